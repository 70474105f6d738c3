// libs/catalog-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreateServiceRequest, UpdateServiceRequest};
use crate::services::catalog::CatalogService;

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub categoria: Option<String>,
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Auth("Token no proporcionado".to_string()))
}

fn require_admin(user: &User) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Se requieren permisos de administrador".to_string(),
        ))
    }
}

#[axum::debug_handler]
pub async fn list_services(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<CatalogQuery>,
) -> Result<Json<Value>, AppError> {
    let catalog_service = CatalogService::new(&state);
    let servicios = catalog_service
        .list_services(params.categoria.as_deref())
        .await?;

    Ok(Json(json!({
        "total": servicios.len(),
        "servicios": servicios,
    })))
}

#[axum::debug_handler]
pub async fn get_service(
    State(state): State<Arc<AppConfig>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let catalog_service = CatalogService::new(&state);
    let servicio = catalog_service.get_service(id).await?;

    Ok(Json(json!(servicio)))
}

#[axum::debug_handler]
pub async fn create_service(
    State(state): State<Arc<AppConfig>>,
    headers: HeaderMap,
    Extension(user): Extension<User>,
    Json(request): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_admin(&user)?;
    let token = bearer_token(&headers)?;

    let catalog_service = CatalogService::new(&state);
    let servicio = catalog_service.create_service(request, token).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "mensaje": "Servicio creado con éxito",
            "servicio": servicio,
        })),
    ))
}

#[axum::debug_handler]
pub async fn update_service(
    State(state): State<Arc<AppConfig>>,
    headers: HeaderMap,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateServiceRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let token = bearer_token(&headers)?;

    let catalog_service = CatalogService::new(&state);
    let servicio = catalog_service.update_service(id, request, token).await?;

    Ok(Json(json!({
        "mensaje": "Servicio actualizado con éxito",
        "servicio": servicio,
    })))
}

#[axum::debug_handler]
pub async fn delete_service(
    State(state): State<Arc<AppConfig>>,
    headers: HeaderMap,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let token = bearer_token(&headers)?;

    let catalog_service = CatalogService::new(&state);
    catalog_service.delete_service(id, token).await?;

    Ok(Json(json!({ "mensaje": "Servicio eliminado" })))
}
