// libs/catalog-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

/// A bookable salon service as stored in the catalog. `duracion` is in
/// minutes; appointment requests sum it across the selected services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub categoria: String,
    pub nombre: String,
    pub duracion: i32,
    pub precio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    #[serde(default)]
    pub categoria: String,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub duracion: i32,
    #[serde(default)]
    pub precio: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateServiceRequest {
    pub categoria: Option<String>,
    pub nombre: Option<String>,
    pub duracion: Option<i32>,
    pub precio: Option<f64>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Servicio no encontrado")]
    NotFound,

    #[error("Datos del servicio inválidos")]
    Validation(Vec<String>),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound => AppError::NotFound("Servicio no encontrado".to_string()),
            CatalogError::Validation(errores) => AppError::Validation(errores),
            CatalogError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
