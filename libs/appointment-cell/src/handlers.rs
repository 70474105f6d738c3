// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CancelOutcome, CreateAppointmentRequest, UpdateAppointmentRequest};
use crate::services::availability::AvailabilityService;
use crate::services::booking::{is_valid_celular, AppointmentBookingService};

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub fecha: String,
    pub duracion: i32,
    #[serde(rename = "excluirCita")]
    pub excluir_cita: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CancelQuery {
    pub celular: Option<String>,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

fn parse_fecha_param(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest("La fecha debe tener el formato YYYY-MM-DD".to_string()))
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let booking_service = AppointmentBookingService::new(&state);

    let cita = booking_service.create_appointment(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "mensaje": "Cita creada con éxito",
            "cita": cita,
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let fecha = parse_fecha_param(&params.fecha)?;

    let booking_service = AppointmentBookingService::new(&state);
    let availability_service =
        AvailabilityService::new(booking_service.repository(), booking_service.hours().clone());

    let disponibilidad = availability_service
        .available_slots(fecha, params.duracion, params.excluir_cita, None)
        .await?;

    Ok(Json(json!(disponibilidad)))
}

#[axum::debug_handler]
pub async fn get_appointments_by_phone(
    State(state): State<Arc<AppConfig>>,
    Path(celular): Path<String>,
) -> Result<Json<Value>, AppError> {
    if !is_valid_celular(&celular) {
        return Err(AppError::BadRequest(
            "El número de celular debe comenzar por 3 y tener 10 dígitos".to_string(),
        ));
    }

    let booking_service = AppointmentBookingService::new(&state);
    let citas = booking_service.appointments_by_phone(&celular).await?;

    Ok(Json(json!({
        "total": citas.len(),
        "citas": citas,
    })))
}

/// Public update path: the body's phone number is the only credential.
#[axum::debug_handler]
pub async fn update_appointment_public(
    State(state): State<Arc<AppConfig>>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let booking_service = AppointmentBookingService::new(&state);

    let cita = booking_service.update_appointment_public(id, request).await?;

    Ok(Json(json!({
        "mensaje": "Cita actualizada con éxito",
        "cita": cita,
    })))
}

// ==============================================================================
// PROTECTED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    headers: HeaderMap,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden(
            "Se requieren permisos de administrador".to_string(),
        ));
    }

    let token = bearer_token(&headers);

    let booking_service = AppointmentBookingService::new(&state);
    let citas = booking_service.list_all(token).await?;

    Ok(Json(json!({
        "total": citas.len(),
        "citas": citas,
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_admin(
    State(state): State<Arc<AppConfig>>,
    headers: HeaderMap,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden(
            "Se requieren permisos de administrador".to_string(),
        ));
    }

    let token = bearer_token(&headers);

    let booking_service = AppointmentBookingService::new(&state);
    let cita = booking_service.update_appointment_admin(id, request, token).await?;

    Ok(Json(json!({
        "mensaje": "Cita actualizada con éxito",
        "cita": cita,
    })))
}

/// Admins delete the row outright; an authenticated non-admin may cancel
/// their own appointment by passing their phone number as a query param.
#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    headers: HeaderMap,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Query(params): Query<CancelQuery>,
) -> Result<Json<Value>, AppError> {
    let token = bearer_token(&headers);

    let booking_service = AppointmentBookingService::new(&state);
    let outcome = booking_service
        .cancel_or_delete(id, user.is_admin(), params.celular.as_deref(), token)
        .await?;

    let body = match outcome {
        CancelOutcome::Deleted => json!({ "mensaje": "Cita eliminada" }),
        CancelOutcome::Cancelled(cita) => json!({
            "mensaje": "Cita cancelada",
            "cita": cita,
        }),
    };

    Ok(Json(body))
}
