// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::services::schedule::{ClockTime, ScheduleError};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A persisted appointment. Wire field names keep the public API's Spanish
/// vocabulary; internals use the typed representations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub celular: String,
    pub fecha: NaiveDate,
    pub hora: ClockTime,
    pub servicio: Vec<Uuid>,
    #[serde(rename = "duracionTotal")]
    pub duracion_total: i32,
    #[serde(rename = "precioTotal")]
    pub precio_total: f64,
    pub estado: AppointmentStatus,
    #[serde(default)]
    pub historial: Vec<StatusChange>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One entry of the append-only status history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub estado: AppointmentStatus,
    pub fecha: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AppointmentStatus {
    #[serde(rename = "Pendiente")]
    Pendiente,
    #[serde(rename = "Aprobada")]
    Aprobada,
    #[serde(rename = "Notificada")]
    Notificada,
    #[serde(rename = "En progreso")]
    EnProgreso,
    #[serde(rename = "Completada")]
    Completada,
    #[serde(rename = "Cancelada por clienta")]
    CanceladaPorClienta,
    #[serde(rename = "Cancelada por salón")]
    CanceladaPorSalon,
    #[serde(rename = "No asistió")]
    NoAsistio,
}

impl AppointmentStatus {
    /// Statuses that still occupy their time slot. Cancelled and no-show
    /// appointments never participate in conflict detection.
    pub fn is_active(&self) -> bool {
        !matches!(
            self,
            AppointmentStatus::CanceladaPorClienta
                | AppointmentStatus::CanceladaPorSalon
                | AppointmentStatus::NoAsistio
        )
    }

    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completada
                | AppointmentStatus::CanceladaPorClienta
                | AppointmentStatus::CanceladaPorSalon
                | AppointmentStatus::NoAsistio
        )
    }

    pub fn all() -> [AppointmentStatus; 8] {
        [
            AppointmentStatus::Pendiente,
            AppointmentStatus::Aprobada,
            AppointmentStatus::Notificada,
            AppointmentStatus::EnProgreso,
            AppointmentStatus::Completada,
            AppointmentStatus::CanceladaPorClienta,
            AppointmentStatus::CanceladaPorSalon,
            AppointmentStatus::NoAsistio,
        ]
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppointmentStatus::Pendiente => "Pendiente",
            AppointmentStatus::Aprobada => "Aprobada",
            AppointmentStatus::Notificada => "Notificada",
            AppointmentStatus::EnProgreso => "En progreso",
            AppointmentStatus::Completada => "Completada",
            AppointmentStatus::CanceladaPorClienta => "Cancelada por clienta",
            AppointmentStatus::CanceladaPorSalon => "Cancelada por salón",
            AppointmentStatus::NoAsistio => "No asistió",
        };
        write!(f, "{}", name)
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Body of `POST /api/citas`. Date and time arrive as raw strings so the
/// service can report every field violation in one response instead of
/// failing on the first deserialization error.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAppointmentRequest {
    #[serde(default)]
    pub celular: String,
    #[serde(default)]
    pub fecha: String,
    #[serde(default)]
    pub hora: String,
    #[serde(default, deserialize_with = "one_or_many_services")]
    pub servicio: Vec<Uuid>,
    #[serde(rename = "duracionTotal", default)]
    pub duracion_total: i32,
    #[serde(rename = "precioTotal", default)]
    pub precio_total: f64,
}

/// Body of the public and admin `PUT` routes. Every field optional; the
/// service merges the patch over the stored record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub celular: Option<String>,
    pub fecha: Option<String>,
    pub hora: Option<String>,
    #[serde(default, deserialize_with = "optional_one_or_many_services")]
    pub servicio: Option<Vec<Uuid>>,
    #[serde(rename = "duracionTotal")]
    pub duracion_total: Option<i32>,
    #[serde(rename = "precioTotal")]
    pub precio_total: Option<f64>,
    pub estado: Option<AppointmentStatus>,
}

impl UpdateAppointmentRequest {
    /// A patch that touches nothing but `estado` goes through the
    /// status-only path (no conflict re-check, no reset to Pendiente).
    pub fn is_status_only(&self) -> bool {
        self.fecha.is_none()
            && self.hora.is_none()
            && self.servicio.is_none()
            && self.duracion_total.is_none()
            && self.precio_total.is_none()
    }
}

// Historically the `servicio` field arrived sometimes as one reference and
// sometimes as a list. Normalize here at the boundary; the core only ever
// sees an ordered sequence of service ids.
#[derive(Deserialize)]
#[serde(untagged)]
enum ServicioField {
    One(Uuid),
    Many(Vec<Uuid>),
}

fn one_or_many_services<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Uuid>, D::Error> {
    Ok(match Option::<ServicioField>::deserialize(d)? {
        Some(ServicioField::One(id)) => vec![id],
        Some(ServicioField::Many(ids)) => ids,
        None => Vec::new(),
    })
}

fn optional_one_or_many_services<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<Vec<Uuid>>, D::Error> {
    Ok(match Option::<ServicioField>::deserialize(d)? {
        Some(ServicioField::One(id)) => Some(vec![id]),
        Some(ServicioField::Many(ids)) => Some(ids),
        None => None,
    })
}

/// Response of `GET /api/citas/disponibilidad`.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityResponse {
    pub fecha: NaiveDate,
    #[serde(rename = "duracionConsiderada")]
    pub duracion_considerada: i32,
    #[serde(rename = "horariosDisponibles")]
    pub horarios_disponibles: Vec<ClockTime>,
    #[serde(rename = "totalDisponibles")]
    pub total_disponibles: usize,
    #[serde(rename = "citasExistentes")]
    pub citas_existentes: usize,
}

/// Outcome of `DELETE /api/citas/{id}`: admins remove the row, owners get a
/// soft cancellation.
#[derive(Debug, Clone)]
pub enum CancelOutcome {
    Deleted,
    Cancelled(Appointment),
}

// ==============================================================================
// CONFLICT DETAILS AND ERRORS
// ==============================================================================

/// What the caller learns about the appointment blocking their slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictDetails {
    pub inicio: ClockTime,
    pub fin: ClockTime,
    pub es_propia: bool,
    pub estado: AppointmentStatus,
}

impl fmt::Display for ConflictDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.es_propia {
            write!(
                f,
                "Usted ya tiene una cita de {} a {}, se encuentra en estado: {}",
                self.inicio, self.fin, self.estado
            )
        } else {
            write!(
                f,
                "El horario de {} a {} ya está ocupado (estado: {})",
                self.inicio, self.fin, self.estado
            )
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppointmentError {
    #[error("Cita no encontrada")]
    NotFound,

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("{details}")]
    Conflict { details: ConflictDetails },

    #[error("{details}")]
    RescheduleConflict { details: ConflictDetails },

    #[error("La duración total debe ser un número positivo menor que un día")]
    InvalidDuration,

    #[error("La fecha de la cita no puede ser anterior a hoy")]
    PastDate,

    #[error("Datos de cita inválidos")]
    Validation(Vec<String>),

    #[error("La cita está en estado terminal ({0}) y no admite más cambios")]
    TerminalStatus(AppointmentStatus),

    #[error("Acceso denegado")]
    Forbidden,

    #[error("Error de base de datos: {0}")]
    DatabaseError(String),
}

/// Stable machine codes for the user-facing scheduling failures.
pub const CODIGO_HORARIO_OCUPADO: &str = "HORARIO_OCUPADO";
pub const CODIGO_HORARIO_OCUPADO_ACTUALIZACION: &str = "HORARIO_OCUPADO_ACTUALIZACION";

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound("Cita no encontrada".to_string()),
            AppointmentError::Conflict { ref details } => AppError::UserFacing {
                codigo: CODIGO_HORARIO_OCUPADO.to_string(),
                mensaje: details.to_string(),
            },
            AppointmentError::RescheduleConflict { ref details } => AppError::UserFacing {
                codigo: CODIGO_HORARIO_OCUPADO_ACTUALIZACION.to_string(),
                mensaje: details.to_string(),
            },
            AppointmentError::Validation(errores) => AppError::Validation(errores),
            AppointmentError::Forbidden => AppError::Forbidden("Acceso denegado".to_string()),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
            AppointmentError::Schedule(_)
            | AppointmentError::InvalidDuration
            | AppointmentError::PastDate
            | AppointmentError::TerminalStatus(_) => AppError::BadRequest(err.to_string()),
        }
    }
}
