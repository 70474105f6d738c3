// libs/appointment-cell/src/services/booking.rs
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, OnceLock};

use chrono::{Local, NaiveDate, Utc};
use serde_json::json;
use tokio::sync::{Mutex as TokioMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, CancelOutcome, ConflictDetails,
    CreateAppointmentRequest, StatusChange, UpdateAppointmentRequest,
};
use crate::repository::AppointmentRepository;
use crate::services::conflict::ConflictDetectionService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::schedule::{BusinessHours, ClockTime, MINUTES_PER_DAY};

/// Serialization point for the check-then-act sequence: one async mutex per
/// date, process-wide. Two concurrent bookings for the same date cannot both
/// pass the conflict check before either write commits.
struct DateLockRegistry {
    locks: StdMutex<HashMap<NaiveDate, Arc<TokioMutex<()>>>>,
}

impl DateLockRegistry {
    fn new() -> Self {
        Self {
            locks: StdMutex::new(HashMap::new()),
        }
    }

    fn acquire(&self, fecha: NaiveDate) -> Arc<TokioMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // A strong count of 1 means only the map still references the lock,
        // so nobody holds or awaits it. Evicting here keeps the registry
        // bounded by the number of dates currently in flight.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(fecha).or_default().clone()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

async fn hold_date_lock(fecha: NaiveDate) -> OwnedMutexGuard<()> {
    static LOCKS: OnceLock<DateLockRegistry> = OnceLock::new();
    LOCKS
        .get_or_init(DateLockRegistry::new)
        .acquire(fecha)
        .lock_owned()
        .await
}

/// Orchestrates appointment mutations: validation, business hours, conflict
/// detection, status history and persistence.
pub struct AppointmentBookingService {
    repository: Arc<AppointmentRepository>,
    conflict_service: ConflictDetectionService,
    lifecycle_service: AppointmentLifecycleService,
    hours: BusinessHours,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_hours(config, BusinessHours::default())
    }

    pub fn with_hours(config: &AppConfig, hours: BusinessHours) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        let repository = Arc::new(AppointmentRepository::new(supabase));

        Self {
            conflict_service: ConflictDetectionService::new(Arc::clone(&repository)),
            lifecycle_service: AppointmentLifecycleService::new(),
            repository,
            hours,
        }
    }

    pub fn repository(&self) -> Arc<AppointmentRepository> {
        Arc::clone(&self.repository)
    }

    pub fn hours(&self) -> &BusinessHours {
        &self.hours
    }

    // ==========================================================================
    // CREATE
    // ==========================================================================

    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        info!(
            "Booking request for {} on {} at {}",
            request.celular, request.fecha, request.hora
        );

        let (fecha, hora) = validate_create_request(&request)?;

        self.hours.validate_booking_window(hora, request.duracion_total)?;

        let _guard = hold_date_lock(fecha).await;

        if let Some(booked) = self
            .conflict_service
            .check_date_conflicts(fecha, hora, request.duracion_total, None, None)
            .await?
        {
            return Err(AppointmentError::Conflict {
                details: ConflictDetails::from_interval(&booked, &request.celular),
            });
        }

        let now = Utc::now();
        let record = json!({
            "celular": request.celular,
            "fecha": fecha,
            "hora": hora,
            "servicio": request.servicio,
            "duracionTotal": request.duracion_total,
            "precioTotal": request.precio_total,
            "estado": AppointmentStatus::Pendiente,
            "historial": [StatusChange { estado: AppointmentStatus::Pendiente, fecha: now }],
        });

        let cita = self.repository.insert(record, None).await?;
        info!("Appointment {} created for {} at {}", cita.id, cita.fecha, cita.hora);
        Ok(cita)
    }

    // ==========================================================================
    // UPDATE (public and admin entry points)
    // ==========================================================================

    /// Public mutation path: authorized solely by the phone number supplied in
    /// the body matching the record's phone number.
    pub async fn update_appointment_public(
        &self,
        id: Uuid,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let celular = request
            .celular
            .clone()
            .ok_or_else(|| {
                AppointmentError::Validation(vec![
                    "El número de celular es obligatorio".to_string()
                ])
            })?;

        let current = self
            .repository
            .find_by_id(id, None)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        if current.celular != celular {
            warn!("Public update of appointment {} with mismatched phone", id);
            return Err(AppointmentError::Forbidden);
        }

        self.apply_update(current, request, None).await
    }

    /// Admin mutation path: the role check happens at the handler; here the
    /// patch applies unconditionally.
    pub async fn update_appointment_admin(
        &self,
        id: Uuid,
        request: UpdateAppointmentRequest,
        auth_token: Option<&str>,
    ) -> Result<Appointment, AppointmentError> {
        let current = self
            .repository
            .find_by_id(id, auth_token)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        self.apply_update(current, request, auth_token).await
    }

    async fn apply_update(
        &self,
        current: Appointment,
        request: UpdateAppointmentRequest,
        auth_token: Option<&str>,
    ) -> Result<Appointment, AppointmentError> {
        if request.is_status_only() {
            let nuevo_estado = request.estado.ok_or_else(|| {
                AppointmentError::Validation(vec!["No hay campos para actualizar".to_string()])
            })?;
            return self.update_status(current, nuevo_estado, auth_token).await;
        }

        self.update_full(current, request, auth_token).await
    }

    /// Merges a structural patch over the stored record, re-running the
    /// conflict check (excluding self) when the schedule actually changed.
    /// A structural change resets the status to Pendiente unless the patch
    /// names one explicitly.
    async fn update_full(
        &self,
        current: Appointment,
        request: UpdateAppointmentRequest,
        auth_token: Option<&str>,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Updating appointment {}", current.id);

        let mut errores = Vec::new();

        let fecha = match &request.fecha {
            Some(raw) => match parse_fecha(raw) {
                Ok(fecha) => fecha,
                Err(mensaje) => {
                    errores.push(mensaje);
                    current.fecha
                }
            },
            None => current.fecha,
        };

        let hora = match &request.hora {
            Some(raw) => match raw.parse::<ClockTime>() {
                Ok(hora) => hora,
                Err(e) => {
                    errores.push(e.to_string());
                    current.hora
                }
            },
            None => current.hora,
        };

        let servicio = request.servicio.unwrap_or_else(|| current.servicio.clone());
        if servicio.is_empty() {
            errores.push("Debe seleccionar al menos un servicio".to_string());
        }

        let precio_total = request.precio_total.unwrap_or(current.precio_total);
        if precio_total <= 0.0 {
            errores.push("El precio total debe ser un número positivo".to_string());
        }

        if !errores.is_empty() {
            return Err(AppointmentError::Validation(errores));
        }

        let duracion_total = request.duracion_total.unwrap_or(current.duracion_total);
        if duracion_total <= 0 || duracion_total >= MINUTES_PER_DAY as i32 {
            return Err(AppointmentError::InvalidDuration);
        }

        let schedule_changed = fecha != current.fecha
            || hora != current.hora
            || duracion_total != current.duracion_total;

        let _guard = if schedule_changed {
            if fecha < Local::now().date_naive() {
                return Err(AppointmentError::PastDate);
            }
            self.hours.validate_booking_window(hora, duracion_total)?;

            let guard = hold_date_lock(fecha).await;

            if let Some(booked) = self
                .conflict_service
                .check_date_conflicts(fecha, hora, duracion_total, Some(current.id), auth_token)
                .await?
            {
                return Err(AppointmentError::RescheduleConflict {
                    details: ConflictDetails::from_interval(&booked, &current.celular),
                });
            }

            Some(guard)
        } else {
            None
        };

        let estado = request.estado.unwrap_or(AppointmentStatus::Pendiente);
        let mut historial = current.historial.clone();
        if estado != current.estado {
            self.lifecycle_service
                .validate_status_transition(&current.estado, &estado)?;
            historial.push(StatusChange { estado, fecha: Utc::now() });
        }

        let patch = json!({
            "fecha": fecha,
            "hora": hora,
            "servicio": servicio,
            "duracionTotal": duracion_total,
            "precioTotal": precio_total,
            "estado": estado,
            "historial": historial,
        });

        let updated = self
            .repository
            .update(current.id, patch, auth_token)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        info!("Appointment {} updated ({} at {})", updated.id, updated.fecha, updated.hora);
        Ok(updated)
    }

    /// Status-only transition. Re-sending the current status is a no-op
    /// success; anything else appends to the history.
    async fn update_status(
        &self,
        current: Appointment,
        nuevo_estado: AppointmentStatus,
        auth_token: Option<&str>,
    ) -> Result<Appointment, AppointmentError> {
        if nuevo_estado == current.estado {
            debug!(
                "Appointment {} already in status {}, nothing to do",
                current.id, nuevo_estado
            );
            return Ok(current);
        }

        self.lifecycle_service
            .validate_status_transition(&current.estado, &nuevo_estado)?;

        let mut historial = current.historial.clone();
        historial.push(StatusChange { estado: nuevo_estado, fecha: Utc::now() });

        let patch = json!({ "estado": nuevo_estado, "historial": historial });

        let updated = self
            .repository
            .update(current.id, patch, auth_token)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        info!("Appointment {} moved to status {}", updated.id, updated.estado);
        Ok(updated)
    }

    // ==========================================================================
    // CANCEL / DELETE
    // ==========================================================================

    /// Admins hard-delete the row; the owner (matched by phone) gets a soft
    /// cancellation; anyone else is rejected.
    pub async fn cancel_or_delete(
        &self,
        id: Uuid,
        is_admin: bool,
        caller_celular: Option<&str>,
        auth_token: Option<&str>,
    ) -> Result<CancelOutcome, AppointmentError> {
        let current = self
            .repository
            .find_by_id(id, auth_token)
            .await?
            .ok_or(AppointmentError::NotFound)?;

        if is_admin {
            self.repository.delete(id, auth_token).await?;
            info!("Appointment {} deleted by admin", id);
            return Ok(CancelOutcome::Deleted);
        }

        if caller_celular != Some(current.celular.as_str()) {
            warn!("Unauthorized cancellation attempt for appointment {}", id);
            return Err(AppointmentError::Forbidden);
        }

        let cancelled = self
            .update_status(current, AppointmentStatus::CanceladaPorClienta, auth_token)
            .await?;
        Ok(CancelOutcome::Cancelled(cancelled))
    }

    // ==========================================================================
    // LOOKUPS
    // ==========================================================================

    pub async fn get_appointment(
        &self,
        id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Appointment, AppointmentError> {
        self.repository
            .find_by_id(id, auth_token)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    pub async fn appointments_by_phone(
        &self,
        celular: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.repository.find_by_phone(celular, None).await
    }

    pub async fn list_all(
        &self,
        auth_token: Option<&str>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.repository.list_all(auth_token).await
    }
}

// ==============================================================================
// REQUEST VALIDATION
// ==============================================================================

/// Colombian mobile numbers: exactly ten digits, first digit 3.
pub fn is_valid_celular(celular: &str) -> bool {
    celular.len() == 10
        && celular.starts_with('3')
        && celular.bytes().all(|b| b.is_ascii_digit())
}

fn parse_fecha(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| "La fecha debe tener el formato YYYY-MM-DD".to_string())
}

/// Aggregates every field violation into one error instead of failing on
/// the first, so clients can show the whole form state at once.
fn validate_create_request(
    request: &CreateAppointmentRequest,
) -> Result<(NaiveDate, ClockTime), AppointmentError> {
    let mut errores = Vec::new();

    if request.celular.is_empty() {
        errores.push("El número de celular es obligatorio".to_string());
    } else if !is_valid_celular(&request.celular) {
        errores.push("El número de celular debe comenzar por 3 y tener 10 dígitos".to_string());
    }

    let fecha = if request.fecha.is_empty() {
        errores.push("La fecha es obligatoria".to_string());
        None
    } else {
        match parse_fecha(&request.fecha) {
            Ok(fecha) => {
                if fecha < Local::now().date_naive() {
                    errores.push("La fecha de la cita no puede ser anterior a hoy".to_string());
                    None
                } else {
                    Some(fecha)
                }
            }
            Err(mensaje) => {
                errores.push(mensaje);
                None
            }
        }
    };

    let hora = if request.hora.is_empty() {
        errores.push("La hora es obligatoria".to_string());
        None
    } else {
        match request.hora.parse::<ClockTime>() {
            Ok(hora) => Some(hora),
            Err(e) => {
                errores.push(e.to_string());
                None
            }
        }
    };

    if request.servicio.is_empty() {
        errores.push("Debe seleccionar al menos un servicio".to_string());
    }

    if request.duracion_total <= 0 {
        errores.push("La duración total debe ser un número positivo".to_string());
    } else if request.duracion_total >= MINUTES_PER_DAY as i32 {
        errores.push("La duración total no puede superar un día".to_string());
    }

    if request.precio_total <= 0.0 {
        errores.push("El precio total debe ser un número positivo".to_string());
    }

    match (fecha, hora) {
        (Some(fecha), Some(hora)) if errores.is_empty() => Ok((fecha, hora)),
        _ => Err(AppointmentError::Validation(errores)),
    }
}
