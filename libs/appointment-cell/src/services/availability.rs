// libs/appointment-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{AppointmentError, AvailabilityResponse};
use crate::repository::AppointmentRepository;
use crate::services::conflict::{find_conflict, ConflictDetectionService};
use crate::services::schedule::{BusinessHours, MINUTES_PER_DAY};

/// Derives the bookable start times for a date and service duration by
/// composing the slot generator, the business-hours policy and the overlap
/// check.
pub struct AvailabilityService {
    conflict_service: ConflictDetectionService,
    hours: BusinessHours,
}

impl AvailabilityService {
    pub fn new(repository: Arc<AppointmentRepository>, hours: BusinessHours) -> Self {
        Self {
            conflict_service: ConflictDetectionService::new(repository),
            hours,
        }
    }

    /// Bookable start times, in the generator's chronological order.
    ///
    /// `exclude_appointment_id` names an appointment being rescheduled; its
    /// row is filtered out here so callers do not have to pre-filter the
    /// day's set themselves.
    pub async fn available_slots(
        &self,
        fecha: NaiveDate,
        duracion_minutos: i32,
        exclude_appointment_id: Option<Uuid>,
        auth_token: Option<&str>,
    ) -> Result<AvailabilityResponse, AppointmentError> {
        if duracion_minutos <= 0 || duracion_minutos >= MINUTES_PER_DAY as i32 {
            return Err(AppointmentError::InvalidDuration);
        }

        let hoy = Local::now().date_naive();
        if fecha < hoy {
            debug!("Availability requested for past date {}", fecha);
            return Err(AppointmentError::PastDate);
        }

        let existing = self
            .conflict_service
            .load_intervals(fecha, exclude_appointment_id, auth_token)
            .await?;

        let horarios_disponibles: Vec<_> = self
            .hours
            .candidate_slots()
            .into_iter()
            .filter(|slot| self.hours.validate_booking_window(*slot, duracion_minutos).is_ok())
            .filter(|slot| find_conflict(*slot, duracion_minutos, &existing).is_none())
            .collect();

        info!(
            "{} of the day's slots available on {} for {} min ({} existing appointments)",
            horarios_disponibles.len(),
            fecha,
            duracion_minutos,
            existing.len()
        );

        Ok(AvailabilityResponse {
            fecha,
            duracion_considerada: duracion_minutos,
            total_disponibles: horarios_disponibles.len(),
            citas_existentes: existing.len(),
            horarios_disponibles,
        })
    }
}
