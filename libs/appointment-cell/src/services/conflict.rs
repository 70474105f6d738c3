// libs/appointment-cell/src/services/conflict.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{Appointment, AppointmentError, AppointmentStatus, ConflictDetails};
use crate::repository::AppointmentRepository;
use crate::services::schedule::ClockTime;

/// An existing appointment reduced to what conflict detection needs.
#[derive(Debug, Clone)]
pub struct BookedInterval {
    pub id: Uuid,
    pub celular: String,
    pub inicio: ClockTime,
    pub duracion_minutos: i32,
    pub estado: AppointmentStatus,
}

impl BookedInterval {
    pub fn from_appointment(cita: &Appointment) -> Self {
        Self {
            id: cita.id,
            celular: cita.celular.clone(),
            inicio: cita.hora,
            duracion_minutos: cita.duracion_total,
            estado: cita.estado,
        }
    }

    /// Exclusive end of the booked interval, in i64 so stored durations of
    /// any magnitude cannot overflow the sum.
    pub fn fin_minutos(&self) -> i64 {
        self.inicio.minutes() as i64 + self.duracion_minutos as i64
    }
}

/// Half-open interval intersection: `[start1, end1)` and `[start2, end2)`
/// conflict iff they share at least one minute. Touching endpoints do not.
pub fn intervals_overlap(start1: i64, end1: i64, start2: i64, end2: i64) -> bool {
    start1 < end2 && start2 < end1
}

/// First existing interval, in the order given, that the candidate would
/// intersect. Each existing interval uses its own stored duration. Callers
/// wanting the closest conflict or all of them post-process.
pub fn find_conflict<'a>(
    candidate_start: ClockTime,
    candidate_duration: i32,
    existing: &'a [BookedInterval],
) -> Option<&'a BookedInterval> {
    let start = candidate_start.minutes() as i64;
    let end = start + candidate_duration as i64;

    existing.iter().find(|booked| {
        intervals_overlap(start, end, booked.inicio.minutes() as i64, booked.fin_minutos())
    })
}

/// Loads a date's active appointments and runs the pure overlap check
/// against them.
pub struct ConflictDetectionService {
    repository: Arc<AppointmentRepository>,
}

impl ConflictDetectionService {
    pub fn new(repository: Arc<AppointmentRepository>) -> Self {
        Self { repository }
    }

    /// Checks a candidate interval against a date's existing appointments.
    /// `exclude_appointment_id` drops the appointment being rescheduled so it
    /// never conflicts with itself.
    pub async fn check_date_conflicts(
        &self,
        fecha: NaiveDate,
        candidate_start: ClockTime,
        candidate_duration: i32,
        exclude_appointment_id: Option<Uuid>,
        auth_token: Option<&str>,
    ) -> Result<Option<BookedInterval>, AppointmentError> {
        debug!(
            "Checking conflicts on {} for candidate {} ({} min)",
            fecha, candidate_start, candidate_duration
        );

        let existing = self.load_intervals(fecha, exclude_appointment_id, auth_token).await?;

        let conflict = find_conflict(candidate_start, candidate_duration, &existing).cloned();

        if let Some(ref booked) = conflict {
            warn!(
                "Conflict detected on {}: candidate {} overlaps appointment {} ({})",
                fecha, candidate_start, booked.id, booked.inicio
            );
        }

        Ok(conflict)
    }

    /// A date's active appointments as intervals, chronological, with the
    /// excluded id (if any) already removed.
    pub async fn load_intervals(
        &self,
        fecha: NaiveDate,
        exclude_appointment_id: Option<Uuid>,
        auth_token: Option<&str>,
    ) -> Result<Vec<BookedInterval>, AppointmentError> {
        let citas = self.repository.find_active_by_date(fecha, auth_token).await?;

        Ok(citas
            .iter()
            .filter(|cita| Some(cita.id) != exclude_appointment_id)
            .map(BookedInterval::from_appointment)
            .collect())
    }
}

impl ConflictDetails {
    /// Describes a conflict from the point of view of the phone number that
    /// asked for the slot.
    pub fn from_interval(booked: &BookedInterval, caller_celular: &str) -> Self {
        Self {
            inicio: booked.inicio,
            fin: booked.inicio.wrapping_add(booked.duracion_minutos),
            es_propia: booked.celular == caller_celular,
            estado: booked.estado,
        }
    }
}
