// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

/// Status transition rules. The salon workflow is flat: staff move an
/// appointment directly to whatever state reality is in, so every
/// non-terminal status may transition to any other. Terminal statuses
/// (completed, both cancellations, no-show) are frozen.
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_status_transition(
        &self,
        current: &AppointmentStatus,
        new: &AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition {} -> {}", current, new);

        if !self.get_valid_transitions(current).contains(new) {
            warn!("Invalid status transition attempted: {} -> {}", current, new);
            return Err(AppointmentError::TerminalStatus(*current));
        }

        Ok(())
    }

    pub fn get_valid_transitions(&self, current: &AppointmentStatus) -> Vec<AppointmentStatus> {
        if current.is_terminal() {
            return Vec::new();
        }

        AppointmentStatus::all()
            .into_iter()
            .filter(|estado| estado != current)
            .collect()
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
