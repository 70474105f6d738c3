// libs/appointment-cell/src/repository.rs
use std::sync::Arc;

use chrono::NaiveDate;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentError};

const CITAS: &str = "/rest/v1/citas";

/// Statuses that free their slot. Rows in these states are invisible to
/// conflict detection and availability.
const ESTADOS_INACTIVOS: [&str; 3] = [
    "Cancelada por clienta",
    "Cancelada por salón",
    "No asistió",
];

/// Query layer for the `citas` table. Builds PostgREST filters and decodes
/// rows; all scheduling decisions stay in the services.
pub struct AppointmentRepository {
    supabase: Arc<SupabaseClient>,
}

impl AppointmentRepository {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Same-day appointments that still occupy their slot, in chronological
    /// order. The stored `hora` is a 12-hour clock string, so the database's
    /// lexicographic ordering is not chronological; rows are re-sorted after
    /// decoding.
    pub async fn find_active_by_date(
        &self,
        fecha: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let exclusion = format!(
            "not.in.({})",
            ESTADOS_INACTIVOS
                .iter()
                .map(|estado| format!("\"{}\"", estado))
                .collect::<Vec<_>>()
                .join(",")
        );
        let path = format!(
            "{}?fecha=eq.{}&estado={}&order=hora.asc",
            CITAS,
            fecha,
            urlencoding::encode(&exclusion)
        );

        let mut citas: Vec<Appointment> = self.request(Method::GET, &path, auth_token, None).await?;
        citas.sort_by_key(|cita| cita.hora);

        debug!("Loaded {} active appointments for {}", citas.len(), fecha);
        Ok(citas)
    }

    pub async fn find_by_id(
        &self,
        id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("{}?id=eq.{}", CITAS, id);
        let citas: Vec<Appointment> = self.request(Method::GET, &path, auth_token, None).await?;
        Ok(citas.into_iter().next())
    }

    pub async fn find_by_phone(
        &self,
        celular: &str,
        auth_token: Option<&str>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "{}?celular=eq.{}&order=fecha.asc",
            CITAS,
            urlencoding::encode(celular)
        );
        let mut citas: Vec<Appointment> = self.request(Method::GET, &path, auth_token, None).await?;
        citas.sort_by_key(|cita| (cita.fecha, cita.hora));
        Ok(citas)
    }

    pub async fn list_all(
        &self,
        auth_token: Option<&str>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!("{}?order=fecha.asc", CITAS);
        let mut citas: Vec<Appointment> = self.request(Method::GET, &path, auth_token, None).await?;
        citas.sort_by_key(|cita| (cita.fecha, cita.hora));
        Ok(citas)
    }

    /// Inserts a row and returns it as stored (ids and timestamps assigned by
    /// the database).
    pub async fn insert(
        &self,
        record: Value,
        auth_token: Option<&str>,
    ) -> Result<Appointment, AppointmentError> {
        let citas: Vec<Appointment> = self
            .request(Method::POST, CITAS, auth_token, Some(record))
            .await?;
        citas.into_iter().next().ok_or_else(|| {
            AppointmentError::DatabaseError("insert returned no rows".to_string())
        })
    }

    pub async fn update(
        &self,
        id: Uuid,
        patch: Value,
        auth_token: Option<&str>,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("{}?id=eq.{}", CITAS, id);
        let citas: Vec<Appointment> = self
            .request(Method::PATCH, &path, auth_token, Some(patch))
            .await?;
        Ok(citas.into_iter().next())
    }

    pub async fn delete(
        &self,
        id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<bool, AppointmentError> {
        let path = format!("{}?id=eq.{}", CITAS, id);
        let citas: Vec<Appointment> = self.request(Method::DELETE, &path, auth_token, None).await?;
        Ok(!citas.is_empty())
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.supabase
            .request(method, path, auth_token, body)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))
    }
}
