use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Method;
use tracing::debug;
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{error_status, SupabaseClient};

use crate::models::{
    Appointment, AppointmentError, AppointmentFilters, AppointmentStatus, Shift,
};

/// Persistence seam for appointment rows. All mutating paths go through
/// here so the scheduling service stays testable without a live backend.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn create(
        &self,
        appointment: &Appointment,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError>;

    async fn get_by_id(
        &self,
        id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Appointment>, AppointmentError>;

    async fn list_filtered(
        &self,
        offset: i64,
        limit: i64,
        filters: &AppointmentFilters,
        auth_token: &str,
    ) -> Result<(Vec<Appointment>, i64), AppointmentError>;

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError>;

    /// Sets status RESCHEDULED together with the new slot in one update.
    async fn reschedule(
        &self,
        id: Uuid,
        date: NaiveDate,
        time: &str,
        shift: Shift,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError>;

    async fn exists_at_slot(
        &self,
        date: NaiveDate,
        time: &str,
        exclude_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<bool, AppointmentError>;
}

pub struct SupabaseAppointmentStore {
    supabase: SupabaseClient,
}

impl SupabaseAppointmentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

fn map_store_error(e: anyhow::Error) -> AppointmentError {
    match error_status(&e) {
        // The partial unique index on active (date,time) rows reports
        // double-booking as a 409.
        Some(409) => AppointmentError::SlotTaken,
        _ => AppointmentError::DatabaseError(e.to_string()),
    }
}

fn representation_headers() -> reqwest::header::HeaderMap {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        "Prefer",
        reqwest::header::HeaderValue::from_static("return=representation"),
    );
    headers
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn create(
        &self,
        appointment: &Appointment,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!(
            "Creating appointment {} for patient {} at {} {}",
            appointment.id, appointment.patient_id, appointment.date, appointment.time
        );

        let body = json!({
            "id": appointment.id,
            "patient_id": appointment.patient_id,
            "date": appointment.date.format("%Y-%m-%d").to_string(),
            "time": appointment.time,
            "treatment_type": appointment.treatment_type,
            "status": appointment.status,
            "shift": appointment.shift,
            "notes": appointment.notes,
            "package_id": appointment.package_id,
            "created_by": appointment.created_by,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let result: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(body),
                Some(representation_headers()),
            )
            .await
            .map_err(map_store_error)?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::DatabaseError("Failed to create appointment".to_string()))
    }

    async fn get_by_id(
        &self,
        id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let result: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(map_store_error)?;
        Ok(result.into_iter().next())
    }

    async fn list_filtered(
        &self,
        offset: i64,
        limit: i64,
        filters: &AppointmentFilters,
        auth_token: &str,
    ) -> Result<(Vec<Appointment>, i64), AppointmentError> {
        let mut path = format!(
            "/rest/v1/appointments?order=date.desc,time.desc&offset={}&limit={}",
            offset, limit
        );
        if let Some(date) = filters.date {
            path.push_str(&format!("&date=eq.{}", date.format("%Y-%m-%d")));
        }
        if let Some(shift) = filters.shift {
            path.push_str(&format!("&shift=eq.{}", shift));
        }
        if let Some(status) = filters.status {
            path.push_str(&format!("&status=eq.{}", status));
        }

        self.supabase
            .request_with_count(&path, Some(auth_token))
            .await
            .map_err(map_store_error)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let body = json!({
            "status": status,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let result: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(body),
                Some(representation_headers()),
            )
            .await
            .map_err(map_store_error)?;

        result.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    async fn reschedule(
        &self,
        id: Uuid,
        date: NaiveDate,
        time: &str,
        shift: Shift,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let body = json!({
            "status": AppointmentStatus::Rescheduled,
            "date": date.format("%Y-%m-%d").to_string(),
            "time": time,
            "shift": shift,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let result: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(body),
                Some(representation_headers()),
            )
            .await
            .map_err(map_store_error)?;

        result.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    async fn exists_at_slot(
        &self,
        date: NaiveDate,
        time: &str,
        exclude_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        // Cancelled and rescheduled rows no longer hold the slot.
        let mut path = format!(
            "/rest/v1/appointments?select=id&date=eq.{}&time=eq.{}&status=not.in.(CANCELLED,RESCHEDULED)&limit=1",
            date.format("%Y-%m-%d"),
            urlencoding::encode(time)
        );
        if let Some(exclude) = exclude_id {
            path.push_str(&format!("&id=neq.{}", exclude));
        }

        let result: Vec<serde_json::Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(map_store_error)?;
        Ok(!result.is_empty())
    }
}
