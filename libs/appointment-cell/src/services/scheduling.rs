use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use package_cell::models::PackageStatus;
use package_cell::store::{PackageStore, SupabasePackageStore};
use patient_cell::store::{PatientStore, SupabasePatientStore};
use shared_config::AppConfig;
use shared_models::pagination::normalize_page;

use crate::models::{
    Appointment, AppointmentError, AppointmentFilters, AppointmentListQuery, AppointmentStatus,
    CreateAppointmentRequest, Shift,
};
use crate::services::hours::validate_business_hours;
use crate::services::lifecycle::validate_transition;
use crate::store::{AppointmentStore, SupabaseAppointmentStore};

/// Orchestrates appointment creation, listing, status changes, and
/// rescheduling. All business validation lives here; handlers only parse
/// the request and thread identity through.
pub struct AppointmentSchedulingService {
    appointments: Arc<dyn AppointmentStore>,
    patients: Arc<dyn PatientStore>,
    packages: Arc<dyn PackageStore>,
}

impl AppointmentSchedulingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            appointments: Arc::new(SupabaseAppointmentStore::new(config)),
            patients: Arc::new(SupabasePatientStore::new(config)),
            packages: Arc::new(SupabasePackageStore::new(config)),
        }
    }

    pub fn with_stores(
        appointments: Arc<dyn AppointmentStore>,
        patients: Arc<dyn PatientStore>,
        packages: Arc<dyn PackageStore>,
    ) -> Self {
        Self {
            appointments,
            patients,
            packages,
        }
    }

    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
        creator_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.patients
            .get_by_id(request.patient_id, auth_token)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
            .ok_or(AppointmentError::PatientNotFound)?;

        let date = parse_date(&request.date)?;
        validate_business_hours(date, &request.time)?;

        // Advisory pre-check. The partial unique index on active rows is
        // still authoritative under concurrent creates.
        if self
            .appointments
            .exists_at_slot(date, &request.time, None, auth_token)
            .await?
        {
            return Err(AppointmentError::SlotTaken);
        }

        if let Some(package_id) = request.package_id {
            let package = self
                .packages
                .get_by_id(package_id, auth_token)
                .await
                .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
                .ok_or(AppointmentError::PackageNotFound)?;
            if package.patient_id != request.patient_id {
                return Err(AppointmentError::PackageOwnershipMismatch);
            }
            if package.status != PackageStatus::Active {
                return Err(AppointmentError::PackageNotActive);
            }
        }

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            date,
            time: request.time,
            treatment_type: request.treatment_type,
            status: AppointmentStatus::New,
            shift: request.shift,
            notes: request.notes,
            package_id: request.package_id,
            created_by: creator_id,
            created_at: now,
            updated_at: now,
        };

        self.appointments.create(&appointment, auth_token).await
    }

    pub async fn get_appointment(
        &self,
        id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.appointments
            .get_by_id(id, auth_token)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    pub async fn list_appointments(
        &self,
        query: &AppointmentListQuery,
        auth_token: &str,
    ) -> Result<(Vec<Appointment>, i64, i64, i64), AppointmentError> {
        let (page, per_page, offset) = normalize_page(query.page, query.per_page);

        let filters = AppointmentFilters {
            date: match &query.date {
                Some(raw) => Some(parse_date(raw)?),
                None => None,
            },
            shift: query.shift,
            status: query.status,
        };

        let (items, total) = self
            .appointments
            .list_filtered(offset, per_page, &filters, auth_token)
            .await?;
        Ok((items, total, page, per_page))
    }

    pub async fn update_status(
        &self,
        id: Uuid,
        target: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        // Rescheduling carries a new slot and goes through reschedule().
        if target == AppointmentStatus::Rescheduled {
            return Err(AppointmentError::RescheduleRequiresSlot);
        }

        let current = self.get_appointment(id, auth_token).await?;
        validate_transition(current.status, target)?;

        let updated = self.appointments.update_status(id, target, auth_token).await?;

        if target == AppointmentStatus::Attended {
            if let Some(package_id) = current.package_id {
                // Best effort: the appointment is already ATTENDED, a
                // counter failure must not undo that.
                match self.packages.increment_sessions(package_id, auth_token).await {
                    Ok(package) => debug!(
                        "Package {} now at {}/{} sessions ({})",
                        package.id, package.completed_sessions, package.total_sessions, package.status
                    ),
                    Err(e) => warn!(
                        "Failed to increment sessions for package {} after appointment {} was attended: {}",
                        package_id, id, e
                    ),
                }
            }
        }

        Ok(updated)
    }

    pub async fn reschedule(
        &self,
        id: Uuid,
        new_date: &str,
        new_time: &str,
        new_shift: Shift,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(id, auth_token).await?;
        validate_transition(current.status, AppointmentStatus::Rescheduled)?;

        let date = parse_date(new_date)?;
        validate_business_hours(date, new_time)?;

        if self
            .appointments
            .exists_at_slot(date, new_time, Some(id), auth_token)
            .await?
        {
            return Err(AppointmentError::SlotTaken);
        }

        self.appointments
            .reschedule(id, date, new_time, new_shift, auth_token)
            .await
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, AppointmentError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| AppointmentError::InvalidDateFormat)
}
