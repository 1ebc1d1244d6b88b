use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    New,
    Scheduled,
    Confirmed,
    Attended,
    NoShow,
    Cancelled,
    Rescheduled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::New => "NEW",
            AppointmentStatus::Scheduled => "SCHEDULED",
            AppointmentStatus::Confirmed => "CONFIRMED",
            AppointmentStatus::Attended => "ATTENDED",
            AppointmentStatus::NoShow => "NO_SHOW",
            AppointmentStatus::Cancelled => "CANCELLED",
            AppointmentStatus::Rescheduled => "RESCHEDULED",
        }
    }

    /// Whether an appointment in this status occupies its slot. Cancelled
    /// and rescheduled appointments free the slot for reuse.
    pub fn blocks_slot(&self) -> bool {
        !matches!(
            self,
            AppointmentStatus::Cancelled | AppointmentStatus::Rescheduled
        )
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-day bucket, stored for the front desk; not part of conflict or
/// business-hours checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shift {
    #[serde(rename = "AM")]
    Am,
    #[serde(rename = "PM")]
    Pm,
}

impl std::fmt::Display for Shift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Shift::Am => "AM",
            Shift::Pm => "PM",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    /// Zero-padded 24h "HH:MM".
    pub time: String,
    pub treatment_type: String,
    pub status: AppointmentStatus,
    pub shift: Shift,
    #[serde(default)]
    pub notes: String,
    pub package_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    /// YYYY-MM-DD; validated by the scheduling service.
    pub date: String,
    /// HH:MM; validated by the scheduling service.
    pub time: String,
    pub treatment_type: String,
    pub shift: Shift,
    #[serde(default)]
    pub notes: String,
    pub package_id: Option<Uuid>,
}

/// Status change request. Date/time/shift are only read when the target
/// status is RESCHEDULED.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAppointmentStatusRequest {
    pub status: AppointmentStatus,
    pub date: Option<String>,
    pub time: Option<String>,
    pub shift: Option<Shift>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub date: Option<String>,
    pub shift: Option<Shift>,
    pub status: Option<AppointmentStatus>,
}

/// Conjunctive filters applied by the store.
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilters {
    pub date: Option<NaiveDate>,
    pub shift: Option<Shift>,
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Patient not found")]
    PatientNotFound,

    #[error("Appointment not found")]
    NotFound,

    #[error("Treatment package not found")]
    PackageNotFound,

    #[error("Invalid date format. Use YYYY-MM-DD")]
    InvalidDateFormat,

    #[error("Invalid time format. Use HH:MM")]
    InvalidTimeFormat,

    #[error("{0}")]
    OutsideBusinessHours(String),

    #[error("Status transition not allowed: {from} -> {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Rescheduling requires a new date and time")]
    RescheduleRequiresSlot,

    #[error("An appointment already occupies that date and time")]
    SlotTaken,

    #[error("The package does not belong to the patient")]
    PackageOwnershipMismatch,

    #[error("The package is not active")]
    PackageNotActive,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match &err {
            AppointmentError::PatientNotFound
            | AppointmentError::NotFound
            | AppointmentError::PackageNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::SlotTaken => AppError::Conflict(err.to_string()),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg.clone()),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}
