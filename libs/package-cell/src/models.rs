use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageStatus {
    Active,
    Completed,
    Cancelled,
}

impl PackageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageStatus::Active => "ACTIVE",
            PackageStatus::Completed => "COMPLETED",
            PackageStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prepaid bundle of treatment sessions, counted down to completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentPackage {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub treatment_type: String,
    pub total_sessions: i32,
    pub completed_sessions: i32,
    pub status: PackageStatus,
    #[serde(default)]
    pub notes: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePackageRequest {
    pub treatment_type: String,
    pub total_sessions: i32,
    #[serde(default)]
    pub notes: String,
}
