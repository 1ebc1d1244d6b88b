use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    /// Clinic-assigned sequential code ("P-00042"), allocated by the store.
    pub code: String,
    pub full_name: String,
    pub document_id: String,
    pub date_of_birth: NaiveDate,
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub full_name: String,
    pub document_id: String,
    /// YYYY-MM-DD; validated by the service, not the handler.
    pub date_of_birth: String,
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatientSearchQuery {
    pub q: String,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Signed consent form. The signature is kept base64-encoded end to end;
/// the service only verifies the encoding on intake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentForm {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub signature: Option<String>,
    pub photo_authorization: bool,
    #[serde(default)]
    pub content: String,
    pub recorded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConsentRequest {
    pub signature: Option<String>,
    #[serde(default)]
    pub photo_authorization: bool,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalHistory {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub history_number: String,
    #[serde(default)]
    pub personal_background: String,
    #[serde(default)]
    pub family_background: String,
    #[serde(default)]
    pub allergies: String,
    #[serde(default)]
    pub current_medications: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateHistoryRequest {
    #[serde(default)]
    pub personal_background: String,
    #[serde(default)]
    pub family_background: String,
    #[serde(default)]
    pub allergies: String,
    #[serde(default)]
    pub current_medications: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressNote {
    pub id: Uuid,
    pub history_id: Uuid,
    pub note_type: String,
    pub content: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNoteRequest {
    pub note_type: String,
    pub content: String,
}

pub const NOTE_TYPES: &[&str] = &["TREATMENT", "PROGRESS", "NOTE"];
