use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::error::AppError;

use crate::models::{ClinicalHistory, CreateNoteRequest, ProgressNote, UpdateHistoryRequest, NOTE_TYPES};

/// Clinical history and progress notes for a patient.
pub struct HistoryService {
    supabase: SupabaseClient,
}

impl HistoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Open the clinical history that accompanies a newly registered
    /// patient. The history number is allocated server-side.
    pub async fn open_for_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<ClinicalHistory, AppError> {
        let number: Value = self
            .supabase
            .request(
                Method::POST,
                "/rest/v1/rpc/next_history_number",
                Some(auth_token),
                Some(json!({})),
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let history_number = number
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::Database("Unexpected next_history_number response".to_string()))?;

        let body = json!({
            "id": Uuid::new_v4(),
            "patient_id": patient_id,
            "history_number": history_number,
            "status": "ACTIVE",
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<ClinicalHistory> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/clinical_histories",
                Some(auth_token),
                Some(body),
                Some(headers),
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Failed to create clinical history".to_string()))
    }

    pub async fn get_by_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<ClinicalHistory, AppError> {
        let path = format!("/rest/v1/clinical_histories?patient_id=eq.{}", patient_id);
        let result: Vec<ClinicalHistory> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("Clinical history not found".to_string()))
    }

    pub async fn update_background(
        &self,
        patient_id: Uuid,
        request: UpdateHistoryRequest,
        auth_token: &str,
    ) -> Result<ClinicalHistory, AppError> {
        let history = self.get_by_patient(patient_id, auth_token).await?;

        let body = json!({
            "personal_background": request.personal_background,
            "family_background": request.family_background,
            "allergies": request.allergies,
            "current_medications": request.current_medications,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let path = format!("/rest/v1/clinical_histories?id=eq.{}", history.id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<ClinicalHistory> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(auth_token), Some(body), Some(headers))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Failed to update clinical history".to_string()))
    }

    pub async fn list_notes(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<ProgressNote>, AppError> {
        let history = self.get_by_patient(patient_id, auth_token).await?;

        let path = format!(
            "/rest/v1/progress_notes?history_id=eq.{}&order=created_at.desc",
            history.id
        );
        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn create_note(
        &self,
        patient_id: Uuid,
        request: CreateNoteRequest,
        created_by: Uuid,
        auth_token: &str,
    ) -> Result<ProgressNote, AppError> {
        let history = self.get_by_patient(patient_id, auth_token).await?;

        if !NOTE_TYPES.contains(&request.note_type.as_str()) {
            return Err(AppError::BadRequest(
                "Invalid note type. Use TREATMENT, PROGRESS or NOTE".to_string(),
            ));
        }

        debug!("Creating {} note for history {}", request.note_type, history.id);

        let body = json!({
            "id": Uuid::new_v4(),
            "history_id": history.id,
            "note_type": request.note_type,
            "content": request.content,
            "created_by": created_by,
            "created_at": Utc::now().to_rfc3339(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<ProgressNote> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/progress_notes",
                Some(auth_token),
                Some(body),
                Some(headers),
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Failed to create progress note".to_string()))
    }
}
