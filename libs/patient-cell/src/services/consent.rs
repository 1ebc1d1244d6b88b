use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::error::AppError;

use crate::models::{ConsentForm, CreateConsentRequest};
use crate::store::{PatientStore, SupabasePatientStore};

pub struct ConsentService {
    supabase: SupabaseClient,
    patients: Arc<dyn PatientStore>,
}

impl ConsentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            patients: Arc::new(SupabasePatientStore::new(config)),
        }
    }

    pub async fn create_consent(
        &self,
        patient_id: Uuid,
        request: CreateConsentRequest,
        recorded_by: Uuid,
        auth_token: &str,
    ) -> Result<ConsentForm, AppError> {
        if self.patients.get_by_id(patient_id, auth_token).await?.is_none() {
            return Err(AppError::NotFound("Patient not found".to_string()));
        }

        // The signature travels and is stored base64-encoded; only the
        // encoding is checked here.
        if let Some(signature) = &request.signature {
            if !signature.is_empty() && STANDARD.decode(signature).is_err() {
                return Err(AppError::BadRequest(
                    "Digital signature is not valid base64".to_string(),
                ));
            }
        }

        debug!("Recording consent form for patient {}", patient_id);

        let body = json!({
            "id": Uuid::new_v4(),
            "patient_id": patient_id,
            "signature": request.signature,
            "photo_authorization": request.photo_authorization,
            "content": request.content,
            "recorded_by": recorded_by,
            "created_at": Utc::now().to_rfc3339(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<ConsentForm> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/consent_forms",
                Some(auth_token),
                Some(body),
                Some(headers),
            )
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Failed to record consent form".to_string()))
    }

    pub async fn list_by_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<ConsentForm>, AppError> {
        if self.patients.get_by_id(patient_id, auth_token).await?.is_none() {
            return Err(AppError::NotFound("Patient not found".to_string()));
        }

        let path = format!(
            "/rest/v1/consent_forms?patient_id=eq.{}&order=created_at.desc",
            patient_id
        );
        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
