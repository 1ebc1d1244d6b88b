use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{error_status, SupabaseClient};
use shared_models::error::AppError;

use crate::models::Patient;

/// Persistence seam for patient rows. The scheduling service only needs
/// `get_by_id`; the rest backs the patient CRUD surface.
#[async_trait]
pub trait PatientStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid, auth_token: &str) -> Result<Option<Patient>, AppError>;
    async fn get_by_document(
        &self,
        document_id: &str,
        auth_token: &str,
    ) -> Result<Option<Patient>, AppError>;
    async fn create(&self, patient: &Patient, auth_token: &str) -> Result<Patient, AppError>;
    async fn list(
        &self,
        offset: i64,
        limit: i64,
        auth_token: &str,
    ) -> Result<(Vec<Patient>, i64), AppError>;
    async fn search(
        &self,
        query: &str,
        offset: i64,
        limit: i64,
        auth_token: &str,
    ) -> Result<(Vec<Patient>, i64), AppError>;
    async fn update(&self, patient: &Patient, auth_token: &str) -> Result<Patient, AppError>;
    async fn next_code(&self, auth_token: &str) -> Result<String, AppError>;
}

pub struct SupabasePatientStore {
    supabase: SupabaseClient,
}

impl SupabasePatientStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

fn map_store_error(e: anyhow::Error) -> AppError {
    match error_status(&e) {
        Some(409) => AppError::Conflict("Duplicate record".to_string()),
        _ => AppError::Database(e.to_string()),
    }
}

#[async_trait]
impl PatientStore for SupabasePatientStore {
    async fn get_by_id(&self, id: Uuid, auth_token: &str) -> Result<Option<Patient>, AppError> {
        let path = format!("/rest/v1/patients?id=eq.{}", id);
        let result: Vec<Patient> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(map_store_error)?;
        Ok(result.into_iter().next())
    }

    async fn get_by_document(
        &self,
        document_id: &str,
        auth_token: &str,
    ) -> Result<Option<Patient>, AppError> {
        let path = format!(
            "/rest/v1/patients?document_id=eq.{}",
            urlencoding::encode(document_id)
        );
        let result: Vec<Patient> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(map_store_error)?;
        Ok(result.into_iter().next())
    }

    async fn create(&self, patient: &Patient, auth_token: &str) -> Result<Patient, AppError> {
        debug!("Creating patient {} ({})", patient.code, patient.id);

        let body = json!({
            "id": patient.id,
            "code": patient.code,
            "full_name": patient.full_name,
            "document_id": patient.document_id,
            "date_of_birth": patient.date_of_birth.format("%Y-%m-%d").to_string(),
            "phone": patient.phone,
            "address": patient.address,
            "created_by": patient.created_by,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Patient> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/patients",
                Some(auth_token),
                Some(body),
                Some(headers),
            )
            .await
            .map_err(map_store_error)?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Failed to create patient".to_string()))
    }

    async fn list(
        &self,
        offset: i64,
        limit: i64,
        auth_token: &str,
    ) -> Result<(Vec<Patient>, i64), AppError> {
        let path = format!(
            "/rest/v1/patients?order=created_at.desc&offset={}&limit={}",
            offset, limit
        );
        self.supabase
            .request_with_count(&path, Some(auth_token))
            .await
            .map_err(map_store_error)
    }

    async fn search(
        &self,
        query: &str,
        offset: i64,
        limit: i64,
        auth_token: &str,
    ) -> Result<(Vec<Patient>, i64), AppError> {
        let pattern = urlencoding::encode(query).into_owned();
        let path = format!(
            "/rest/v1/patients?or=(full_name.ilike.%{}%,document_id.ilike.%{}%,code.ilike.%{}%)&order=created_at.desc&offset={}&limit={}",
            pattern, pattern, pattern, offset, limit
        );
        self.supabase
            .request_with_count(&path, Some(auth_token))
            .await
            .map_err(map_store_error)
    }

    async fn update(&self, patient: &Patient, auth_token: &str) -> Result<Patient, AppError> {
        let body = json!({
            "full_name": patient.full_name,
            "phone": patient.phone,
            "address": patient.address,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let path = format!("/rest/v1/patients?id=eq.{}", patient.id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Patient> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(auth_token), Some(body), Some(headers))
            .await
            .map_err(map_store_error)?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Failed to update patient".to_string()))
    }

    async fn next_code(&self, auth_token: &str) -> Result<String, AppError> {
        // Sequential codes are allocated server-side to avoid duplicate
        // numbers under concurrent patient creation.
        let result: Value = self
            .supabase
            .request(
                Method::POST,
                "/rest/v1/rpc/next_patient_code",
                Some(auth_token),
                Some(json!({})),
            )
            .await
            .map_err(map_store_error)?;

        result
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::Database("Unexpected next_patient_code response".to_string()))
    }
}
