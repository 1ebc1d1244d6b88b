use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{error_status, SupabaseClient};
use shared_models::error::AppError;

use crate::models::{PackageStatus, TreatmentPackage};

/// Persistence seam for treatment packages. `increment_sessions` is the
/// session counter's single entry point and must be atomic in the backing
/// store (increment + completion flip in one statement).
#[async_trait]
pub trait PackageStore: Send + Sync {
    async fn get_by_id(
        &self,
        id: Uuid,
        auth_token: &str,
    ) -> Result<Option<TreatmentPackage>, AppError>;
    async fn create(
        &self,
        package: &TreatmentPackage,
        auth_token: &str,
    ) -> Result<TreatmentPackage, AppError>;
    async fn list_by_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<TreatmentPackage>, AppError>;
    async fn list_active_by_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<TreatmentPackage>, AppError>;
    /// Atomically add one completed session, flipping ACTIVE to COMPLETED
    /// when the total is reached. Returns the updated row.
    async fn increment_sessions(
        &self,
        id: Uuid,
        auth_token: &str,
    ) -> Result<TreatmentPackage, AppError>;
    async fn update_status(
        &self,
        id: Uuid,
        status: PackageStatus,
        auth_token: &str,
    ) -> Result<(), AppError>;
}

pub struct SupabasePackageStore {
    supabase: SupabaseClient,
}

impl SupabasePackageStore {
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
impl PackageStore for SupabasePackageStore {
    async fn get_by_id(
        &self,
        id: Uuid,
        auth_token: &str,
    ) -> Result<Option<TreatmentPackage>, AppError> {
        let path = format!("/rest/v1/treatment_packages?id=eq.{}", id);
        let result: Vec<TreatmentPackage> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(map_store_error)?;
        Ok(result.into_iter().next())
    }

    async fn create(
        &self,
        package: &TreatmentPackage,
        auth_token: &str,
    ) -> Result<TreatmentPackage, AppError> {
        debug!(
            "Creating treatment package for patient {} ({} sessions)",
            package.patient_id, package.total_sessions
        );

        let body = json!({
            "id": package.id,
            "patient_id": package.patient_id,
            "treatment_type": package.treatment_type,
            "total_sessions": package.total_sessions,
            "completed_sessions": package.completed_sessions,
            "status": package.status,
            "notes": package.notes,
            "created_by": package.created_by,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<TreatmentPackage> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/treatment_packages",
                Some(auth_token),
                Some(body),
                Some(headers),
            )
            .await
            .map_err(map_store_error)?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Failed to create treatment package".to_string()))
    }

    async fn list_by_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<TreatmentPackage>, AppError> {
        let path = format!(
            "/rest/v1/treatment_packages?patient_id=eq.{}&order=created_at.desc",
            patient_id
        );
        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(map_store_error)
    }

    async fn list_active_by_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<TreatmentPackage>, AppError> {
        let path = format!(
            "/rest/v1/treatment_packages?patient_id=eq.{}&status=eq.ACTIVE&order=created_at.desc",
            patient_id
        );
        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(map_store_error)
    }

    async fn increment_sessions(
        &self,
        id: Uuid,
        auth_token: &str,
    ) -> Result<TreatmentPackage, AppError> {
        // Single-statement increment + completion flip on the server; the
        // read-increment-read-update sequence would race under concurrent
        // ATTENDED transitions.
        self.supabase
            .request(
                Method::POST,
                "/rest/v1/rpc/increment_package_sessions",
                Some(auth_token),
                Some(json!({ "package_id": id })),
            )
            .await
            .map_err(map_store_error)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: PackageStatus,
        auth_token: &str,
    ) -> Result<(), AppError> {
        let path = format!("/rest/v1/treatment_packages?id=eq.{}", id);
        let body = json!({
            "status": status,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let _: Vec<TreatmentPackage> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(auth_token), Some(body), Some(headers))
            .await
            .map_err(map_store_error)?;

        Ok(())
    }
}
