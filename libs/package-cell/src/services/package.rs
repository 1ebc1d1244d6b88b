use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use patient_cell::store::{PatientStore, SupabasePatientStore};
use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{CreatePackageRequest, PackageStatus, TreatmentPackage};
use crate::store::{PackageStore, SupabasePackageStore};

pub struct PackageService {
    store: Arc<dyn PackageStore>,
    patients: Arc<dyn PatientStore>,
}

impl PackageService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: Arc::new(SupabasePackageStore::new(config)),
            patients: Arc::new(SupabasePatientStore::new(config)),
        }
    }

    /// Test seam: inject store fakes instead of the data-API clients.
    pub fn with_stores(store: Arc<dyn PackageStore>, patients: Arc<dyn PatientStore>) -> Self {
        Self { store, patients }
    }

    pub async fn create_package(
        &self,
        patient_id: Uuid,
        request: CreatePackageRequest,
        created_by: Uuid,
        auth_token: &str,
    ) -> Result<TreatmentPackage, AppError> {
        debug!("Creating treatment package for patient {}", patient_id);

        if self.patients.get_by_id(patient_id, auth_token).await?.is_none() {
            return Err(AppError::NotFound("Patient not found".to_string()));
        }

        if request.total_sessions < 1 {
            return Err(AppError::BadRequest(
                "Total sessions must be at least 1".to_string(),
            ));
        }

        let package = TreatmentPackage {
            id: Uuid::new_v4(),
            patient_id,
            treatment_type: request.treatment_type,
            total_sessions: request.total_sessions,
            completed_sessions: 0,
            status: PackageStatus::Active,
            notes: request.notes,
            created_by,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let created = self.store.create(&package, auth_token).await?;
        info!(
            "Treatment package {} created for patient {} ({} sessions)",
            created.id, patient_id, created.total_sessions
        );
        Ok(created)
    }

    pub async fn get_package(
        &self,
        id: Uuid,
        auth_token: &str,
    ) -> Result<TreatmentPackage, AppError> {
        self.store
            .get_by_id(id, auth_token)
            .await?
            .ok_or_else(|| AppError::NotFound("Treatment package not found".to_string()))
    }

    pub async fn list_by_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<TreatmentPackage>, AppError> {
        if self.patients.get_by_id(patient_id, auth_token).await?.is_none() {
            return Err(AppError::NotFound("Patient not found".to_string()));
        }
        self.store.list_by_patient(patient_id, auth_token).await
    }

    pub async fn list_active_by_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<TreatmentPackage>, AppError> {
        if self.patients.get_by_id(patient_id, auth_token).await?.is_none() {
            return Err(AppError::NotFound("Patient not found".to_string()));
        }
        self.store.list_active_by_patient(patient_id, auth_token).await
    }

    /// Only ACTIVE packages may be cancelled; completed and already
    /// cancelled ones are closed for good.
    pub async fn cancel_package(&self, id: Uuid, auth_token: &str) -> Result<(), AppError> {
        let package = self.get_package(id, auth_token).await?;

        if package.status != PackageStatus::Active {
            return Err(AppError::BadRequest(
                "Only active packages can be cancelled".to_string(),
            ));
        }

        self.store
            .update_status(id, PackageStatus::Cancelled, auth_token)
            .await?;
        info!("Treatment package {} cancelled", id);
        Ok(())
    }
}
