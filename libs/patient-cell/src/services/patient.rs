use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_models::pagination::normalize_page;

use crate::models::{CreatePatientRequest, Patient, UpdatePatientRequest};
use crate::services::history::HistoryService;
use crate::store::{PatientStore, SupabasePatientStore};

pub struct PatientService {
    store: Arc<dyn PatientStore>,
    history: HistoryService,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: Arc::new(SupabasePatientStore::new(config)),
            history: HistoryService::new(config),
        }
    }

    pub async fn create_patient(
        &self,
        request: CreatePatientRequest,
        created_by: Uuid,
        auth_token: &str,
    ) -> Result<Patient, AppError> {
        debug!("Creating patient with document {}", request.document_id);

        if self
            .store
            .get_by_document(&request.document_id, auth_token)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "A patient with that document id already exists".to_string(),
            ));
        }

        let date_of_birth = NaiveDate::parse_from_str(&request.date_of_birth, "%Y-%m-%d")
            .map_err(|_| {
                AppError::BadRequest("Invalid date of birth format. Use YYYY-MM-DD".to_string())
            })?;

        let code = self.store.next_code(auth_token).await?;

        let patient = Patient {
            id: Uuid::new_v4(),
            code,
            full_name: request.full_name,
            document_id: request.document_id,
            date_of_birth,
            phone: request.phone,
            address: request.address,
            created_by,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let created = self.store.create(&patient, auth_token).await?;

        // A clinical history is opened alongside every patient. Losing it is
        // recoverable (it can be opened on first visit), so the patient
        // creation is not failed over it.
        if let Err(e) = self.history.open_for_patient(created.id, auth_token).await {
            warn!(
                patient_id = %created.id,
                error = %e,
                "Failed to open clinical history for new patient"
            );
        }

        info!("Patient {} created with code {}", created.id, created.code);
        Ok(created)
    }

    pub async fn get_patient(&self, id: Uuid, auth_token: &str) -> Result<Patient, AppError> {
        self.store
            .get_by_id(id, auth_token)
            .await?
            .ok_or_else(|| AppError::NotFound("Patient not found".to_string()))
    }

    pub async fn list_patients(
        &self,
        page: Option<i64>,
        per_page: Option<i64>,
        auth_token: &str,
    ) -> Result<(Vec<Patient>, i64, i64, i64), AppError> {
        let (page, per_page, offset) = normalize_page(page, per_page);
        let (items, total) = self.store.list(offset, per_page, auth_token).await?;
        Ok((items, total, page, per_page))
    }

    pub async fn search_patients(
        &self,
        query: &str,
        page: Option<i64>,
        per_page: Option<i64>,
        auth_token: &str,
    ) -> Result<(Vec<Patient>, i64, i64, i64), AppError> {
        let (page, per_page, offset) = normalize_page(page, per_page);
        let (items, total) = self
            .store
            .search(query, offset, per_page, auth_token)
            .await?;
        Ok((items, total, page, per_page))
    }

    pub async fn update_patient(
        &self,
        id: Uuid,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, AppError> {
        let mut patient = self.get_patient(id, auth_token).await?;

        if let Some(full_name) = request.full_name {
            patient.full_name = full_name;
        }
        if let Some(phone) = request.phone {
            patient.phone = phone;
        }
        if let Some(address) = request.address {
            patient.address = address;
        }

        self.store.update(&patient, auth_token).await
    }
}
