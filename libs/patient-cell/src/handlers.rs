use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::pagination::{PageMeta, PageQuery};
use shared_utils::extractor::{require_roles, ALL_ROLES, STAFF_ROLES};

use crate::models::{
    CreateConsentRequest, CreateNoteRequest, CreatePatientRequest, PatientSearchQuery,
    UpdateHistoryRequest, UpdatePatientRequest,
};
use crate::services::{ConsentService, HistoryService, PatientService};

fn acting_user_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id).map_err(|_| AppError::Auth("Invalid user id in token".to_string()))
}

#[axum::debug_handler]
pub async fn create_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, STAFF_ROLES)?;
    let service = PatientService::new(&config);

    let patient = service
        .create_patient(request, acting_user_id(&user)?, auth.token())
        .await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, ALL_ROLES)?;
    let service = PatientService::new(&config);

    let patient = service.get_patient(patient_id, auth.token()).await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn list_patients(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, ALL_ROLES)?;
    let service = PatientService::new(&config);

    let (items, total, page, per_page) = service
        .list_patients(query.page, query.per_page, auth.token())
        .await?;

    Ok(Json(json!({
        "items": items,
        "meta": PageMeta::new(page, per_page, total)
    })))
}

#[axum::debug_handler]
pub async fn search_patients(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, ALL_ROLES)?;
    let service = PatientService::new(&config);

    let (items, total, page, per_page) = service
        .search_patients(&query.q, query.page, query.per_page, auth.token())
        .await?;

    Ok(Json(json!({
        "items": items,
        "meta": PageMeta::new(page, per_page, total)
    })))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, STAFF_ROLES)?;
    let service = PatientService::new(&config);

    let patient = service
        .update_patient(patient_id, request, auth.token())
        .await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn create_consent(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<CreateConsentRequest>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, STAFF_ROLES)?;
    let service = ConsentService::new(&config);

    let consent = service
        .create_consent(patient_id, request, acting_user_id(&user)?, auth.token())
        .await?;

    Ok(Json(json!(consent)))
}

#[axum::debug_handler]
pub async fn list_consents(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, ALL_ROLES)?;
    let service = ConsentService::new(&config);

    let consents = service.list_by_patient(patient_id, auth.token()).await?;

    Ok(Json(json!(consents)))
}

#[axum::debug_handler]
pub async fn get_history(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, ALL_ROLES)?;
    let service = HistoryService::new(&config);

    let history = service.get_by_patient(patient_id, auth.token()).await?;

    Ok(Json(json!(history)))
}

#[axum::debug_handler]
pub async fn update_history(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpdateHistoryRequest>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, STAFF_ROLES)?;
    let service = HistoryService::new(&config);

    let history = service
        .update_background(patient_id, request, auth.token())
        .await?;

    Ok(Json(json!(history)))
}

#[axum::debug_handler]
pub async fn list_notes(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, ALL_ROLES)?;
    let service = HistoryService::new(&config);

    let notes = service.list_notes(patient_id, auth.token()).await?;

    Ok(Json(json!(notes)))
}

#[axum::debug_handler]
pub async fn create_note(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<CreateNoteRequest>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, STAFF_ROLES)?;
    let service = HistoryService::new(&config);

    let note = service
        .create_note(patient_id, request, acting_user_id(&user)?, auth.token())
        .await?;

    Ok(Json(json!(note)))
}
