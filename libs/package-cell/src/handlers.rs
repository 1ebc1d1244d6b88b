use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::{require_roles, ALL_ROLES, STAFF_ROLES};

use crate::models::CreatePackageRequest;
use crate::services::PackageService;

#[axum::debug_handler]
pub async fn create_package(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<CreatePackageRequest>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, STAFF_ROLES)?;
    let created_by = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Invalid user id in token".to_string()))?;
    let service = PackageService::new(&config);

    let package = service
        .create_package(patient_id, request, created_by, auth.token())
        .await?;

    Ok(Json(json!(package)))
}

#[axum::debug_handler]
pub async fn list_packages(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, ALL_ROLES)?;
    let service = PackageService::new(&config);

    let packages = service.list_by_patient(patient_id, auth.token()).await?;

    Ok(Json(json!(packages)))
}

#[axum::debug_handler]
pub async fn list_active_packages(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, ALL_ROLES)?;
    let service = PackageService::new(&config);

    let packages = service
        .list_active_by_patient(patient_id, auth.token())
        .await?;

    Ok(Json(json!(packages)))
}

#[axum::debug_handler]
pub async fn cancel_package(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(package_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, STAFF_ROLES)?;
    let service = PackageService::new(&config);

    service.cancel_package(package_id, auth.token()).await?;

    Ok(Json(json!({ "message": "Package cancelled" })))
}
