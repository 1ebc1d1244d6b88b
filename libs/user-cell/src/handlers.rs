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
use shared_utils::extractor::{require_roles, ALL_ROLES, ROLE_ADMIN};

use crate::models::{CreateUserRequest, UpdateUserRequest};
use crate::services::UserService;

#[axum::debug_handler]
pub async fn create_user(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, &[ROLE_ADMIN])?;
    let service = UserService::new(&config);

    let created = service.create_user(request, auth.token()).await?;

    Ok(Json(json!(created)))
}

#[axum::debug_handler]
pub async fn get_user(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, &[ROLE_ADMIN])?;
    let service = UserService::new(&config);

    let found = service.get_user(user_id, auth.token()).await?;

    Ok(Json(json!(found)))
}

#[axum::debug_handler]
pub async fn list_users(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, &[ROLE_ADMIN])?;
    let service = UserService::new(&config);

    let users = service.list_users(auth.token()).await?;

    Ok(Json(json!(users)))
}

#[axum::debug_handler]
pub async fn update_user(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, &[ROLE_ADMIN])?;
    let service = UserService::new(&config);

    let updated = service.update_user(user_id, request, auth.token()).await?;

    Ok(Json(json!(updated)))
}

#[axum::debug_handler]
pub async fn deactivate_user(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, &[ROLE_ADMIN])?;
    let service = UserService::new(&config);

    service.deactivate_user(user_id, auth.token()).await?;

    Ok(Json(json!({ "deactivated": true })))
}

#[axum::debug_handler]
pub async fn list_roles(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, ALL_ROLES)?;
    let service = UserService::new(&config);

    let roles = service.list_roles(auth.token()).await?;

    Ok(Json(json!(roles)))
}
