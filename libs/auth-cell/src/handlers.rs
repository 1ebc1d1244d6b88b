use std::sync::Arc;

use axum::{extract::State, Json};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::TokenResponse;
use shared_models::error::AppError;
use shared_utils::jwt::validate_token;

use crate::models::{LoginRequest, RefreshRequest};
use crate::services::AuthService;

#[axum::debug_handler]
pub async fn login(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AuthService::new(&config);

    let session = service.login(&request.email, &request.password).await?;

    Ok(Json(json!(session)))
}

#[axum::debug_handler]
pub async fn refresh(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AuthService::new(&config);

    let session = service.refresh(&request.refresh_token).await?;

    Ok(Json(json!(session)))
}

/// Lets clients and sibling services check a token without performing the
/// call it would guard.
#[axum::debug_handler]
pub async fn validate(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = validate_token(auth.token(), &config.jwt_secret).map_err(AppError::Auth)?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        email: user.email,
        role: user.role,
    }))
}
