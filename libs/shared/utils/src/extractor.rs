use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::jwt::validate_token;

/// Bearer-token middleware: validates the JWT and stores the caller in
/// request extensions for handlers downstream.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    if !auth_value.starts_with("Bearer ") {
        return Err(AppError::Auth("Invalid authorization header format".to_string()));
    }

    let token = &auth_value[7..];

    let user = validate_token(token, &config.jwt_secret).map_err(AppError::Auth)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Per-route role gate. Handlers call this with the roles allowed for the
/// operation; callers without a matching role are rejected.
pub fn require_roles(user: &User, allowed: &[&str]) -> Result<(), AppError> {
    let role = user
        .role
        .as_deref()
        .ok_or_else(|| AppError::Forbidden("User has no role assigned".to_string()))?;

    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Role '{}' is not allowed for this operation",
            role
        )))
    }
}

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_CLINICIAN: &str = "clinician";
pub const ROLE_ASSISTANT: &str = "assistant";

/// Roles allowed to mutate clinical data.
pub const STAFF_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_CLINICIAN];
/// Any authenticated clinic role (read access).
pub const ALL_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_CLINICIAN, ROLE_ASSISTANT];
