use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::jwt::{issue_refresh_token, issue_token, validate_refresh_token};
use user_cell::models::StaffUser;
use user_cell::services::verify_password;
use user_cell::store::{SupabaseUserStore, UserStore};

use crate::models::{LoginResponse, SessionUser};

pub struct AuthService {
    store: Arc<dyn UserStore>,
    jwt_secret: String,
    token_ttl_hours: i64,
    refresh_token_ttl_hours: i64,
}

impl AuthService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_store(Arc::new(SupabaseUserStore::new(config)), config)
    }

    pub fn with_store(store: Arc<dyn UserStore>, config: &AppConfig) -> Self {
        Self {
            store,
            jwt_secret: config.jwt_secret.clone(),
            token_ttl_hours: config.token_ttl_hours,
            refresh_token_ttl_hours: config.refresh_token_ttl_hours,
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AppError> {
        // Login runs with the anon key; no caller token exists yet.
        let user = match self.store.get_by_email(email, None).await? {
            Some(user) => user,
            None => {
                // Same message as a wrong password so accounts cannot be
                // enumerated by email.
                warn!("Login attempt for unknown email");
                return Err(AppError::Auth("Invalid email or password".to_string()));
            }
        };

        if !user.active {
            return Err(AppError::Auth("Account is deactivated".to_string()));
        }

        if !verify_password(password, &user.password_hash) {
            warn!("Failed login attempt for user {}", user.id);
            return Err(AppError::Auth("Invalid email or password".to_string()));
        }

        debug!("User {} authenticated", user.id);
        self.issue_session(user).await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<LoginResponse, AppError> {
        let user_id = validate_refresh_token(refresh_token, &self.jwt_secret)
            .map_err(AppError::Auth)?;
        let user_id = Uuid::parse_str(&user_id)
            .map_err(|_| AppError::Auth("Invalid refresh token subject".to_string()))?;

        let user = self
            .store
            .get_by_id(user_id, None)
            .await?
            .ok_or_else(|| AppError::Auth("User no longer exists".to_string()))?;

        if !user.active {
            return Err(AppError::Auth("Account is deactivated".to_string()));
        }

        self.issue_session(user).await
    }

    async fn issue_session(&self, user: StaffUser) -> Result<LoginResponse, AppError> {
        let role = self
            .store
            .get_role(user.role_id, None)
            .await?
            .ok_or_else(|| AppError::Internal("User role not found".to_string()))?;

        let token = issue_token(
            &user.id.to_string(),
            &user.email,
            &role.name,
            &self.jwt_secret,
            self.token_ttl_hours,
        )
        .map_err(AppError::Internal)?;

        let refresh_token = issue_refresh_token(
            &user.id.to_string(),
            &self.jwt_secret,
            self.refresh_token_ttl_hours,
        )
        .map_err(AppError::Internal)?;

        Ok(LoginResponse {
            token,
            refresh_token,
            user: SessionUser {
                id: user.id,
                full_name: user.full_name,
                email: user.email,
                role: role.name,
            },
        })
    }
}
