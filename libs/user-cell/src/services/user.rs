use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{CreateUserRequest, Role, StaffUser, UpdateUserRequest};
use crate::store::{SupabaseUserStore, UserStore};

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: Arc::new(SupabaseUserStore::new(config)),
        }
    }

    pub fn with_store(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn create_user(
        &self,
        request: CreateUserRequest,
        auth_token: &str,
    ) -> Result<StaffUser, AppError> {
        if request.password.len() < 8 {
            return Err(AppError::BadRequest(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        self.store
            .get_role(request.role_id, Some(auth_token))
            .await?
            .ok_or_else(|| AppError::NotFound("Role not found".to_string()))?;

        if self
            .store
            .get_by_email(&request.email, Some(auth_token))
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let now = Utc::now();
        let user = StaffUser {
            id: Uuid::new_v4(),
            full_name: request.full_name,
            email: request.email,
            password_hash: hash_password(&request.password)?,
            role_id: request.role_id,
            active: true,
            created_at: now,
            updated_at: now,
        };

        debug!("Creating staff user {} ({})", user.email, user.id);
        self.store.create(&user, Some(auth_token)).await
    }

    pub async fn get_user(&self, id: Uuid, auth_token: &str) -> Result<StaffUser, AppError> {
        self.store
            .get_by_id(id, Some(auth_token))
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn list_users(&self, auth_token: &str) -> Result<Vec<StaffUser>, AppError> {
        self.store.list(Some(auth_token)).await
    }

    pub async fn update_user(
        &self,
        id: Uuid,
        request: UpdateUserRequest,
        auth_token: &str,
    ) -> Result<StaffUser, AppError> {
        self.get_user(id, auth_token).await?;

        if let Some(role_id) = request.role_id {
            self.store
                .get_role(role_id, Some(auth_token))
                .await?
                .ok_or_else(|| AppError::NotFound("Role not found".to_string()))?;
        }

        self.store
            .update(id, request.full_name.as_deref(), request.role_id, Some(auth_token))
            .await
    }

    /// Accounts are deactivated rather than deleted so audit references to
    /// created_by stay resolvable.
    pub async fn deactivate_user(&self, id: Uuid, auth_token: &str) -> Result<(), AppError> {
        self.get_user(id, auth_token).await?;
        self.store.set_active(id, false, Some(auth_token)).await
    }

    pub async fn list_roles(&self, auth_token: &str) -> Result<Vec<Role>, AppError> {
        self.store.list_roles(Some(auth_token)).await
    }
}
