use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{error_status, SupabaseClient};
use shared_models::error::AppError;

use crate::models::{Role, StaffUser};

/// Persistence seam for staff accounts and roles. Login runs before any
/// caller token exists, so methods take an optional bearer and fall back
/// to the anon key.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_id(
        &self,
        id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Option<StaffUser>, AppError>;
    async fn get_by_email(
        &self,
        email: &str,
        auth_token: Option<&str>,
    ) -> Result<Option<StaffUser>, AppError>;
    async fn create(
        &self,
        user: &StaffUser,
        auth_token: Option<&str>,
    ) -> Result<StaffUser, AppError>;
    async fn list(&self, auth_token: Option<&str>) -> Result<Vec<StaffUser>, AppError>;
    async fn update(
        &self,
        id: Uuid,
        full_name: Option<&str>,
        role_id: Option<Uuid>,
        auth_token: Option<&str>,
    ) -> Result<StaffUser, AppError>;
    async fn set_active(
        &self,
        id: Uuid,
        active: bool,
        auth_token: Option<&str>,
    ) -> Result<(), AppError>;
    async fn get_role(
        &self,
        id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Option<Role>, AppError>;
    async fn list_roles(&self, auth_token: Option<&str>) -> Result<Vec<Role>, AppError>;
}

pub struct SupabaseUserStore {
    supabase: SupabaseClient,
}

impl SupabaseUserStore {
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

fn representation_headers() -> reqwest::header::HeaderMap {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        "Prefer",
        reqwest::header::HeaderValue::from_static("return=representation"),
    );
    headers
}

#[async_trait]
impl UserStore for SupabaseUserStore {
    async fn get_by_id(
        &self,
        id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Option<StaffUser>, AppError> {
        let path = format!("/rest/v1/staff_users?id=eq.{}", id);
        let result: Vec<StaffUser> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(map_store_error)?;
        Ok(result.into_iter().next())
    }

    async fn get_by_email(
        &self,
        email: &str,
        auth_token: Option<&str>,
    ) -> Result<Option<StaffUser>, AppError> {
        let path = format!(
            "/rest/v1/staff_users?email=eq.{}",
            urlencoding::encode(email)
        );
        let result: Vec<StaffUser> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(map_store_error)?;
        Ok(result.into_iter().next())
    }

    async fn create(
        &self,
        user: &StaffUser,
        auth_token: Option<&str>,
    ) -> Result<StaffUser, AppError> {
        let body = json!({
            "id": user.id,
            "full_name": user.full_name,
            "email": user.email,
            "password_hash": user.password_hash,
            "role_id": user.role_id,
            "active": user.active,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let result: Vec<StaffUser> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/staff_users",
                auth_token,
                Some(body),
                Some(representation_headers()),
            )
            .await
            .map_err(map_store_error)?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Database("Failed to create user".to_string()))
    }

    async fn list(&self, auth_token: Option<&str>) -> Result<Vec<StaffUser>, AppError> {
        self.supabase
            .request(
                Method::GET,
                "/rest/v1/staff_users?order=full_name.asc",
                auth_token,
                None,
            )
            .await
            .map_err(map_store_error)
    }

    async fn update(
        &self,
        id: Uuid,
        full_name: Option<&str>,
        role_id: Option<Uuid>,
        auth_token: Option<&str>,
    ) -> Result<StaffUser, AppError> {
        let mut body = json!({ "updated_at": Utc::now().to_rfc3339() });
        if let Some(name) = full_name {
            body["full_name"] = json!(name);
        }
        if let Some(role) = role_id {
            body["role_id"] = json!(role);
        }

        let path = format!("/rest/v1/staff_users?id=eq.{}", id);
        let result: Vec<StaffUser> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                auth_token,
                Some(body),
                Some(representation_headers()),
            )
            .await
            .map_err(map_store_error)?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn set_active(
        &self,
        id: Uuid,
        active: bool,
        auth_token: Option<&str>,
    ) -> Result<(), AppError> {
        let body = json!({
            "active": active,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let path = format!("/rest/v1/staff_users?id=eq.{}", id);
        let _: Vec<StaffUser> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                auth_token,
                Some(body),
                Some(representation_headers()),
            )
            .await
            .map_err(map_store_error)?;
        Ok(())
    }

    async fn get_role(
        &self,
        id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Option<Role>, AppError> {
        let path = format!("/rest/v1/roles?id=eq.{}", id);
        let result: Vec<Role> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(map_store_error)?;
        Ok(result.into_iter().next())
    }

    async fn list_roles(&self, auth_token: Option<&str>) -> Result<Vec<Role>, AppError> {
        self.supabase
            .request(
                Method::GET,
                "/rest/v1/roles?order=name.asc",
                auth_token,
                None,
            )
            .await
            .map_err(map_store_error)
    }
}
