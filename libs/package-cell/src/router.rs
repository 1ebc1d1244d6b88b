use std::sync::Arc;

use axum::{middleware, routing::{get, post}, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

/// Mounted at the API root: package routes hang off both /patients and
/// /packages.
pub fn package_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route(
            "/patients/{id}/packages",
            get(list_packages).post(create_package),
        )
        .route("/patients/{id}/packages/active", get(list_active_packages))
        .route("/packages/{id}/cancel", post(cancel_package))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
