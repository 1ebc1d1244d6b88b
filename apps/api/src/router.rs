use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use package_cell::router::package_routes;
use patient_cell::router::patient_routes;
use shared_config::AppConfig;
use user_cell::router::user_routes;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        // Package routes span /patients/{id}/packages and /packages/{id},
        // so they are merged at the root rather than nested.
        .merge(package_routes(state.clone()))
        .merge(user_routes(state))
}
