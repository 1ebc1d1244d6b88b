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
use shared_models::pagination::PageMeta;
use shared_utils::extractor::{require_roles, ALL_ROLES, STAFF_ROLES};

use crate::models::{
    AppointmentError, AppointmentListQuery, AppointmentStatus, CreateAppointmentRequest,
    UpdateAppointmentStatusRequest,
};
use crate::services::AppointmentSchedulingService;

fn acting_user_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id).map_err(|_| AppError::Auth("Invalid user id in token".to_string()))
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, STAFF_ROLES)?;
    let service = AppointmentSchedulingService::new(&config);

    let appointment = service
        .create_appointment(request, acting_user_id(&user)?, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, ALL_ROLES)?;
    let service = AppointmentSchedulingService::new(&config);

    let appointment = service
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, ALL_ROLES)?;
    let service = AppointmentSchedulingService::new(&config);

    let (items, total, page, per_page) = service
        .list_appointments(&query, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "items": items,
        "meta": PageMeta::new(page, per_page, total)
    })))
}

/// Status changes and rescheduling share this endpoint. A RESCHEDULED
/// target must carry the new date, time, and shift in the body.
#[axum::debug_handler]
pub async fn update_appointment_status(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentStatusRequest>,
) -> Result<Json<Value>, AppError> {
    require_roles(&user, STAFF_ROLES)?;
    let service = AppointmentSchedulingService::new(&config);

    let appointment = if request.status == AppointmentStatus::Rescheduled {
        let (date, time, shift) = match (request.date, request.time, request.shift) {
            (Some(date), Some(time), Some(shift)) => (date, time, shift),
            _ => return Err(AppointmentError::RescheduleRequiresSlot.into()),
        };
        service
            .reschedule(appointment_id, &date, &time, shift, auth.token())
            .await
            .map_err(AppError::from)?
    } else {
        service
            .update_status(appointment_id, request.status, auth.token())
            .await
            .map_err(AppError::from)?
    };

    Ok(Json(json!(appointment)))
}
