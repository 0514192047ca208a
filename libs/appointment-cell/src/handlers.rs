use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, AppointmentListQuery, BookAppointmentRequest, BookingCheckResponse,
    DaySlotsQuery, DaySlotsResponse,
};
use crate::services::booking::AppointmentBookingService;

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    debug!("User {} booking doctor {} at {}", user.id, request.doctor_id, request.date);

    let appointment = AppointmentBookingService::new(&state)
        .book_appointment(request, auth.token())
        .await?;

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

/// Dry run of a booking. Rejections are reported in the body; lookup
/// failures are still errors.
#[axum::debug_handler]
pub async fn check_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<BookingCheckResponse>, AppError> {
    let outcome = AppointmentBookingService::new(&state)
        .check_appointment(&request, auth.token())
        .await;

    let response = match outcome {
        Ok(_) => BookingCheckResponse { accepted: true, reason: None },
        Err(AppointmentError::Rejected(rejection)) => BookingCheckResponse {
            accepted: false,
            reason: Some(rejection),
        },
        Err(e) => return Err(e.into()),
    };

    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let appointments = AppointmentBookingService::new(&state)
        .list_appointments(&query, auth.token())
        .await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = AppointmentBookingService::new(&state)
        .get_appointment(appointment_id, auth.token())
        .await?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    AppointmentBookingService::new(&state)
        .cancel_appointment(appointment_id, auth.token())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn doctor_day_slots(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<DaySlotsQuery>,
) -> Result<Json<DaySlotsResponse>, AppError> {
    let response = AppointmentBookingService::new(&state)
        .day_slots(doctor_id, query.date, query.step_minutes, auth.token())
        .await?;

    Ok(Json(response))
}
