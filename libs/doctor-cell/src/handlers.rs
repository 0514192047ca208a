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
    AvailabilityCheckQuery, AvailabilityCheckResponse, CreateDoctorRequest, DoctorListQuery,
    UpdateDoctorRequest,
};
use crate::services::{availability::is_within_availability, doctor::DoctorService};

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    debug!("User {} creating doctor in clinic {}", user.id, request.clinic_id);

    let doctor = DoctorService::new(&state)
        .create_doctor(request, auth.token())
        .await?;

    Ok((StatusCode::CREATED, Json(json!(doctor))))
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<DoctorListQuery>,
) -> Result<Json<Value>, AppError> {
    let doctors = DoctorService::new(&state)
        .list_doctors(query.clinic_id, auth.token())
        .await?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let doctor = DoctorService::new(&state)
        .get_doctor(doctor_id, auth.token())
        .await?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor = DoctorService::new(&state)
        .update_doctor(doctor_id, request, auth.token())
        .await?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn delete_doctor(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    DoctorService::new(&state)
        .delete_doctor(doctor_id, auth.token())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Answer whether a single timestamp falls inside the doctor's weekly window.
#[axum::debug_handler]
pub async fn check_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<AvailabilityCheckQuery>,
) -> Result<Json<AvailabilityCheckResponse>, AppError> {
    let doctor = DoctorService::new(&state)
        .get_doctor(doctor_id, auth.token())
        .await?;

    Ok(Json(AvailabilityCheckResponse {
        doctor_id,
        at: query.at,
        available: is_within_availability(&doctor, query.at),
        window: doctor.availability(),
    }))
}
