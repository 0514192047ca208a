use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{AddMemberRequest, CreateClinicRequest, CreateClinicResponse, UpdateClinicRequest};
use crate::services::ClinicService;

#[axum::debug_handler]
pub async fn create_clinic(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateClinicRequest>,
) -> Result<(StatusCode, Json<CreateClinicResponse>), AppError> {
    let created = ClinicService::new(&config)
        .create_clinic(&user.id, request, auth.token())
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Clinics the caller belongs to.
#[axum::debug_handler]
pub async fn list_my_clinics(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let memberships = ClinicService::new(&config)
        .list_user_clinics(&user.id, auth.token())
        .await?;

    Ok(Json(json!({
        "clinics": memberships,
        "total": memberships.len()
    })))
}

#[axum::debug_handler]
pub async fn get_clinic(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(clinic_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let clinic = ClinicService::new(&config)
        .get_clinic(clinic_id, auth.token())
        .await?;

    Ok(Json(json!(clinic)))
}

#[axum::debug_handler]
pub async fn update_clinic(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(clinic_id): Path<Uuid>,
    Json(request): Json<UpdateClinicRequest>,
) -> Result<Json<Value>, AppError> {
    let clinic = ClinicService::new(&config)
        .update_clinic(clinic_id, request, auth.token())
        .await?;

    Ok(Json(json!(clinic)))
}

#[axum::debug_handler]
pub async fn delete_clinic(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(clinic_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ClinicService::new(&config)
        .delete_clinic(clinic_id, auth.token())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn add_member(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(clinic_id): Path<Uuid>,
    Json(request): Json<AddMemberRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let membership = ClinicService::new(&config)
        .add_member(clinic_id, &request.user_id, auth.token())
        .await?;

    Ok((StatusCode::CREATED, Json(json!(membership))))
}
