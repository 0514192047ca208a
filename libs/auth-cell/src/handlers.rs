use std::sync::Arc;

use axum::{
    extract::{State, Json, Extension},
    http::{HeaderMap, StatusCode},
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use tracing::{debug, info};

use clinic_cell::ClinicService;
use shared_config::AppConfig;
use shared_database::{app_error_from, SupabaseClient, SupabaseError};
use shared_models::auth::{TokenResponse, User};
use shared_models::error::AppError;
use shared_utils::extractor::extract_bearer_token;
use shared_utils::jwt::validate_token as decode_token;

use crate::models::{LoginRequest, RegisterRequest};

/// Create an account with the auth provider. The response is the provider's
/// session (or pending-confirmation user) as returned.
#[axum::debug_handler]
pub async fn register(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let registration = request.validate()?;
    debug!("Registering user: {}", registration.email);

    let session = SupabaseClient::new(&config)
        .sign_up(&registration.email, &registration.password, &registration.name)
        .await
        .map_err(app_error_from)?;

    info!("User registered: {}", registration.email);
    Ok((StatusCode::CREATED, Json(session)))
}

#[axum::debug_handler]
pub async fn login(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let email = request.validate()?;
    debug!("Signing in user: {}", email);

    let session = SupabaseClient::new(&config)
        .sign_in_with_password(&email, &request.password)
        .await
        .map_err(|e| {
            let bad_credentials = matches!(
                e.downcast_ref::<SupabaseError>(),
                Some(SupabaseError::Rejected { .. })
            );

            if bad_credentials {
                AppError::Auth("Invalid login credentials".to_string())
            } else {
                app_error_from(e)
            }
        })?;

    Ok(Json(session))
}

pub async fn validate_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = extract_bearer_token(&headers)?;
    let user = decode_token(&token, &config.supabase_jwt_secret).map_err(AppError::Auth)?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        email: user.email,
        role: user.role,
    }))
}

pub async fn verify_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    debug!("Verifying token");

    let token = extract_bearer_token(&headers)?;
    let valid = decode_token(&token, &config.supabase_jwt_secret).is_ok();

    Ok(Json(json!({ "valid": valid })))
}

/// The caller's identity plus the clinics they belong to.
#[axum::debug_handler]
pub async fn get_profile(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    debug!("Getting profile for user: {}", user.id);

    let clinics = ClinicService::new(&config)
        .list_user_clinics(&user.id, auth.token())
        .await?;

    Ok(Json(json!({
        "user_id": user.id,
        "name": user.name(),
        "email": user.email,
        "clinics": clinics
    })))
}
