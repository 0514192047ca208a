use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use thiserror::Error;

use shared_database::app_error_from;
use shared_models::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Clinic {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Link between an auth-provider user and a clinic. Carries its own identity
/// so a user can hold several memberships.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserClinic {
    pub id: Uuid,
    pub user_id: String,
    pub clinic_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Membership row with the clinic embedded (`select=*,clinic:clinics(*)`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipWithClinic {
    #[serde(flatten)]
    pub membership: UserClinic,
    pub clinic: Clinic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClinicRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateClinicRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClinicResponse {
    pub clinic: Clinic,
    pub membership: UserClinic,
}

#[derive(Debug, Error)]
pub enum ClinicError {
    #[error("Clinic not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<ClinicError> for AppError {
    fn from(err: ClinicError) -> Self {
        match err {
            ClinicError::NotFound => AppError::NotFound("Clinic not found".to_string()),
            ClinicError::ValidationError(msg) => AppError::ValidationError(msg),
            ClinicError::Storage(e) => app_error_from(e),
        }
    }
}
