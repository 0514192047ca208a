use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use thiserror::Error;

use shared_database::app_error_from;
use shared_models::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PatientSex {
    Male,
    Female,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub address: String,
    pub sex: PatientSex,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub clinic_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub address: String,
    pub sex: PatientSex,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub sex: Option<PatientSex>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSearchQuery {
    pub clinic_id: Uuid,
    pub name: Option<String>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => AppError::NotFound("Patient not found".to_string()),
            PatientError::ValidationError(msg) => AppError::ValidationError(msg),
            PatientError::Storage(e) => app_error_from(e),
        }
    }
}
