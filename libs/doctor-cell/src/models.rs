use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDateTime, NaiveTime, Utc};
use thiserror::Error;

use shared_database::app_error_from;
use shared_models::error::AppError;

use crate::services::availability::WeeklyAvailability;

/// Doctor row. Week days are 0 (Sunday) to 6 (Saturday).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    pub avatar_image_url: Option<String>,
    pub specialty: String,
    pub available_from_week_day: i32,
    pub available_to_week_day: i32,
    pub available_from_time: NaiveTime,
    pub available_to_time: NaiveTime,
    pub appointment_price_in_cents: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Doctor {
    pub fn availability(&self) -> WeeklyAvailability {
        WeeklyAvailability {
            from_week_day: self.available_from_week_day,
            to_week_day: self.available_to_week_day,
            from_time: self.available_from_time,
            to_time: self.available_to_time,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub clinic_id: Uuid,
    pub name: String,
    pub specialty: String,
    pub avatar_image_url: Option<String>,
    pub available_from_week_day: i32,
    pub available_to_week_day: i32,
    pub available_from_time: NaiveTime,
    pub available_to_time: NaiveTime,
    pub appointment_price_in_cents: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    pub name: Option<String>,
    pub specialty: Option<String>,
    /// Absent leaves the avatar alone; `null` clears it.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub avatar_image_url: Option<Option<String>>,
    pub available_from_week_day: Option<i32>,
    pub available_to_week_day: Option<i32>,
    pub available_from_time: Option<NaiveTime>,
    pub available_to_time: Option<NaiveTime>,
    pub appointment_price_in_cents: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorListQuery {
    pub clinic_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityCheckQuery {
    pub at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityCheckResponse {
    pub doctor_id: Uuid,
    pub at: NaiveDateTime,
    pub available: bool,
    pub window: WeeklyAvailability,
}

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
            DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
            DoctorError::Storage(e) => app_error_from(e),
        }
    }
}

/// Wraps any value that is present in the body, `null` included, so a field
/// can tell "missing" from "set to null".
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
