use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

use shared_database::app_error_from;
use shared_models::error::AppError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// Appointment row. `date` is clinic wall-clock time (a Postgres `timestamp`
/// without zone), which is what the doctor's weekly window is expressed in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub date: NaiveDateTime,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn slot(&self) -> BookedSlot {
        BookedSlot {
            doctor_id: self.doctor_id,
            date: self.date,
        }
    }
}

/// The part of an existing appointment the validator looks at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookedSlot {
    pub doctor_id: Uuid,
    pub date: NaiveDateTime,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookAppointmentRequest {
    pub clinic_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDateTime,
}

/// A booking request is the candidate the validator decides on.
pub type AppointmentCandidate = BookAppointmentRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentListQuery {
    pub clinic_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySlotsQuery {
    pub date: NaiveDate,
    pub step_minutes: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaySlot {
    pub start: NaiveDateTime,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySlotsResponse {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub step_minutes: u32,
    pub slots: Vec<DaySlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCheckResponse {
    pub accepted: bool,
    pub reason: Option<BookingRejection>,
}

// ==============================================================================
// VALIDATION OUTCOMES
// ==============================================================================

/// Marker returned when a candidate passes validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accepted;

/// Why a candidate time cannot be booked. Both are user-facing outcomes about
/// the chosen time; retrying the same time will not help.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingRejection {
    #[error("The requested time is outside the doctor's availability")]
    OutsideAvailability,

    #[error("The doctor already has an appointment at the requested time")]
    DoubleBooked,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error(transparent)]
    Rejected(#[from] BookingRejection),

    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Doctor does not belong to clinic {0}")]
    ClinicMismatch(Uuid),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::Rejected(rejection @ BookingRejection::OutsideAvailability) => {
                AppError::Unprocessable(rejection.to_string())
            }
            AppointmentError::Rejected(rejection @ BookingRejection::DoubleBooked) => {
                AppError::Conflict(rejection.to_string())
            }
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
            AppointmentError::ClinicMismatch(clinic_id) => {
                AppError::BadRequest(format!("Doctor does not belong to clinic {}", clinic_id))
            }
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::Storage(e) => app_error_from(e),
        }
    }
}
