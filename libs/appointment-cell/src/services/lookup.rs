use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{SupabaseClient, SupabaseError};
use doctor_cell::models::{Doctor, DoctorError};
use doctor_cell::services::DoctorService;

use crate::models::{
    Appointment, AppointmentError, AppointmentListQuery, BookAppointmentRequest, BookedSlot,
    BookingRejection,
};

/// PostgREST filter format for `timestamp` columns.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Where the booking flow reads doctor snapshots from.
#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    async fn find_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Doctor>, AppointmentError>;
}

/// Where the booking flow reads and writes appointments.
#[async_trait]
pub trait AppointmentLedger: Send + Sync {
    /// Appointments of one doctor with `from <= date < to`.
    async fn appointments_for_doctor(
        &self,
        doctor_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Vec<BookedSlot>, AppointmentError>;

    /// Insert a validated booking. Implementations must report a uniqueness
    /// violation on `(doctor_id, date)` as `BookingRejection::DoubleBooked`.
    async fn insert_appointment(
        &self,
        request: &BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError>;

    async fn find_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Appointment>, AppointmentError>;

    async fn list_appointments(
        &self,
        query: &AppointmentListQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    /// Returns false when there was nothing to delete.
    async fn delete_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<bool, AppointmentError>;
}

// ==============================================================================
// SUPABASE IMPLEMENTATIONS
// ==============================================================================

pub struct SupabaseDoctorDirectory {
    doctors: DoctorService,
}

impl SupabaseDoctorDirectory {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            doctors: DoctorService::new(config),
        }
    }
}

#[async_trait]
impl DoctorDirectory for SupabaseDoctorDirectory {
    async fn find_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Doctor>, AppointmentError> {
        self.doctors
            .find_doctor(doctor_id, auth_token)
            .await
            .map_err(|e| match e {
                DoctorError::Storage(inner) => AppointmentError::Storage(inner),
                DoctorError::NotFound => AppointmentError::DoctorNotFound,
                DoctorError::ValidationError(msg) => AppointmentError::ValidationError(msg),
            })
    }
}

pub struct SupabaseAppointmentLedger {
    supabase: SupabaseClient,
}

impl SupabaseAppointmentLedger {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl AppointmentLedger for SupabaseAppointmentLedger {
    async fn appointments_for_doctor(
        &self,
        doctor_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
        auth_token: &str,
    ) -> Result<Vec<BookedSlot>, AppointmentError> {
        debug!("Fetching appointments for doctor {} in [{}, {})", doctor_id, from, to);

        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=gte.{}&date=lt.{}&select=doctor_id,date&order=date.asc",
            doctor_id,
            from.format(TIMESTAMP_FORMAT),
            to.format(TIMESTAMP_FORMAT)
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        parse_rows(result)
    }

    async fn insert_appointment(
        &self,
        request: &BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let now = Utc::now().to_rfc3339();
        let body = json!({
            "clinic_id": request.clinic_id,
            "doctor_id": request.doctor_id,
            "patient_id": request.patient_id,
            "date": request.date.format(TIMESTAMP_FORMAT).to_string(),
            "created_at": now,
            "updated_at": now
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(auth_token),
            Some(body),
            Some(SupabaseClient::representation_headers()),
        ).await.map_err(|e| {
            let duplicate = e
                .downcast_ref::<SupabaseError>()
                .is_some_and(SupabaseError::is_conflict);

            if duplicate {
                warn!(
                    "Storage rejected duplicate booking for doctor {} at {}",
                    request.doctor_id, request.date
                );
                AppointmentError::Rejected(BookingRejection::DoubleBooked)
            } else {
                AppointmentError::Storage(e)
            }
        })?;

        parse_rows(result)?
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::Storage(anyhow::anyhow!("Failed to create appointment")))
    }

    async fn find_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(parse_rows(result)?.into_iter().next())
    }

    async fn list_appointments(
        &self,
        query: &AppointmentListQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut query_parts = vec![format!("clinic_id=eq.{}", query.clinic_id)];

        if let Some(doctor_id) = query.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        query_parts.push("order=date.asc".to_string());

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        parse_rows(result)
    }

    async fn delete_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<bool, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(SupabaseClient::representation_headers()),
        ).await?;

        Ok(!result.is_empty())
    }
}

fn parse_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, AppointmentError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(|e| AppointmentError::Storage(e.into())))
        .collect()
}
