use chrono::{NaiveTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{CreateDoctorRequest, Doctor, DoctorError, UpdateDoctorRequest};
use crate::services::availability::{SATURDAY, SUNDAY};

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_doctor(
        &self,
        request: CreateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Creating doctor {} for clinic {}", request.name, request.clinic_id);

        let name = required_text("name", &request.name)?;
        let specialty = required_text("specialty", &request.specialty)?;
        validate_price(request.appointment_price_in_cents)?;
        validate_schedule(
            request.available_from_week_day,
            request.available_to_week_day,
            request.available_from_time,
            request.available_to_time,
        )?;

        let now = Utc::now().to_rfc3339();
        let doctor_data = json!({
            "clinic_id": request.clinic_id,
            "name": name,
            "specialty": specialty,
            "avatar_image_url": request.avatar_image_url,
            "available_from_week_day": request.available_from_week_day,
            "available_to_week_day": request.available_to_week_day,
            "available_from_time": request.available_from_time.format("%H:%M:%S").to_string(),
            "available_to_time": request.available_to_time.format("%H:%M:%S").to_string(),
            "appointment_price_in_cents": request.appointment_price_in_cents,
            "created_at": now,
            "updated_at": now
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/doctors",
            Some(auth_token),
            Some(doctor_data),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let doctor = first_doctor(result)?.ok_or_else(|| {
            DoctorError::Storage(anyhow::anyhow!("Failed to create doctor"))
        })?;
        debug!("Doctor created with ID: {}", doctor.id);

        Ok(doctor)
    }

    /// Snapshot lookup used by the booking flow; `None` when the row is
    /// missing or hidden by row-level security.
    pub async fn find_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Doctor>, DoctorError> {
        debug!("Fetching doctor: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        first_doctor(result)
    }

    pub async fn get_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        self.find_doctor(doctor_id, auth_token)
            .await?
            .ok_or(DoctorError::NotFound)
    }

    pub async fn list_doctors(
        &self,
        clinic_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Doctor>, DoctorError> {
        debug!("Listing doctors for clinic: {}", clinic_id);

        let path = format!("/rest/v1/doctors?clinic_id=eq.{}&order=name.asc", clinic_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        result
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(|e| DoctorError::Storage(e.into())))
            .collect()
    }

    pub async fn update_doctor(
        &self,
        doctor_id: Uuid,
        request: UpdateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Updating doctor: {}", doctor_id);

        let current = self.get_doctor(doctor_id, auth_token).await?;

        // A partial update must still leave a coherent window behind.
        validate_schedule(
            request.available_from_week_day.unwrap_or(current.available_from_week_day),
            request.available_to_week_day.unwrap_or(current.available_to_week_day),
            request.available_from_time.unwrap_or(current.available_from_time),
            request.available_to_time.unwrap_or(current.available_to_time),
        )?;

        let mut update_data = serde_json::Map::new();

        if let Some(name) = request.name {
            update_data.insert("name".to_string(), json!(required_text("name", &name)?));
        }
        if let Some(specialty) = request.specialty {
            update_data.insert("specialty".to_string(), json!(required_text("specialty", &specialty)?));
        }
        if let Some(avatar) = request.avatar_image_url {
            update_data.insert("avatar_image_url".to_string(), json!(avatar));
        }
        if let Some(day) = request.available_from_week_day {
            update_data.insert("available_from_week_day".to_string(), json!(day));
        }
        if let Some(day) = request.available_to_week_day {
            update_data.insert("available_to_week_day".to_string(), json!(day));
        }
        if let Some(time) = request.available_from_time {
            update_data.insert("available_from_time".to_string(), json!(time.format("%H:%M:%S").to_string()));
        }
        if let Some(time) = request.available_to_time {
            update_data.insert("available_to_time".to_string(), json!(time.format("%H:%M:%S").to_string()));
        }
        if let Some(price) = request.appointment_price_in_cents {
            validate_price(price)?;
            update_data.insert("appointment_price_in_cents".to_string(), json!(price));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        first_doctor(result)?.ok_or(DoctorError::NotFound)
    }

    /// Deleting a doctor cascades to their appointments in storage.
    pub async fn delete_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<(), DoctorError> {
        debug!("Deleting doctor: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(DoctorError::NotFound);
        }

        Ok(())
    }
}

fn first_doctor(rows: Vec<Value>) -> Result<Option<Doctor>, DoctorError> {
    rows.into_iter()
        .next()
        .map(|row| serde_json::from_value(row).map_err(|e| DoctorError::Storage(e.into())))
        .transpose()
}

fn required_text(field: &str, value: &str) -> Result<String, DoctorError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DoctorError::ValidationError(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn validate_price(price_in_cents: i32) -> Result<(), DoctorError> {
    if price_in_cents < 0 {
        return Err(DoctorError::ValidationError(
            "Appointment price cannot be negative".to_string(),
        ));
    }
    Ok(())
}

/// Checks applied when a window is written. Rows that predate these rules
/// are still read and simply never admit a booking.
pub fn validate_schedule(
    from_week_day: i32,
    to_week_day: i32,
    from_time: NaiveTime,
    to_time: NaiveTime,
) -> Result<(), DoctorError> {
    for day in [from_week_day, to_week_day] {
        if !(SUNDAY..=SATURDAY).contains(&day) {
            return Err(DoctorError::ValidationError(
                "Week day must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ));
        }
    }

    if from_time >= to_time {
        return Err(DoctorError::ValidationError(
            "Available from time must be before available to time".to_string(),
        ));
    }

    Ok(())
}
