use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::validation::{trimmed_within, validate_email};

use crate::models::{CreatePatientRequest, Patient, PatientError, PatientSearchQuery, UpdatePatientRequest};

const MAX_TEXT_LEN: usize = 255;

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_patient(
        &self,
        request: CreatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Creating patient for clinic: {}", request.clinic_id);

        let name = required("name", &request.name)?;
        let email = checked_email(&request.email)?;
        let phone_number = required("phone_number", &request.phone_number)?;
        let address = required("address", &request.address)?;

        let now = Utc::now().to_rfc3339();
        let patient_data = json!({
            "clinic_id": request.clinic_id,
            "name": name,
            "email": email,
            "phone_number": phone_number,
            "address": address,
            "sex": request.sex,
            "created_at": now,
            "updated_at": now
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/patients",
            Some(auth_token),
            Some(patient_data),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let patient = first_patient(result)?.ok_or_else(|| {
            PatientError::Storage(anyhow::anyhow!("Failed to create patient"))
        })?;
        debug!("Patient created with ID: {}", patient.id);

        Ok(patient)
    }

    pub async fn get_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Fetching patient: {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        first_patient(result)?.ok_or(PatientError::NotFound)
    }

    pub async fn update_patient(
        &self,
        patient_id: Uuid,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Updating patient: {}", patient_id);

        let mut update_data = serde_json::Map::new();

        if let Some(name) = request.name {
            update_data.insert("name".to_string(), json!(required("name", &name)?));
        }
        if let Some(new_email) = request.email {
            update_data.insert("email".to_string(), json!(checked_email(&new_email)?));
        }
        if let Some(phone_number) = request.phone_number {
            update_data.insert("phone_number".to_string(), json!(required("phone_number", &phone_number)?));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(required("address", &address)?));
        }
        if let Some(sex) = request.sex {
            update_data.insert("sex".to_string(), json!(sex));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        first_patient(result)?.ok_or(PatientError::NotFound)
    }

    pub async fn delete_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<(), PatientError> {
        debug!("Deleting patient: {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(PatientError::NotFound);
        }

        Ok(())
    }

    pub async fn search_patients(
        &self,
        query: PatientSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Patient>, PatientError> {
        debug!("Searching patients with query: {:?}", query);

        let mut path = format!("/rest/v1/patients?clinic_id=eq.{}", query.clinic_id);

        if let Some(name) = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            path.push_str(&format!("&name=ilike.*{}*", urlencoding::encode(name)));
        }

        let limit = query.limit.unwrap_or(50).clamp(1, 200);
        let offset = query.offset.unwrap_or(0).max(0);
        path.push_str(&format!("&order=name.asc&limit={}&offset={}", limit, offset));

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        result
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(|e| PatientError::Storage(e.into())))
            .collect()
    }
}

fn first_patient(rows: Vec<Value>) -> Result<Option<Patient>, PatientError> {
    rows.into_iter()
        .next()
        .map(|row| serde_json::from_value(row).map_err(|e| PatientError::Storage(e.into())))
        .transpose()
}

fn required(field: &str, value: &str) -> Result<String, PatientError> {
    trimmed_within(value, 1, MAX_TEXT_LEN)
        .map(str::to_string)
        .ok_or_else(|| PatientError::ValidationError(format!("{} is required", field)))
}

fn checked_email(value: &str) -> Result<String, PatientError> {
    let trimmed = value.trim();
    if !validate_email(trimmed) {
        return Err(PatientError::ValidationError("Invalid email".to_string()));
    }
    Ok(trimmed.to_string())
}
