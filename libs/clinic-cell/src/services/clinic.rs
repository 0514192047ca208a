use chrono::Utc;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::validation::trimmed_within;

use crate::models::{
    Clinic, ClinicError, CreateClinicRequest, CreateClinicResponse, MembershipWithClinic,
    UpdateClinicRequest, UserClinic,
};

const MAX_CLINIC_NAME_LEN: usize = 100;

pub struct ClinicService {
    supabase: SupabaseClient,
}

impl ClinicService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Create a clinic and make the creator its first member.
    pub async fn create_clinic(
        &self,
        user_id: &str,
        request: CreateClinicRequest,
        auth_token: &str,
    ) -> Result<CreateClinicResponse, ClinicError> {
        let name = clinic_name(&request.name)?;
        debug!("Creating clinic '{}' for user {}", name, user_id);

        let now = Utc::now().to_rfc3339();
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/clinics",
            Some(auth_token),
            Some(json!({
                "name": name,
                "created_at": now,
                "updated_at": now
            })),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        let clinic: Clinic = first_row(result)?.ok_or_else(|| {
            ClinicError::Storage(anyhow::anyhow!("Failed to create clinic"))
        })?;

        let membership = match self.add_member(clinic.id, user_id, auth_token).await {
            Ok(membership) => membership,
            Err(e) => {
                warn!("Membership insert failed for clinic {}, removing it: {}", clinic.id, e);
                if let Err(cleanup) = self.delete_clinic(clinic.id, auth_token).await {
                    warn!("Could not remove orphan clinic {}: {}", clinic.id, cleanup);
                }
                return Err(e);
            }
        };

        debug!("Clinic created with ID: {}", clinic.id);
        Ok(CreateClinicResponse { clinic, membership })
    }

    pub async fn add_member(
        &self,
        clinic_id: Uuid,
        user_id: &str,
        auth_token: &str,
    ) -> Result<UserClinic, ClinicError> {
        debug!("Adding user {} to clinic {}", user_id, clinic_id);

        if user_id.trim().is_empty() {
            return Err(ClinicError::ValidationError("user_id is required".to_string()));
        }

        let now = Utc::now().to_rfc3339();
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/users_to_clinics",
            Some(auth_token),
            Some(json!({
                "user_id": user_id,
                "clinic_id": clinic_id,
                "created_at": now,
                "updated_at": now
            })),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        first_row(result)?.ok_or_else(|| {
            ClinicError::Storage(anyhow::anyhow!("Failed to create clinic membership"))
        })
    }

    pub async fn list_user_clinics(
        &self,
        user_id: &str,
        auth_token: &str,
    ) -> Result<Vec<MembershipWithClinic>, ClinicError> {
        debug!("Listing clinics for user: {}", user_id);

        let path = format!(
            "/rest/v1/users_to_clinics?user_id=eq.{}&select=*,clinic:clinics(*)&order=created_at.asc",
            user_id
        );
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        result
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(|e| ClinicError::Storage(e.into())))
            .collect()
    }

    pub async fn get_clinic(
        &self,
        clinic_id: Uuid,
        auth_token: &str,
    ) -> Result<Clinic, ClinicError> {
        let path = format!("/rest/v1/clinics?id=eq.{}", clinic_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        first_row(result)?.ok_or(ClinicError::NotFound)
    }

    pub async fn update_clinic(
        &self,
        clinic_id: Uuid,
        request: UpdateClinicRequest,
        auth_token: &str,
    ) -> Result<Clinic, ClinicError> {
        let name = clinic_name(&request.name)?;
        debug!("Renaming clinic {} to '{}'", clinic_id, name);

        let path = format!("/rest/v1/clinics?id=eq.{}", clinic_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(json!({
                "name": name,
                "updated_at": Utc::now().to_rfc3339()
            })),
            Some(SupabaseClient::representation_headers()),
        ).await?;

        first_row(result)?.ok_or(ClinicError::NotFound)
    }

    /// Storage cascades the delete to doctors, patients, appointments and
    /// memberships of the clinic.
    pub async fn delete_clinic(
        &self,
        clinic_id: Uuid,
        auth_token: &str,
    ) -> Result<(), ClinicError> {
        debug!("Deleting clinic: {}", clinic_id);

        let path = format!("/rest/v1/clinics?id=eq.{}", clinic_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(SupabaseClient::representation_headers()),
        ).await?;

        if result.is_empty() {
            return Err(ClinicError::NotFound);
        }

        Ok(())
    }
}

fn first_row<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Option<T>, ClinicError> {
    rows.into_iter()
        .next()
        .map(|row| serde_json::from_value(row).map_err(|e| ClinicError::Storage(e.into())))
        .transpose()
}

fn clinic_name(raw: &str) -> Result<String, ClinicError> {
    trimmed_within(raw, 1, MAX_CLINIC_NAME_LEN)
        .map(str::to_string)
        .ok_or_else(|| {
            ClinicError::ValidationError(format!(
                "Clinic name must be between 1 and {} characters",
                MAX_CLINIC_NAME_LEN
            ))
        })
}
