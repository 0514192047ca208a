use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub const TEST_JWT_SECRET: &str = "test-secret-key-for-jwt-validation-must-be-long-enough";

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: TEST_JWT_SECRET.to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    /// Point the config at a mock server (wiremock) instead of a real project.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            supabase_url: url.into(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            port: 3000,
            slot_step_minutes: 30,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("Test User", "test@example.com")
    }
}

impl TestUser {
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            role: "authenticated".to_string(),
        }
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: Some(json!({ "name": self.name })),
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "user_metadata": { "name": user.name },
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn bearer(user: &TestUser) -> String {
        format!("Bearer {}", Self::create_test_token(user, TEST_JWT_SECRET, Some(24)))
    }
}

/// Canned PostgREST rows matching the migration in `supabase/migrations`.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn clinic_response(clinic_id: &str, name: &str) -> Value {
        json!({
            "id": clinic_id,
            "name": name,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn membership_response(user_id: &str, clinic_id: &str) -> Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "clinic_id": clinic_id,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    /// Doctor available Monday to Friday, 08:00 to 18:00.
    pub fn doctor_response(doctor_id: &str, clinic_id: &str) -> Value {
        json!({
            "id": doctor_id,
            "clinic_id": clinic_id,
            "name": "Dra. Ana Souza",
            "avatar_image_url": null,
            "specialty": "Cardiology",
            "available_from_week_day": 1,
            "available_to_week_day": 5,
            "available_from_time": "08:00:00",
            "available_to_time": "18:00:00",
            "appointment_price_in_cents": 15000,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn patient_response(patient_id: &str, clinic_id: &str) -> Value {
        json!({
            "id": patient_id,
            "clinic_id": clinic_id,
            "name": "Carlos Lima",
            "email": "carlos@example.com",
            "phone_number": "+5511999990000",
            "address": "Rua das Flores, 10",
            "sex": "male",
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn appointment_response(
        appointment_id: &str,
        clinic_id: &str,
        doctor_id: &str,
        patient_id: &str,
        date: &str,
    ) -> Value {
        json!({
            "id": appointment_id,
            "date": date,
            "clinic_id": clinic_id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn unique_violation_response() -> Value {
        json!({
            "code": "23505",
            "details": null,
            "hint": null,
            "message": "duplicate key value violates unique constraint \"appointments_doctor_id_date_key\""
        })
    }
}
