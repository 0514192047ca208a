use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claims of a Supabase access token that the backend reads. Unknown claims
/// are ignored.
#[derive(Debug, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub iat: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub user_metadata: Option<serde_json::Value>,
}

/// Authenticated caller, placed in request extensions by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Name given at registration, stored by the auth provider in user metadata.
    pub fn name(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|meta| meta.get("name"))
            .and_then(|name| name.as_str())
    }
}

/// Body of `POST /auth/validate`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub valid: bool,
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<String>,
}
