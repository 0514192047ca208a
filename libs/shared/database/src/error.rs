use serde_json::Value;
use thiserror::Error;

use shared_models::error::AppError;

/// Postgres SQLSTATE for a unique constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SupabaseError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
}

impl SupabaseError {
    /// Classify a non-success response from PostgREST or GoTrue.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let code = parsed
            .as_ref()
            .and_then(|v| v.get("code"))
            .and_then(|c| c.as_str());
        let message = parsed
            .as_ref()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("msg"))
                    .or_else(|| v.get("error_description"))
                    .or_else(|| v.get("error"))
            })
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string());

        if code == Some(UNIQUE_VIOLATION) {
            return SupabaseError::Conflict(message);
        }

        match status {
            401 => SupabaseError::Auth(message),
            403 => SupabaseError::Forbidden(message),
            404 => SupabaseError::NotFound(message),
            409 => SupabaseError::Conflict(message),
            400 | 422 => SupabaseError::Rejected { status, message },
            _ => SupabaseError::Api { status, message },
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, SupabaseError::Conflict(_))
    }
}

impl From<SupabaseError> for AppError {
    fn from(err: SupabaseError) -> Self {
        match err {
            SupabaseError::Auth(msg) => AppError::Auth(msg),
            SupabaseError::Forbidden(msg) => AppError::Forbidden(msg),
            SupabaseError::NotFound(msg) => AppError::NotFound(msg),
            SupabaseError::Conflict(msg) => AppError::Conflict(msg),
            SupabaseError::Rejected { message, .. } => AppError::BadRequest(message),
            SupabaseError::Api { .. } => AppError::ExternalService(err.to_string()),
            SupabaseError::InvalidHeader(msg) => AppError::Internal(msg),
        }
    }
}

/// Map an error coming out of the storage client to an HTTP-facing error.
pub fn app_error_from(err: anyhow::Error) -> AppError {
    match err.downcast::<SupabaseError>() {
        Ok(supabase_err) => supabase_err.into(),
        Err(other) => AppError::Database(other.to_string()),
    }
}
