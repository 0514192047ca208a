use std::env;
use tracing::warn;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SLOT_STEP_MINUTES: u32 = 30;

/// Process-wide settings, built once at startup and shared as `Arc<AppConfig>`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub port: u16,
    pub slot_step_minutes: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            port: parse_or_default("PORT", DEFAULT_PORT),
            slot_step_minutes: parse_or_default("SLOT_STEP_MINUTES", DEFAULT_SLOT_STEP_MINUTES),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_when_secret_missing() {
        let config = AppConfig {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "anon".to_string(),
            supabase_jwt_secret: String::new(),
            port: DEFAULT_PORT,
            slot_step_minutes: DEFAULT_SLOT_STEP_MINUTES,
        };

        assert!(!config.is_configured());
    }

    #[test]
    fn parse_or_default_falls_back_for_missing_key() {
        let value: u16 = parse_or_default("CLINIC_TEST_UNSET_PORT_KEY", 4242);
        assert_eq!(value, 4242);
    }
}
