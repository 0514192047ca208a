use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email pattern compiles")
});

pub fn validate_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_REGEX.is_match(email)
}

/// Trimmed value with its length in characters checked against `min..=max`.
pub fn trimmed_within(value: &str, min: usize, max: usize) -> Option<&str> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    (len >= min && len <= max).then_some(trimmed)
}
