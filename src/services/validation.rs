use once_cell::sync::Lazy;
use regex::Regex;

use super::error::{ServiceError, ServiceResult};

static SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").expect("valid regex"));
static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"));

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn slug(field: &str, value: &str) -> ServiceResult<()> {
    if !SLUG.is_match(value) {
        return Err(ServiceError::validation(format!(
            "{} must contain only lowercase letters, digits and hyphens",
            field
        )));
    }
    Ok(())
}

/// Trimmed, non-empty text.
pub fn required<'a>(field: &str, value: &'a str) -> ServiceResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::validation(format!("{} is required", field)));
    }
    Ok(trimmed)
}

pub fn email(value: &str) -> ServiceResult<String> {
    let normalized = value.trim().to_lowercase();
    if !EMAIL.is_match(&normalized) {
        return Err(ServiceError::validation("email is not a valid address"));
    }
    Ok(normalized)
}

pub fn password(value: &str) -> ServiceResult<()> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Parse a closed set of string values, naming the field in the error.
pub fn one_of<'a>(field: &str, value: &'a str, allowed: &[&str]) -> ServiceResult<&'a str> {
    if allowed.contains(&value) {
        Ok(value)
    } else {
        Err(ServiceError::validation(format!(
            "{} must be one of: {}",
            field,
            allowed.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs() {
        assert!(slug("slug", "tech-2024").is_ok());
        assert!(slug("slug", "").is_err());
        assert!(slug("slug", "Tech").is_err());
        assert!(slug("slug", "../etc").is_err());
        assert!(slug("slug", "a b").is_err());
    }

    #[test]
    fn required_trims() {
        assert_eq!(required("name", "  Ana ").unwrap(), "Ana");
        assert!(required("name", "   ").is_err());
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(email(" Ana@Example.COM ").unwrap(), "ana@example.com");
        assert!(email("not-an-email").is_err());
        assert!(email("a@b").is_err());
    }

    #[test]
    fn passwords_and_enums() {
        assert!(password("short").is_err());
        assert!(password("long enough").is_ok());
        assert!(one_of("status", "draft", &["draft", "published"]).is_ok());
        assert!(one_of("status", "archived", &["draft", "published"]).is_err());
    }
}
