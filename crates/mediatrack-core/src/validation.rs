//! Input validation shared by the catalog and the migration engine.

use crate::defaults::{MAX_DESCRIPTION_LEN, MAX_NAME_LEN, MAX_USERNAME_LEN};
use crate::error::{Error, Result};

/// Trim a name and check it is non-empty and within [`MAX_NAME_LEN`].
///
/// `what` names the input in the error message ("field name", ...).
pub fn validate_name(raw: &str, what: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput(format!("{} must not be empty", what)));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::InvalidInput(format!(
            "{} exceeds {} characters",
            what, MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

pub fn validate_description(raw: &str) -> Result<String> {
    if raw.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(Error::InvalidInput(format!(
            "description exceeds {} characters",
            MAX_DESCRIPTION_LEN
        )));
    }
    Ok(raw.to_string())
}

pub fn validate_username(raw: &str) -> Result<String> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(Error::InvalidInput("username must not be empty".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(Error::InvalidInput(format!(
            "username exceeds {} characters",
            MAX_USERNAME_LEN
        )));
    }
    Ok(username.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name_trims() {
        assert_eq!(validate_name("  Writer ", "field name").unwrap(), "Writer");
    }

    #[test]
    fn test_validate_name_rejects_blank() {
        let err = validate_name("   ", "field name").unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: field name must not be empty");
    }

    #[test]
    fn test_validate_name_rejects_long() {
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(validate_name(&long, "category name").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN), "category name").is_ok());
    }

    #[test]
    fn test_validate_description() {
        assert!(validate_description("").is_ok());
        assert!(validate_description(&"d".repeat(MAX_DESCRIPTION_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert_eq!(validate_username(" ahmad@example.com ").unwrap(), "ahmad@example.com");
        assert!(validate_username("").is_err());
    }
}
