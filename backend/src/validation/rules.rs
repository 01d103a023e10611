//! Common validation rules shared across request payloads.

use validator::ValidationError;

/// Validates a student/teacher id (the "sid").
///
/// Requirements:
/// - Only alphanumeric characters, hyphens and underscores
/// - 1-50 characters in length
pub fn validate_sid(sid: &str) -> Result<(), ValidationError> {
    if sid.is_empty() || sid.len() > 50 {
        return Err(ValidationError::new("sid_invalid_length"));
    }

    if !sid
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ValidationError::new("sid_invalid_characters"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sid_rejects_empty() {
        assert!(validate_sid("").is_err());
    }

    #[test]
    fn sid_rejects_special_chars() {
        assert!(validate_sid("cs 21/001").is_err());
    }

    #[test]
    fn sid_accepts_valid() {
        assert!(validate_sid("CS21-001").is_ok());
        assert!(validate_sid("teacher_01").is_ok());
    }
}
