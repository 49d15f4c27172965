//! Input validation shared by the request models.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Empty { field: &'static str },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("{field}: {reason}")]
    InvalidFormat {
        field: &'static str,
        reason: &'static str,
    },

    #[error("invalid {field} value: '{value}'")]
    InvalidVariant { field: &'static str, value: String },

    #[error("{field} {reason}")]
    OutOfRange {
        field: &'static str,
        reason: &'static str,
    },
}

pub fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(())
}

/// Length is counted in characters after trimming surrounding whitespace.
pub fn min_len(field: &'static str, value: &str, min: usize) -> Result<(), ValidationError> {
    require(field, value)?;
    if value.trim().chars().count() < min {
        return Err(ValidationError::TooShort { field, min });
    }
    Ok(())
}

/// Shape check only: one `@`, a non-empty local part, and a dotted domain.
pub fn email(field: &'static str, value: &str) -> Result<(), ValidationError> {
    require(field, value)?;
    let invalid = ValidationError::InvalidFormat {
        field,
        reason: "must be a valid email",
    };

    let value = value.trim();
    if value.chars().any(char::is_whitespace) {
        return Err(invalid);
    }
    let Some((local, domain)) = value.split_once('@') else {
        return Err(invalid);
    };
    if local.is_empty() || domain.contains('@') {
        return Err(invalid);
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() => Ok(()),
        _ => Err(invalid),
    }
}

/// Treats blank optional strings as absent.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
