//! Name validation for operations that require existing entries.

use crate::core::error::{PassgenError, Result};

/// Reject the batch if any requested name is not in `valid`.
pub fn validate_names(requested: &[String], valid: &[String], location: &str) -> Result<()> {
    let invalid: Vec<&str> = requested
        .iter()
        .filter(|name| !valid.contains(name))
        .map(String::as_str)
        .collect();
    if invalid.is_empty() {
        return Ok(());
    }
    let valid = if valid.is_empty() {
        "(none)".to_string()
    } else {
        valid.join(", ")
    };
    Err(PassgenError::Validation {
        location: location.to_string(),
        invalid: invalid.join(", "),
        valid,
    })
}
