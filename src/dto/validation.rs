//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a definition id is a lowercase snake_case key.
///
/// # Examples
///
/// ```ignore
/// validate_definition_id("numeric_recall") // Ok
/// validate_definition_id("NumericRecall") // Err - uppercase
/// validate_definition_id("")              // Err - empty
/// ```
pub fn validate_definition_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > 64 {
        let mut err = ValidationError::new("definition_id_length");
        err.message =
            Some(format!("Definition id must be 1-64 characters (got {})", id.len()).into());
        return Err(err);
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        let mut err = ValidationError::new("definition_id_format");
        err.message =
            Some("Definition id must contain only lowercase letters, digits and underscores".into());
        return Err(err);
    }

    Ok(())
}
