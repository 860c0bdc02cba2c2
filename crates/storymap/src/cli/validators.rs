//! CLI input validation functions.
//!
//! These validators are used by clap's `value_parser` attribute to validate
//! user input at parse time, providing immediate feedback for invalid values.

/// Maximum length of a feature description handed to the planner.
pub const MAX_DESCRIPTION_LENGTH: usize = 10_000;

/// Validate a feature description: not blank and at most
/// [`MAX_DESCRIPTION_LENGTH`] characters. Returns the trimmed text.
pub fn validate_description(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err("Description cannot be empty".to_string());
    }
    let length = trimmed.chars().count();
    if length > MAX_DESCRIPTION_LENGTH {
        return Err(format!(
            "Description cannot exceed {MAX_DESCRIPTION_LENGTH} characters (got {length})"
        ));
    }
    Ok(trimmed.to_string())
}
