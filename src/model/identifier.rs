//! Stable identifier rules shared by variables, networks, and groups.

use super::error::{BnError, Result};

/// Maximum identifier length in characters.
pub const MAX_ID_LENGTH: usize = 20;

fn is_id_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
}

/// Checks that an explicitly supplied identifier matches the id pattern:
/// 1 to 20 lowercase alphanumeric or underscore characters.
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > MAX_ID_LENGTH || !id.chars().all(is_id_char) {
        return Err(BnError::Validation(format!(
            "'{id}' is not a valid id: expected 1 to {MAX_ID_LENGTH} lowercase alphanumeric or underscore characters"
        )));
    }
    Ok(())
}

/// Derives an identifier from a display name by lowercasing, stripping
/// disallowed characters, and truncating to the maximum length.
pub fn id_from_name(name: &str) -> Result<String> {
    let mut id: String = name
        .to_lowercase()
        .chars()
        .filter(|c| is_id_char(*c))
        .collect();
    id.truncate(MAX_ID_LENGTH);

    if id.is_empty() {
        return Err(BnError::Validation(format!(
            "cannot derive an id from name '{name}': no allowed characters remain"
        )));
    }
    Ok(id)
}
