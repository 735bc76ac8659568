use crate::error::{Result, SessionError};

/// Longest identifier the engine accepts.
const MAX_NAME_LEN: usize = 63;

/// Check that `name` is a plain engine identifier before it is spliced into
/// command text.
pub fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = name.len() <= MAX_NAME_LEN
        && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SessionError::InvalidName(name.to_string()))
    }
}
