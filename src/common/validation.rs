use crate::devices::DeviceId;
use thiserror::Error;

pub const API_KEY_MIN_LEN: usize = 20;
pub const API_KEY_MAX_LEN: usize = 500;
pub const SEARCH_MAX_LEN: usize = 100;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("API key is required")]
    ApiKeyRequired,
    #[error("API key must be at least 20 characters")]
    ApiKeyTooShort,
    #[error("API key is too long")]
    ApiKeyTooLong,
    #[error("API key contains invalid characters")]
    ApiKeyInvalidCharacters,
    #[error("Invalid API key format")]
    ApiKeyInvalidFormat,
    #[error("Search query too long")]
    SearchTooLong,
    #[error("Invalid characters in search query")]
    SearchInvalidCharacters,
    #[error("Cannot delete this device: Invalid device ID")]
    InvalidDeviceId,
}

/// Local sanity check run before the key is tried against the API.
/// Expects the key already trimmed.
pub fn validate_api_key(key: &str) -> Result<(), ValidationError> {
    if key.is_empty() {
        return Err(ValidationError::ApiKeyRequired);
    }
    let len = key.chars().count();
    if len < API_KEY_MIN_LEN {
        return Err(ValidationError::ApiKeyTooShort);
    }
    if len > API_KEY_MAX_LEN {
        return Err(ValidationError::ApiKeyTooLong);
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ValidationError::ApiKeyInvalidCharacters);
    }
    if key.to_ascii_lowercase().contains("script") {
        return Err(ValidationError::ApiKeyInvalidFormat);
    }
    Ok(())
}

pub fn accepts_search_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | '@')
}

pub fn validate_search_query(query: &str) -> Result<(), ValidationError> {
    if query.chars().count() > SEARCH_MAX_LEN {
        return Err(ValidationError::SearchTooLong);
    }
    if !query.chars().all(accepts_search_char) {
        return Err(ValidationError::SearchInvalidCharacters);
    }
    Ok(())
}

/// The agent id to send to the delete endpoint.
pub fn validate_device_id(id: &DeviceId) -> Result<i64, ValidationError> {
    id.agent_id().ok_or(ValidationError::InvalidDeviceId)
}
