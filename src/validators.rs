/// Input validators for the token endpoints
///
/// 1. DoS protection: length limits before any hashing work happens
/// 2. User identifiers must be UUID v4
/// 3. Refresh tokens must be non-empty printable ASCII

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_REFRESH_TOKEN_LENGTH: usize = 256;

lazy_static! {
    static ref UUID_V4_REGEX: Regex = Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-4[0-9a-fA-F]{3}-[89abAB][0-9a-fA-F]{3}-[0-9a-fA-F]{12}$"
    )
    .unwrap();
}

/// Validates a user identifier
/// - Must be present and a canonical UUID v4 string
pub fn is_valid_user_id(user_id: &str) -> Result<String, ValidationError> {
    let trimmed = user_id.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("user_id".to_string()));
    }

    if !UUID_V4_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("user_id".to_string()));
    }

    Ok(trimmed.to_lowercase())
}

/// Validates a presented refresh token
/// - Must be present
/// - Bounded length (bcrypt cost is paid per request)
/// - Printable ASCII only
pub fn is_valid_refresh_token(token: &str) -> Result<&str, ValidationError> {
    if token.is_empty() {
        return Err(ValidationError::EmptyField("refresh_token".to_string()));
    }

    if token.len() > MAX_REFRESH_TOKEN_LENGTH {
        return Err(ValidationError::TooLong(
            "refresh_token".to_string(),
            MAX_REFRESH_TOKEN_LENGTH,
        ));
    }

    if !token.chars().all(|c| c.is_ascii_graphic()) {
        return Err(ValidationError::InvalidFormat("refresh_token".to_string()));
    }

    Ok(token)
}
