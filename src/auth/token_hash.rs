/// Refresh Token Hashing and Verification
///
/// Stored refresh tokens are bcrypt hashes. bcrypt only looks at the first
/// 72 bytes of its input, so tokens are cut to that bound explicitly before
/// both hashing and comparison.

use bcrypt::{hash, verify};

use crate::error::{AppError, CryptoError};

/// Input bound of the bcrypt primitive
pub const BCRYPT_MAX_INPUT: usize = 72;

/// The part of a raw token that bcrypt actually sees
pub fn truncate_token(token: &str) -> &[u8] {
    let bytes = token.as_bytes();
    &bytes[..bytes.len().min(BCRYPT_MAX_INPUT)]
}

/// Hash a raw refresh token for storage
///
/// # Errors
/// Returns `CryptoError::Hashing` if the token is shorter than the bcrypt
/// input bound or bcrypt fails (e.g. invalid cost)
pub fn hash_token(token: &str, cost: u32) -> Result<String, AppError> {
    if token.len() < BCRYPT_MAX_INPUT {
        return Err(CryptoError::Hashing(format!(
            "refresh token must be at least {} bytes",
            BCRYPT_MAX_INPUT
        ))
        .into());
    }

    hash(truncate_token(token), cost)
        .map_err(|e| CryptoError::Hashing(e.to_string()).into())
}

/// Compare a presented token against a stored hash
///
/// bcrypt's comparison runs in constant time with respect to the hash.
///
/// # Errors
/// Returns `CryptoError::Hashing` if the stored hash is malformed
pub fn verify_token(token: &str, stored_hash: &str) -> Result<bool, AppError> {
    verify(truncate_token(token), stored_hash)
        .map_err(|e| CryptoError::Hashing(e.to_string()).into())
}
