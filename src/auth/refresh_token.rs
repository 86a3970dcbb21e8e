/// Refresh Token Generation
///
/// Refresh tokens are:
/// - 64 bytes drawn from the operating system CSPRNG
/// - Collapsed through SHA-512 into a fixed-width digest
/// - Encoded as padded URL-safe base64 (88 characters)
///
/// The raw value only lives in memory and in the response that hands it to
/// the client. Storage keeps a bcrypt hash (see `token_hash`).

use std::fmt;

use base64::{engine::general_purpose, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha512};

use crate::error::{AppError, CryptoError};

const RANDOM_BYTES: usize = 64;

/// Length of an encoded refresh token
pub const REFRESH_TOKEN_LENGTH: usize = 88;

/// A freshly generated refresh token in plaintext.
///
/// `Debug` is redacted so the value never ends up in logs by accident.
#[derive(Clone, PartialEq, Eq)]
pub struct RawRefreshToken(String);

impl RawRefreshToken {
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for RawRefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RawRefreshToken([REDACTED])")
    }
}

/// Produces opaque refresh tokens.
///
/// Stateless: every call reads fresh bytes from `OsRng`, there is no seed or
/// counter to predict.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshTokenGenerator;

impl RefreshTokenGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Generate a new refresh token
    ///
    /// # Errors
    /// Returns `CryptoError::EntropySource` if the OS random source fails
    pub fn generate(&self) -> Result<RawRefreshToken, AppError> {
        let mut raw = [0u8; RANDOM_BYTES];
        OsRng
            .try_fill_bytes(&mut raw)
            .map_err(|e| CryptoError::EntropySource(e.to_string()))?;

        let digest = Sha512::digest(raw);
        Ok(RawRefreshToken(general_purpose::URL_SAFE.encode(digest)))
    }
}
