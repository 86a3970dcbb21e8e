/// Refresh Token Storage and Rotation
///
/// `RefreshTokenStore` persists hashes of issued tokens.
/// `RefreshTokenVerifier` validates a presented token against the user's most
/// recent record and consumes it in the same atomic step, so every refresh
/// token works exactly once.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::token_hash::{hash_token, verify_token};
use crate::error::{AppError, AuthError};
use crate::store::{ConsumeOutcome, RefreshTokenRecord, RefreshTokenRepository};

/// Client address change between issuance and refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpChangeEvent {
    pub user_id: String,
    pub previous_ip: String,
    pub current_ip: String,
}

/// Receives advisory IP change notifications. Never affects the outcome.
pub trait IpChangeListener: Send + Sync {
    fn ip_changed(&self, event: &IpChangeEvent);
}

/// Emits IP changes as `warn` events
#[derive(Debug, Default)]
pub struct TracingIpChangeListener;

impl IpChangeListener for TracingIpChangeListener {
    fn ip_changed(&self, event: &IpChangeEvent) {
        tracing::warn!(
            event = "ip_changed",
            user_id = %event.user_id,
            previous_ip = %event.previous_ip,
            current_ip = %event.current_ip,
            "Client IP changed since refresh token was issued"
        );
    }
}

/// Writes refresh token hashes to the repository
#[derive(Clone)]
pub struct RefreshTokenStore {
    repository: Arc<dyn RefreshTokenRepository>,
    hash_cost: u32,
    single_active_token: bool,
}

impl RefreshTokenStore {
    pub fn new(
        repository: Arc<dyn RefreshTokenRepository>,
        hash_cost: u32,
        single_active_token: bool,
    ) -> Self {
        Self {
            repository,
            hash_cost,
            single_active_token,
        }
    }

    /// Hash `raw_token` and record it for `user_id`
    ///
    /// Earlier records of the user stay in place unless the store was built
    /// with `single_active_token`.
    ///
    /// # Errors
    /// - `CryptoError::Hashing` if hashing fails
    /// - `StorageError` if the insert fails
    pub async fn persist(
        &self,
        user_id: &str,
        raw_token: &str,
        client_ip: &str,
    ) -> Result<(), AppError> {
        let token_hash = hash_token(raw_token, self.hash_cost)?;

        let record = RefreshTokenRecord {
            user_id: user_id.to_string(),
            token_hash,
            client_ip: client_ip.to_string(),
            created_at: Utc::now(),
        };

        self.repository
            .insert(&record, self.single_active_token)
            .await
            .map_err(|e| {
                tracing::error!(user_id = %user_id, error = %e, "Failed to store refresh token");
                e
            })?;

        tracing::info!(user_id = %user_id, client_ip = %client_ip, "Refresh token stored");
        Ok(())
    }

    /// Delete records older than `max_age`
    pub async fn purge_stale(&self, max_age: chrono::Duration) -> Result<u64, AppError> {
        let purged = self
            .repository
            .purge_created_before(Utc::now() - max_age)
            .await?;

        tracing::info!(purged, "Stale refresh tokens purged");
        Ok(purged)
    }
}

/// Validates and consumes presented refresh tokens
#[derive(Clone)]
pub struct RefreshTokenVerifier {
    repository: Arc<dyn RefreshTokenRepository>,
    listener: Arc<dyn IpChangeListener>,
}

impl RefreshTokenVerifier {
    pub fn new(repository: Arc<dyn RefreshTokenRepository>) -> Self {
        Self {
            repository,
            listener: Arc::new(TracingIpChangeListener),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn IpChangeListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Verify `presented_token` against the latest record of `user_id` and
    /// delete that record on a match.
    ///
    /// Returns `Ok(true)` only once the deletion is committed. `Ok(false)`
    /// means another request consumed the same record first.
    ///
    /// # Errors
    /// - `AuthError::TokenNotFound` if the user has no record
    /// - `AuthError::InvalidToken` if the token does not match (record kept)
    /// - `CryptoError::Hashing` / `StorageError` on primitive or datastore failure
    pub async fn verify_and_rotate(
        &self,
        user_id: &str,
        presented_token: &str,
        client_ip: &str,
    ) -> Result<bool, AppError> {
        let matches = |stored_hash: &str| verify_token(presented_token, stored_hash);

        let record = match self.repository.consume_latest(user_id, &matches).await? {
            ConsumeOutcome::Consumed(record) => record,
            ConsumeOutcome::NotFound => {
                tracing::warn!(user_id = %user_id, "Refresh token not found");
                return Err(AuthError::TokenNotFound.into());
            }
            ConsumeOutcome::Mismatch => {
                tracing::warn!(user_id = %user_id, "Refresh token mismatch");
                return Err(AuthError::InvalidToken.into());
            }
            ConsumeOutcome::Vanished => {
                tracing::warn!(user_id = %user_id, "Refresh token consumed by a concurrent request");
                return Ok(false);
            }
        };

        if record.client_ip != client_ip {
            self.listener.ip_changed(&IpChangeEvent {
                user_id: user_id.to_string(),
                previous_ip: record.client_ip,
                current_ip: client_ip.to_string(),
            });
        }

        tracing::info!(user_id = %user_id, "Refresh token consumed");
        Ok(true)
    }
}
