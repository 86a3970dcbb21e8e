/// Refresh token persistence
///
/// `RefreshTokenRepository` is the only seam through which refresh token
/// records are created or destroyed. Consumption is a single atomic
/// operation: the latest record is read, compared and deleted as one unit, so
/// two concurrent callers presenting the same token can never both succeed.

mod memory;
mod postgres;

pub use memory::InMemoryRefreshTokenRepository;
pub use postgres::PostgresRefreshTokenRepository;

use chrono::{DateTime, Utc};

use crate::error::AppError;

/// A stored refresh token entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub user_id: String,
    /// bcrypt hash of the truncated raw token
    pub token_hash: String,
    pub client_ip: String,
    pub created_at: DateTime<Utc>,
}

/// Decides whether a stored hash matches the presented token
pub type HashMatcher<'a> = dyn Fn(&str) -> Result<bool, AppError> + Send + Sync + 'a;

/// Result of an atomic consume attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The user has no stored record
    NotFound,
    /// The latest record did not match; it was left in place
    Mismatch,
    /// The record matched and has been deleted
    Consumed(RefreshTokenRecord),
    /// The record matched but a concurrent caller deleted it first
    Vanished,
}

#[async_trait::async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Insert a new record. With `replace_existing`, every older record of
    /// the same user is removed in the same unit of work.
    async fn insert(
        &self,
        record: &RefreshTokenRecord,
        replace_existing: bool,
    ) -> Result<(), AppError>;

    /// Atomically look up the most recent record of `user_id`, run
    /// `matches` against its hash and delete it on a match.
    async fn consume_latest(
        &self,
        user_id: &str,
        matches: &HashMatcher<'_>,
    ) -> Result<ConsumeOutcome, AppError>;

    /// Most recent record of `user_id`, if any
    async fn latest(&self, user_id: &str) -> Result<Option<RefreshTokenRecord>, AppError>;

    async fn count_for_user(&self, user_id: &str) -> Result<u64, AppError>;

    /// Delete every record created before `cutoff`, returning how many went
    async fn purge_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError>;
}
