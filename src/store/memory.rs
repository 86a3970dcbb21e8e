use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::{ConsumeOutcome, HashMatcher, RefreshTokenRecord, RefreshTokenRepository};
use crate::error::{AppError, StorageError};

struct Entry {
    seq: u64,
    record: RefreshTokenRecord,
}

#[derive(Default)]
struct Inner {
    next_seq: u64,
    entries: Vec<Entry>,
}

impl Inner {
    /// Index of the most recent entry for `user_id`; insertion order breaks ties
    fn latest_index(&self, user_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.record.user_id == user_id)
            .max_by_key(|(_, entry)| (entry.record.created_at, entry.seq))
            .map(|(index, _)| index)
    }
}

/// Process-local repository.
///
/// Every operation runs under one mutex, which gives `consume_latest` the
/// same all-or-nothing behavior as the row-locking Postgres transaction.
#[derive(Default)]
pub struct InMemoryRefreshTokenRepository {
    inner: Mutex<Inner>,
}

impl InMemoryRefreshTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, AppError> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Unexpected("refresh token store lock poisoned".to_string()).into())
    }
}

#[async_trait::async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    async fn insert(
        &self,
        record: &RefreshTokenRecord,
        replace_existing: bool,
    ) -> Result<(), AppError> {
        let mut inner = self.lock()?;

        if replace_existing {
            inner.entries.retain(|entry| entry.record.user_id != record.user_id);
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.push(Entry {
            seq,
            record: record.clone(),
        });
        Ok(())
    }

    async fn consume_latest(
        &self,
        user_id: &str,
        matches: &HashMatcher<'_>,
    ) -> Result<ConsumeOutcome, AppError> {
        let mut inner = self.lock()?;

        let index = match inner.latest_index(user_id) {
            Some(index) => index,
            None => return Ok(ConsumeOutcome::NotFound),
        };

        if !matches(&inner.entries[index].record.token_hash)? {
            return Ok(ConsumeOutcome::Mismatch);
        }

        let entry = inner.entries.remove(index);
        Ok(ConsumeOutcome::Consumed(entry.record))
    }

    async fn latest(&self, user_id: &str) -> Result<Option<RefreshTokenRecord>, AppError> {
        let inner = self.lock()?;
        Ok(inner
            .latest_index(user_id)
            .map(|index| inner.entries[index].record.clone()))
    }

    async fn count_for_user(&self, user_id: &str) -> Result<u64, AppError> {
        let inner = self.lock()?;
        Ok(inner
            .entries
            .iter()
            .filter(|entry| entry.record.user_id == user_id)
            .count() as u64)
    }

    async fn purge_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let mut inner = self.lock()?;
        let before = inner.entries.len();
        inner.entries.retain(|entry| entry.record.created_at >= cutoff);
        Ok((before - inner.entries.len()) as u64)
    }
}
