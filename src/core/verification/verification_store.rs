use super::verification_models::{DayCounters, PendingVerification, VerificationOutcome};
use async_trait::async_trait;
use chrono::NaiveDate;

#[derive(Debug, thiserror::Error)]
pub enum VerificationStoreError {
    #[error("Storage error: {0}")]
    Backend(String),
}

/// Port for pending quiz records and the per-day outcome counters.
#[async_trait]
pub trait VerificationStore: Send + Sync {
    /// Insert or replace the pending record for (guild, user).
    async fn put_pending(
        &self,
        record: PendingVerification,
    ) -> Result<(), VerificationStoreError>;

    async fn get_pending(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Option<PendingVerification>, VerificationStoreError>;

    /// Remove and return the pending record, if any. The remove-then-act
    /// ordering in the service is what makes resolution exactly-once.
    async fn take_pending(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Option<PendingVerification>, VerificationStoreError>;

    async fn record_outcome(
        &self,
        guild_id: u64,
        date: NaiveDate,
        outcome: VerificationOutcome,
    ) -> Result<(), VerificationStoreError>;

    async fn daily_counters(
        &self,
        guild_id: u64,
    ) -> Result<Vec<(NaiveDate, DayCounters)>, VerificationStoreError>;

    /// Drop counter rows strictly older than `cutoff`. Returns how many.
    async fn evict_before(&self, cutoff: NaiveDate) -> Result<usize, VerificationStoreError>;
}
