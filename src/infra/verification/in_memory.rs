// In-memory implementation of the verification store, used by the service
// tests. DashMap keeps it safe across concurrent async tasks.

use crate::core::verification::{
    DayCounters, PendingVerification, VerificationOutcome, VerificationStore,
    VerificationStoreError,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;

#[allow(dead_code)]
pub struct InMemoryVerificationStore {
    pending: DashMap<(u64, u64), PendingVerification>,
    days: DashMap<(u64, NaiveDate), DayCounters>,
}

#[allow(dead_code)]
impl InMemoryVerificationStore {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
            days: DashMap::new(),
        }
    }

    /// Total pending rows across all guilds. Lets tests assert the
    /// one-pending-per-user invariant directly.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Default for InMemoryVerificationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VerificationStore for InMemoryVerificationStore {
    async fn put_pending(
        &self,
        record: PendingVerification,
    ) -> Result<(), VerificationStoreError> {
        self.pending
            .insert((record.guild_id, record.user_id), record);
        Ok(())
    }

    async fn get_pending(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Option<PendingVerification>, VerificationStoreError> {
        Ok(self
            .pending
            .get(&(guild_id, user_id))
            .map(|entry| entry.value().clone()))
    }

    async fn take_pending(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Option<PendingVerification>, VerificationStoreError> {
        Ok(self
            .pending
            .remove(&(guild_id, user_id))
            .map(|(_, record)| record))
    }

    async fn record_outcome(
        &self,
        guild_id: u64,
        date: NaiveDate,
        outcome: VerificationOutcome,
    ) -> Result<(), VerificationStoreError> {
        let mut counters = self.days.entry((guild_id, date)).or_default();
        match outcome {
            VerificationOutcome::Passed => counters.passed += 1,
            VerificationOutcome::Failed => counters.failed += 1,
            VerificationOutcome::TimedOut => counters.timed_out += 1,
        }
        Ok(())
    }

    async fn daily_counters(
        &self,
        guild_id: u64,
    ) -> Result<Vec<(NaiveDate, DayCounters)>, VerificationStoreError> {
        Ok(self
            .days
            .iter()
            .filter(|entry| entry.key().0 == guild_id)
            .map(|entry| (entry.key().1, *entry.value()))
            .collect())
    }

    async fn evict_before(&self, cutoff: NaiveDate) -> Result<usize, VerificationStoreError> {
        let before = self.days.len();
        self.days.retain(|(_, date), _| *date >= cutoff);
        Ok(before - self.days.len())
    }
}
