// The verification quiz flow: a short-lived per-user state machine,
// Idle -> Pending(question, expiry) -> Answered | TimedOut.
//
// The two invariants that matter: at most one pending challenge per user
// (replace-before-create), and exactly-once resolution (take the record
// before acting on it, so answer and timeout can never both fire).

use super::verification_models::{
    question, GuildVerificationStats, PendingVerification, TriviaQuestion, VerificationOutcome,
    QUESTION_BANK,
};
use super::verification_store::{VerificationStore, VerificationStoreError};
use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use thiserror::Error;

/// How long a hunter gets to answer.
pub const CHALLENGE_TIMEOUT_SECS: i64 = 60;

/// Per-day counters older than this are evicted on write.
pub const STATS_RETENTION_DAYS: i64 = 30;

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("No verification challenge is pending")]
    NoPending,
    #[error("Answer index {0} is out of range")]
    InvalidChoice(usize),
    #[error("Question {0} is no longer in the bank")]
    UnknownQuestion(String),
    #[error("Store error: {0}")]
    Store(#[from] VerificationStoreError),
}

/// What `start_challenge` hands the discord layer to render and to arm the
/// timeout timer with.
pub struct IssuedChallenge {
    pub question: &'static TriviaQuestion,
    pub expires_at: DateTime<Utc>,
}

pub struct AnswerReport {
    pub correct: bool,
    pub elapsed_secs: i64,
    pub correct_answer: &'static str,
}

pub struct VerificationService<S: VerificationStore> {
    store: S,
    timeout: Duration,
}

impl<S: VerificationStore> VerificationService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            timeout: Duration::seconds(CHALLENGE_TIMEOUT_SECS),
        }
    }

    /// Timeout as a std duration, for the discord layer's sleep timer.
    pub fn challenge_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(CHALLENGE_TIMEOUT_SECS as u64)
    }

    /// Issues a fresh challenge, replacing any unanswered one first so there
    /// is never more than one pending record per user.
    pub async fn start_challenge(
        &self,
        user_id: u64,
        guild_id: u64,
        now: DateTime<Utc>,
    ) -> Result<IssuedChallenge, VerificationError> {
        if self.store.take_pending(guild_id, user_id).await?.is_some() {
            tracing::debug!(user_id, guild_id, "replaced an unanswered quiz challenge");
        }

        let question = QUESTION_BANK
            .choose(&mut rand::thread_rng())
            .unwrap_or(&QUESTION_BANK[0]);
        let expires_at = now + self.timeout;
        self.store
            .put_pending(PendingVerification {
                user_id,
                guild_id,
                question_id: question.id.to_string(),
                correct_index: question.correct_index,
                started_at: now,
                expires_at,
            })
            .await?;

        Ok(IssuedChallenge {
            question,
            expires_at,
        })
    }

    /// Resolves a pending challenge with the user's answer.
    pub async fn answer(
        &self,
        user_id: u64,
        guild_id: u64,
        choice: usize,
        now: DateTime<Utc>,
    ) -> Result<AnswerReport, VerificationError> {
        let pending = self
            .store
            .take_pending(guild_id, user_id)
            .await?
            .ok_or(VerificationError::NoPending)?;
        let question = question(&pending.question_id)
            .ok_or_else(|| VerificationError::UnknownQuestion(pending.question_id.clone()))?;
        if choice >= question.options.len() {
            // The attempt is burned; the next /ghostquiz start issues a
            // fresh question.
            return Err(VerificationError::InvalidChoice(choice));
        }

        let correct = choice == pending.correct_index;
        let outcome = if correct {
            VerificationOutcome::Passed
        } else {
            VerificationOutcome::Failed
        };
        self.store
            .record_outcome(guild_id, now.date_naive(), outcome)
            .await?;
        self.evict_stale(now).await?;

        Ok(AnswerReport {
            correct,
            elapsed_secs: now.signed_duration_since(pending.started_at).num_seconds().max(0),
            correct_answer: question
                .options
                .get(question.correct_index)
                .copied()
                .unwrap_or_default(),
        })
    }

    /// Timeout path, driven by a timer the discord layer arms at issue time.
    /// Returns true when a challenge actually timed out. If the record is
    /// gone (answered) or has been superseded by a newer challenge (its
    /// expiry is still in the future), this is an idempotent no-op.
    pub async fn expire(
        &self,
        user_id: u64,
        guild_id: u64,
        now: DateTime<Utc>,
    ) -> Result<bool, VerificationError> {
        let pending = match self.store.get_pending(guild_id, user_id).await? {
            Some(pending) => pending,
            None => return Ok(false),
        };
        if pending.expires_at > now {
            return Ok(false);
        }
        if self.store.take_pending(guild_id, user_id).await?.is_none() {
            return Ok(false);
        }

        self.store
            .record_outcome(guild_id, now.date_naive(), VerificationOutcome::TimedOut)
            .await?;
        self.evict_stale(now).await?;
        tracing::info!(user_id, guild_id, "quiz challenge timed out");
        Ok(true)
    }

    pub async fn stats(&self, guild_id: u64) -> Result<GuildVerificationStats, VerificationError> {
        let mut daily = self.store.daily_counters(guild_id).await?;
        daily.sort_by_key(|(date, _)| *date);

        let mut stats = GuildVerificationStats::default();
        for (date, counters) in daily {
            stats.passed += counters.passed as u64;
            stats.failed += counters.failed as u64;
            stats.timed_out += counters.timed_out as u64;
            stats.daily.push((date, counters));
        }
        Ok(stats)
    }

    async fn evict_stale(&self, now: DateTime<Utc>) -> Result<(), VerificationStoreError> {
        let cutoff = now.date_naive() - Duration::days(STATS_RETENTION_DAYS);
        let evicted = self.store.evict_before(cutoff).await?;
        if evicted > 0 {
            tracing::debug!(evicted, "dropped verification stat rows past retention");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::verification::InMemoryVerificationStore;
    use chrono::TimeZone;

    const USER: u64 = 11;
    const GUILD: u64 = 22;

    fn service() -> VerificationService<InMemoryVerificationStore> {
        VerificationService::new(InMemoryVerificationStore::new())
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, h, m, s).unwrap()
    }

    #[tokio::test]
    async fn starting_twice_keeps_a_single_pending_record() {
        let service = service();
        let now = at(12, 0, 0);

        service.start_challenge(USER, GUILD, now).await.unwrap();
        let second = service
            .start_challenge(USER, GUILD, now + Duration::seconds(5))
            .await
            .unwrap();

        assert_eq!(service.store.pending_count(), 1);
        let pending = service
            .store
            .get_pending(GUILD, USER)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pending.question_id, second.question.id);
        assert_eq!(pending.expires_at, second.expires_at);
    }

    #[tokio::test]
    async fn correct_answer_passes_and_reports_elapsed_time() {
        let service = service();
        let started = at(12, 0, 0);
        let issued = service.start_challenge(USER, GUILD, started).await.unwrap();

        let report = service
            .answer(
                USER,
                GUILD,
                issued.question.correct_index,
                started + Duration::seconds(14),
            )
            .await
            .unwrap();

        assert!(report.correct);
        assert_eq!(report.elapsed_secs, 14);

        let stats = service.stats(GUILD).await.unwrap();
        assert_eq!((stats.passed, stats.failed, stats.timed_out), (1, 0, 0));
    }

    #[tokio::test]
    async fn wrong_answer_fails_and_reveals_the_correct_option() {
        let service = service();
        let started = at(12, 0, 0);
        let issued = service.start_challenge(USER, GUILD, started).await.unwrap();
        let wrong = (issued.question.correct_index + 1) % issued.question.options.len();

        let report = service
            .answer(USER, GUILD, wrong, started + Duration::seconds(3))
            .await
            .unwrap();

        assert!(!report.correct);
        assert_eq!(
            report.correct_answer,
            issued.question.options[issued.question.correct_index]
        );
        let stats = service.stats(GUILD).await.unwrap();
        assert_eq!((stats.passed, stats.failed), (0, 1));
    }

    #[tokio::test]
    async fn answering_resolves_exactly_once() {
        let service = service();
        let started = at(12, 0, 0);
        let issued = service.start_challenge(USER, GUILD, started).await.unwrap();

        service
            .answer(USER, GUILD, issued.question.correct_index, started)
            .await
            .unwrap();
        // Second answer and a late timeout both find nothing.
        assert!(matches!(
            service.answer(USER, GUILD, 0, started).await,
            Err(VerificationError::NoPending)
        ));
        assert!(!service
            .expire(USER, GUILD, started + Duration::seconds(120))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn timeout_fires_only_after_expiry() {
        let service = service();
        let started = at(12, 0, 0);
        service.start_challenge(USER, GUILD, started).await.unwrap();

        // Timer misfire before the deadline: record stays.
        assert!(!service
            .expire(USER, GUILD, started + Duration::seconds(30))
            .await
            .unwrap());
        assert!(service
            .store
            .get_pending(GUILD, USER)
            .await
            .unwrap()
            .is_some());

        assert!(service
            .expire(USER, GUILD, started + Duration::seconds(61))
            .await
            .unwrap());
        let stats = service.stats(GUILD).await.unwrap();
        assert_eq!(stats.timed_out, 1);
    }

    #[tokio::test]
    async fn stale_timer_does_not_kill_a_replacement_challenge() {
        let service = service();
        let first_start = at(12, 0, 0);
        service
            .start_challenge(USER, GUILD, first_start)
            .await
            .unwrap();
        // User restarts 50s in; the first challenge's timer will still fire
        // at +60s, but the live record now expires later.
        service
            .start_challenge(USER, GUILD, first_start + Duration::seconds(50))
            .await
            .unwrap();

        assert!(!service
            .expire(USER, GUILD, first_start + Duration::seconds(60))
            .await
            .unwrap());
        assert!(service
            .store
            .get_pending(GUILD, USER)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn stats_evict_days_past_the_retention_window() {
        let service = service();
        let now = at(12, 0, 0);
        let old_date = now.date_naive() - Duration::days(STATS_RETENTION_DAYS + 5);
        service
            .store
            .record_outcome(GUILD, old_date, VerificationOutcome::Passed)
            .await
            .unwrap();

        // Any resolved challenge triggers eviction.
        let issued = service.start_challenge(USER, GUILD, now).await.unwrap();
        service
            .answer(USER, GUILD, issued.question.correct_index, now)
            .await
            .unwrap();

        let stats = service.stats(GUILD).await.unwrap();
        assert_eq!(stats.passed, 1);
        assert!(stats.daily.iter().all(|(date, _)| *date > old_date));
    }
}
