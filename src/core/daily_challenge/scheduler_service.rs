// The renewal scheduler. One timer task per tier, each re-evaluating every
// guild on that tier and renewing the eligible ones. Per-guild failures are
// logged and counted; they never abort the rest of the batch.
//
// Like the other services, the scheduler is an explicitly constructed object
// handed to command handlers through poise's shared `Data` - there is no
// ambient singleton.

use super::challenge_models::{GuildChallengeConfig, RenewalFrequency};
use super::challenge_store::{ChallengeConfigStore, ChallengeStoreError};
use super::schedule::{is_eligible, next_renewal};
use super::selector::{ChallengeSelector, SelectedChallenge};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Channel {0} not found")]
    ChannelNotFound(u64),
    #[error("Send failed: {0}")]
    SendFailed(String),
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Scheduler has not been initialized")]
    NotInitialized,
    #[error("No daily challenge configured for guild {0}")]
    NotConfigured(u64),
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),
    #[error("Store error: {0}")]
    Store(#[from] ChallengeStoreError),
}

/// Payload handed to the delivery sink. Turning this into an embed is the
/// discord layer's job; the core never formats presentation.
#[derive(Debug, Clone)]
pub struct RenderedChallenge {
    pub category_name: &'static str,
    pub icon: &'static str,
    pub text: String,
    pub bonus_ghost: Option<&'static str>,
    pub frequency_label: &'static str,
    pub next_renewal: DateTime<Utc>,
}

/// Port for pushing a rendered challenge into a channel.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn send_challenge(
        &self,
        channel_id: u64,
        challenge: &RenderedChallenge,
    ) -> Result<(), DeliveryError>;
}

/// What a completed renewal hands back to the caller (the manual trigger
/// shows this to the operator).
#[derive(Debug, Clone)]
pub struct RenewalReceipt {
    pub challenge: SelectedChallenge,
    pub next_renewal: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Content(RenewalFrequency),
    Cleanup,
}

struct TierSpec {
    name: &'static str,
    tier: Tier,
    /// How often the tier re-evaluates its guilds. Finer than the renewal
    /// interval; eligibility makes over-ticking idempotent.
    tick: StdDuration,
}

const TIERS: [TierSpec; 6] = [
    TierSpec {
        name: "hourly",
        tier: Tier::Content(RenewalFrequency::Hourly),
        tick: StdDuration::from_secs(5 * 60),
    },
    TierSpec {
        name: "every3hours",
        tier: Tier::Content(RenewalFrequency::Every3Hours),
        tick: StdDuration::from_secs(15 * 60),
    },
    TierSpec {
        name: "every6hours",
        tier: Tier::Content(RenewalFrequency::Every6Hours),
        tick: StdDuration::from_secs(15 * 60),
    },
    TierSpec {
        name: "every12hours",
        tier: Tier::Content(RenewalFrequency::Every12Hours),
        tick: StdDuration::from_secs(15 * 60),
    },
    TierSpec {
        name: "daily",
        tier: Tier::Content(RenewalFrequency::Daily),
        tick: StdDuration::from_secs(10 * 60),
    },
    TierSpec {
        name: "cleanup",
        tier: Tier::Cleanup,
        tick: StdDuration::from_secs(6 * 60 * 60),
    },
];

#[derive(Debug, Clone)]
pub struct TaskStatus {
    pub running: bool,
    pub scheduled: bool,
}

#[derive(Debug, Clone)]
pub struct SchedulerStatus {
    pub initialized: bool,
    pub tasks: HashMap<&'static str, TaskStatus>,
    /// Guilds with in-memory selection history. Operational signal only.
    pub active_guilds: usize,
}

struct SchedulerState {
    initialized: bool,
    handles: HashMap<&'static str, JoinHandle<()>>,
}

pub struct ChallengeScheduler<S, D> {
    store: Arc<S>,
    sink: Arc<D>,
    selector: Mutex<ChallengeSelector>,
    state: Mutex<SchedulerState>,
}

impl<S, D> ChallengeScheduler<S, D>
where
    S: ChallengeConfigStore + 'static,
    D: DeliverySink + 'static,
{
    pub fn new(store: Arc<S>, sink: Arc<D>) -> Self {
        Self {
            store,
            sink,
            selector: Mutex::new(ChallengeSelector::new()),
            state: Mutex::new(SchedulerState {
                initialized: false,
                handles: HashMap::new(),
            }),
        }
    }

    /// Marks the tier table ready without starting any timers. Calling it a
    /// second time is a no-op with a warning.
    pub async fn initialize(&self) {
        let mut state = self.state.lock().await;
        if state.initialized {
            tracing::warn!("challenge scheduler already initialized, ignoring");
            return;
        }
        state.initialized = true;
        tracing::info!(tiers = TIERS.len(), "challenge scheduler initialized");
    }

    /// Spawns one timer task per tier. Requires `initialize` first.
    /// Each tier task holds a clone of the scheduler Arc for its lifetime.
    pub async fn start(self: Arc<Self>) -> Result<(), SchedulerError> {
        let mut state = self.state.lock().await;
        if !state.initialized {
            return Err(SchedulerError::NotInitialized);
        }
        if !state.handles.is_empty() {
            tracing::warn!("challenge scheduler already running, ignoring start");
            return Ok(());
        }

        for spec in &TIERS {
            let scheduler = Arc::clone(&self);
            let tier = spec.tier;
            let tick = spec.tick;
            let name = spec.name;
            let handle = tokio::spawn(async move {
                let mut interval = tokio::time::interval(tick);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                // The first interval tick completes immediately; skipping it
                // keeps a fresh start from firing every tier at once.
                interval.tick().await;
                loop {
                    interval.tick().await;
                    scheduler.run_tick(tier).await;
                }
            });
            state.handles.insert(name, handle);
            tracing::debug!(tier = name, period_secs = tick.as_secs(), "tier timer started");
        }

        tracing::info!("challenge scheduler started");
        Ok(())
    }

    /// Aborts all tier tasks. Safe to call repeatedly. Renewal writes are
    /// single awaited round-trips, so stopping between ticks never leaves a
    /// guild mid-update.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        if state.handles.is_empty() {
            return;
        }
        for (name, handle) in state.handles.drain() {
            handle.abort();
            tracing::debug!(tier = name, "tier timer stopped");
        }
        tracing::info!("challenge scheduler stopped");
    }

    pub async fn status(&self) -> SchedulerStatus {
        let state = self.state.lock().await;
        let tasks = TIERS
            .iter()
            .map(|spec| {
                let running = state
                    .handles
                    .get(spec.name)
                    .map(|handle| !handle.is_finished())
                    .unwrap_or(false);
                (
                    spec.name,
                    TaskStatus {
                        running,
                        scheduled: state.initialized,
                    },
                )
            })
            .collect();
        let active_guilds = self.selector.lock().await.tracked_guilds();
        SchedulerStatus {
            initialized: state.initialized,
            tasks,
            active_guilds,
        }
    }

    /// Operator-invoked renewal: skips the eligibility check entirely and,
    /// unlike the scheduled path, propagates delivery errors to the caller.
    pub async fn manual_renewal(&self, guild_id: u64) -> Result<RenewalReceipt, SchedulerError> {
        let config = self
            .store
            .get_config(guild_id)
            .await?
            .ok_or(SchedulerError::NotConfigured(guild_id))?;
        self.renew(&config).await
    }

    async fn run_tick(&self, tier: Tier) {
        match tier {
            Tier::Content(frequency) => self.run_content_tick(frequency).await,
            Tier::Cleanup => self.run_cleanup_tick().await,
        }
    }

    async fn run_content_tick(&self, frequency: RenewalFrequency) {
        let configs = match self.store.find_enabled(frequency).await {
            Ok(configs) => configs,
            Err(err) => {
                tracing::error!(
                    frequency = frequency.as_str(),
                    error = %err,
                    "failed to load challenge configs for tick"
                );
                return;
            }
        };

        let now = Utc::now();
        let mut renewed = 0usize;
        let mut failed = 0usize;
        for config in configs.iter().filter(|config| is_eligible(config, now)) {
            match self.renew(config).await {
                Ok(receipt) => {
                    renewed += 1;
                    tracing::info!(
                        guild_id = config.guild_id,
                        challenge_id = %receipt.challenge.challenge_id,
                        "challenge renewed"
                    );
                }
                Err(err) => {
                    // The guild's last_renewal was not advanced, so it stays
                    // eligible on the next tick.
                    failed += 1;
                    tracing::warn!(
                        guild_id = config.guild_id,
                        error = %err,
                        "challenge renewal failed"
                    );
                }
            }
        }

        if renewed > 0 || failed > 0 {
            tracing::debug!(
                frequency = frequency.as_str(),
                renewed,
                failed,
                "content tick finished"
            );
        }
    }

    /// Drops selection history for guilds that no longer have an enabled
    /// config, so the map tracks live tenants instead of growing forever.
    async fn run_cleanup_tick(&self) {
        let ids = match self.store.enabled_guild_ids().await {
            Ok(ids) => ids,
            Err(err) => {
                tracing::error!(error = %err, "cleanup tick could not load guild ids");
                return;
            }
        };
        let keep: HashSet<u64> = ids.into_iter().collect();
        let pruned = self.selector.lock().await.retain_guilds(&keep);
        if pruned > 0 {
            tracing::info!(pruned, "pruned selection history for removed guilds");
        }
    }

    /// One guild's renewal: select, deliver, then persist. The write-back
    /// happens strictly after the send succeeds, so a failed delivery leaves
    /// the guild eligible and `last_renewal` monotonic.
    async fn renew(&self, config: &GuildChallengeConfig) -> Result<RenewalReceipt, SchedulerError> {
        let now = Utc::now();
        let selection = {
            let mut selector = self.selector.lock().await;
            selector.select(
                &mut rand::thread_rng(),
                config.guild_id,
                config.last_challenge_id.as_deref(),
                now,
            )
        };
        let next = next_renewal(config.frequency, config.custom_hour, now);

        let payload = RenderedChallenge {
            category_name: selection.category_name,
            icon: selection.icon,
            text: selection.text.clone(),
            bonus_ghost: selection.bonus_ghost,
            frequency_label: config.frequency.label(),
            next_renewal: next,
        };
        self.sink.send_challenge(config.channel_id, &payload).await?;

        self.store
            .record_renewal(config.guild_id, &selection.challenge_id, now)
            .await?;

        Ok(RenewalReceipt {
            challenge: selection,
            next_renewal: next,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::daily_challenge::InMemoryChallengeConfigStore;
    use chrono::Duration;

    /// Sink that records every send and can be told to reject a channel.
    struct RecordingSink {
        sent: std::sync::Mutex<Vec<(u64, RenderedChallenge)>>,
        reject_channel: Option<u64>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                sent: std::sync::Mutex::new(Vec::new()),
                reject_channel: None,
            }
        }

        fn rejecting(channel_id: u64) -> Self {
            Self {
                sent: std::sync::Mutex::new(Vec::new()),
                reject_channel: Some(channel_id),
            }
        }

        fn sent_channels(&self) -> Vec<u64> {
            self.sent.lock().unwrap().iter().map(|(id, _)| *id).collect()
        }
    }

    #[async_trait]
    impl DeliverySink for RecordingSink {
        async fn send_challenge(
            &self,
            channel_id: u64,
            challenge: &RenderedChallenge,
        ) -> Result<(), DeliveryError> {
            if self.reject_channel == Some(channel_id) {
                return Err(DeliveryError::ChannelNotFound(channel_id));
            }
            self.sent
                .lock()
                .unwrap()
                .push((channel_id, challenge.clone()));
            Ok(())
        }
    }

    fn scheduler_with(
        store: Arc<InMemoryChallengeConfigStore>,
        sink: Arc<RecordingSink>,
    ) -> Arc<ChallengeScheduler<InMemoryChallengeConfigStore, RecordingSink>> {
        Arc::new(ChallengeScheduler::new(store, sink))
    }

    async fn seed(
        store: &InMemoryChallengeConfigStore,
        guild_id: u64,
        channel_id: u64,
        frequency: RenewalFrequency,
        last_renewal: Option<DateTime<Utc>>,
    ) {
        let mut config = GuildChallengeConfig::new(guild_id, channel_id, frequency, None);
        config.last_renewal = last_renewal;
        store.save_config(config).await.unwrap();
    }

    #[tokio::test]
    async fn start_before_initialize_is_a_configuration_error() {
        let scheduler = scheduler_with(
            Arc::new(InMemoryChallengeConfigStore::new()),
            Arc::new(RecordingSink::new()),
        );
        assert!(matches!(
            Arc::clone(&scheduler).start().await,
            Err(SchedulerError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn initialize_twice_is_an_idempotent_no_op() {
        let scheduler = scheduler_with(
            Arc::new(InMemoryChallengeConfigStore::new()),
            Arc::new(RecordingSink::new()),
        );
        scheduler.initialize().await;
        scheduler.initialize().await;

        let status = scheduler.status().await;
        assert!(status.initialized);
        assert!(status.tasks.values().all(|t| t.scheduled && !t.running));
    }

    #[tokio::test]
    async fn start_and_stop_flip_the_running_flags() {
        let scheduler = scheduler_with(
            Arc::new(InMemoryChallengeConfigStore::new()),
            Arc::new(RecordingSink::new()),
        );
        scheduler.initialize().await;
        Arc::clone(&scheduler).start().await.unwrap();

        let status = scheduler.status().await;
        assert_eq!(status.tasks.len(), TIERS.len());
        assert!(status.tasks.values().all(|t| t.running));

        scheduler.stop().await;
        let status = scheduler.status().await;
        assert!(status.tasks.values().all(|t| !t.running));
        // Stopping again must be harmless.
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn successful_renewal_advances_last_renewal_monotonically() {
        let store = Arc::new(InMemoryChallengeConfigStore::new());
        let sink = Arc::new(RecordingSink::new());
        let previous = Utc::now() - Duration::minutes(90);
        seed(&store, 1, 10, RenewalFrequency::Hourly, Some(previous)).await;

        let scheduler = scheduler_with(Arc::clone(&store), Arc::clone(&sink));
        scheduler.run_content_tick(RenewalFrequency::Hourly).await;

        assert_eq!(sink.sent_channels(), vec![10]);
        let config = store.get_config(1).await.unwrap().unwrap();
        let renewed_at = config.last_renewal.unwrap();
        assert!(renewed_at > previous);
        assert!(config.last_challenge_id.is_some());
    }

    #[tokio::test]
    async fn failed_delivery_leaves_the_config_untouched() {
        let store = Arc::new(InMemoryChallengeConfigStore::new());
        let sink = Arc::new(RecordingSink::rejecting(10));
        let previous = Utc::now() - Duration::hours(2);
        seed(&store, 1, 10, RenewalFrequency::Hourly, Some(previous)).await;

        let scheduler = scheduler_with(Arc::clone(&store), sink);
        scheduler.run_content_tick(RenewalFrequency::Hourly).await;

        let config = store.get_config(1).await.unwrap().unwrap();
        assert_eq!(config.last_renewal, Some(previous));
        assert!(config.last_challenge_id.is_none());
    }

    #[tokio::test]
    async fn one_failing_guild_does_not_abort_the_batch() {
        let store = Arc::new(InMemoryChallengeConfigStore::new());
        // Guild 1's channel rejects sends; guild 2's works.
        let sink = Arc::new(RecordingSink::rejecting(10));
        seed(&store, 1, 10, RenewalFrequency::Hourly, None).await;
        seed(&store, 2, 20, RenewalFrequency::Hourly, None).await;

        let scheduler = scheduler_with(Arc::clone(&store), Arc::clone(&sink));
        scheduler.run_content_tick(RenewalFrequency::Hourly).await;

        assert_eq!(sink.sent_channels(), vec![20]);
        assert!(store
            .get_config(2)
            .await
            .unwrap()
            .unwrap()
            .last_renewal
            .is_some());
        assert!(store
            .get_config(1)
            .await
            .unwrap()
            .unwrap()
            .last_renewal
            .is_none());
    }

    #[tokio::test]
    async fn ineligible_and_disabled_guilds_are_skipped() {
        let store = Arc::new(InMemoryChallengeConfigStore::new());
        let sink = Arc::new(RecordingSink::new());
        // Renewed 10 minutes ago: not yet due on the hourly tier.
        seed(
            &store,
            1,
            10,
            RenewalFrequency::Hourly,
            Some(Utc::now() - Duration::minutes(10)),
        )
        .await;
        seed(&store, 2, 20, RenewalFrequency::Hourly, None).await;
        store.set_enabled(2, false).await.unwrap();

        let scheduler = scheduler_with(Arc::clone(&store), Arc::clone(&sink));
        scheduler.run_content_tick(RenewalFrequency::Hourly).await;

        assert!(sink.sent_channels().is_empty());
    }

    #[tokio::test]
    async fn manual_renewal_requires_a_config() {
        let scheduler = scheduler_with(
            Arc::new(InMemoryChallengeConfigStore::new()),
            Arc::new(RecordingSink::new()),
        );
        assert!(matches!(
            scheduler.manual_renewal(7).await,
            Err(SchedulerError::NotConfigured(7))
        ));
    }

    #[tokio::test]
    async fn manual_renewal_bypasses_eligibility_and_propagates_errors() {
        let store = Arc::new(InMemoryChallengeConfigStore::new());
        let sink = Arc::new(RecordingSink::new());
        // Renewed moments ago: the scheduled path would skip this guild.
        seed(
            &store,
            1,
            10,
            RenewalFrequency::Every12Hours,
            Some(Utc::now()),
        )
        .await;

        let scheduler = scheduler_with(Arc::clone(&store), Arc::clone(&sink));
        let receipt = scheduler.manual_renewal(1).await.unwrap();
        assert!(!receipt.challenge.challenge_id.is_empty());
        assert_eq!(sink.sent_channels(), vec![10]);

        // And with a rejecting sink the error reaches the operator.
        let store = Arc::new(InMemoryChallengeConfigStore::new());
        seed(&store, 1, 10, RenewalFrequency::Hourly, None).await;
        let scheduler = scheduler_with(store, Arc::new(RecordingSink::rejecting(10)));
        assert!(matches!(
            scheduler.manual_renewal(1).await,
            Err(SchedulerError::Delivery(DeliveryError::ChannelNotFound(10)))
        ));
    }

    #[tokio::test]
    async fn consecutive_renewals_avoid_the_previous_category() {
        let store = Arc::new(InMemoryChallengeConfigStore::new());
        let sink = Arc::new(RecordingSink::new());
        seed(&store, 1, 10, RenewalFrequency::Hourly, None).await;
        let scheduler = scheduler_with(Arc::clone(&store), sink);

        let mut previous: Option<String> = None;
        for _ in 0..20 {
            let receipt = scheduler.manual_renewal(1).await.unwrap();
            let key = receipt.challenge.category_key.to_string();
            if let Some(prev) = &previous {
                assert_ne!(&key, prev, "immediate category repeat");
            }
            previous = Some(key);
        }
    }

    #[tokio::test]
    async fn cleanup_tick_prunes_history_for_vanished_guilds() {
        let store = Arc::new(InMemoryChallengeConfigStore::new());
        let sink = Arc::new(RecordingSink::new());
        seed(&store, 1, 10, RenewalFrequency::Hourly, None).await;
        seed(&store, 2, 20, RenewalFrequency::Hourly, None).await;

        let scheduler = scheduler_with(Arc::clone(&store), sink);
        scheduler.manual_renewal(1).await.unwrap();
        scheduler.manual_renewal(2).await.unwrap();
        assert_eq!(scheduler.status().await.active_guilds, 2);

        store.delete_config(1).await.unwrap();
        scheduler.run_cleanup_tick().await;
        assert_eq!(scheduler.status().await.active_guilds, 1);
    }
}
