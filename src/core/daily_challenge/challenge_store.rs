use super::challenge_models::{GuildChallengeConfig, RenewalFrequency};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum ChallengeStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Config not found")]
    NotFound,
}

/// Port for persisting guild challenge configuration.
///
/// The core defines what it needs from storage; the infra layer provides the
/// JSON-file implementation (and an in-memory one for tests).
#[async_trait]
pub trait ChallengeConfigStore: Send + Sync {
    async fn get_config(
        &self,
        guild_id: u64,
    ) -> Result<Option<GuildChallengeConfig>, ChallengeStoreError>;

    /// Insert or replace a guild's configuration.
    async fn save_config(&self, config: GuildChallengeConfig) -> Result<(), ChallengeStoreError>;

    async fn delete_config(&self, guild_id: u64) -> Result<(), ChallengeStoreError>;

    async fn set_enabled(&self, guild_id: u64, enabled: bool) -> Result<(), ChallengeStoreError>;

    /// All enabled configs sitting on the given tier.
    async fn find_enabled(
        &self,
        frequency: RenewalFrequency,
    ) -> Result<Vec<GuildChallengeConfig>, ChallengeStoreError>;

    /// Guild ids with an enabled config on any tier. Used by the cleanup
    /// tier to prune in-memory selection history.
    async fn enabled_guild_ids(&self) -> Result<Vec<u64>, ChallengeStoreError>;

    /// Write-back after a successful delivery. Only touches
    /// `last_challenge_id` and `last_renewal`.
    async fn record_renewal(
        &self,
        guild_id: u64,
        challenge_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), ChallengeStoreError>;
}
