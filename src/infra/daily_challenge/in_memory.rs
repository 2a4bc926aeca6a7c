// In-memory implementation of the challenge config store. Used by the
// scheduler tests; nothing here survives a restart.

use crate::core::daily_challenge::{
    ChallengeConfigStore, ChallengeStoreError, GuildChallengeConfig, RenewalFrequency,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

#[allow(dead_code)]
pub struct InMemoryChallengeConfigStore {
    data: DashMap<u64, GuildChallengeConfig>,
}

#[allow(dead_code)]
impl InMemoryChallengeConfigStore {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }
}

impl Default for InMemoryChallengeConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChallengeConfigStore for InMemoryChallengeConfigStore {
    async fn get_config(
        &self,
        guild_id: u64,
    ) -> Result<Option<GuildChallengeConfig>, ChallengeStoreError> {
        Ok(self.data.get(&guild_id).map(|entry| entry.value().clone()))
    }

    async fn save_config(&self, config: GuildChallengeConfig) -> Result<(), ChallengeStoreError> {
        self.data.insert(config.guild_id, config);
        Ok(())
    }

    async fn delete_config(&self, guild_id: u64) -> Result<(), ChallengeStoreError> {
        match self.data.remove(&guild_id) {
            Some(_) => Ok(()),
            None => Err(ChallengeStoreError::NotFound),
        }
    }

    async fn set_enabled(&self, guild_id: u64, enabled: bool) -> Result<(), ChallengeStoreError> {
        match self.data.get_mut(&guild_id) {
            Some(mut entry) => {
                entry.enabled = enabled;
                Ok(())
            }
            None => Err(ChallengeStoreError::NotFound),
        }
    }

    async fn find_enabled(
        &self,
        frequency: RenewalFrequency,
    ) -> Result<Vec<GuildChallengeConfig>, ChallengeStoreError> {
        Ok(self
            .data
            .iter()
            .filter(|entry| entry.enabled && entry.frequency == frequency)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn enabled_guild_ids(&self) -> Result<Vec<u64>, ChallengeStoreError> {
        Ok(self
            .data
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| entry.guild_id)
            .collect())
    }

    async fn record_renewal(
        &self,
        guild_id: u64,
        challenge_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), ChallengeStoreError> {
        match self.data.get_mut(&guild_id) {
            Some(mut entry) => {
                entry.last_challenge_id = Some(challenge_id.to_string());
                entry.last_renewal = Some(at);
                Ok(())
            }
            None => Err(ChallengeStoreError::NotFound),
        }
    }
}
