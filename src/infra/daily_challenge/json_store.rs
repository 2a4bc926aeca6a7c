use crate::core::daily_challenge::{
    ChallengeConfigStore, ChallengeStoreError, GuildChallengeConfig, RenewalFrequency,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// JSON-file backed config store. The whole map lives in memory behind an
/// RwLock and is rewritten on every mutation; guild counts are small enough
/// that this stays cheap.
pub struct JsonChallengeConfigStore {
    path: PathBuf,
    cache: RwLock<HashMap<u64, GuildChallengeConfig>>,
}

impl JsonChallengeConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cache = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), error = %err, "challenge config file unreadable, starting empty");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };

        Self {
            path,
            cache: RwLock::new(cache),
        }
    }

    async fn persist(&self) -> Result<(), ChallengeStoreError> {
        let cache = self.cache.read().await;
        let file = std::fs::File::create(&self.path)?;
        serde_json::to_writer_pretty(file, &*cache)?;
        Ok(())
    }
}

#[async_trait]
impl ChallengeConfigStore for JsonChallengeConfigStore {
    async fn get_config(
        &self,
        guild_id: u64,
    ) -> Result<Option<GuildChallengeConfig>, ChallengeStoreError> {
        let cache = self.cache.read().await;
        Ok(cache.get(&guild_id).cloned())
    }

    async fn save_config(&self, config: GuildChallengeConfig) -> Result<(), ChallengeStoreError> {
        let mut cache = self.cache.write().await;
        cache.insert(config.guild_id, config);
        drop(cache); // Release lock before persisting
        self.persist().await
    }

    async fn delete_config(&self, guild_id: u64) -> Result<(), ChallengeStoreError> {
        let mut cache = self.cache.write().await;
        let existed = cache.remove(&guild_id).is_some();
        drop(cache);
        if !existed {
            return Err(ChallengeStoreError::NotFound);
        }

        self.persist().await
    }

    async fn set_enabled(&self, guild_id: u64, enabled: bool) -> Result<(), ChallengeStoreError> {
        let mut cache = self.cache.write().await;
        match cache.get_mut(&guild_id) {
            Some(config) => config.enabled = enabled,
            None => return Err(ChallengeStoreError::NotFound),
        }
        drop(cache);
        self.persist().await
    }

    async fn find_enabled(
        &self,
        frequency: RenewalFrequency,
    ) -> Result<Vec<GuildChallengeConfig>, ChallengeStoreError> {
        let cache = self.cache.read().await;
        Ok(cache
            .values()
            .filter(|config| config.enabled && config.frequency == frequency)
            .cloned()
            .collect())
    }

    async fn enabled_guild_ids(&self) -> Result<Vec<u64>, ChallengeStoreError> {
        let cache = self.cache.read().await;
        Ok(cache
            .values()
            .filter(|config| config.enabled)
            .map(|config| config.guild_id)
            .collect())
    }

    async fn record_renewal(
        &self,
        guild_id: u64,
        challenge_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), ChallengeStoreError> {
        let mut cache = self.cache.write().await;
        match cache.get_mut(&guild_id) {
            Some(config) => {
                config.last_challenge_id = Some(challenge_id.to_string());
                config.last_renewal = Some(at);
            }
            None => return Err(ChallengeStoreError::NotFound),
        }
        drop(cache);
        self.persist().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn configs_survive_a_reload() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_owned();
        drop(tmp);

        let store = JsonChallengeConfigStore::new(path.clone());
        store
            .save_config(GuildChallengeConfig::new(
                5,
                99,
                RenewalFrequency::Every6Hours,
                None,
            ))
            .await
            .unwrap();
        let at = Utc::now();
        store.record_renewal(5, "survival:1700000000", at).await.unwrap();

        // Reload from file
        let store2 = JsonChallengeConfigStore::new(path);
        let config = store2.get_config(5).await.unwrap().unwrap();
        assert_eq!(config.channel_id, 99);
        assert_eq!(config.frequency, RenewalFrequency::Every6Hours);
        assert_eq!(config.last_challenge_id.as_deref(), Some("survival:1700000000"));
        assert_eq!(config.last_renewal, Some(at));
    }

    #[tokio::test]
    async fn find_enabled_filters_on_tier_and_flag() {
        let tmp = NamedTempFile::new().unwrap();
        let store = JsonChallengeConfigStore::new(tmp.path().to_owned());

        store
            .save_config(GuildChallengeConfig::new(1, 10, RenewalFrequency::Hourly, None))
            .await
            .unwrap();
        store
            .save_config(GuildChallengeConfig::new(2, 20, RenewalFrequency::Hourly, None))
            .await
            .unwrap();
        store
            .save_config(GuildChallengeConfig::new(3, 30, RenewalFrequency::Daily, None))
            .await
            .unwrap();
        store.set_enabled(2, false).await.unwrap();

        let hourly = store.find_enabled(RenewalFrequency::Hourly).await.unwrap();
        assert_eq!(hourly.len(), 1);
        assert_eq!(hourly[0].guild_id, 1);

        let mut ids = store.enabled_guild_ids().await.unwrap();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn missing_guild_is_not_found() {
        let tmp = NamedTempFile::new().unwrap();
        let store = JsonChallengeConfigStore::new(tmp.path().to_owned());

        assert!(matches!(
            store.delete_config(404).await,
            Err(ChallengeStoreError::NotFound)
        ));
        assert!(matches!(
            store.record_renewal(404, "photo:1", Utc::now()).await,
            Err(ChallengeStoreError::NotFound)
        ));
        assert!(store.get_config(404).await.unwrap().is_none());
    }
}
