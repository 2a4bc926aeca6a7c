// Domain models for the rotating ghost-hunt challenge.
// No Discord types in here - the scheduler core works with primitive ids
// so it can be driven by tests as easily as by the gateway.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Hour of day (UTC) the daily tier fires at when the admin doesn't pick one.
pub const DEFAULT_DAILY_HOUR: u32 = 8;

/// One guild's challenge configuration.
///
/// The scheduler reads everything and writes back exactly two fields
/// (`last_renewal`, `last_challenge_id`) after a successful delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildChallengeConfig {
    pub guild_id: u64,
    pub channel_id: u64,
    pub enabled: bool,
    pub frequency: RenewalFrequency,
    /// 0-23, only meaningful when `frequency` is `Daily`.
    pub custom_hour: u32,
    pub last_renewal: Option<DateTime<Utc>>,
    /// Id of the most recently sent challenge (`{category}:{unix_ts}` plus an
    /// optional `:bonus` suffix). Used to avoid immediate repeats.
    pub last_challenge_id: Option<String>,
}

impl GuildChallengeConfig {
    pub fn new(
        guild_id: u64,
        channel_id: u64,
        frequency: RenewalFrequency,
        custom_hour: Option<u32>,
    ) -> Self {
        Self {
            guild_id,
            channel_id,
            enabled: true,
            frequency,
            custom_hour: custom_hour.unwrap_or(DEFAULT_DAILY_HOUR),
            last_renewal: None,
            last_challenge_id: None,
        }
    }
}

/// The five renewal tiers a guild can sit on. Each guild belongs to exactly
/// one tier, so no two scheduler ticks ever touch the same config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenewalFrequency {
    Hourly,
    Every3Hours,
    Every6Hours,
    Every12Hours,
    Daily,
}

impl RenewalFrequency {
    pub const ALL: [RenewalFrequency; 5] = [
        RenewalFrequency::Hourly,
        RenewalFrequency::Every3Hours,
        RenewalFrequency::Every6Hours,
        RenewalFrequency::Every12Hours,
        RenewalFrequency::Daily,
    ];

    /// Fixed renewal interval, or `None` for the daily tier, which renews on
    /// a wall-clock hour instead of an elapsed duration.
    pub fn interval(self) -> Option<Duration> {
        match self {
            RenewalFrequency::Hourly => Some(Duration::hours(1)),
            RenewalFrequency::Every3Hours => Some(Duration::hours(3)),
            RenewalFrequency::Every6Hours => Some(Duration::hours(6)),
            RenewalFrequency::Every12Hours => Some(Duration::hours(12)),
            RenewalFrequency::Daily => None,
        }
    }

    /// Storage code, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            RenewalFrequency::Hourly => "hourly",
            RenewalFrequency::Every3Hours => "every3hours",
            RenewalFrequency::Every6Hours => "every6hours",
            RenewalFrequency::Every12Hours => "every12hours",
            RenewalFrequency::Daily => "daily",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_str() == value)
    }

    /// Human label used in embeds and status output.
    pub fn label(self) -> &'static str {
        match self {
            RenewalFrequency::Hourly => "Every hour",
            RenewalFrequency::Every3Hours => "Every 3 hours",
            RenewalFrequency::Every6Hours => "Every 6 hours",
            RenewalFrequency::Every12Hours => "Every 12 hours",
            RenewalFrequency::Daily => "Once a day",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_codec_roundtrips() {
        for frequency in RenewalFrequency::ALL {
            assert_eq!(RenewalFrequency::parse(frequency.as_str()), Some(frequency));
        }
        assert_eq!(RenewalFrequency::parse("weekly"), None);
    }

    #[test]
    fn serde_representation_matches_storage_code() {
        for frequency in RenewalFrequency::ALL {
            let json = serde_json::to_string(&frequency).unwrap();
            assert_eq!(json, format!("\"{}\"", frequency.as_str()));
        }
    }

    #[test]
    fn new_config_defaults() {
        let config = GuildChallengeConfig::new(1, 2, RenewalFrequency::Daily, None);
        assert!(config.enabled);
        assert_eq!(config.custom_hour, DEFAULT_DAILY_HOUR);
        assert!(config.last_renewal.is_none());
        assert!(config.last_challenge_id.is_none());

        let config = GuildChallengeConfig::new(1, 2, RenewalFrequency::Daily, Some(20));
        assert_eq!(config.custom_hour, 20);
    }

    #[test]
    fn only_daily_lacks_a_fixed_interval() {
        for frequency in RenewalFrequency::ALL {
            match frequency {
                RenewalFrequency::Daily => assert!(frequency.interval().is_none()),
                _ => assert!(frequency.interval().is_some()),
            }
        }
    }
}
