// Eligibility and boundary math for the renewal scheduler.
// Pure functions of (config, now) - no side effects, so the timing rules
// can be tested without timers or storage.

use super::challenge_models::{GuildChallengeConfig, RenewalFrequency};
use chrono::{DateTime, Duration, Timelike, Utc};

/// Whether a guild is due for a new challenge at `now`.
///
/// Fixed tiers are due once the tier interval has elapsed since the last
/// renewal. The daily tier instead requires the current hour to match the
/// configured hour AND the last renewal to fall on an earlier calendar
/// date - the date check is what stops a second send when a tick fires
/// twice inside the target hour.
pub fn is_eligible(config: &GuildChallengeConfig, now: DateTime<Utc>) -> bool {
    let last = match config.last_renewal {
        None => return true,
        Some(last) => last,
    };

    match config.frequency.interval() {
        Some(interval) => now.signed_duration_since(last) >= interval,
        None => now.hour() == config.custom_hour && last.date_naive() < now.date_naive(),
    }
}

/// The next renewal boundary after `now`: hour-aligned for the fixed tiers,
/// next day at `custom_hour` for daily. Shown to users as the "next
/// challenge" timestamp right after a send.
pub fn next_renewal(
    frequency: RenewalFrequency,
    custom_hour: u32,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    match frequency.interval() {
        Some(interval) => {
            let aligned = now
                .date_naive()
                .and_hms_opt(now.hour(), 0, 0)
                .map(|dt| dt.and_utc())
                .unwrap_or(now);
            aligned + interval
        }
        None => now
            .date_naive()
            .succ_opt()
            .and_then(|date| date.and_hms_opt(custom_hour.min(23), 0, 0))
            .map(|dt| dt.and_utc())
            .unwrap_or_else(|| now + Duration::days(1)),
    }
}
