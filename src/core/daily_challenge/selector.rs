// Anti-repetition challenge selection.
//
// The selector owns the per-guild history of recently used categories. The
// history is process-local on purpose: losing it on restart only weakens
// short-term repetition avoidance, never correctness.

use super::catalog::{ChallengeCategory, CATEGORIES, GHOST_POOL};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Roughly one renewal in three carries a bonus ghost clause.
const BONUS_ONE_IN: u32 = 3;

/// A fully rendered pick: text plus the category metadata the discord layer
/// needs for display, and the id stored as the guild's `last_challenge_id`.
#[derive(Debug, Clone)]
pub struct SelectedChallenge {
    pub category_key: &'static str,
    pub category_name: &'static str,
    pub icon: &'static str,
    pub text: String,
    pub bonus_ghost: Option<&'static str>,
    pub challenge_id: String,
}

/// Extracts the category key embedded in a stored challenge id.
pub fn category_key_of(challenge_id: &str) -> Option<&str> {
    challenge_id.split(':').next().filter(|key| !key.is_empty())
}

pub struct ChallengeSelector {
    catalog: &'static [ChallengeCategory],
    used: HashMap<u64, HashSet<&'static str>>,
}

impl ChallengeSelector {
    pub fn new() -> Self {
        Self::with_catalog(CATEGORIES)
    }

    /// Mainly for tests, which exercise small catalogs (down to one entry).
    pub fn with_catalog(catalog: &'static [ChallengeCategory]) -> Self {
        debug_assert!(!catalog.is_empty());
        Self {
            catalog,
            used: HashMap::new(),
        }
    }

    /// Pick a category and task for a guild, avoiding the categories in the
    /// guild's history and the category of the last sent challenge.
    ///
    /// Never fails: once the history covers the whole catalog it is cleared,
    /// and if the exclusions still empty the available set (tiny catalogs),
    /// the pick falls back to the full catalog. Novelty yields to progress.
    pub fn select<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        guild_id: u64,
        last_challenge_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> SelectedChallenge {
        let catalog = self.catalog;
        let used = self.used.entry(guild_id).or_default();
        if used.len() >= catalog.len() {
            used.clear();
        }

        let last_category = last_challenge_id.and_then(category_key_of);
        let available: Vec<&'static ChallengeCategory> = catalog
            .iter()
            .filter(|c| !used.contains(c.key) && Some(c.key) != last_category)
            .collect();
        let pool: Vec<&'static ChallengeCategory> = if available.is_empty() {
            catalog.iter().collect()
        } else {
            available
        };

        let category = pool.choose(rng).copied().unwrap_or(&catalog[0]);
        let task = category.tasks.choose(rng).copied().unwrap_or_default();
        used.insert(category.key);

        let bonus_ghost = if !GHOST_POOL.is_empty() && rng.gen_range(0..BONUS_ONE_IN) == 0 {
            GHOST_POOL.choose(rng).copied()
        } else {
            None
        };

        let mut text = task.to_string();
        let mut challenge_id = format!("{}:{}", category.key, now.timestamp());
        if let Some(ghost) = bonus_ghost {
            text.push_str(&format!(
                "\n**Bonus:** pull it off on a contract where the ghost turns out to be a {}.",
                ghost
            ));
            challenge_id.push_str(":bonus");
        }

        SelectedChallenge {
            category_key: category.key,
            category_name: category.name,
            icon: category.icon,
            text,
            bonus_ghost,
            challenge_id,
        }
    }

    /// Number of guilds with in-memory history. Operational signal only.
    pub fn tracked_guilds(&self) -> usize {
        self.used.len()
    }

    /// Drops history for guilds not in `keep`. Returns how many were pruned.
    pub fn retain_guilds(&mut self, keep: &HashSet<u64>) -> usize {
        let before = self.used.len();
        self.used.retain(|guild_id, _| keep.contains(guild_id));
        before - self.used.len()
    }

    #[cfg(test)]
    fn mark_used(&mut self, guild_id: u64, key: &'static str) {
        self.used.entry(guild_id).or_default().insert(key);
    }
}

impl Default for ChallengeSelector {
    fn default() -> Self {
        Self::new()
    }
}
