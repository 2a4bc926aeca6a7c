use chrono::{DateTime, NaiveDate, Utc};

/// A trivia question from the static bank. Four options, one correct.
pub struct TriviaQuestion {
    pub id: &'static str,
    pub prompt: &'static str,
    pub options: [&'static str; 4],
    pub correct_index: usize,
}

pub const QUESTION_BANK: &[TriviaQuestion] = &[
    TriviaQuestion {
        id: "obake-prints",
        prompt: "Which ghost can leave six-fingered handprints?",
        options: ["Spirit", "Obake", "Wraith", "Myling"],
        correct_index: 1,
    },
    TriviaQuestion {
        id: "wraith-salt",
        prompt: "Which ghost never steps in salt?",
        options: ["Wraith", "Phantom", "Banshee", "Jinn"],
        correct_index: 0,
    },
    TriviaQuestion {
        id: "hantu-cold",
        prompt: "Which ghost moves faster the colder the room gets?",
        options: ["Mare", "Revenant", "Hantu", "Onryo"],
        correct_index: 2,
    },
    TriviaQuestion {
        id: "banshee-target",
        prompt: "Which ghost singles out one player and hunts only them?",
        options: ["Demon", "Banshee", "Yurei", "Shade"],
        correct_index: 1,
    },
    TriviaQuestion {
        id: "deogen-spiritbox",
        prompt: "Which ghost always answers the spirit box when you stand right next to it?",
        options: ["Deogen", "Moroi", "Myling", "Spirit"],
        correct_index: 0,
    },
    TriviaQuestion {
        id: "mirror-room",
        prompt: "Which cursed possession shows you the ghost room at the cost of sanity?",
        options: ["Ouija Board", "Haunted Mirror", "Voodoo Doll", "Music Box"],
        correct_index: 1,
    },
    TriviaQuestion {
        id: "phantom-photo",
        prompt: "Taking a photo of which ghost makes it briefly vanish?",
        options: ["Goryo", "Yokai", "Phantom", "Oni"],
        correct_index: 2,
    },
    TriviaQuestion {
        id: "yokai-voices",
        prompt: "Which ghost gets more aggressive when players talk near it?",
        options: ["Yokai", "Mare", "Thaye", "Raiju"],
        correct_index: 0,
    },
    TriviaQuestion {
        id: "mare-dark",
        prompt: "Which ghost prefers to attack with the lights off?",
        options: ["Jinn", "Mare", "Hantu", "The Twins"],
        correct_index: 1,
    },
    TriviaQuestion {
        id: "freezing-tool",
        prompt: "Which tool confirms freezing temperatures?",
        options: ["EMF Reader", "Parabolic Microphone", "Thermometer", "DOTS Projector"],
        correct_index: 2,
    },
    TriviaQuestion {
        id: "thaye-age",
        prompt: "Which ghost grows slower and less active the longer the contract runs?",
        options: ["Revenant", "Obake", "Moroi", "Thaye"],
        correct_index: 3,
    },
    TriviaQuestion {
        id: "crucifix-use",
        prompt: "Which item prevents a hunt from starting when placed near the ghost?",
        options: ["Crucifix", "Smudge Sticks", "Salt", "Sanity Medication"],
        correct_index: 0,
    },
];

pub fn question(id: &str) -> Option<&'static TriviaQuestion> {
    QUESTION_BANK.iter().find(|q| q.id == id)
}

/// One user's in-flight quiz. At most one of these exists per (guild, user);
/// the store enforces it with its primary key.
#[derive(Debug, Clone)]
pub struct PendingVerification {
    pub user_id: u64,
    pub guild_id: u64,
    pub question_id: String,
    pub correct_index: usize,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Passed,
    Failed,
    TimedOut,
}

/// Counters for one calendar date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayCounters {
    pub passed: u32,
    pub failed: u32,
    pub timed_out: u32,
}

/// Aggregate view over the retained window, oldest day first.
#[derive(Debug, Clone, Default)]
pub struct GuildVerificationStats {
    pub passed: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub daily: Vec<(NaiveDate, DayCounters)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn question_bank_is_well_formed() {
        assert!(QUESTION_BANK.len() >= 10);
        let mut ids = HashSet::new();
        for q in QUESTION_BANK {
            assert!(ids.insert(q.id), "duplicate question id {}", q.id);
            assert!(q.correct_index < q.options.len(), "{} out of range", q.id);
            assert!(!q.prompt.is_empty());
        }
    }

    #[test]
    fn question_lookup() {
        assert!(question("wraith-salt").is_some());
        assert!(question("nope").is_none());
    }
}
