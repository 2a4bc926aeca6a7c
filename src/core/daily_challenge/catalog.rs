// The static challenge catalog. Loaded once, immutable during execution.
// Category keys double as storage identifiers, so they must never contain
// ':' (the challenge-id separator).

pub struct ChallengeCategory {
    pub key: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub tasks: &'static [&'static str],
}

pub const CATEGORIES: &[ChallengeCategory] = &[
    ChallengeCategory {
        key: "photo",
        name: "Photo Evidence",
        icon: "📸",
        tasks: &[
            "Photograph the ghost during a manifestation event.",
            "Collect a 3-star photo of fingerprints on a door or light switch.",
            "Fill the journal with photos of dirty water, the bone, and the cursed possession in a single contract.",
            "Snap a photo of the ghost within five seconds of a hunt ending.",
        ],
    },
    ChallengeCategory {
        key: "survival",
        name: "Survival",
        icon: "💀",
        tasks: &[
            "Finish a contract on Nightmare difficulty with no deaths.",
            "Hide from three separate hunts in one investigation without using a locker or closet.",
            "Complete every objective after your sanity hits zero.",
            "Escape a hunt that starts while you are in the basement.",
        ],
    },
    ChallengeCategory {
        key: "cursed",
        name: "Cursed Possessions",
        icon: "🔮",
        tasks: &[
            "Identify the ghost after drawing the Death card from the Tarot deck.",
            "Use the Ouija board to locate the bone without asking about the ghost room.",
            "Light the Summoning Circle and survive the hunt it triggers.",
            "Look into the Haunted Mirror below 50% sanity and still finish all objectives.",
        ],
    },
    ChallengeCategory {
        key: "investigation",
        name: "Investigation",
        icon: "🕯️",
        tasks: &[
            "Identify the ghost correctly using only two pieces of evidence.",
            "Complete every optional objective on a medium or large map.",
            "Identify the ghost without ever switching on your flashlight.",
            "Get a spirit box response as your first piece of evidence.",
        ],
    },
    ChallengeCategory {
        key: "teamwork",
        name: "Teamwork",
        icon: "🤝",
        tasks: &[
            "Complete a four-player contract where nobody carries a flashlight.",
            "Finish a contract where one teammate never leaves the truck.",
            "Win a contract where only one player is allowed inside the ghost room.",
            "Have every player place at least one piece of starter equipment before the first hunt.",
        ],
    },
    ChallengeCategory {
        key: "speedrun",
        name: "Speedrun",
        icon: "⏱️",
        tasks: &[
            "Identify the ghost within five minutes of the van door opening.",
            "Complete all objectives on Tanglewood in under ten minutes.",
            "Grab the bone and a ghost photo before your first sanity pill.",
            "Finish a small-map contract before the first hunt can start.",
        ],
    },
];

/// Secondary pool for the one-in-three bonus augmentation.
pub const GHOST_POOL: &[&str] = &[
    "Spirit", "Wraith", "Phantom", "Poltergeist", "Banshee", "Jinn", "Mare", "Revenant", "Shade",
    "Demon", "Yurei", "Oni", "Yokai", "Hantu", "Goryo", "Myling", "Onryo", "The Twins", "Raiju",
    "Obake", "The Mimic", "Moroi", "Deogen", "Thaye",
];

pub fn category(key: &str) -> Option<&'static ChallengeCategory> {
    CATEGORIES.iter().find(|c| c.key == key)
}
