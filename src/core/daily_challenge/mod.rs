// Rotating ghost-hunt challenge core: catalog, anti-repetition selection,
// eligibility math, and the tier scheduler.

mod catalog;
mod challenge_models;
mod challenge_store;
mod schedule;
mod scheduler_service;
mod selector;

pub use catalog::{category, ChallengeCategory, CATEGORIES, GHOST_POOL};
pub use challenge_models::{GuildChallengeConfig, RenewalFrequency, DEFAULT_DAILY_HOUR};
pub use challenge_store::{ChallengeConfigStore, ChallengeStoreError};
pub use schedule::{is_eligible, next_renewal};
pub use scheduler_service::{
    ChallengeScheduler, DeliveryError, DeliverySink, RenderedChallenge, RenewalReceipt,
    SchedulerError, SchedulerStatus, TaskStatus,
};
pub use selector::{category_key_of, ChallengeSelector, SelectedChallenge};
