// Verification quiz core: question bank, pending-challenge state machine,
// and guild-level outcome statistics.

mod verification_models;
mod verification_service;
mod verification_store;

pub use verification_models::{
    question, DayCounters, GuildVerificationStats, PendingVerification, TriviaQuestion,
    VerificationOutcome, QUESTION_BANK,
};
pub use verification_service::{
    AnswerReport, IssuedChallenge, VerificationError, VerificationService,
    CHALLENGE_TIMEOUT_SECS, STATS_RETENTION_DAYS,
};
pub use verification_store::{VerificationStore, VerificationStoreError};
