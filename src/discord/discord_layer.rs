// Discord layer - commands, delivery sink, and event glue.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "daily_challenge/sink.rs"]
pub mod challenge_sink;

// Re-export command types for convenience
pub use commands::daily_challenge::{Data, Error};
