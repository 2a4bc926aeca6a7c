mod in_memory;
mod json_store;

pub use in_memory::InMemoryChallengeConfigStore;
pub use json_store::JsonChallengeConfigStore;
