// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (databases, files)
// - `discord/` = Discord-specific adapters (commands, delivery sink)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Start the challenge scheduler

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::daily_challenge::ChallengeScheduler;
use crate::core::verification::VerificationService;
use crate::discord::challenge_sink::SerenityDeliverySink;
use crate::discord::commands::presence;
use crate::discord::Data;
use crate::infra::daily_challenge::JsonChallengeConfigStore;
use crate::infra::verification::SqliteVerificationStore;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Get Discord bot token from environment
    let token = std::env::var("DISCORD_TOKEN").expect(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    );

    // Keep runtime data in a dedicated folder so the repo root stays tidy.
    let data_dir = "data";
    std::fs::create_dir_all(data_dir).expect("Failed to create data directory");

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let challenge_store = Arc::new(JsonChallengeConfigStore::new(format!(
        "{}/challenge_configs.json",
        data_dir
    )));

    let verification_store = SqliteVerificationStore::new(&format!("{}/verification.db", data_dir))
        .await
        .expect("Failed to initialize verification store");
    let verification = Arc::new(VerificationService::new(verification_store));

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================
    // Slash commands only - no message content access needed.

    let intents = serenity::GatewayIntents::GUILDS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                discord::commands::daily_challenge::dailychallenge(),
                discord::commands::verification::ghostquiz(),
            ],
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                tracing::info!("registering slash commands");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                presence::on_ready(ctx);

                // The delivery sink needs the gateway's HTTP handle, so the
                // scheduler gets wired up here rather than before the client
                // is built.
                let sink = Arc::new(SerenityDeliverySink::new(ctx.http.clone()));
                let challenges = Arc::new(ChallengeScheduler::new(
                    Arc::clone(&challenge_store),
                    sink,
                ));
                challenges.initialize().await;
                Arc::clone(&challenges).start().await?;

                tracing::info!("phasmobot is ready");
                Ok(Data {
                    challenges,
                    challenge_store,
                    verification,
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .expect("Error creating client");

    client.start().await.expect("Error running bot");
}
