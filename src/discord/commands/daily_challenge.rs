// Discord commands for the rotating challenge.
//
// The pattern, as everywhere in this layer:
// 1. Extract primitive data from Discord types
// 2. Call the core service
// 3. Format the response based on the result

use crate::core::daily_challenge::{
    category, category_key_of, ChallengeConfigStore, ChallengeScheduler, ChallengeStoreError,
    GuildChallengeConfig, RenewalFrequency, SchedulerError,
};
use crate::core::verification::VerificationService;
use crate::discord::challenge_sink::SerenityDeliverySink;
use crate::infra::daily_challenge::JsonChallengeConfigStore;
use crate::infra::verification::SqliteVerificationStore;
use poise::serenity_prelude::{self as serenity, Mentionable};
use std::sync::Arc;

/// Type alias for our bot's context.
/// This is what every command receives as its first parameter.
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Data that's shared across all commands.
pub struct Data {
    pub challenges: Arc<ChallengeScheduler<JsonChallengeConfigStore, SerenityDeliverySink>>,
    pub challenge_store: Arc<JsonChallengeConfigStore>,
    pub verification: Arc<VerificationService<SqliteVerificationStore>>,
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum FrequencyChoice {
    #[name = "Every hour"]
    Hourly,
    #[name = "Every 3 hours"]
    Every3Hours,
    #[name = "Every 6 hours"]
    Every6Hours,
    #[name = "Every 12 hours"]
    Every12Hours,
    #[name = "Once a day"]
    Daily,
}

impl From<FrequencyChoice> for RenewalFrequency {
    fn from(value: FrequencyChoice) -> Self {
        match value {
            FrequencyChoice::Hourly => RenewalFrequency::Hourly,
            FrequencyChoice::Every3Hours => RenewalFrequency::Every3Hours,
            FrequencyChoice::Every6Hours => RenewalFrequency::Every6Hours,
            FrequencyChoice::Every12Hours => RenewalFrequency::Every12Hours,
            FrequencyChoice::Daily => RenewalFrequency::Daily,
        }
    }
}

/// Manage the rotating ghost-hunt challenge for this server
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "ADMINISTRATOR",
    subcommands("setup", "enable", "disable", "renew", "status")
)]
pub async fn dailychallenge(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Pick the channel and cadence for challenge announcements
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn setup(
    ctx: Context<'_>,
    #[description = "Channel to post challenges in"] channel: serenity::GuildChannel,
    #[description = "How often to rotate"] frequency: FrequencyChoice,
    #[description = "Hour of day (0-23 UTC) for the daily cadence"] hour: Option<u32>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    if let Some(hour) = hour {
        if hour > 23 {
            ctx.say("❌ The hour must be between 0 and 23 (UTC).").await?;
            return Ok(());
        }
    }

    let frequency: RenewalFrequency = frequency.into();
    let config = GuildChallengeConfig::new(guild_id, channel.id.get(), frequency, hour);
    let custom_hour = config.custom_hour;
    ctx.data().challenge_store.save_config(config).await?;

    let mut lines = vec![
        format!("Challenges will rotate in {}.", channel.mention()),
        format!("Cadence: **{}**.", frequency.label()),
    ];
    if frequency == RenewalFrequency::Daily {
        lines.push(format!("Posting at **{:02}:00 UTC** each day.", custom_hour));
    }
    lines.push("The first challenge goes out on the next scheduler pass.".to_string());

    let embed = serenity::CreateEmbed::new()
        .title("👻 Daily challenge configured")
        .description(lines.join("\n"))
        .color(0x6a0dad);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

/// Resume challenge announcements
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn enable(ctx: Context<'_>) -> Result<(), Error> {
    set_enabled(ctx, true).await
}

/// Pause challenge announcements without losing the configuration
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn disable(ctx: Context<'_>) -> Result<(), Error> {
    set_enabled(ctx, false).await
}

async fn set_enabled(ctx: Context<'_>, enabled: bool) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    match ctx.data().challenge_store.set_enabled(guild_id, enabled).await {
        Ok(()) => {
            let verb = if enabled { "enabled" } else { "paused" };
            ctx.say(format!("✅ Challenge announcements {verb}.")).await?;
        }
        Err(ChallengeStoreError::NotFound) => {
            ctx.say("❌ No challenge configuration yet. Run `/dailychallenge setup` first.")
                .await?;
        }
        Err(err) => return Err(err.into()),
    }

    Ok(())
}

/// Post a fresh challenge right now, skipping the schedule
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn renew(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    ctx.defer_ephemeral().await?;

    // Unlike the scheduled path, failures here are shown to the operator.
    match ctx.data().challenges.manual_renewal(guild_id).await {
        Ok(receipt) => {
            ctx.say(format!(
                "✅ Sent a fresh {} **{}** challenge. Next scheduled one lands <t:{}:R>.",
                receipt.challenge.icon,
                receipt.challenge.category_name,
                receipt.next_renewal.timestamp(),
            ))
            .await?;
        }
        Err(SchedulerError::NotConfigured(_)) => {
            ctx.say("❌ No challenge configuration yet. Run `/dailychallenge setup` first.")
                .await?;
        }
        Err(err) => {
            tracing::warn!(guild_id, error = %err, "manual challenge renewal failed");
            ctx.say(format!("❌ Could not renew the challenge: {err}"))
                .await?;
        }
    }

    Ok(())
}

/// Show the challenge configuration and scheduler health
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();

    let config = ctx.data().challenge_store.get_config(guild_id).await?;
    let scheduler = ctx.data().challenges.status().await;

    let mut embed = serenity::CreateEmbed::new()
        .title("👻 Daily challenge status")
        .color(0x6a0dad);

    match config {
        Some(config) => {
            embed = embed
                .field(
                    "Announcements",
                    if config.enabled { "Enabled" } else { "Paused" },
                    true,
                )
                .field("Channel", format!("<#{}>", config.channel_id), true)
                .field("Cadence", config.frequency.label(), true);
            if config.frequency == RenewalFrequency::Daily {
                embed = embed.field(
                    "Daily hour",
                    format!("{:02}:00 UTC", config.custom_hour),
                    true,
                );
            }
            embed = embed.field(
                "Last challenge",
                match config.last_renewal {
                    Some(at) => format!("<t:{}:R>", at.timestamp()),
                    None => "Never".to_string(),
                },
                true,
            );
            if let Some(current) = config
                .last_challenge_id
                .as_deref()
                .and_then(category_key_of)
                .and_then(category)
            {
                embed = embed.field(
                    "Current category",
                    format!("{} {}", current.icon, current.name),
                    true,
                );
            }
        }
        None => {
            embed = embed.description("Not configured yet. Run `/dailychallenge setup` to get started.");
        }
    }

    let mut tiers: Vec<_> = scheduler.tasks.iter().collect();
    tiers.sort_by_key(|(name, _)| *name);
    let tier_lines: Vec<String> = tiers
        .into_iter()
        .map(|(name, task)| {
            let state = if task.running {
                "running"
            } else if task.scheduled {
                "scheduled"
            } else {
                "stopped"
            };
            format!("`{name}`: {state}")
        })
        .collect();

    embed = embed
        .field(
            "Scheduler",
            if scheduler.initialized {
                "Initialized"
            } else {
                "Not initialized"
            },
            true,
        )
        .field("Guilds in rotation", scheduler.active_guilds.to_string(), true)
        .field("Timers", tier_lines.join("\n"), false);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}
