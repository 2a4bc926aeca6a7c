// Discord commands for the verification quiz.
//
// The core owns the state machine; this layer renders questions, collects
// answers, and arms the timeout timer for each issued challenge.

use crate::core::verification::VerificationError;
use crate::discord::commands::daily_challenge::{Context, Error};
use chrono::Utc;
use poise::serenity_prelude::{self as serenity, Mentionable};

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum QuizChoice {
    A,
    B,
    C,
    D,
}

impl QuizChoice {
    fn index(self) -> usize {
        match self {
            QuizChoice::A => 0,
            QuizChoice::B => 1,
            QuizChoice::C => 2,
            QuizChoice::D => 3,
        }
    }
}

const OPTION_LETTERS: [&str; 4] = ["A", "B", "C", "D"];

/// Prove you're a real ghost hunter
#[poise::command(slash_command, guild_only, subcommands("start", "answer", "stats"))]
pub async fn ghostquiz(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Get a trivia question. You have 60 seconds to answer.
#[poise::command(slash_command, guild_only)]
pub async fn start(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let user_id = ctx.author().id;

    let issued = ctx
        .data()
        .verification
        .start_challenge(user_id.get(), guild_id, Utc::now())
        .await?;

    let options = issued
        .question
        .options
        .iter()
        .zip(OPTION_LETTERS)
        .map(|(option, letter)| format!("**{letter}.** {option}"))
        .collect::<Vec<_>>()
        .join("\n");

    let embed = serenity::CreateEmbed::new()
        .title("👻 Ghost quiz")
        .description(format!("{}\n\n{}", issued.question.prompt, options))
        .color(0x2e8b57)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Answer with /ghostquiz answer before <t:{}:T>",
            issued.expires_at.timestamp()
        )));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    // Arm the timeout. If the user answers (or restarts) first, the expiry
    // check inside the service turns this into a no-op.
    let verification = ctx.data().verification.clone();
    let timeout = verification.challenge_timeout();
    let channel_id = ctx.channel_id();
    let http = ctx.serenity_context().http.clone();
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;

        match verification
            .expire(user_id.get(), guild_id, Utc::now())
            .await
        {
            Ok(true) => {
                let content = format!(
                    "{} ⏳ Time's up! The ghost got away. Try `/ghostquiz start` again.",
                    user_id.mention()
                );
                if let Err(err) = channel_id
                    .send_message(
                        &http,
                        serenity::CreateMessage::new().content(content).allowed_mentions(
                            serenity::CreateAllowedMentions::new().users(vec![user_id]),
                        ),
                    )
                    .await
                {
                    tracing::error!(error = %err, "failed to send quiz timeout notice");
                }
            }
            Ok(false) => {}
            Err(err) => tracing::error!(error = %err, "quiz timeout check failed"),
        }
    });

    Ok(())
}

/// Answer your current quiz question
#[poise::command(slash_command, guild_only)]
pub async fn answer(
    ctx: Context<'_>,
    #[description = "Your answer"] choice: QuizChoice,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let user_id = ctx.author().id.get();

    match ctx
        .data()
        .verification
        .answer(user_id, guild_id, choice.index(), Utc::now())
        .await
    {
        Ok(report) if report.correct => {
            ctx.say(format!(
                "✅ Correct, in {} seconds. You know your ghosts.",
                report.elapsed_secs
            ))
            .await?;
        }
        Ok(report) => {
            ctx.say(format!(
                "❌ Not quite. The answer was **{}**. Try `/ghostquiz start` for another question.",
                report.correct_answer
            ))
            .await?;
        }
        Err(VerificationError::NoPending) => {
            ctx.say("You don't have an active question. Use `/ghostquiz start` first.")
                .await?;
        }
        Err(err) => return Err(err.into()),
    }

    Ok(())
}

/// Show this server's quiz results
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn stats(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be in a guild")?.get();
    let stats = ctx.data().verification.stats(guild_id).await?;

    let total = stats.passed + stats.failed + stats.timed_out;
    let recent = stats
        .daily
        .iter()
        .rev()
        .take(7)
        .map(|(date, counters)| {
            format!(
                "`{}`: {} passed, {} failed, {} timed out",
                date, counters.passed, counters.failed, counters.timed_out
            )
        })
        .collect::<Vec<_>>();

    let embed = serenity::CreateEmbed::new()
        .title("👻 Ghost quiz stats")
        .color(0x2e8b57)
        .field("Attempts", total.to_string(), true)
        .field("Passed", stats.passed.to_string(), true)
        .field("Failed", stats.failed.to_string(), true)
        .field("Timed out", stats.timed_out.to_string(), true)
        .field(
            "Recent days",
            if recent.is_empty() {
                "No attempts yet".to_string()
            } else {
                recent.join("\n")
            },
            false,
        );
    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}
