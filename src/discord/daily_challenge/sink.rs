// Serenity-backed delivery sink. This is the only place challenge embeds
// are built - the core hands over a RenderedChallenge and never touches
// presentation.

use crate::core::daily_challenge::{DeliveryError, DeliverySink, RenderedChallenge};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

pub struct SerenityDeliverySink {
    http: Arc<serenity::Http>,
}

impl SerenityDeliverySink {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

fn challenge_embed(challenge: &RenderedChallenge) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title(format!(
            "{} {} Challenge",
            challenge.icon, challenge.category_name
        ))
        .description(challenge.text.clone())
        .color(0x6a0dad)
        .field("Rotation", challenge.frequency_label, true)
        .field(
            "Next challenge",
            format!("<t:{}:R>", challenge.next_renewal.timestamp()),
            true,
        )
        .footer(serenity::CreateEmbedFooter::new("Good luck out there, hunters"));

    if challenge.bonus_ghost.is_some() {
        embed = embed.field("Bonus round", "Extra bragging rights on the line", true);
    }

    embed
}

#[async_trait]
impl DeliverySink for SerenityDeliverySink {
    async fn send_challenge(
        &self,
        channel_id: u64,
        challenge: &RenderedChallenge,
    ) -> Result<(), DeliveryError> {
        if channel_id == 0 {
            return Err(DeliveryError::ChannelNotFound(channel_id));
        }
        let channel = serenity::ChannelId::new(channel_id);

        // A deleted or unknown channel is reported as ChannelNotFound,
        // not as a generic send failure.
        if self.http.get_channel(channel).await.is_err() {
            return Err(DeliveryError::ChannelNotFound(channel_id));
        }

        channel
            .send_message(
                &self.http,
                serenity::CreateMessage::new().embed(challenge_embed(challenge)),
            )
            .await
            .map_err(|err| DeliveryError::SendFailed(err.to_string()))?;

        Ok(())
    }
}
