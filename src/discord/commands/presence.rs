// This module handles bot presence and lifecycle events.
//
// Everything here is Discord-layer glue that adapts user-facing presence
// updates into the primitives expected by the core. That means we only work
// with Discord SDK types (Context, ActivityData, OnlineStatus) and keep the
// logic extremely short and intention-revealing.

use poise::serenity_prelude as serenity;

/// Resets the bot's status to the default message.
pub fn reset_status(ctx: &serenity::Context) {
    // serenity 0.12 exposes builder helpers on ActivityData, not Activity.
    let activity = serenity::ActivityData::watching("for ghost activity");
    ctx.set_presence(Some(activity), serenity::OnlineStatus::Online);
}

/// Called once the bot is ready so we can announce a default presence message
/// without repeating the setup code at every call site.
pub fn on_ready(ctx: &serenity::Context) {
    reset_status(ctx);
}
