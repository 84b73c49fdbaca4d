use std::sync::Arc;

use serenity::model::channel::{Reaction, ReactionType};

use cronus_core::{
    domain::{ChannelId, GuildId, MessageId, MessageRef, UserId},
    messaging::types::ReactionEvent,
};

use crate::router::AppState;

/// Unicode emoji verbatim; custom emoji in their `<:name:id>` form.
pub(crate) fn emoji_text(emoji: &ReactionType) -> String {
    match emoji {
        ReactionType::Unicode(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn reaction_event(reaction: &Reaction) -> ReactionEvent {
    ReactionEvent {
        message: MessageRef::new(
            ChannelId(reaction.channel_id.get()),
            MessageId(reaction.message_id.get()),
        ),
        guild_id: reaction.guild_id.map(|g| GuildId(g.get())),
        user_id: reaction.user_id.map(|u| UserId(u.get())),
        emoji: emoji_text(&reaction.emoji),
    }
}

pub async fn handle_reaction(reaction: Reaction, state: Arc<AppState>) {
    let event = reaction_event(&reaction);
    if let Err(e) = state.bot.handle_reaction(&event).await {
        tracing::error!(
            channel = event.message.channel_id.0,
            message = event.message.message_id.0,
            error = %e,
            "reaction handling failed"
        );
    }
}
