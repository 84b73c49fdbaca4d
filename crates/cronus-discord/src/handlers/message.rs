use std::sync::Arc;

use serenity::model::channel::Message;

use cronus_core::{
    domain::{ChannelId, GuildId, MessageId, MessageRef},
    messaging::types::IncomingMessage,
};

use crate::{router::AppState, user_info};

pub(crate) fn incoming(msg: &Message) -> IncomingMessage {
    IncomingMessage {
        message: MessageRef::new(ChannelId(msg.channel_id.get()), MessageId(msg.id.get())),
        guild_id: msg.guild_id.map(|g| GuildId(g.get())),
        author: user_info(&msg.author),
        content: msg.content.clone(),
        referenced: msg
            .message_reference
            .as_ref()
            .and_then(|r| r.message_id)
            .map(|id| MessageId(id.get())),
    }
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) {
    if msg.author.bot {
        return;
    }

    let incoming = incoming(&msg);
    if let Err(e) = state.bot.handle_message(&incoming).await {
        tracing::error!(
            channel = incoming.message.channel_id.0,
            message = incoming.message.message_id.0,
            error = %e,
            "message handling failed"
        );
    }
}
