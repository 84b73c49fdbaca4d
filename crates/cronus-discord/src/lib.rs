//! Discord adapter (serenity).
//!
//! This crate implements the `cronus-core` MessagingPort over the Discord
//! HTTP API and feeds gateway events into `SupportBot`.

use std::sync::Arc;

use async_trait::async_trait;

use serenity::{
    builder::{
        CreateActionRow, CreateButton, CreateEmbed, CreateEmbedAuthor, CreateMessage, EditMessage,
    },
    http::{Http, HttpError},
    model::{
        application::ButtonStyle as DiscordButtonStyle,
        channel::{Message, ReactionType},
        id,
    },
};

pub mod handlers;
pub mod router;

use cronus_core::{
    domain::{ChannelId, GuildId, MessageId, MessageRef, RoleId, UserId},
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{
            Button, ButtonStyle, Embed, MessageInfo, OutgoingMessage, RoleInfo, UserInfo,
        },
    },
    Result,
};

/// Discord's maximum message content length in characters.
pub const MAX_MESSAGE_LEN: usize = 2000;

#[derive(Clone)]
pub struct DiscordMessenger {
    http: Arc<Http>,
}

impl DiscordMessenger {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    fn channel(channel_id: ChannelId) -> id::ChannelId {
        id::ChannelId::new(channel_id.0)
    }

    fn message(message_id: MessageId) -> id::MessageId {
        id::MessageId::new(message_id.0)
    }
}

/// Map a serenity error onto the core error kinds. 404 and 403 responses get
/// their own variants so callers can treat them as best-effort failures.
pub fn map_err(op: &str, e: serenity::Error) -> Error {
    if let serenity::Error::Http(HttpError::UnsuccessfulRequest(resp)) = &e {
        return status_error(op, resp.status_code.as_u16(), &resp.error.message);
    }
    Error::External(format!("discord {op} failed: {e}"))
}

fn status_error(op: &str, status: u16, message: &str) -> Error {
    match status {
        404 => Error::NotFound(format!("discord {op}: {message}")),
        403 => Error::Forbidden(format!("discord {op}: {message}")),
        _ => Error::External(format!("discord {op} failed: {status} {message}")),
    }
}

/// Cut `s` to Discord's content limit, counted in chars.
pub fn truncate(s: &str) -> &str {
    match s.char_indices().nth(MAX_MESSAGE_LEN) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

pub fn build_embed(embed: &Embed) -> CreateEmbed {
    let mut builder = CreateEmbed::new().colour(embed.colour);
    if let Some(title) = &embed.title {
        builder = builder.title(title);
    }
    if let Some(desc) = &embed.description {
        builder = builder.description(desc);
    }
    for field in &embed.fields {
        builder = builder.field(&field.name, &field.value, field.inline);
    }
    if let Some(author) = &embed.author {
        let mut a = CreateEmbedAuthor::new(&author.name);
        if let Some(icon) = &author.icon_url {
            a = a.icon_url(icon);
        }
        builder = builder.author(a);
    }
    builder
}

pub fn build_button(button: &Button) -> CreateButton {
    let style = match button.style {
        ButtonStyle::Primary => DiscordButtonStyle::Primary,
        ButtonStyle::Secondary => DiscordButtonStyle::Secondary,
        ButtonStyle::Danger => DiscordButtonStyle::Danger,
    };
    let mut b = CreateButton::new(&button.custom_id).style(style);
    if let Some(label) = &button.label {
        b = b.label(label);
    }
    if let Some(emoji) = &button.emoji {
        b = b.emoji(ReactionType::Unicode(emoji.clone()));
    }
    b
}

/// All buttons go on a single row.
pub fn build_components(buttons: &[Button]) -> Vec<CreateActionRow> {
    if buttons.is_empty() {
        return Vec::new();
    }
    vec![CreateActionRow::Buttons(
        buttons.iter().map(build_button).collect(),
    )]
}

pub fn user_info(user: &serenity::model::user::User) -> UserInfo {
    UserInfo {
        id: UserId(user.id.get()),
        is_bot: user.bot,
    }
}

pub fn message_info(msg: &Message) -> MessageInfo {
    MessageInfo {
        message: MessageRef::new(ChannelId(msg.channel_id.get()), MessageId(msg.id.get())),
        author: user_info(&msg.author),
        jump_url: msg.link(),
    }
}

#[async_trait]
impl MessagingPort for DiscordMessenger {
    async fn send(&self, channel_id: ChannelId, msg: OutgoingMessage) -> Result<MessageRef> {
        let channel = Self::channel(channel_id);
        let mut builder = CreateMessage::new();
        if let Some(content) = &msg.content {
            builder = builder.content(truncate(content));
        }
        if let Some(embed) = &msg.embed {
            builder = builder.embed(build_embed(embed));
        }
        if !msg.buttons.is_empty() {
            builder = builder.components(build_components(&msg.buttons));
        }
        if let Some(reply_to) = msg.reply_to {
            builder = builder.reference_message((channel, Self::message(reply_to)));
        }

        let sent = channel
            .send_message(self.http.as_ref(), builder)
            .await
            .map_err(|e| map_err("send message", e))?;
        Ok(MessageRef::new(channel_id, MessageId(sent.id.get())))
    }

    /// Replaces content, embed and buttons; anything not set is cleared.
    async fn edit(&self, target: MessageRef, msg: OutgoingMessage) -> Result<()> {
        let embeds = msg.embed.as_ref().map(build_embed).into_iter().collect();
        let builder = EditMessage::new()
            .content(truncate(msg.content.as_deref().unwrap_or_default()))
            .embeds(embeds)
            .components(build_components(&msg.buttons));

        Self::channel(target.channel_id)
            .edit_message(self.http.as_ref(), Self::message(target.message_id), builder)
            .await
            .map_err(|e| map_err("edit message", e))?;
        Ok(())
    }

    async fn delete_message(&self, target: MessageRef) -> Result<()> {
        Self::channel(target.channel_id)
            .delete_message(self.http.as_ref(), Self::message(target.message_id))
            .await
            .map_err(|e| map_err("delete message", e))
    }

    async fn fetch_message(&self, target: MessageRef) -> Result<MessageInfo> {
        let msg = Self::channel(target.channel_id)
            .message(self.http.as_ref(), Self::message(target.message_id))
            .await
            .map_err(|e| map_err("fetch message", e))?;
        Ok(message_info(&msg))
    }

    async fn fetch_user(&self, user_id: UserId) -> Result<UserInfo> {
        let user = self
            .http
            .get_user(id::UserId::new(user_id.0))
            .await
            .map_err(|e| map_err("fetch user", e))?;
        Ok(user_info(&user))
    }

    async fn member_roles(&self, guild_id: GuildId, user_id: UserId) -> Result<Vec<RoleInfo>> {
        let guild = id::GuildId::new(guild_id.0);
        let member = self
            .http
            .get_member(guild, id::UserId::new(user_id.0))
            .await
            .map_err(|e| map_err("fetch member", e))?;
        if member.roles.is_empty() {
            return Ok(Vec::new());
        }

        let roles = self
            .http
            .get_guild_roles(guild)
            .await
            .map_err(|e| map_err("fetch guild roles", e))?;
        Ok(roles
            .into_iter()
            .filter(|r| member.roles.contains(&r.id))
            .map(|r| RoleInfo {
                id: RoleId(r.id.get()),
                name: r.name,
            })
            .collect())
    }

    async fn guild_icon_url(&self, guild_id: GuildId) -> Result<Option<String>> {
        let guild = self
            .http
            .get_guild(id::GuildId::new(guild_id.0))
            .await
            .map_err(|e| map_err("fetch guild", e))?;
        Ok(guild.icon_url())
    }
}
