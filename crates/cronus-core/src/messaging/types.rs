use std::time::Duration;

use crate::domain::{GuildId, MessageId, MessageRef, RoleId, UserId};

/// Embed side colour used across the bot, `rgb(43, 45, 49)`.
pub const EMBED_COLOUR: u32 = 0x2B2D31;

/// Inbound chat message, already stripped of platform specifics.
#[derive(Clone, Debug)]
pub struct IncomingMessage {
    pub message: MessageRef,
    pub guild_id: Option<GuildId>,
    pub author: UserInfo,
    pub content: String,
    /// Message this one replies to, if any.
    pub referenced: Option<MessageId>,
}

/// A reaction added to a message.
#[derive(Clone, Debug)]
pub struct ReactionEvent {
    pub message: MessageRef,
    pub guild_id: Option<GuildId>,
    pub user_id: Option<UserId>,
    pub emoji: String,
}

/// A button press on one of the bot's messages.
#[derive(Clone, Debug)]
pub struct ComponentInteraction {
    pub custom_id: String,
    pub user_id: UserId,
    pub guild_id: Option<GuildId>,
    pub member_roles: Vec<RoleId>,
    /// The message carrying the pressed button.
    pub message: MessageRef,
}

/// How the adapter should answer a component interaction.
#[derive(Clone, Debug, PartialEq)]
pub enum ComponentReply {
    /// Deferred update, nothing visible changes.
    Acknowledge,
    /// Message only the clicking user sees.
    Ephemeral {
        text: String,
        delete_after: Option<Duration>,
    },
    /// Replace the message carrying the button.
    Update(OutgoingMessage),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserInfo {
    pub id: UserId,
    pub is_bot: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageInfo {
    pub message: MessageRef,
    pub author: UserInfo,
    pub jump_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleInfo {
    pub id: RoleId,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmbedAuthor {
    pub name: String,
    pub icon_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub colour: u32,
    pub fields: Vec<EmbedField>,
    pub author: Option<EmbedAuthor>,
}

impl Default for Embed {
    fn default() -> Self {
        Self {
            title: None,
            description: None,
            colour: EMBED_COLOUR,
            fields: Vec::new(),
            author: None,
        }
    }
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn author(mut self, name: impl Into<String>, icon_url: Option<String>) -> Self {
        self.author = Some(EmbedAuthor {
            name: name.into(),
            icon_url,
        });
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Button {
    pub custom_id: String,
    pub label: Option<String>,
    pub emoji: Option<String>,
    pub style: ButtonStyle,
}

/// Outgoing message (send or edit).
///
/// On edit, `content: None` clears the text and an empty `buttons` list
/// removes any components.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub content: Option<String>,
    pub embed: Option<Embed>,
    pub buttons: Vec<Button>,
    pub reply_to: Option<MessageId>,
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            embed: Some(embed),
            ..Self::default()
        }
    }

    pub fn with_embed(mut self, embed: Embed) -> Self {
        self.embed = Some(embed);
        self
    }

    pub fn with_buttons(mut self, buttons: Vec<Button>) -> Self {
        self.buttons = buttons;
        self
    }

    pub fn replying_to(mut self, message_id: MessageId) -> Self {
        self.reply_to = Some(message_id);
        self
    }
}
