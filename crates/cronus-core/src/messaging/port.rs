use async_trait::async_trait;

use crate::{
    domain::{ChannelId, GuildId, MessageRef, UserId},
    messaging::types::{MessageInfo, OutgoingMessage, RoleInfo, UserInfo},
    Result,
};

/// Chat platform port.
///
/// Adapters map "unknown message/user" responses to `Error::NotFound` and
/// missing permissions to `Error::Forbidden`; the handlers rely on that to
/// tell best-effort failures from real ones.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send(&self, channel_id: ChannelId, msg: OutgoingMessage) -> Result<MessageRef>;
    async fn edit(&self, target: MessageRef, msg: OutgoingMessage) -> Result<()>;
    async fn delete_message(&self, target: MessageRef) -> Result<()>;

    async fn fetch_message(&self, target: MessageRef) -> Result<MessageInfo>;
    async fn fetch_user(&self, user_id: UserId) -> Result<UserInfo>;

    async fn member_roles(&self, guild_id: GuildId, user_id: UserId) -> Result<Vec<RoleInfo>>;
    async fn guild_icon_url(&self, guild_id: GuildId) -> Result<Option<String>>;
}
