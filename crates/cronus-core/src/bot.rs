//! Application entry points for the support bot.
//!
//! The platform adapter converts gateway events into the neutral types from
//! `messaging::types` and calls `handle_message`, `handle_reaction` or
//! `handle_component`. Everything below talks to the outside world through
//! the messaging port, the tag store and the issue tracker.

use std::sync::Arc;

use crate::{
    commands::{self, Command, CommandError, TagCommand},
    config::Config,
    domain::{ChannelId, GuildId, MessageId, MessageRef},
    issues::IssueLookup,
    messaging::{
        port::MessagingPort,
        types::{ComponentInteraction, ComponentReply, IncomingMessage, OutgoingMessage, ReactionEvent},
    },
    moderation::{DeleteRequest, ReportCooldowns, ReportDesk, ReportSettings},
    pagination::{PageTurn, Paginator, PaginatorRegistry},
    tags::{self, TagOutcome, TagService},
    Result,
};

pub const TAG_USAGE_TEXT: &str = "Invalid tag command. Use `!help tag` for more information.";
pub const NO_TAGS_TEXT: &str = "No tags found.";
pub const TARGET_NOT_FOUND_TEXT: &str = "Target message not found.";
pub const EXPIRED_LIST_TEXT: &str = "This tag list is no longer active.";

/// Where a tag request came from; decides how "not found" is reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TagInvocation {
    Command,
    Shortcut,
}

pub struct SupportBot {
    cfg: Arc<Config>,
    messenger: Arc<dyn MessagingPort>,
    tags: TagService,
    issues: IssueLookup,
    reports: ReportDesk,
    paginators: PaginatorRegistry,
}

impl SupportBot {
    pub fn new(
        cfg: Arc<Config>,
        messenger: Arc<dyn MessagingPort>,
        tags: TagService,
        issues: IssueLookup,
    ) -> Self {
        let reports = ReportDesk::new(
            ReportSettings {
                report_channel: cfg.report_channel_id,
                ping_role: cfg.report_ping_role_id,
                moderator_role: cfg.moderator_role_id,
            },
            ReportCooldowns::new(cfg.reaction_cooldown, cfg.report_cooldown),
        );
        let paginators = PaginatorRegistry::new(cfg.paginator_timeout);
        Self {
            cfg,
            messenger,
            tags,
            issues,
            reports,
            paginators,
        }
    }

    pub async fn handle_message(&self, msg: &IncomingMessage) -> Result<()> {
        if msg.author.is_bot {
            return Ok(());
        }
        let Some(parsed) = commands::parse(&self.cfg.command_prefix, &msg.content) else {
            return Ok(());
        };

        let channel = msg.message.channel_id;
        let result = match parsed {
            Ok(cmd) => self.run_command(msg, cmd).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            tracing::info!(channel = channel.0, error = ?e, "command failed");
            self.messenger
                .send(
                    channel,
                    OutgoingMessage::text(e.to_string()).replying_to(msg.message.message_id),
                )
                .await?;
        }
        Ok(())
    }

    pub async fn handle_reaction(&self, event: &ReactionEvent) -> Result<()> {
        let outcome = self.reports.handle_reaction(self.messenger.as_ref(), event).await?;
        tracing::debug!(?outcome, message = event.message.message_id.0, "reaction handled");
        Ok(())
    }

    pub async fn handle_component(&self, interaction: &ComponentInteraction) -> ComponentReply {
        if let Some(turn) = PageTurn::from_custom_id(&interaction.custom_id) {
            return match self
                .paginators
                .turn(interaction.message.message_id, turn)
                .await
            {
                Some(page) => ComponentReply::Update(page),
                None => ComponentReply::Ephemeral {
                    text: EXPIRED_LIST_TEXT.to_string(),
                    delete_after: None,
                },
            };
        }

        if let Some(request) = DeleteRequest::parse(&interaction.custom_id) {
            return self
                .reports
                .handle_delete(self.messenger.as_ref(), interaction, request)
                .await;
        }

        tracing::debug!(custom_id = %interaction.custom_id, "unknown component");
        ComponentReply::Acknowledge
    }

    async fn run_command(&self, msg: &IncomingMessage, cmd: Command) -> std::result::Result<(), CommandError> {
        match cmd {
            Command::Sentry { error_id } => {
                self.require_support(msg).await?;
                self.sentry(msg, &error_id).await?;
            }
            Command::Tag(TagCommand::Usage) => {
                self.say(msg.message.channel_id, TAG_USAGE_TEXT).await?;
            }
            Command::Tag(TagCommand::Show { name, target }) => {
                let target = msg.referenced.or(target);
                self.run_tag(msg, &name, target, TagInvocation::Command).await;
            }
            Command::Tag(TagCommand::Create { name, content }) => {
                self.require_support(msg).await?;
                let outcome = self.tags.create(&name, &content, msg.author.id).await?;
                self.say(msg.message.channel_id, &outcome.reply(&name)).await?;
            }
            Command::Tag(TagCommand::Edit { name, content }) => {
                let can_manage = self.can_manage_tags(msg).await?;
                let outcome = self.tags.edit(&name, &content, can_manage).await?;
                self.say(msg.message.channel_id, &outcome.reply(&name)).await?;
            }
            Command::Tag(TagCommand::Delete { name }) => {
                let can_manage = self.can_manage_tags(msg).await?;
                let outcome = self.tags.delete(&name, can_manage).await?;
                self.say(msg.message.channel_id, &outcome.reply(&name)).await?;
            }
            Command::Tag(TagCommand::List) => self.list_tags(msg).await?,
            Command::Tag(TagCommand::All) => self.list_all_tags(msg).await?,
            Command::Shortcut { name } => {
                self.run_tag(msg, &name, msg.referenced, TagInvocation::Shortcut)
                    .await;
            }
        }
        Ok(())
    }

    /// Guild-only check for the support role (by name).
    async fn require_support(&self, msg: &IncomingMessage) -> std::result::Result<GuildId, CommandError> {
        let guild = msg.guild_id.ok_or(CommandError::NoPrivateMessage)?;
        let roles = self.messenger.member_roles(guild, msg.author.id).await?;
        if roles.iter().any(|r| r.name == self.cfg.support_role_name) {
            Ok(guild)
        } else {
            Err(CommandError::MissingPermissions)
        }
    }

    /// Missing the role is an outcome here, not an error: the tag service
    /// answers "not found" before "no permission".
    async fn can_manage_tags(&self, msg: &IncomingMessage) -> std::result::Result<bool, CommandError> {
        match self.require_support(msg).await {
            Ok(_) => Ok(true),
            Err(CommandError::MissingPermissions) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn sentry(&self, msg: &IncomingMessage, error_id: &str) -> Result<()> {
        let status = self
            .messenger
            .send(
                msg.message.channel_id,
                OutgoingMessage::text("Fetching...").replying_to(msg.message.message_id),
            )
            .await?;
        self.issues
            .run(self.messenger.as_ref(), status, error_id)
            .await?;
        Ok(())
    }

    async fn list_tags(&self, msg: &IncomingMessage) -> Result<()> {
        let all = self.tags.list().await?;
        if all.is_empty() {
            return self.say(msg.message.channel_id, NO_TAGS_TEXT).await;
        }

        let icon = self.guild_icon(msg.guild_id).await;
        let paginator = Paginator::new(tags::tag_pages(&all, icon.as_deref()));
        let shown = self
            .messenger
            .send(msg.message.channel_id, paginator.render())
            .await?;
        self.paginators.insert(shown.message_id, paginator).await;
        Ok(())
    }

    async fn list_all_tags(&self, msg: &IncomingMessage) -> Result<()> {
        let all = self.tags.list().await?;
        if all.is_empty() {
            return self.say(msg.message.channel_id, NO_TAGS_TEXT).await;
        }

        let icon = self.guild_icon(msg.guild_id).await;
        self.messenger
            .send(
                msg.message.channel_id,
                OutgoingMessage::embed(tags::tag_index(&all, icon.as_deref())),
            )
            .await?;
        Ok(())
    }

    async fn guild_icon(&self, guild: Option<GuildId>) -> Option<String> {
        let guild = guild?;
        match self.messenger.guild_icon_url(guild).await {
            Ok(icon) => icon,
            Err(e) => {
                tracing::warn!(guild = guild.0, error = %e, "failed to fetch guild icon");
                None
            }
        }
    }

    /// Post a tag, replying to `target` when given. Failures are reported in the channel.
    async fn run_tag(
        &self,
        msg: &IncomingMessage,
        name: &str,
        target: Option<MessageId>,
        invocation: TagInvocation,
    ) {
        let channel = msg.message.channel_id;
        if let Err(e) = self.try_run_tag(msg, name, target, invocation).await {
            tracing::warn!(tag = name, error = %e, "tag invocation failed");
            let text = format!("An error occurred while processing the tag: {e}");
            if let Err(e) = self.say(channel, &text).await {
                tracing::error!(error = %e, "failed to report tag error");
            }
        }
    }

    async fn try_run_tag(
        &self,
        msg: &IncomingMessage,
        name: &str,
        target: Option<MessageId>,
        invocation: TagInvocation,
    ) -> Result<()> {
        let channel = msg.message.channel_id;
        let Some(tag) = self.tags.find(name).await? else {
            if invocation == TagInvocation::Command {
                self.say(channel, &TagOutcome::NotFound.reply(name)).await?;
            }
            return Ok(());
        };

        match self.messenger.delete_message(msg.message).await {
            Ok(()) => {}
            Err(e) if e.is_forbidden() || e.is_not_found() => {
                tracing::debug!(error = %e, "could not delete tag invocation");
            }
            Err(e) => return Err(e),
        }

        let content = tag.content_or_default().to_string();
        match target {
            Some(target) => self.reply_with_tag(channel, target, content).await,
            None => self.say(channel, &content).await,
        }
    }

    async fn reply_with_tag(&self, channel: ChannelId, target: MessageId, content: String) -> Result<()> {
        let target_ref = MessageRef::new(channel, target);
        match self.messenger.fetch_message(target_ref).await {
            Ok(_) => {
                self.messenger
                    .send(channel, OutgoingMessage::text(content).replying_to(target))
                    .await?;
                Ok(())
            }
            Err(e) if e.is_not_found() => self.say(channel, TARGET_NOT_FOUND_TEXT).await,
            Err(e) => Err(e),
        }
    }

    async fn say(&self, channel: ChannelId, text: &str) -> Result<()> {
        self.messenger
            .send(channel, OutgoingMessage::text(text))
            .await?;
        Ok(())
    }
}
