//! Reaction-triggered message reports.
//!
//! Reacting with ⚠️ posts a report to the moderation channel and attaches a
//! "Quick Delete" button to the reported message. Two cooldowns keep the
//! listener from being used to spam the report channel.

use std::{collections::HashMap, time::Duration};

use tokio::{sync::Mutex, time::Instant};

use crate::{
    domain::{ChannelId, MessageId, MessageRef, RoleId, UserId},
    messaging::{
        port::MessagingPort,
        types::{Button, ButtonStyle, ComponentInteraction, ComponentReply, Embed, OutgoingMessage, ReactionEvent},
    },
    Result,
};

pub const REPORT_EMOJI: &str = "\u{26a0}\u{fe0f}";
pub const DELETE_BUTTON_PREFIX: &str = "report-delete:";
pub const MISSING_ROLE_TEXT: &str = "You do not have the required role to delete this message.";

/// Matches ⚠ with or without the emoji variation selector.
pub fn is_report_emoji(emoji: &str) -> bool {
    emoji.trim_end_matches('\u{fe0f}') == "\u{26a0}"
}

/// In-memory cooldown state. Lost on restart.
#[derive(Debug)]
pub struct ReportCooldowns {
    reaction_cooldown: Duration,
    report_cooldown: Duration,
    last_reaction: Option<Instant>,
    last_reports: HashMap<MessageId, Instant>,
}

impl ReportCooldowns {
    pub fn new(reaction_cooldown: Duration, report_cooldown: Duration) -> Self {
        Self {
            reaction_cooldown,
            report_cooldown,
            last_reaction: None,
            last_reports: HashMap::new(),
        }
    }

    /// Global gate: `true` (and the window restarts) when the last accepted
    /// reaction is older than the reaction cooldown.
    pub fn try_accept_reaction(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_reaction {
            if now.duration_since(last) < self.reaction_cooldown {
                return false;
            }
        }
        self.last_reaction = Some(now);
        true
    }

    /// Whether `message` may be reported again.
    pub fn report_allowed(&self, message: MessageId, now: Instant) -> bool {
        match self.last_reports.get(&message) {
            Some(last) => now.duration_since(*last) >= self.report_cooldown,
            None => true,
        }
    }

    pub fn record_report(&mut self, message: MessageId, now: Instant) {
        let window = self.report_cooldown;
        self.last_reports
            .retain(|_, at| now.duration_since(*at) < window);
        self.last_reports.insert(message, now);
    }
}

/// Everything the Quick Delete button needs, encoded in its custom id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeleteRequest {
    pub reported: MessageRef,
    pub report: MessageRef,
}

impl DeleteRequest {
    pub fn custom_id(&self) -> String {
        format!(
            "{DELETE_BUTTON_PREFIX}{}:{}:{}:{}",
            self.reported.channel_id.0,
            self.reported.message_id.0,
            self.report.channel_id.0,
            self.report.message_id.0
        )
    }

    pub fn parse(custom_id: &str) -> Option<Self> {
        let rest = custom_id.strip_prefix(DELETE_BUTTON_PREFIX)?;
        let ids = rest
            .split(':')
            .map(|p| p.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()?;
        let [reported_channel, reported_message, report_channel, report_message] = ids[..] else {
            return None;
        };
        Some(Self {
            reported: MessageRef::new(ChannelId(reported_channel), MessageId(reported_message)),
            report: MessageRef::new(ChannelId(report_channel), MessageId(report_message)),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportOutcome {
    Reported,
    IgnoredEmoji,
    IgnoredContext,
    OnCooldown,
    Unavailable,
}

pub fn report_embed(reported_user: UserId) -> Embed {
    Embed::new().title("New Report").description(format!(
        "The user {} has been reported for sending a message that violates our rules.",
        reported_user.mention()
    ))
}

fn jump_link(url: &str) -> String {
    format!("[Jump to Message]({url})")
}

/// Settings for the report flow.
#[derive(Clone, Copy, Debug)]
pub struct ReportSettings {
    pub report_channel: ChannelId,
    pub ping_role: Option<RoleId>,
    pub moderator_role: RoleId,
}

/// Report flow: reaction listener plus the Quick Delete button.
pub struct ReportDesk {
    settings: ReportSettings,
    cooldowns: Mutex<ReportCooldowns>,
}

impl ReportDesk {
    pub fn new(settings: ReportSettings, cooldowns: ReportCooldowns) -> Self {
        Self {
            settings,
            cooldowns: Mutex::new(cooldowns),
        }
    }

    pub async fn handle_reaction(
        &self,
        messenger: &dyn MessagingPort,
        event: &ReactionEvent,
    ) -> Result<ReportOutcome> {
        if !is_report_emoji(&event.emoji) {
            tracing::debug!(emoji = %event.emoji, "ignoring unexpected emoji");
            return Ok(ReportOutcome::IgnoredEmoji);
        }
        let (Some(reporter), Some(_guild)) = (event.user_id, event.guild_id) else {
            return Ok(ReportOutcome::IgnoredContext);
        };

        let now = Instant::now();
        {
            // Check and mark under one lock; gateway events run concurrently.
            let mut cooldowns = self.cooldowns.lock().await;
            if !cooldowns.try_accept_reaction(now) {
                return Ok(ReportOutcome::OnCooldown);
            }
            if !cooldowns.report_allowed(event.message.message_id, now) {
                return Ok(ReportOutcome::OnCooldown);
            }
        }

        let user = match messenger.fetch_user(reporter).await {
            Ok(u) => u,
            Err(e) if e.is_not_found() => return Ok(ReportOutcome::Unavailable),
            Err(e) => return Err(e),
        };
        if user.is_bot {
            return Ok(ReportOutcome::IgnoredContext);
        }
        let reported = match messenger.fetch_message(event.message).await {
            Ok(m) => m,
            Err(e) if e.is_not_found() => return Ok(ReportOutcome::Unavailable),
            Err(e) => return Err(e),
        };

        let mut content = jump_link(&reported.jump_url);
        if let Some(role) = self.settings.ping_role {
            content = format!("{}\n{content}", role.mention());
        }
        let report = messenger
            .send(
                self.settings.report_channel,
                OutgoingMessage::text(content).with_embed(report_embed(reported.author.id)),
            )
            .await?;
        self.cooldowns
            .lock()
            .await
            .record_report(event.message.message_id, now);

        let request = DeleteRequest {
            reported: event.message,
            report,
        };
        let quick_delete = OutgoingMessage::text(jump_link(&reported.jump_url))
            .with_buttons(vec![Button {
                custom_id: request.custom_id(),
                label: Some("Quick Delete".to_string()),
                emoji: None,
                style: ButtonStyle::Danger,
            }])
            .replying_to(event.message.message_id);
        // The report stands even without its button.
        if let Err(e) = messenger.send(event.message.channel_id, quick_delete).await {
            tracing::warn!(
                channel = event.message.channel_id.0,
                message = event.message.message_id.0,
                error = %e,
                "failed to attach quick delete button"
            );
        }

        tracing::info!(
            reporter = reporter.0,
            reported_user = reported.author.id.0,
            message = event.message.message_id.0,
            "message reported"
        );
        Ok(ReportOutcome::Reported)
    }

    /// Quick Delete: moderators remove the report, the reported message and the button message.
    pub async fn handle_delete(
        &self,
        messenger: &dyn MessagingPort,
        interaction: &ComponentInteraction,
        request: DeleteRequest,
    ) -> ComponentReply {
        if !interaction.member_roles.contains(&self.settings.moderator_role) {
            return ComponentReply::Ephemeral {
                text: MISSING_ROLE_TEXT.to_string(),
                delete_after: Some(Duration::from_secs(3)),
            };
        }

        tokio::join!(
            delete_best_effort(messenger, request.report),
            delete_best_effort(messenger, request.reported),
            delete_best_effort(messenger, interaction.message),
        );
        tracing::info!(
            moderator = interaction.user_id.0,
            message = request.reported.message_id.0,
            "reported message deleted"
        );
        ComponentReply::Acknowledge
    }
}

async fn delete_best_effort(messenger: &dyn MessagingPort, target: MessageRef) {
    match messenger.delete_message(target).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {
            tracing::debug!(message = target.message_id.0, "message already gone");
        }
        Err(e) if e.is_forbidden() => {
            tracing::error!(
                channel = target.channel_id.0,
                error = %e,
                "bot does not have permission to delete messages"
            );
        }
        Err(e) => {
            tracing::error!(message = target.message_id.0, error = %e, "failed to delete message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GuildId;
    use crate::messaging::types::{MessageInfo, UserInfo};
    use crate::testing::FakeMessenger;

    const REPORT_CHANNEL: ChannelId = ChannelId(900);
    const MOD_ROLE: RoleId = RoleId(77);

    fn desk() -> ReportDesk {
        ReportDesk::new(
            ReportSettings {
                report_channel: REPORT_CHANNEL,
                ping_role: Some(RoleId(55)),
                moderator_role: MOD_ROLE,
            },
            ReportCooldowns::new(Duration::from_secs(120), Duration::from_secs(1200)),
        )
    }

    fn reaction(message: u64, emoji: &str) -> ReactionEvent {
        ReactionEvent {
            message: MessageRef::new(ChannelId(10), MessageId(message)),
            guild_id: Some(GuildId(1)),
            user_id: Some(UserId(5)),
            emoji: emoji.to_string(),
        }
    }

    fn messenger_with(messages: &[u64]) -> FakeMessenger {
        let m = FakeMessenger::default();
        m.add_user(UserInfo {
            id: UserId(5),
            is_bot: false,
        });
        for id in messages {
            m.add_message(MessageInfo {
                message: MessageRef::new(ChannelId(10), MessageId(*id)),
                author: UserInfo {
                    id: UserId(6),
                    is_bot: false,
                },
                jump_url: format!("https://discord.com/channels/1/10/{id}"),
            });
        }
        m
    }

    #[test]
    fn emoji_matching() {
        assert!(is_report_emoji("⚠️"));
        assert!(is_report_emoji("\u{26a0}"));
        assert!(!is_report_emoji("👍"));
        assert!(!is_report_emoji("⚠️⚠️"));
    }

    #[test]
    fn cooldowns_gate_reactions_and_reports() {
        let start = Instant::now();
        let mut c = ReportCooldowns::new(Duration::from_secs(120), Duration::from_secs(1200));

        assert!(c.try_accept_reaction(start));
        assert!(!c.try_accept_reaction(start + Duration::from_secs(119)));
        assert!(c.try_accept_reaction(start + Duration::from_secs(120)));

        assert!(c.report_allowed(MessageId(1), start));
        c.record_report(MessageId(1), start);
        assert!(!c.report_allowed(MessageId(1), start + Duration::from_secs(1199)));
        assert!(c.report_allowed(MessageId(2), start));
        assert!(c.report_allowed(MessageId(1), start + Duration::from_secs(1200)));
    }

    #[test]
    fn stale_report_entries_are_pruned() {
        let start = Instant::now();
        let mut c = ReportCooldowns::new(Duration::from_secs(1), Duration::from_secs(10));
        c.record_report(MessageId(1), start);
        c.record_report(MessageId(2), start + Duration::from_secs(11));
        assert_eq!(c.last_reports.len(), 1);
    }

    #[test]
    fn delete_request_custom_id_round_trips() {
        let req = DeleteRequest {
            reported: MessageRef::new(ChannelId(1), MessageId(2)),
            report: MessageRef::new(ChannelId(3), MessageId(4)),
        };
        assert_eq!(req.custom_id(), "report-delete:1:2:3:4");
        assert_eq!(DeleteRequest::parse(&req.custom_id()), Some(req));
        assert_eq!(DeleteRequest::parse("report-delete:1:2:3"), None);
        assert_eq!(DeleteRequest::parse("report-delete:1:2:3:x"), None);
        assert_eq!(DeleteRequest::parse("tags:next"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn reports_once_then_respects_cooldowns() {
        let desk = desk();
        let m = messenger_with(&[100, 101]);

        assert_eq!(
            desk.handle_reaction(&m, &reaction(100, "👍")).await.unwrap(),
            ReportOutcome::IgnoredEmoji
        );
        assert_eq!(
            desk.handle_reaction(&m, &reaction(100, "⚠️")).await.unwrap(),
            ReportOutcome::Reported
        );

        let sent = m.sent();
        assert_eq!(sent.len(), 2);
        let (channel, report) = &sent[0];
        assert_eq!(*channel, REPORT_CHANNEL);
        assert_eq!(
            report.content.as_deref(),
            Some("<@&55>\n[Jump to Message](https://discord.com/channels/1/10/100)")
        );
        assert_eq!(
            report.embed.as_ref().unwrap().description.as_deref(),
            Some("The user <@6> has been reported for sending a message that violates our rules.")
        );
        let (channel, quick) = &sent[1];
        assert_eq!(*channel, ChannelId(10));
        assert_eq!(quick.reply_to, Some(MessageId(100)));
        assert_eq!(quick.buttons[0].label.as_deref(), Some("Quick Delete"));
        assert!(DeleteRequest::parse(&quick.buttons[0].custom_id).is_some());

        // Global cooldown blocks any message for two minutes.
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(
            desk.handle_reaction(&m, &reaction(101, "⚠️")).await.unwrap(),
            ReportOutcome::OnCooldown
        );

        // Past the global window, the same message is still on its own cooldown.
        tokio::time::advance(Duration::from_secs(120)).await;
        assert_eq!(
            desk.handle_reaction(&m, &reaction(100, "⚠️")).await.unwrap(),
            ReportOutcome::OnCooldown
        );

        tokio::time::advance(Duration::from_secs(120)).await;
        assert_eq!(
            desk.handle_reaction(&m, &reaction(101, "⚠️")).await.unwrap(),
            ReportOutcome::Reported
        );
        assert_eq!(m.sent().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn ignores_bots_and_missing_messages() {
        let desk = desk();
        let m = messenger_with(&[]);
        assert_eq!(
            desk.handle_reaction(&m, &reaction(100, "⚠️")).await.unwrap(),
            ReportOutcome::Unavailable
        );

        let mut dm = reaction(100, "⚠️");
        dm.guild_id = None;
        assert_eq!(
            desk.handle_reaction(&m, &dm).await.unwrap(),
            ReportOutcome::IgnoredContext
        );

        let desk = ReportDesk::new(
            ReportSettings {
                report_channel: REPORT_CHANNEL,
                ping_role: None,
                moderator_role: MOD_ROLE,
            },
            ReportCooldowns::new(Duration::ZERO, Duration::ZERO),
        );
        let m = messenger_with(&[100]);
        m.add_user(UserInfo {
            id: UserId(5),
            is_bot: true,
        });
        assert_eq!(
            desk.handle_reaction(&m, &reaction(100, "⚠️")).await.unwrap(),
            ReportOutcome::IgnoredContext
        );
        assert!(m.sent().is_empty());
    }

    fn click(roles: Vec<RoleId>) -> ComponentInteraction {
        ComponentInteraction {
            custom_id: "report-delete:10:100:900:1".to_string(),
            user_id: UserId(8),
            guild_id: Some(GuildId(1)),
            member_roles: roles,
            message: MessageRef::new(ChannelId(10), MessageId(2)),
        }
    }

    #[tokio::test]
    async fn quick_delete_requires_moderator_role() {
        let desk = desk();
        let m = FakeMessenger::default();
        let interaction = click(vec![RoleId(1)]);
        let request = DeleteRequest::parse(&interaction.custom_id).unwrap();

        let reply = desk.handle_delete(&m, &interaction, request).await;
        assert_eq!(
            reply,
            ComponentReply::Ephemeral {
                text: MISSING_ROLE_TEXT.to_string(),
                delete_after: Some(Duration::from_secs(3)),
            }
        );
        assert!(m.deleted().is_empty());
    }

    #[tokio::test]
    async fn quick_delete_removes_all_three_messages() {
        let desk = desk();
        let m = FakeMessenger::default();
        m.fail_delete(MessageId(100));
        let interaction = click(vec![RoleId(1), MOD_ROLE]);
        let request = DeleteRequest::parse(&interaction.custom_id).unwrap();

        let reply = desk.handle_delete(&m, &interaction, request).await;
        assert_eq!(reply, ComponentReply::Acknowledge);

        // The reported message was already gone; the others are still removed.
        let deleted: Vec<u64> = m.deleted().iter().map(|r| r.message_id.0).collect();
        assert_eq!(deleted, [1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn report_stays_on_cooldown_when_button_reply_fails() {
        let desk = desk();
        let m = messenger_with(&[100]);
        m.deny_send(ChannelId(10));

        assert_eq!(
            desk.handle_reaction(&m, &reaction(100, "⚠️")).await.unwrap(),
            ReportOutcome::Reported
        );
        let sent = m.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, REPORT_CHANNEL);

        // Past the global window the message must not be reported twice.
        tokio::time::advance(Duration::from_secs(121)).await;
        assert_eq!(
            desk.handle_reaction(&m, &reaction(100, "⚠️")).await.unwrap(),
            ReportOutcome::OnCooldown
        );
        assert_eq!(m.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn quick_delete_runs_deletes_concurrently() {
        let desk = desk();
        let m = FakeMessenger::default();
        m.slow_delete(Duration::from_secs(1));
        let interaction = click(vec![MOD_ROLE]);
        let request = DeleteRequest::parse(&interaction.custom_id).unwrap();

        let start = Instant::now();
        let reply = desk.handle_delete(&m, &interaction, request).await;
        assert_eq!(reply, ComponentReply::Acknowledge);
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(m.deleted().len(), 3);
    }
}
