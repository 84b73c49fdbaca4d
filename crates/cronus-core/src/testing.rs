//! In-memory fakes of the ports, shared by the unit tests.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    domain::{ChannelId, GuildId, MessageId, MessageRef, UserId},
    errors::Error,
    issues::{Issue, IssueTracker},
    messaging::{
        port::MessagingPort,
        types::{MessageInfo, OutgoingMessage, RoleInfo, UserInfo},
    },
    tags::{Tag, TagStore},
    Result,
};

pub const ICON_URL: &str = "https://cdn.example/icon.png";

#[derive(Default)]
pub struct FakeMessenger {
    next_id: Mutex<u64>,
    sent: Mutex<Vec<(ChannelId, OutgoingMessage)>>,
    edits: Mutex<Vec<(MessageRef, OutgoingMessage)>>,
    deleted: Mutex<Vec<MessageRef>>,
    users: Mutex<HashMap<UserId, UserInfo>>,
    messages: Mutex<HashMap<MessageRef, MessageInfo>>,
    roles: Mutex<HashMap<UserId, Vec<RoleInfo>>>,
    missing_on_delete: Mutex<HashSet<MessageId>>,
    forbidden_on_delete: Mutex<HashSet<MessageId>>,
    forbidden_channels: Mutex<HashSet<ChannelId>>,
    delete_delay: Mutex<Option<Duration>>,
}

impl FakeMessenger {
    fn alloc(&self, channel_id: ChannelId) -> MessageRef {
        let mut guard = self.next_id.lock().unwrap();
        *guard += 1;
        MessageRef::new(channel_id, MessageId(10_000 + *guard))
    }

    pub fn add_user(&self, user: UserInfo) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    pub fn add_message(&self, msg: MessageInfo) {
        self.messages.lock().unwrap().insert(msg.message, msg);
    }

    pub fn set_roles(&self, user: UserId, roles: Vec<RoleInfo>) {
        self.roles.lock().unwrap().insert(user, roles);
    }

    /// Deleting this message reports "not found".
    pub fn fail_delete(&self, id: MessageId) {
        self.missing_on_delete.lock().unwrap().insert(id);
    }

    /// Deleting this message reports "forbidden".
    pub fn deny_delete(&self, id: MessageId) {
        self.forbidden_on_delete.lock().unwrap().insert(id);
    }

    /// Sending to this channel reports "forbidden".
    pub fn deny_send(&self, channel_id: ChannelId) {
        self.forbidden_channels.lock().unwrap().insert(channel_id);
    }

    /// Every delete takes `delay` before it resolves.
    pub fn slow_delete(&self, delay: Duration) {
        *self.delete_delay.lock().unwrap() = Some(delay);
    }

    pub fn sent(&self) -> Vec<(ChannelId, OutgoingMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|(_, m)| m.content)
            .collect()
    }

    pub fn edits(&self) -> Vec<(MessageRef, OutgoingMessage)> {
        self.edits.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<MessageRef> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    async fn send(&self, channel_id: ChannelId, msg: OutgoingMessage) -> Result<MessageRef> {
        if self.forbidden_channels.lock().unwrap().contains(&channel_id) {
            return Err(Error::Forbidden("Missing Permissions".to_string()));
        }
        self.sent.lock().unwrap().push((channel_id, msg));
        Ok(self.alloc(channel_id))
    }

    async fn edit(&self, target: MessageRef, msg: OutgoingMessage) -> Result<()> {
        self.edits.lock().unwrap().push((target, msg));
        Ok(())
    }

    async fn delete_message(&self, target: MessageRef) -> Result<()> {
        let delay = *self.delete_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.missing_on_delete.lock().unwrap().contains(&target.message_id) {
            return Err(Error::NotFound("Unknown Message".to_string()));
        }
        if self.forbidden_on_delete.lock().unwrap().contains(&target.message_id) {
            return Err(Error::Forbidden("Missing Permissions".to_string()));
        }
        self.deleted.lock().unwrap().push(target);
        Ok(())
    }

    async fn fetch_message(&self, target: MessageRef) -> Result<MessageInfo> {
        self.messages
            .lock()
            .unwrap()
            .get(&target)
            .cloned()
            .ok_or_else(|| Error::NotFound("Unknown Message".to_string()))
    }

    async fn fetch_user(&self, user_id: UserId) -> Result<UserInfo> {
        self.users
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .ok_or_else(|| Error::NotFound("Unknown User".to_string()))
    }

    async fn member_roles(&self, _guild_id: GuildId, user_id: UserId) -> Result<Vec<RoleInfo>> {
        Ok(self
            .roles
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn guild_icon_url(&self, _guild_id: GuildId) -> Result<Option<String>> {
        Ok(Some(ICON_URL.to_string()))
    }
}

/// Tracker that replays canned responses, then reports "nothing found".
#[derive(Default)]
pub struct FakeTracker {
    responses: Mutex<VecDeque<Result<Vec<Issue>>>>,
    calls: AtomicUsize,
}

impl FakeTracker {
    pub fn with_responses(responses: Vec<Result<Vec<Issue>>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn find_issues(&self, _error_id: &str) -> Result<Vec<Issue>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Case-insensitive in-memory tag collection.
#[derive(Default)]
pub struct MemoryTagStore {
    tags: Mutex<Vec<Tag>>,
}

fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[async_trait]
impl TagStore for MemoryTagStore {
    async fn ensure_indexes(&self) -> Result<()> {
        Ok(())
    }

    async fn find(&self, name: &str) -> Result<Option<Tag>> {
        Ok(self
            .tags
            .lock()
            .unwrap()
            .iter()
            .find(|t| same_name(&t.name, name))
            .cloned())
    }

    async fn insert(&self, tag: Tag) -> Result<()> {
        let mut tags = self.tags.lock().unwrap();
        tags.retain(|t| !same_name(&t.name, &tag.name));
        tags.push(tag);
        Ok(())
    }

    async fn update_content(&self, name: &str, content: &str) -> Result<bool> {
        let mut tags = self.tags.lock().unwrap();
        match tags.iter_mut().find(|t| same_name(&t.name, name)) {
            Some(tag) => {
                tag.content = Some(content.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let mut tags = self.tags.lock().unwrap();
        let before = tags.len();
        tags.retain(|t| !same_name(&t.name, name));
        Ok(tags.len() != before)
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        Ok(self.tags.lock().unwrap().clone())
    }
}
