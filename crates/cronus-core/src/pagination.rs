use std::{collections::HashMap, time::Duration};

use tokio::{sync::Mutex, time::Instant};

use crate::{
    domain::MessageId,
    messaging::types::{Button, ButtonStyle, Embed, OutgoingMessage},
};

pub const PREV_BUTTON_ID: &str = "tags:prev";
pub const NEXT_BUTTON_ID: &str = "tags:next";

/// Pre-rendered pages with a cursor clamped to the valid range.
#[derive(Clone, Debug)]
pub struct Paginator {
    pages: Vec<Embed>,
    current: usize,
}

impl Paginator {
    pub fn new(pages: Vec<Embed>) -> Self {
        Self { pages, current: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn next(&mut self) -> usize {
        self.current = (self.current + 1).min(self.pages.len().saturating_sub(1));
        self.current
    }

    pub fn prev(&mut self) -> usize {
        self.current = self.current.saturating_sub(1);
        self.current
    }

    /// The current page with its navigation buttons.
    pub fn render(&self) -> OutgoingMessage {
        let mut msg = OutgoingMessage::default().with_buttons(nav_buttons());
        msg.embed = self.pages.get(self.current).cloned();
        msg
    }
}

fn nav_buttons() -> Vec<Button> {
    vec![
        Button {
            custom_id: PREV_BUTTON_ID.to_string(),
            label: None,
            emoji: Some("⬅️".to_string()),
            style: ButtonStyle::Secondary,
        },
        Button {
            custom_id: NEXT_BUTTON_ID.to_string(),
            label: None,
            emoji: Some("➡️".to_string()),
            style: ButtonStyle::Secondary,
        },
    ]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageTurn {
    Prev,
    Next,
}

impl PageTurn {
    pub fn from_custom_id(custom_id: &str) -> Option<Self> {
        match custom_id {
            PREV_BUTTON_ID => Some(PageTurn::Prev),
            NEXT_BUTTON_ID => Some(PageTurn::Next),
            _ => None,
        }
    }
}

struct Entry {
    paginator: Paginator,
    last_used: Instant,
}

/// Live paginators keyed by the message that displays them.
///
/// Entries idle for longer than `timeout` are dropped on the next access.
pub struct PaginatorRegistry {
    timeout: Duration,
    inner: Mutex<HashMap<MessageId, Entry>>,
}

impl PaginatorRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, message_id: MessageId, paginator: Paginator) {
        let now = Instant::now();
        let mut map = self.inner.lock().await;
        map.retain(|_, e| now.duration_since(e.last_used) < self.timeout);
        map.insert(
            message_id,
            Entry {
                paginator,
                last_used: now,
            },
        );
    }

    /// Move the paginator shown on `message_id` and return the page to display.
    /// `None` when the list is unknown or expired.
    pub async fn turn(&self, message_id: MessageId, turn: PageTurn) -> Option<OutgoingMessage> {
        let now = Instant::now();
        let mut map = self.inner.lock().await;

        let expired = map
            .get(&message_id)
            .map(|e| now.duration_since(e.last_used) >= self.timeout)?;
        if expired {
            map.remove(&message_id);
            return None;
        }

        let entry = map.get_mut(&message_id)?;
        entry.last_used = now;
        match turn {
            PageTurn::Prev => entry.paginator.prev(),
            PageTurn::Next => entry.paginator.next(),
        };
        Some(entry.paginator.render())
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(n: usize) -> Vec<Embed> {
        (0..n).map(|i| Embed::new().title(format!("page {i}"))).collect()
    }

    fn title(msg: &OutgoingMessage) -> &str {
        msg.embed.as_ref().unwrap().title.as_deref().unwrap()
    }

    #[test]
    fn index_is_clamped_at_both_ends() {
        let mut p = Paginator::new(pages(3));
        assert_eq!(p.prev(), 0);
        assert_eq!(p.next(), 1);
        assert_eq!(p.next(), 2);
        assert_eq!(p.next(), 2);
        assert_eq!(p.prev(), 1);
        assert_eq!(p.prev(), 0);
        assert_eq!(p.prev(), 0);
    }

    #[test]
    fn single_and_empty_lists_stay_at_zero() {
        let mut one = Paginator::new(pages(1));
        assert_eq!(one.next(), 0);
        assert_eq!(one.prev(), 0);

        let mut none = Paginator::new(vec![]);
        assert!(none.is_empty());
        assert_eq!(none.next(), 0);
        assert!(none.render().embed.is_none());
    }

    #[test]
    fn render_carries_nav_buttons() {
        let msg = Paginator::new(pages(2)).render();
        assert_eq!(title(&msg), "page 0");
        let ids: Vec<&str> = msg.buttons.iter().map(|b| b.custom_id.as_str()).collect();
        assert_eq!(ids, [PREV_BUTTON_ID, NEXT_BUTTON_ID]);
    }

    #[test]
    fn parses_button_ids() {
        assert_eq!(PageTurn::from_custom_id("tags:prev"), Some(PageTurn::Prev));
        assert_eq!(PageTurn::from_custom_id("tags:next"), Some(PageTurn::Next));
        assert_eq!(PageTurn::from_custom_id("report-delete:1:2:3:4"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn registry_turns_and_expires() {
        let reg = PaginatorRegistry::new(Duration::from_secs(180));
        reg.insert(MessageId(1), Paginator::new(pages(2))).await;

        let shown = reg.turn(MessageId(1), PageTurn::Next).await.unwrap();
        assert_eq!(title(&shown), "page 1");
        assert!(reg.turn(MessageId(2), PageTurn::Next).await.is_none());

        tokio::time::advance(Duration::from_secs(181)).await;
        assert!(reg.turn(MessageId(1), PageTurn::Prev).await.is_none());
        assert_eq!(reg.len().await, 0);
    }
}
