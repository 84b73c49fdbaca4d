//! Named text snippets ("tags").
//!
//! Names are matched exactly but case-insensitively; storage lives behind
//! `TagStore` so the MongoDB adapter stays out of the core.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{domain::UserId, messaging::types::Embed, Result};

pub const NO_CONTENT: &str = "No content available";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub content: Option<String>,
    pub author_id: Option<UserId>,
}

impl Tag {
    pub fn content_or_default(&self) -> &str {
        self.content.as_deref().unwrap_or(NO_CONTENT)
    }
}

/// Storage port for tags. Every `name` argument is matched case-insensitively.
#[async_trait]
pub trait TagStore: Send + Sync {
    /// Create the unique, case-insensitive index on `name`.
    async fn ensure_indexes(&self) -> Result<()>;

    async fn find(&self, name: &str) -> Result<Option<Tag>>;

    /// Upsert keyed by name.
    async fn insert(&self, tag: Tag) -> Result<()>;

    /// Returns `false` when no tag matched.
    async fn update_content(&self, name: &str, content: &str) -> Result<bool>;

    /// Returns `false` when no tag matched.
    async fn delete(&self, name: &str) -> Result<bool>;

    async fn list(&self) -> Result<Vec<Tag>>;
}

/// Anchored, escaped pattern for an exact name match; pair with the `i` option.
pub fn exact_name_pattern(name: &str) -> String {
    format!("^{}$", regex::escape(name))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagOutcome {
    Created,
    AlreadyExists,
    Edited,
    Deleted,
    NotFound,
    Forbidden,
}

impl TagOutcome {
    pub fn reply(self, name: &str) -> String {
        match self {
            TagOutcome::Created => format!("Tag '{name}' created successfully!"),
            TagOutcome::AlreadyExists => format!("A tag with the name '{name}' already exists."),
            TagOutcome::Edited => format!("Tag '{name}' edited successfully!"),
            TagOutcome::Deleted => format!("Tag '{name}' deleted successfully!"),
            TagOutcome::NotFound => format!("Tag '{name}' not found."),
            TagOutcome::Forbidden => "You don't have permission to perform this action.".to_string(),
        }
    }
}

/// Tag use cases on top of a `TagStore`.
#[derive(Clone)]
pub struct TagService {
    store: Arc<dyn TagStore>,
}

impl TagService {
    pub fn new(store: Arc<dyn TagStore>) -> Self {
        Self { store }
    }

    pub async fn find(&self, name: &str) -> Result<Option<Tag>> {
        self.store.find(name).await
    }

    pub async fn list(&self) -> Result<Vec<Tag>> {
        self.store.list().await
    }

    pub async fn create(&self, name: &str, content: &str, author: UserId) -> Result<TagOutcome> {
        if self.store.find(name).await?.is_some() {
            return Ok(TagOutcome::AlreadyExists);
        }

        self.store
            .insert(Tag {
                name: name.to_string(),
                content: Some(content.to_string()),
                author_id: Some(author),
            })
            .await?;
        tracing::info!(tag = name, author = author.0, "tag created");
        Ok(TagOutcome::Created)
    }

    pub async fn edit(&self, name: &str, content: &str, can_manage: bool) -> Result<TagOutcome> {
        if self.store.find(name).await?.is_none() {
            return Ok(TagOutcome::NotFound);
        }
        if !can_manage {
            return Ok(TagOutcome::Forbidden);
        }

        if !self.store.update_content(name, content).await? {
            return Ok(TagOutcome::NotFound);
        }
        tracing::info!(tag = name, "tag edited");
        Ok(TagOutcome::Edited)
    }

    pub async fn delete(&self, name: &str, can_manage: bool) -> Result<TagOutcome> {
        if self.store.find(name).await?.is_none() {
            return Ok(TagOutcome::NotFound);
        }
        if !can_manage {
            return Ok(TagOutcome::Forbidden);
        }

        if !self.store.delete(name).await? {
            return Ok(TagOutcome::NotFound);
        }
        tracing::info!(tag = name, "tag deleted");
        Ok(TagOutcome::Deleted)
    }
}

/// One embed per tag, for the paginated `tag list`.
pub fn tag_pages(tags: &[Tag], guild_icon: Option<&str>) -> Vec<Embed> {
    tags.iter()
        .map(|tag| {
            let author = tag
                .author_id
                .map(UserId::mention)
                .unwrap_or_else(|| "Unknown".to_string());
            let description = format!(
                "**Content:**\n > {}\n**Author:**\n >>> {author}",
                tag.content_or_default()
            );
            Embed::new()
                .title(&tag.name)
                .description(description)
                .author("Tag List", guild_icon.map(str::to_string))
        })
        .collect()
}

/// Compact listing of every tag name.
pub fn tag_index(tags: &[Tag], guild_icon: Option<&str>) -> Embed {
    let names = tags
        .iter()
        .map(|t| format!("`{}`", t.name))
        .collect::<Vec<_>>()
        .join(", ");
    Embed::new()
        .title("Tag List")
        .description(names)
        .author("All Tags", guild_icon.map(str::to_string))
}
