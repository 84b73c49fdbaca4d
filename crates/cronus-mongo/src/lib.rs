//! MongoDB adapter for the tag store.
//!
//! Documents live in the `tags` collection as `{ name, content, author_id }`.
//! Lookups use an anchored, case-insensitive regex on `name`.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::{ClientOptions, Collation, CollationStrength, IndexOptions, UpdateOptions},
    Client, Collection, IndexModel,
};
use serde::{Deserialize, Serialize};

use cronus_core::{
    domain::UserId,
    errors::Error,
    tags::{exact_name_pattern, Tag, TagStore},
    Result,
};

pub const TAGS_COLLECTION: &str = "tags";
const NAME_INDEX: &str = "name_ci";

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
struct TagDocument {
    #[serde(default)]
    name: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    author_id: Option<i64>,
}

impl From<TagDocument> for Tag {
    fn from(d: TagDocument) -> Self {
        Tag {
            name: d.name,
            content: d.content,
            author_id: d.author_id.map(|id| UserId(id as u64)),
        }
    }
}

fn db_err(op: &str, e: mongodb::error::Error) -> Error {
    Error::Database(format!("{op}: {e}"))
}

/// Exact, case-insensitive match on `name`.
fn name_filter(name: &str) -> Document {
    doc! { "name": { "$regex": exact_name_pattern(name), "$options": "i" } }
}

#[derive(Clone, Debug)]
pub struct MongoTagStore {
    tags: Collection<TagDocument>,
}

impl MongoTagStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let mut opts = ClientOptions::parse(uri)
            .await
            .map_err(|e| db_err("parse mongo uri", e))?;
        opts.app_name = Some("cronus".to_string());
        let client = Client::with_options(opts).map_err(|e| db_err("create mongo client", e))?;

        tracing::info!(database, "connected to mongodb");
        Ok(Self {
            tags: client.database(database).collection(TAGS_COLLECTION),
        })
    }
}

#[async_trait]
impl TagStore for MongoTagStore {
    async fn ensure_indexes(&self) -> Result<()> {
        let collation = Collation::builder()
            .locale("en")
            .strength(CollationStrength::Secondary)
            .build();
        let options = IndexOptions::builder()
            .unique(true)
            .collation(collation)
            .name(NAME_INDEX.to_string())
            .build();
        let index = IndexModel::builder()
            .keys(doc! { "name": 1 })
            .options(options)
            .build();

        self.tags
            .create_index(index, None)
            .await
            .map_err(|e| db_err("create tag index", e))?;
        Ok(())
    }

    async fn find(&self, name: &str) -> Result<Option<Tag>> {
        let found = self
            .tags
            .find_one(name_filter(name), None)
            .await
            .map_err(|e| db_err("find tag", e))?;
        Ok(found.map(Tag::from))
    }

    async fn insert(&self, tag: Tag) -> Result<()> {
        let update = doc! {
            "$set": {
                "name": tag.name.as_str(),
                "content": tag.content.as_deref(),
                "author_id": tag.author_id.map(|u| u.0 as i64),
            }
        };
        let options = UpdateOptions::builder().upsert(true).build();
        self.tags
            .update_one(name_filter(&tag.name), update, options)
            .await
            .map_err(|e| db_err("upsert tag", e))?;
        Ok(())
    }

    async fn update_content(&self, name: &str, content: &str) -> Result<bool> {
        let res = self
            .tags
            .update_one(name_filter(name), doc! { "$set": { "content": content } }, None)
            .await
            .map_err(|e| db_err("update tag", e))?;
        Ok(res.matched_count > 0)
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let res = self
            .tags
            .delete_one(name_filter(name), None)
            .await
            .map_err(|e| db_err("delete tag", e))?;
        Ok(res.deleted_count > 0)
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        let cursor = self
            .tags
            .find(None, None)
            .await
            .map_err(|e| db_err("list tags", e))?;
        let docs: Vec<TagDocument> = cursor
            .try_collect()
            .await
            .map_err(|e| db_err("read tags", e))?;
        Ok(docs.into_iter().map(Tag::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson;

    #[test]
    fn filter_is_anchored_case_insensitive_regex() {
        let filter = name_filter("c++");
        let name = filter.get_document("name").unwrap();
        assert_eq!(name.get_str("$regex").unwrap(), r"^c\+\+$");
        assert_eq!(name.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn legacy_documents_without_fields_still_decode() {
        let raw = doc! { "_id": bson::oid::ObjectId::new(), "name": "faq" };
        let d: TagDocument = bson::from_document(raw).unwrap();
        let tag = Tag::from(d);
        assert_eq!(tag.name, "faq");
        assert_eq!(tag.content, None);
        assert_eq!(tag.author_id, None);
        assert_eq!(tag.content_or_default(), "No content available");
    }

    #[test]
    fn author_ids_round_trip_through_i64() {
        let raw = doc! { "name": "rules", "content": "be nice", "author_id": 988055417907200010_i64 };
        let tag = Tag::from(bson::from_document::<TagDocument>(raw).unwrap());
        assert_eq!(tag.author_id, Some(UserId(988055417907200010)));
        assert_eq!(tag.content.as_deref(), Some("be nice"));
    }
}
