//! Blog post persistence boundary.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use thiserror::Error;

use super::model::{BlogPost, BlogPostRow, NewPost, PostPatch};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("data store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("data store returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Persistence for blog posts.
///
/// Inputs are already validated and sanitized.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create(&self, post: NewPost, author_id: &str) -> Result<BlogPost, StoreError>;

    /// `Ok(None)` when no post has this id.
    async fn update(&self, id: &str, patch: PostPatch) -> Result<Option<BlogPost>, StoreError>;

    /// `Ok(false)` when no post has this id.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// Any post, drafts included.
    async fn get_by_id(&self, id: &str) -> Result<Option<BlogPost>, StoreError>;

    async fn get_published_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, StoreError>;

    /// Published posts, newest first.
    async fn list_published(&self) -> Result<Vec<BlogPost>, StoreError>;

    /// Every post, most recently updated first.
    async fn list_all(&self) -> Result<Vec<BlogPost>, StoreError>;
}

/// In-process store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryPostStore {
    rows: DashMap<String, BlogPostRow>,
}

impl MemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect<F>(&self, keep: F) -> Vec<BlogPostRow>
    where
        F: Fn(&BlogPostRow) -> bool,
    {
        self.rows
            .iter()
            .filter(|r| keep(r.value()))
            .map(|r| r.value().clone())
            .collect()
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn create(&self, post: NewPost, author_id: &str) -> Result<BlogPost, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let row = post.into_row(id.clone(), author_id, Utc::now());
        self.rows.insert(id, row.clone());
        Ok(row.into_post())
    }

    async fn update(&self, id: &str, patch: PostPatch) -> Result<Option<BlogPost>, StoreError> {
        let Some(mut row) = self.rows.get_mut(id) else {
            return Ok(None);
        };
        row.apply(&patch, Utc::now());
        Ok(Some(row.clone().into_post()))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.rows.remove(id).is_some())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<BlogPost>, StoreError> {
        Ok(self.rows.get(id).map(|r| r.value().clone().into_post()))
    }

    async fn get_published_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, StoreError> {
        Ok(self
            .collect(|r| r.published && r.slug == slug)
            .into_iter()
            .next()
            .map(BlogPostRow::into_post))
    }

    async fn list_published(&self) -> Result<Vec<BlogPost>, StoreError> {
        let mut rows = self.collect(|r| r.published);
        rows.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(rows.into_iter().map(BlogPostRow::into_post).collect())
    }

    async fn list_all(&self) -> Result<Vec<BlogPost>, StoreError> {
        let mut rows = self.collect(|_| true);
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rows.into_iter().map(BlogPostRow::into_post).collect())
    }
}
