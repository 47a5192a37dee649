//! Blog post shapes: the API view, the stored row, and validated inputs.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::security::sanitize::{sanitize_plain_list, sanitize_plain_text, sanitize_rich_html};

const WORDS_PER_MINUTE: usize = 200;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// Post as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    /// Sanitized rich HTML.
    pub content: String,
    pub featured_image: String,
    pub published_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub reading_time: u32,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub published: bool,
    pub author: Author,
    pub seo: Seo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: Option<String>,
    pub name: String,
    pub image: String,
    pub bio: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seo {
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
}

/// Row in `blog_posts`, optionally joined with its author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPostRow {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub featured_image: Option<String>,
    pub published_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub reading_time: Option<u32>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub published: bool,
    pub author_id: Option<String>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing)]
    pub authors: Option<AuthorRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorRow {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub bio: Option<String>,
}

impl BlogPostRow {
    /// API view of this row. Empty SEO fields fall back to title/excerpt.
    pub fn into_post(self) -> BlogPost {
        let author = match self.authors {
            Some(a) => Author {
                id: Some(a.id),
                name: a.name,
                image: a.image.unwrap_or_default(),
                bio: a.bio.unwrap_or_default(),
            },
            None => Author {
                id: self.author_id,
                name: "Anonymous".to_string(),
                image: String::new(),
                bio: String::new(),
            },
        };

        let seo = Seo {
            title: non_empty(self.seo_title).unwrap_or_else(|| self.title.clone()),
            description: non_empty(self.seo_description).unwrap_or_else(|| self.excerpt.clone()),
            keywords: self.seo_keywords.unwrap_or_default(),
        };

        BlogPost {
            id: self.id,
            slug: self.slug,
            title: self.title,
            excerpt: self.excerpt,
            content: self.content,
            featured_image: self.featured_image.unwrap_or_default(),
            published_at: self.published_at,
            updated_at: self.updated_at,
            reading_time: self.reading_time.unwrap_or(0),
            categories: self.categories,
            tags: self.tags,
            published: self.published,
            author,
            seo,
        }
    }

    /// Apply a validated patch, recomputing the reading time when the content changes.
    pub fn apply(&mut self, patch: &PostPatch, now: DateTime<Utc>) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(slug) = &patch.slug {
            self.slug = slug.clone();
        }
        if let Some(excerpt) = &patch.excerpt {
            self.excerpt = excerpt.clone();
        }
        if let Some(content) = &patch.content {
            self.content = content.clone();
            self.reading_time = Some(reading_time(content));
        }
        if let Some(image) = &patch.featured_image {
            self.featured_image = non_empty(Some(image.clone()));
        }
        if let Some(categories) = &patch.categories {
            self.categories = categories.clone();
        }
        if let Some(tags) = &patch.tags {
            self.tags = tags.clone();
        }
        if let Some(published) = patch.published {
            self.published = published;
        }
        if let Some(title) = &patch.seo_title {
            self.seo_title = non_empty(Some(title.clone()));
        }
        if let Some(description) = &patch.seo_description {
            self.seo_description = non_empty(Some(description.clone()));
        }
        if let Some(keywords) = &patch.seo_keywords {
            self.seo_keywords = Some(keywords.clone());
        }
        self.updated_at = now;
    }
}

/// Validated body of a create request, defaults applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    pub featured_image: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub published: bool,
    pub seo_title: String,
    pub seo_description: String,
    pub seo_keywords: Vec<String>,
}

impl NewPost {
    /// Sanitize every field: plain text everywhere except the rich content.
    pub fn sanitized(self) -> Self {
        Self {
            title: sanitize_plain_text(&self.title),
            slug: sanitize_plain_text(&self.slug),
            excerpt: sanitize_plain_text(&self.excerpt),
            content: sanitize_rich_html(&self.content),
            featured_image: sanitize_plain_text(&self.featured_image),
            categories: sanitize_plain_list(self.categories),
            tags: sanitize_plain_list(self.tags),
            published: self.published,
            seo_title: sanitize_plain_text(&self.seo_title),
            seo_description: sanitize_plain_text(&self.seo_description),
            seo_keywords: sanitize_plain_list(self.seo_keywords),
        }
    }

    /// Build the row to insert.
    pub fn into_row(self, id: String, author_id: &str, now: DateTime<Utc>) -> BlogPostRow {
        BlogPostRow {
            id,
            reading_time: Some(reading_time(&self.content)),
            slug: self.slug,
            title: self.title,
            excerpt: self.excerpt,
            content: self.content,
            featured_image: non_empty(Some(self.featured_image)),
            published_at: now,
            updated_at: now,
            categories: self.categories,
            tags: self.tags,
            published: self.published,
            author_id: Some(author_id.to_string()),
            seo_title: non_empty(Some(self.seo_title)),
            seo_description: non_empty(Some(self.seo_description)),
            seo_keywords: Some(self.seo_keywords),
            created_at: now,
            authors: None,
        }
    }

    /// Columns for an insert, snake_case as stored.
    pub fn to_columns(&self, author_id: &str) -> Map<String, Value> {
        let mut columns = Map::new();
        columns.insert("slug".into(), self.slug.clone().into());
        columns.insert("title".into(), self.title.clone().into());
        columns.insert("excerpt".into(), self.excerpt.clone().into());
        columns.insert("content".into(), self.content.clone().into());
        columns.insert("featured_image".into(), nullable(&self.featured_image));
        columns.insert("reading_time".into(), reading_time(&self.content).into());
        columns.insert("categories".into(), self.categories.clone().into());
        columns.insert("tags".into(), self.tags.clone().into());
        columns.insert("published".into(), self.published.into());
        columns.insert("author_id".into(), author_id.into());
        columns.insert("seo_title".into(), nullable(&self.seo_title));
        columns.insert("seo_description".into(), nullable(&self.seo_description));
        columns.insert("seo_keywords".into(), self.seo_keywords.clone().into());
        columns
    }
}

/// Validated body of an update request. Absent fields are left untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_keywords: Option<Vec<String>>,
}

impl PostPatch {
    pub fn sanitized(self) -> Self {
        let plain = |s: Option<String>| s.map(|s| sanitize_plain_text(&s));
        Self {
            title: plain(self.title),
            slug: plain(self.slug),
            excerpt: plain(self.excerpt),
            content: self.content.map(|c| sanitize_rich_html(&c)),
            featured_image: plain(self.featured_image),
            categories: self.categories.map(sanitize_plain_list),
            tags: self.tags.map(sanitize_plain_list),
            published: self.published,
            seo_title: plain(self.seo_title),
            seo_description: plain(self.seo_description),
            seo_keywords: self.seo_keywords.map(sanitize_plain_list),
        }
    }

    /// Columns to update, snake_case as stored.
    pub fn to_columns(&self, now: DateTime<Utc>) -> Map<String, Value> {
        let mut columns = Map::new();
        let mut put = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                columns.insert(key.to_string(), value);
            }
        };
        put("title", self.title.clone().map(Value::from));
        put("slug", self.slug.clone().map(Value::from));
        put("excerpt", self.excerpt.clone().map(Value::from));
        put("content", self.content.clone().map(Value::from));
        put("reading_time", self.content.as_deref().map(|c| reading_time(c).into()));
        put("featured_image", self.featured_image.as_deref().map(nullable));
        put("categories", self.categories.clone().map(Value::from));
        put("tags", self.tags.clone().map(Value::from));
        put("published", self.published.map(Value::from));
        put("seo_title", self.seo_title.as_deref().map(nullable));
        put("seo_description", self.seo_description.as_deref().map(nullable));
        put("seo_keywords", self.seo_keywords.clone().map(Value::from));
        put("updated_at", Some(now.to_rfc3339().into()));
        columns
    }
}

/// Minutes to read `content` at 200 words per minute, rounded up, at least one.
pub fn reading_time(content: &str) -> u32 {
    let text = TAG.replace_all(content, " ");
    let words = text.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as u32
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

fn nullable(value: &str) -> Value {
    if value.is_empty() {
        Value::Null
    } else {
        Value::from(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_post() -> NewPost {
        NewPost {
            title: "Hello World".into(),
            slug: "hello-world".into(),
            excerpt: "First post".into(),
            content: "<p>hi</p>".into(),
            featured_image: String::new(),
            categories: vec![],
            tags: vec!["rust".into()],
            published: false,
            seo_title: String::new(),
            seo_description: String::new(),
            seo_keywords: vec![],
        }
    }

    #[test]
    fn test_reading_time() {
        assert_eq!(reading_time("<p>hi</p>"), 1);
        assert_eq!(reading_time(""), 1);

        let words = vec!["word"; 200].join(" ");
        assert_eq!(reading_time(&format!("<p>{words}</p>")), 1);

        let words = vec!["word"; 201].join(" ");
        assert_eq!(reading_time(&words), 2);

        let words = vec!["<b>w</b>"; 450].join("");
        assert_eq!(reading_time(&words), 3);
    }

    #[test]
    fn test_row_fallbacks() {
        let now = Utc::now();
        let post = new_post().into_row("id-1".into(), "author-1", now).into_post();

        assert_eq!(post.seo.title, "Hello World");
        assert_eq!(post.seo.description, "First post");
        assert_eq!(post.author.name, "Anonymous");
        assert_eq!(post.author.id.as_deref(), Some("author-1"));
        assert_eq!(post.featured_image, "");
        assert_eq!(post.reading_time, 1);
    }

    #[test]
    fn test_joined_author() {
        let mut row = new_post().into_row("id-1".into(), "author-1", Utc::now());
        row.authors = Some(AuthorRow {
            id: "author-1".into(),
            name: "Dev".into(),
            image: None,
            bio: Some("Writes code".into()),
        });
        let post = row.into_post();
        assert_eq!(post.author.name, "Dev");
        assert_eq!(post.author.bio, "Writes code");
    }

    #[test]
    fn test_apply_patch() {
        let created = Utc::now();
        let mut row = new_post().into_row("id-1".into(), "author-1", created);
        let patch = PostPatch {
            title: Some("New".into()),
            content: Some(vec!["w"; 401].join(" ")),
            seo_title: Some(String::new()),
            ..Default::default()
        };
        let later = created + chrono::Duration::seconds(5);
        row.apply(&patch, later);

        assert_eq!(row.title, "New");
        assert_eq!(row.slug, "hello-world");
        assert_eq!(row.reading_time, Some(3));
        assert_eq!(row.seo_title, None);
        assert_eq!(row.updated_at, later);
        assert_eq!(row.published_at, created);
    }

    #[test]
    fn test_patch_columns_only_present_fields() {
        let patch = PostPatch {
            published: Some(true),
            featured_image: Some(String::new()),
            ..Default::default()
        };
        let columns = patch.to_columns(Utc::now());
        let mut keys: Vec<_> = columns.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["featured_image", "published", "updated_at"]);
        assert_eq!(columns["featured_image"], Value::Null);
    }

    #[test]
    fn test_sanitized_new_post() {
        let post = NewPost {
            title: "<b>Bold</b> title".into(),
            content: r#"<p>x</p><script>bad()</script><a href="https://a.com">l</a>"#.into(),
            tags: vec!["<i>rust</i>".into()],
            ..new_post()
        }
        .sanitized();

        assert_eq!(post.title, "Bold title");
        assert_eq!(post.tags, vec!["rust"]);
        assert!(!post.content.contains("script"));
        assert!(post.content.contains(r#"rel="noopener noreferrer""#));
    }
}
