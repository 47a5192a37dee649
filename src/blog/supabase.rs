//! PostgREST-backed post store for the hosted database.

use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::Utc;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::model::{BlogPost, BlogPostRow, NewPost, PostPatch};
use super::store::{PostStore, StoreError};

const TABLE: &str = "blog_posts";
const SELECT: &str = "*,authors(*)";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Talks to `{url}/rest/v1/blog_posts`.
#[derive(Clone)]
pub struct SupabasePostStore {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    bearer: String,
}

impl SupabasePostStore {
    /// `service_key` authorizes writes; when absent the anon key is used for both.
    pub fn new(client: reqwest::Client, base_url: &str, anon_key: &str, service_key: Option<&str>) -> Self {
        Self {
            client,
            endpoint: format!("{}/rest/v1/{TABLE}", base_url.trim_end_matches('/')),
            api_key: anon_key.to_string(),
            bearer: service_key.unwrap_or(anon_key).to_string(),
        }
    }

    fn request(&self, method: reqwest::Method) -> RequestBuilder {
        self.client
            .request(method, &self.endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.bearer)
    }

    async fn rows(&self, query: &[(&str, &str)]) -> Result<Vec<BlogPost>, StoreError> {
        let response = self
            .request(reqwest::Method::GET)
            .query(&[("select", SELECT)])
            .query(query)
            .send()
            .await?;
        let rows: Vec<BlogPostRow> = parse(response).await?;
        Ok(rows.into_iter().map(BlogPostRow::into_post).collect())
    }

    async fn single(&self, builder: RequestBuilder) -> Result<Option<BlogPost>, StoreError> {
        let response = builder.header("accept", SINGLE_OBJECT).send().await?;
        // PostgREST answers 406 when a single object was requested and no row matched.
        if response.status() == StatusCode::NOT_ACCEPTABLE {
            return Ok(None);
        }
        let row: BlogPostRow = parse(response).await?;
        Ok(Some(row.into_post()))
    }
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StoreError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}

#[async_trait]
impl PostStore for SupabasePostStore {
    async fn create(&self, post: NewPost, author_id: &str) -> Result<BlogPost, StoreError> {
        let builder = self
            .request(reqwest::Method::POST)
            .query(&[("select", SELECT)])
            .header("prefer", "return=representation")
            .json(&post.to_columns(author_id));

        let response = builder.header("accept", SINGLE_OBJECT).send().await?;
        let row: BlogPostRow = parse(response).await?;
        Ok(row.into_post())
    }

    async fn update(&self, id: &str, patch: PostPatch) -> Result<Option<BlogPost>, StoreError> {
        let filter = format!("eq.{id}");
        let builder = self
            .request(reqwest::Method::PATCH)
            .query(&[("id", filter.as_str()), ("select", SELECT)])
            .header("prefer", "return=representation")
            .json(&patch.to_columns(Utc::now()));
        self.single(builder).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let filter = format!("eq.{id}");
        let response = self
            .request(reqwest::Method::DELETE)
            .query(&[("id", filter.as_str()), ("select", "id")])
            .header("prefer", "return=representation")
            .send()
            .await?;
        let deleted: Vec<serde_json::Value> = parse(response).await?;
        Ok(!deleted.is_empty())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<BlogPost>, StoreError> {
        let filter = format!("eq.{id}");
        let builder = self
            .request(reqwest::Method::GET)
            .query(&[("select", SELECT), ("id", filter.as_str())]);
        self.single(builder).await
    }

    async fn get_published_by_slug(&self, slug: &str) -> Result<Option<BlogPost>, StoreError> {
        let filter = format!("eq.{slug}");
        let builder = self.request(reqwest::Method::GET).query(&[
            ("select", SELECT),
            ("slug", filter.as_str()),
            ("published", "eq.true"),
        ]);
        self.single(builder).await
    }

    async fn list_published(&self) -> Result<Vec<BlogPost>, StoreError> {
        self.rows(&[("published", "eq.true"), ("order", "published_at.desc")])
            .await
    }

    async fn list_all(&self) -> Result<Vec<BlogPost>, StoreError> {
        self.rows(&[("order", "updated_at.desc")]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_and_keys() {
        let store = SupabasePostStore::new(
            reqwest::Client::new(),
            "https://project.supabase.co/",
            "anon",
            None,
        );
        assert_eq!(store.endpoint, "https://project.supabase.co/rest/v1/blog_posts");
        assert_eq!(store.bearer, "anon");

        let store = SupabasePostStore::new(
            reqwest::Client::new(),
            "https://project.supabase.co",
            "anon",
            Some("service"),
        );
        assert_eq!(store.api_key, "anon");
        assert_eq!(store.bearer, "service");
    }

    #[test]
    fn test_row_deserializes_from_postgrest() {
        let row: BlogPostRow = serde_json::from_value(serde_json::json!({
            "id": "6f1c",
            "slug": "hello-world",
            "title": "Hello World",
            "excerpt": "...",
            "content": "<p>hi</p>",
            "featured_image": null,
            "published_at": "2024-05-01T10:00:00.123456+00:00",
            "updated_at": "2024-05-01T10:00:00+00:00",
            "reading_time": 1,
            "categories": ["engineering"],
            "tags": [],
            "published": true,
            "author_id": "a-1",
            "seo_title": null,
            "seo_description": "Greeting",
            "seo_keywords": null,
            "created_at": "2024-05-01T10:00:00+00:00",
            "authors": { "id": "a-1", "name": "Dev", "image": null, "bio": null }
        }))
        .unwrap();

        let post = row.into_post();
        assert_eq!(post.author.name, "Dev");
        assert_eq!(post.seo.title, "Hello World");
        assert_eq!(post.seo.description, "Greeting");
        assert_eq!(post.categories, vec!["engineering"]);
    }
}
