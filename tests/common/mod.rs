//! Shared server harness and collaborator doubles for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderMap;
use tokio::net::TcpListener;

use portfolio_api::auth::{access_token, AuthError, IdentityProvider, User};
use portfolio_api::blog::{
    BlogPost, MemoryPostStore, NewPost, PostPatch, PostStore, StoreError,
};
use portfolio_api::config::AppConfig;
use portfolio_api::contact::{
    CaptchaError, CaptchaVerifier, ContactEmail, MailError, MailReceipt, Mailer,
};
use portfolio_api::http::{HttpServer, Services};
use portfolio_api::lifecycle::Shutdown;

pub const ADMIN_TOKEN: &str = "admin-token";
pub const USER_TOKEN: &str = "user-token";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const REJECTED_CAPTCHA: &str = "bad-token";

/// Resolves a fixed set of bearer tokens.
pub struct StaticIdentity {
    users: HashMap<String, User>,
}

impl StaticIdentity {
    pub fn new() -> Self {
        let mut users = HashMap::new();
        users.insert(
            ADMIN_TOKEN.to_string(),
            User {
                id: "admin-1".into(),
                email: Some(ADMIN_EMAIL.into()),
            },
        );
        users.insert(
            USER_TOKEN.to_string(),
            User {
                id: "user-1".into(),
                email: Some("reader@example.com".into()),
            },
        );
        Self { users }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn resolve_user(&self, headers: &HeaderMap) -> Result<Option<User>, AuthError> {
        Ok(access_token(headers).and_then(|token| self.users.get(&token).cloned()))
    }
}

/// Accepts every token except [`REJECTED_CAPTCHA`].
#[derive(Default)]
pub struct StubCaptcha {
    pub calls: AtomicUsize,
}

#[async_trait]
impl CaptchaVerifier for StubCaptcha {
    async fn verify(&self, token: &str, _remote_ip: Option<&str>) -> Result<bool, CaptchaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(token != REJECTED_CAPTCHA)
    }
}

/// Keeps every message instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<ContactEmail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: ContactEmail) -> Result<MailReceipt, MailError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(email);
        Ok(MailReceipt {
            id: format!("msg-{}", sent.len()),
        })
    }
}

/// Panics on every call, standing in for a collaborator bug.
pub struct PanickingStore;

#[async_trait]
impl PostStore for PanickingStore {
    async fn create(&self, _post: NewPost, _author_id: &str) -> Result<BlogPost, StoreError> {
        panic!("store exploded on create");
    }

    async fn update(&self, _id: &str, _patch: PostPatch) -> Result<Option<BlogPost>, StoreError> {
        panic!("store exploded on update");
    }

    async fn delete(&self, _id: &str) -> Result<bool, StoreError> {
        panic!("store exploded on delete");
    }

    async fn get_by_id(&self, _id: &str) -> Result<Option<BlogPost>, StoreError> {
        panic!("store exploded on get_by_id");
    }

    async fn get_published_by_slug(&self, _slug: &str) -> Result<Option<BlogPost>, StoreError> {
        panic!("store exploded on get_published_by_slug");
    }

    async fn list_published(&self) -> Result<Vec<BlogPost>, StoreError> {
        panic!("store exploded on list_published");
    }

    async fn list_all(&self) -> Result<Vec<BlogPost>, StoreError> {
        panic!("store exploded on list_all");
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub captcha: Arc<StubCaptcha>,
    pub mailer: Arc<RecordingMailer>,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// The server's own origin, which passes the same-origin check.
    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// A request carrying a same-origin `Origin` header.
    pub fn same_origin(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header("origin", self.origin())
    }

    /// Same-origin request authenticated as the allowlisted admin.
    pub fn as_admin(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.same_origin(method, path).bearer_auth(ADMIN_TOKEN)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Defaults plus one allowlisted admin email and a contact recipient.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.security.admin_emails = vec![ADMIN_EMAIL.into()];
    config.contact.to = "owner@example.com".into();
    config
}

pub async fn spawn_server() -> TestServer {
    spawn_server_with(test_config()).await
}

pub async fn spawn_server_with(config: AppConfig) -> TestServer {
    spawn_server_with_store(config, Arc::new(MemoryPostStore::new())).await
}

pub async fn spawn_server_with_store(config: AppConfig, posts: Arc<dyn PostStore>) -> TestServer {
    let captcha = Arc::new(StubCaptcha::default());
    let mailer = Arc::new(RecordingMailer::default());
    let services = Services {
        identity: Arc::new(StaticIdentity::new()),
        posts,
        captcha: captcha.clone(),
        mailer: mailer.clone(),
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, services);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    TestServer {
        addr,
        client,
        captcha,
        mailer,
        shutdown,
    }
}
