//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the shared `AppState` from config and collaborators
//! - Create the Axum router for the blog, contact and admin APIs
//! - Wire up middleware (request id, tracing, security headers, limits, metrics)
//! - Turn handler panics into a generic 500
//! - Serve with connect info and graceful shutdown
//! - Run the rate-limit sweeper alongside the server

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::auth::{DisabledIdentity, IdentityProvider, SupabaseIdentity};
use crate::blog::{self, MemoryPostStore, PostStore, SupabasePostStore};
use crate::config::{AppConfig, StoreBackend};
use crate::contact::{self, CaptchaVerifier, Mailer, RecaptchaVerifier, ResendMailer};
use crate::error::ApiError;
use crate::http::request::X_REQUEST_ID;
use crate::observability::metrics;
use crate::security::headers::security_headers_middleware;
use crate::security::rate_limit::RateLimitSweeper;
use crate::security::{AdminAllowlist, AllowedOrigins, FixedWindowLimiter};

/// External collaborators the pipeline calls.
#[derive(Clone)]
pub struct Services {
    pub identity: Arc<dyn IdentityProvider>,
    pub posts: Arc<dyn PostStore>,
    pub captcha: Arc<dyn CaptchaVerifier>,
    pub mailer: Arc<dyn Mailer>,
}

impl Services {
    /// Hosted clients where configured, in-process fallbacks otherwise.
    pub fn from_config(config: &AppConfig) -> Self {
        let client = reqwest::Client::new();
        let supabase = &config.supabase;

        let identity: Arc<dyn IdentityProvider> = match (&supabase.url, &supabase.anon_key) {
            (Some(url), Some(key)) => Arc::new(SupabaseIdentity::new(client.clone(), url, key)),
            _ => {
                tracing::warn!("No identity provider configured; admin routes will reject every caller");
                Arc::new(DisabledIdentity)
            }
        };

        let posts: Arc<dyn PostStore> = match config.store.backend {
            StoreBackend::Memory => Arc::new(MemoryPostStore::new()),
            StoreBackend::Supabase => {
                let url = supabase.url.as_deref().unwrap_or_default();
                let anon = supabase
                    .anon_key
                    .as_deref()
                    .or(supabase.service_key.as_deref())
                    .unwrap_or_default();
                Arc::new(SupabasePostStore::new(
                    client.clone(),
                    url,
                    anon,
                    supabase.service_key.as_deref(),
                ))
            }
        };

        let captcha = Arc::new(RecaptchaVerifier::new(
            client.clone(),
            config.contact.recaptcha_verify_url.clone(),
            config.contact.recaptcha_secret.clone(),
        ));
        let mailer = Arc::new(ResendMailer::new(
            client,
            config.contact.resend_endpoint.clone(),
            config.contact.resend_api_key.clone(),
        ));

        Self {
            identity,
            posts,
            captcha,
            mailer,
        }
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub allowed_origins: Arc<AllowedOrigins>,
    pub admins: Arc<AdminAllowlist>,
    pub limiter: FixedWindowLimiter,
    pub services: Services,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: AppConfig, services: Services) -> Self {
        let allowed_origins = AllowedOrigins::new(&config.security.allowed_origins);
        let admins = AdminAllowlist::new(
            config.security.admin_emails.iter().cloned(),
            config.security.admin_user_ids.iter().cloned(),
        );
        if admins.is_empty() {
            tracing::warn!("Admin allowlist is empty; every admin request will be forbidden");
        }
        if allowed_origins.is_empty() {
            tracing::info!("No origin allowlist; requiring same-origin requests");
        }

        Self {
            config: Arc::new(config),
            allowed_origins: Arc::new(allowed_origins),
            admins: Arc::new(admins),
            limiter: FixedWindowLimiter::in_memory(),
            services,
            started_at: Instant::now(),
        }
    }
}

/// HTTP server for the portfolio API.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(config: AppConfig, services: Services) -> Self {
        let state = AppState::new(config, services);
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let config = state.config.clone();

        let mut router = Router::new()
            .route(
                "/api/blog",
                get(blog::handlers::list_published).post(blog::handlers::create_post),
            )
            .route(
                "/api/blog/{id}",
                put(blog::handlers::update_post).delete(blog::handlers::delete_post),
            )
            .route("/api/blog/slug/{slug}", get(blog::handlers::get_by_slug))
            .route("/api/send", post(contact::handlers::send_message))
            .route("/healthz", get(healthz))
            .nest("/api/admin", admin::router(state.clone()))
            .fallback(not_found)
            .with_state(state)
            .layer(middleware::from_fn(metrics::track_requests))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(CatchPanicLayer::custom(panic_response));

        if config.security.enable_headers {
            router = router.layer(middleware::from_fn(security_headers_middleware));
        }

        router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper = RateLimitSweeper::new(
            self.state.limiter.store().clone(),
            Duration::from_secs(self.state.config.rate_limit.sweep_interval_secs),
        );
        tokio::spawn(sweeper.run(shutdown.resubscribe()));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Generic 500 for a request whose handler panicked.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Handler panicked");
    metrics::record_rejection("panic");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}
