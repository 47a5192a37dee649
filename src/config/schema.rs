//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the API.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the portfolio API.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Origin allowlist, admin allowlists and response hardening.
    pub security: SecurityConfig,

    /// Per-route rate limits.
    pub rate_limit: RateLimitConfig,

    /// Hosted identity provider and database credentials.
    pub supabase: SupabaseConfig,

    /// Blog post persistence.
    pub store: StoreConfig,

    /// Contact form collaborators (CAPTCHA and mail).
    pub contact: ContactConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Origins permitted to issue state-changing requests.
    /// Empty means strict same-origin against the request's own host.
    pub allowed_origins: Vec<String>,

    /// Emails granted admin access.
    pub admin_emails: Vec<String>,

    /// User ids granted admin access.
    pub admin_user_ids: Vec<String>,

    /// Add hardening headers (CSP, frame options, ...) to every response.
    pub enable_headers: bool,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            admin_emails: Vec::new(),
            admin_user_ids: Vec::new(),
            enable_headers: true,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// A fixed-window budget for one route.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct RouteLimit {
    /// Maximum requests per window.
    pub limit: u32,

    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl RouteLimit {
    pub const fn new(limit: u32, window_ms: u64) -> Self {
        Self { limit, window_ms }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// How often expired counters are swept from the store.
    pub sweep_interval_secs: u64,

    pub blog_create: RouteLimit,
    pub blog_update: RouteLimit,
    pub blog_delete: RouteLimit,
    pub contact: RouteLimit,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 60,
            blog_create: RouteLimit::new(10, 60_000),
            blog_update: RouteLimit::new(20, 60_000),
            blog_delete: RouteLimit::new(10, 60_000),
            contact: RouteLimit::new(5, 60_000),
        }
    }
}

/// Hosted backend credentials. Treated as opaque.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SupabaseConfig {
    /// Project URL, e.g. "https://xyz.supabase.co".
    pub url: Option<String>,

    /// Public anon key, sent as `apikey` on every call.
    pub anon_key: Option<String>,

    /// Service key used for database writes. Falls back to the anon key.
    pub service_key: Option<String>,
}

/// Which `PostStore` implementation to run.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Supabase,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

/// Contact form configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContactConfig {
    /// reCAPTCHA secret. Required to accept contact messages.
    pub recaptcha_secret: Option<String>,

    pub recaptcha_verify_url: String,

    /// Resend API key. Required to deliver contact messages.
    pub resend_api_key: Option<String>,

    pub resend_endpoint: String,

    /// Sender shown on delivered messages.
    pub from: String,

    /// Recipient mailbox.
    pub to: String,

    pub subject: String,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            recaptcha_secret: None,
            recaptcha_verify_url: "https://www.google.com/recaptcha/api/siteverify".to_string(),
            resend_api_key: None,
            resend_endpoint: "https://api.resend.com/emails".to_string(),
            from: "Portfolio Contact Form <onboarding@resend.dev>".to_string(),
            to: String::new(),
            subject: "New Message from Portfolio Contact Form".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
