//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load a TOML file (or defaults when `path` is `None`), apply environment
/// overrides from the process environment, and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto a parsed config.
///
/// List variables are comma-separated. `ALLOWED_ORIGINS` falls back to
/// `SITE_URL` when unset.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = lookup("BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }

    if let Some(emails) = lookup("ADMIN_EMAILS") {
        config.security.admin_emails = parse_list(&emails);
    }
    if let Some(ids) = lookup("ADMIN_USER_IDS") {
        config.security.admin_user_ids = parse_list(&ids);
    }

    let origins = lookup("ALLOWED_ORIGINS")
        .filter(|v| !v.trim().is_empty())
        .or_else(|| lookup("SITE_URL"));
    if let Some(origins) = origins {
        config.security.allowed_origins = parse_list(&origins);
    }

    if let Some(url) = lookup("SUPABASE_URL") {
        config.supabase.url = Some(url);
    }
    if let Some(key) = lookup("SUPABASE_ANON_KEY") {
        config.supabase.anon_key = Some(key);
    }
    if let Some(key) = lookup("SUPABASE_SERVICE_KEY") {
        config.supabase.service_key = Some(key);
    }

    if let Some(secret) = lookup("RECAPTCHA_SECRET_KEY") {
        config.contact.recaptcha_secret = Some(secret);
    }
    if let Some(key) = lookup("RESEND_API_KEY") {
        config.contact.resend_api_key = Some(key);
    }
    if let Some(to) = lookup("CONTACT_TO") {
        config.contact.to = to;
    }
}

/// Split a comma-separated list, trimming whitespace and dropping empties.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
