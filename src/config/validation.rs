//! Configuration validation.
//!
//! Serde handles syntax; this pass checks values that parse but cannot work.
//! Every problem is reported, not just the first.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{AppConfig, RouteLimit, StoreBackend};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a fully merged configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be greater than 0"));
    }

    for origin in &config.security.allowed_origins {
        match Url::parse(origin) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => errors.push(ValidationError::new(
                "security.allowed_origins",
                format!("'{origin}' is not an http(s) origin"),
            )),
        }
    }

    let limits = [
        ("rate_limit.blog_create", config.rate_limit.blog_create),
        ("rate_limit.blog_update", config.rate_limit.blog_update),
        ("rate_limit.blog_delete", config.rate_limit.blog_delete),
        ("rate_limit.contact", config.rate_limit.contact),
    ];
    for (field, limit) in limits {
        check_route_limit(field, limit, &mut errors);
    }

    if config.rate_limit.sweep_interval_secs == 0 {
        errors.push(ValidationError::new(
            "rate_limit.sweep_interval_secs",
            "must be greater than 0",
        ));
    }

    if config.store.backend == StoreBackend::Supabase {
        if config.supabase.url.is_none() {
            errors.push(ValidationError::new(
                "supabase.url",
                "required when store.backend = \"supabase\"",
            ));
        }
        if config.supabase.anon_key.is_none() && config.supabase.service_key.is_none() {
            errors.push(ValidationError::new(
                "supabase.anon_key",
                "an anon or service key is required when store.backend = \"supabase\"",
            ));
        }
    }

    if let Some(url) = &config.supabase.url {
        if Url::parse(url).is_err() {
            errors.push(ValidationError::new("supabase.url", format!("'{url}' is not a URL")));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_route_limit(field: &str, limit: RouteLimit, errors: &mut Vec<ValidationError>) {
    if limit.limit == 0 {
        errors.push(ValidationError::new(format!("{field}.limit"), "must be greater than 0"));
    }
    if limit.window_ms == 0 {
        errors.push(ValidationError::new(format!("{field}.window_ms"), "must be greater than 0"));
    }
}
