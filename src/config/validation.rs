//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Require a usable upstream credential
//! - Validate value ranges (ports, URL schemes, header syntax)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("OPENAI_API_KEY is not set")]
    MissingCredential,

    #[error("listener port must be non-zero")]
    InvalidPort,

    #[error("upstream url '{0}' is not a valid ws:// or wss:// URL")]
    InvalidUpstreamUrl(String),

    #[error("upstream model must not be empty")]
    EmptyModel,

    #[error("upstream header '{0}' is not a valid header")]
    InvalidHeader(String),
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match &config.credential {
        Some(credential) if !credential.is_blank() => {}
        _ => errors.push(ValidationError::MissingCredential),
    }

    if config.listener.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }

    match url::Url::parse(&config.upstream.url) {
        Ok(url) if matches!(url.scheme(), "ws" | "wss") && url.host().is_some() => {}
        _ => errors.push(ValidationError::InvalidUpstreamUrl(
            config.upstream.url.clone(),
        )),
    }

    if config.upstream.model.trim().is_empty() {
        errors.push(ValidationError::EmptyModel);
    }

    for (name, value) in &config.upstream.headers {
        let valid = HeaderName::from_bytes(name.as_bytes()).is_ok()
            && HeaderValue::from_str(value).is_ok()
            && !name.eq_ignore_ascii_case("authorization");
        if !valid {
            errors.push(ValidationError::InvalidHeader(name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
