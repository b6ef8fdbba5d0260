//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, URLs and value ranges
//! - Check rule table consistency (paths, targets, unique names)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::uri::PathAndQuery;
use thiserror::Error;
use url::Url;

use crate::config::schema::{RouterConfig, RuleAction};
use crate::routing::Subdomain;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("upstream.url: {0}")]
    InvalidUpstream(String),

    #[error("tenancy.namespace_prefix must be a single non-empty path segment, got {0:?}")]
    InvalidNamespacePrefix(String),

    #[error("tenancy.reserved_subdomains: {0:?} is not a valid DNS label")]
    InvalidReservedSubdomain(String),

    #[error("{field}: path {path:?} must start with '/'")]
    RelativePath { field: String, path: String },

    #[error("{field}: {path:?} is not a valid URI path")]
    InvalidUriPath { field: String, path: String },

    #[error("tenancy.rules: duplicate rule name {0:?}")]
    DuplicateRule(String),

    #[error("upstream.tenant_header: {0:?} is not a valid header name")]
    InvalidHeaderName(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address("listener.bind_address", &config.listener.bind_address, &mut errors);
    if config.admin.enabled {
        check_address("admin.bind_address", &config.admin.bind_address, &mut errors);
    }
    if config.observability.metrics_enabled {
        check_address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }

    if let Err(e) = check_upstream(&config.upstream.url) {
        errors.push(e);
    }

    if axum::http::HeaderName::from_bytes(config.upstream.tenant_header.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidHeaderName(config.upstream.tenant_header.clone()));
    }

    let tenancy = &config.tenancy;
    let prefix = tenancy.namespace_prefix.trim_matches('/');
    if prefix.is_empty() || prefix.contains('/') {
        errors.push(ValidationError::InvalidNamespacePrefix(tenancy.namespace_prefix.clone()));
    } else if !is_uri_path(&format!("/{prefix}/t")) {
        errors.push(ValidationError::InvalidUriPath {
            field: "tenancy.namespace_prefix".to_string(),
            path: tenancy.namespace_prefix.clone(),
        });
    }

    for name in &tenancy.reserved_subdomains {
        if Subdomain::parse(name).is_none() {
            errors.push(ValidationError::InvalidReservedSubdomain(name.clone()));
        }
    }

    for (i, entry) in tenancy.exempt.iter().enumerate() {
        check_path(format!("tenancy.exempt[{i}]"), &entry.path, &mut errors);
    }

    let mut names = HashSet::new();
    for rule in &tenancy.rules {
        let field = format!("tenancy.rules.{}", rule.name);
        check_path(field.clone(), &rule.path, &mut errors);
        match &rule.action {
            RuleAction::Rewrite { to } => check_target(format!("{field}.to"), to, &mut errors),
            RuleAction::ReplacePrefix { with } => check_target(format!("{field}.with"), with, &mut errors),
            RuleAction::Keep => {}
        }
        if !names.insert(rule.name.as_str()) {
            errors.push(ValidationError::DuplicateRule(rule.name.clone()));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_path(field: String, path: &str, errors: &mut Vec<ValidationError>) {
    if !path.starts_with('/') {
        errors.push(ValidationError::RelativePath {
            field,
            path: path.to_string(),
        });
    }
}

/// Rewrite targets end up in the request URI, so they must parse as a bare path.
fn check_target(field: String, path: &str, errors: &mut Vec<ValidationError>) {
    if !path.starts_with('/') {
        check_path(field, path, errors);
    } else if !is_uri_path(path) {
        errors.push(ValidationError::InvalidUriPath {
            field,
            path: path.to_string(),
        });
    }
}

fn is_uri_path(path: &str) -> bool {
    PathAndQuery::try_from(path)
        .map(|pq| pq.path() == path && pq.query().is_none())
        .unwrap_or(false)
}

fn check_upstream(raw: &str) -> Result<(), ValidationError> {
    let url = Url::parse(raw).map_err(|e| ValidationError::InvalidUpstream(e.to_string()))?;
    if url.scheme() != "http" {
        return Err(ValidationError::InvalidUpstream(format!(
            "unsupported scheme {:?}, only http is forwarded",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(ValidationError::InvalidUpstream("missing host".to_string()));
    }
    if url.path() != "/" || url.query().is_some() {
        return Err(ValidationError::InvalidUpstream(
            "must not carry a path or query".to_string(),
        ));
    }
    Ok(())
}
