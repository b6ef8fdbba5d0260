//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the tenant router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Application server that receives forwarded requests.
    pub upstream: UpstreamConfig,

    /// Tenant resolution: reserved names, exemptions, path rules.
    pub tenancy: TenancyConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,

    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Upstream application server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL, scheme and authority only (e.g., "http://127.0.0.1:3000").
    pub url: String,

    /// Header carrying the resolved tenant to the upstream.
    pub tenant_header: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3000".to_string(),
            tenant_header: "x-tenant".to_string(),
        }
    }
}

/// How a configured path is compared against the request path.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Whole path equality.
    Exact,
    /// Raw string prefix.
    Prefix,
    /// Prefix ending on a `/` boundary.
    #[default]
    Segment,
}

/// A path condition used by the exemption list.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PathMatchConfig {
    #[serde(default)]
    pub kind: MatchKind,

    pub path: String,
}

impl PathMatchConfig {
    pub fn new(kind: MatchKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// What a matching rule does to the request path.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    /// Replace the whole path.
    Rewrite { to: String },
    /// Replace the matched prefix, keep the remainder.
    ReplacePrefix { with: String },
    /// Leave the path as it is.
    #[default]
    Keep,
}

/// One entry of the ordered tenant path table.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RuleConfig {
    /// Rule identifier for logging/metrics.
    pub name: String,

    #[serde(default)]
    pub kind: MatchKind,

    pub path: String,

    #[serde(default)]
    pub action: RuleAction,
}

impl RuleConfig {
    fn new(name: &str, kind: MatchKind, path: &str, action: RuleAction) -> Self {
        Self {
            name: name.to_string(),
            kind,
            path: path.to_string(),
            action,
        }
    }
}

/// Tenant resolution settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TenancyConfig {
    /// Path segment namespacing resolved tenant routes (`/tenant/<sub>/...`).
    pub namespace_prefix: String,

    /// Subdomains served by the unscoped application.
    pub reserved_subdomains: Vec<String>,

    /// Paths the router never rewrites.
    pub exempt: Vec<PathMatchConfig>,

    /// Ordered path rules, first match wins.
    pub rules: Vec<RuleConfig>,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            namespace_prefix: "tenant".to_string(),
            reserved_subdomains: vec!["admin".to_string()],
            exempt: default_exempt_paths(),
            rules: default_rules(),
        }
    }
}

fn default_exempt_paths() -> Vec<PathMatchConfig> {
    vec![
        PathMatchConfig::new(MatchKind::Segment, "/api"),
        PathMatchConfig::new(MatchKind::Prefix, "/_next/static/"),
        PathMatchConfig::new(MatchKind::Prefix, "/_next/image/"),
        PathMatchConfig::new(MatchKind::Exact, "/favicon.ico"),
    ]
}

fn default_rules() -> Vec<RuleConfig> {
    let login = || RuleAction::Rewrite { to: "/login".to_string() };
    vec![
        RuleConfig::new("root", MatchKind::Exact, "/", login()),
        RuleConfig::new("login", MatchKind::Exact, "/login", login()),
        RuleConfig::new(
            "dashboard",
            MatchKind::Exact,
            "/dashboard",
            RuleAction::Rewrite { to: "/dashboard".to_string() },
        ),
        RuleConfig::new(
            "cohorts",
            MatchKind::Segment,
            "/cohorts",
            RuleAction::ReplacePrefix { with: "/cohort".to_string() },
        ),
        RuleConfig::new("cohort", MatchKind::Segment, "/cohort", RuleAction::Keep),
        RuleConfig::new("assessment", MatchKind::Segment, "/assessment", RuleAction::Keep),
    ]
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Time allowed for in-flight requests to drain on shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}
