//! Tenant decision.
//!
//! # Responsibilities
//! - Skip exempt paths and paths already under the tenant namespace
//! - Resolve the tenant from the host
//! - Map the path through the rule table and build the namespaced path
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Total: every (host, path) pair yields a decision, never an error
//! - Explicit pass-through reasons rather than a silent default

use serde::Serialize;

use crate::config::schema::TenancyConfig;
use crate::routing::host::{subdomain_of, Subdomain};
use crate::routing::matcher::{segment_prefix, PathPattern};
use crate::routing::rules::RuleTable;

/// Why a request was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassReason {
    /// Path is on the exemption list.
    ExemptPath,
    /// Path already starts with the tenant namespace.
    AlreadyNamespaced,
    /// Host carries no usable subdomain.
    NoSubdomain,
    /// Subdomain belongs to the unscoped application.
    ReservedSubdomain,
}

/// Outcome of routing a single request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    PassThrough {
        reason: PassReason,
    },
    Rewrite {
        tenant: String,
        rule: Option<String>,
        path: String,
    },
}

impl Decision {
    fn pass(reason: PassReason) -> Self {
        Decision::PassThrough { reason }
    }

    /// Label for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            Decision::PassThrough { reason } => match reason {
                PassReason::ExemptPath => "exempt",
                PassReason::AlreadyNamespaced => "namespaced",
                PassReason::NoSubdomain => "no_subdomain",
                PassReason::ReservedSubdomain => "reserved",
            },
            Decision::Rewrite { .. } => "rewrite",
        }
    }

    pub fn is_rewrite(&self) -> bool {
        matches!(self, Decision::Rewrite { .. })
    }
}

/// The tenant router. Built once per configuration and shared via `Arc`.
#[derive(Debug, Clone, Serialize)]
pub struct TenantRouter {
    namespace_prefix: String,
    reserved_subdomains: Vec<String>,
    exempt: Vec<PathPattern>,
    rules: RuleTable,
}

impl TenantRouter {
    /// Compile a router from validated configuration.
    pub fn from_config(config: &TenancyConfig) -> Self {
        Self {
            namespace_prefix: config.namespace_prefix.trim_matches('/').to_string(),
            reserved_subdomains: config
                .reserved_subdomains
                .iter()
                .map(|s| s.to_ascii_lowercase())
                .collect(),
            exempt: config.exempt.iter().map(PathPattern::from).collect(),
            rules: RuleTable::from_config(&config.rules),
        }
    }

    /// Decide what to do with a request. `host` is the raw header value.
    pub fn decide(&self, host: Option<&str>, path: &str) -> Decision {
        if self.is_exempt(path) {
            return Decision::pass(PassReason::ExemptPath);
        }

        if self.is_namespaced(path) {
            return Decision::pass(PassReason::AlreadyNamespaced);
        }

        let Some(subdomain) = host.and_then(subdomain_of) else {
            return Decision::pass(PassReason::NoSubdomain);
        };

        if self.is_reserved(&subdomain) {
            return Decision::pass(PassReason::ReservedSubdomain);
        }

        let mapped = self.rules.map(path);
        Decision::Rewrite {
            path: self.tenant_path(&subdomain, &mapped.path),
            tenant: subdomain.to_string(),
            rule: mapped.rule,
        }
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt.iter().any(|p| p.matches(path))
    }

    pub fn is_namespaced(&self, path: &str) -> bool {
        segment_prefix(path, &format!("/{}", self.namespace_prefix)).is_some()
    }

    fn is_reserved(&self, subdomain: &Subdomain) -> bool {
        self.reserved_subdomains.iter().any(|r| r == subdomain.as_str())
    }

    fn tenant_path(&self, subdomain: &Subdomain, mapped: &str) -> String {
        if mapped.starts_with('/') {
            format!("/{}/{}{}", self.namespace_prefix, subdomain, mapped)
        } else {
            format!("/{}/{}/{}", self.namespace_prefix, subdomain, mapped)
        }
    }

    pub fn namespace_prefix(&self) -> &str {
        &self.namespace_prefix
    }

    pub fn reserved_subdomains(&self) -> &[String] {
        &self.reserved_subdomains
    }

    pub fn exempt_paths(&self) -> &[PathPattern] {
        &self.exempt
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }
}

impl Default for TenantRouter {
    fn default() -> Self {
        Self::from_config(&TenancyConfig::default())
    }
}
