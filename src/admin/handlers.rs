use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::routing::matcher::PathPattern;
use crate::routing::rules::PathRule;
use crate::routing::{subdomain_of, Decision};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub namespace_prefix: String,
    pub rule_count: usize,
}

#[derive(Serialize)]
pub struct RulesSnapshot {
    pub namespace_prefix: String,
    pub reserved_subdomains: Vec<String>,
    pub exempt: Vec<PathPattern>,
    pub rules: Vec<PathRule>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveParams {
    pub host: Option<String>,
    pub path: String,
}

#[derive(Serialize)]
pub struct Resolution {
    pub request_host: Option<String>,
    pub request_path: String,
    pub subdomain: Option<String>,
    #[serde(flatten)]
    pub decision: Decision,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let router = state.router.load();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started.elapsed().as_secs(),
        namespace_prefix: router.namespace_prefix().to_string(),
        rule_count: router.rules().len(),
    })
}

pub async fn get_rules(State(state): State<AdminState>) -> Json<RulesSnapshot> {
    let router = state.router.load();
    Json(RulesSnapshot {
        namespace_prefix: router.namespace_prefix().to_string(),
        reserved_subdomains: router.reserved_subdomains().to_vec(),
        exempt: router.exempt_paths().to_vec(),
        rules: router.rules().iter().cloned().collect(),
    })
}

/// Dry run of the routing decision for a host and path.
pub async fn resolve(
    State(state): State<AdminState>,
    Query(params): Query<ResolveParams>,
) -> Json<Resolution> {
    let decision = state.router.load().decide(params.host.as_deref(), &params.path);
    let subdomain = params
        .host
        .as_deref()
        .and_then(subdomain_of)
        .map(|s| s.to_string());

    Json(Resolution {
        request_host: params.host,
        request_path: params.path,
        subdomain,
        decision,
    })
}
