//! Tenant router.
//!
//! ```text
//!   Client ──▶ listener (TCP/TLS)
//!                 │
//!                 ▼
//!        request ID ─▶ tenant rewrite ─▶ forward ──▶ application server
//!                          │
//!                          ▼
//!       acme.example.com/cohorts/42  →  /tenant/acme/cohort/42
//!
//!   admin API (status, rules, resolve) · Prometheus metrics · config hot reload
//! ```

use std::path::PathBuf;

use clap::Parser;

use tenant_router::config::{load_config, ObservabilityConfig, RouterConfig};
use tenant_router::lifecycle::startup;
use tenant_router::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "tenant-router")]
#[command(about = "Host-based tenant routing proxy", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long, env = "TENANT_ROUTER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path),
        None => Ok(RouterConfig::default()),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            init_logging(&ObservabilityConfig::default());
            tracing::error!(error = %e, path = ?args.config, "Failed to load configuration");
            return Err(e.into());
        }
    };

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tenant-router starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        namespace_prefix = %config.tenancy.namespace_prefix,
        rules = config.tenancy.rules.len(),
        tls = config.listener.tls.is_some(),
        "Configuration loaded"
    );

    startup::run(config, args.config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
