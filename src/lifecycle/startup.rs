//! Startup orchestration.
//!
//! # Responsibilities
//! - Start metrics, signal handling and the config watcher
//! - Start the admin API when enabled
//! - Bind the main listener (plain or TLS) and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::path::PathBuf;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::admin::{serve_admin, AdminState};
use crate::config::{ConfigError, ConfigWatcher, RouterConfig};
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::Shutdown;
use crate::net::tls::load_tls_config;
use crate::observability::metrics;

/// Fatal errors raised before or while serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("config watcher: {0}")]
    Watch(#[from] notify::Error),

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        source: std::io::Error,
    },
}

fn io_error(context: &'static str) -> impl FnOnce(std::io::Error) -> StartupError {
    move |source| StartupError::Io { context, source }
}

/// Start every subsystem and serve until SIGINT/SIGTERM.
pub async fn run(config: RouterConfig, config_path: Option<PathBuf>) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    // The watcher must outlive the server; dropping it stops notifications.
    let (_watcher, config_updates) = match &config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let server = HttpServer::new(config.clone())?;

    let admin_task = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address)
            .await
            .map_err(io_error("binding admin listener"))?;
        let state = AdminState::new(server.tenant_router(), &config.admin);
        let admin_shutdown = shutdown.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) = serve_admin(listener, state, admin_shutdown).await {
                tracing::error!(error = %e, "Admin API stopped with error");
            }
        }))
    } else {
        None
    };

    let result = match &config.listener.tls {
        Some(tls_config) => {
            let tls = load_tls_config(tls_config)
                .await
                .map_err(io_error("loading TLS certificates"))?;
            server.run_tls(tls, config_updates, shutdown.subscribe()).await
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address)
                .await
                .map_err(io_error("binding listener"))?;
            server.run(listener, config_updates, shutdown.subscribe()).await
        }
    };

    // Stop the admin API as well if the main server exited on its own.
    shutdown.trigger();
    if let Some(task) = admin_task {
        let _ = task.await;
    }

    result.map_err(StartupError::from)
}
