//! Admin API.
//!
//! Served on its own listener, guarded by a bearer token:
//! - `GET /admin/status`: version, uptime, active rule count
//! - `GET /admin/rules`: active rule table and exemptions
//! - `GET /admin/resolve?host=..&path=..`: dry-run routing decision

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::config::AdminConfig;
use crate::routing::SharedRouter;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub router: SharedRouter,
    pub api_key: Arc<str>,
    pub started: Instant,
}

impl AdminState {
    pub fn new(router: SharedRouter, config: &AdminConfig) -> Self {
        Self {
            router,
            api_key: Arc::from(config.api_key.as_str()),
            started: Instant::now(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/rules", get(get_rules))
        .route("/admin/resolve", get(resolve))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

/// Serve the admin API until shutdown is signalled.
pub async fn serve_admin(
    listener: TcpListener,
    state: AdminState,
    mut shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    tracing::info!(address = %listener.local_addr()?, "Admin API listening");
    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
}
