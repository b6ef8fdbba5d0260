//! HTTP server setup and upstream forwarding.
//!
//! # Responsibilities
//! - Create the Axum router with the forwarding handler
//! - Wire up middleware (tracing, timeout, body limit, request ID, tenant rewrite)
//! - Forward requests to the upstream application
//! - Swap in reloaded tenant rules
//! - Stop on the shutdown broadcast

use std::net::SocketAddr;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{
        header::{self, HeaderMap, HeaderName, HeaderValue, HOST},
        uri::{Authority, Scheme},
        Request, StatusCode, Uri, Version,
    },
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::Span;

use crate::config::{RouterConfig, UpstreamConfig};
use crate::http::middleware::{tenant_rewrite_middleware, TenantContext};
use crate::http::request::{RequestId, RequestIdExt, RequestIdLayer, X_REQUEST_ID};
use crate::observability::metrics;
use crate::routing::{SharedRouter, TenantRouter};

const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Headers that describe a single hop and are not forwarded.
const HOP_BY_HOP: [HeaderName; 6] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::TE,
    header::TRAILER,
    header::UPGRADE,
];

/// Errors raised while setting up the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid upstream {0:?}")]
    InvalidUpstream(String),

    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Where forwarded requests go.
#[derive(Debug, Clone)]
pub struct Upstream {
    scheme: Scheme,
    authority: Authority,
    tenant_header: HeaderName,
}

impl Upstream {
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, ServerError> {
        let invalid = || ServerError::InvalidUpstream(config.url.clone());

        let uri: Uri = config.url.parse().map_err(|_| invalid())?;
        let scheme = uri.scheme().cloned().ok_or_else(invalid)?;
        let authority = uri.authority().cloned().ok_or_else(invalid)?;
        let tenant_header = HeaderName::from_bytes(config.tenant_header.as_bytes())
            .map_err(|_| ServerError::InvalidUpstream(config.tenant_header.clone()))?;

        Ok(Self {
            scheme,
            authority,
            tenant_header,
        })
    }

    /// Target URI: upstream scheme and authority, request path and query.
    pub fn uri_for(&self, uri: &Uri) -> Result<Uri, axum::http::Error> {
        let mut parts = uri.clone().into_parts();
        parts.scheme = Some(self.scheme.clone());
        parts.authority = Some(self.authority.clone());
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some("/".parse()?);
        }
        Ok(Uri::from_parts(parts)?)
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: Client<HttpConnector, Body>,
    pub upstream: Arc<Upstream>,
}

/// HTTP server for the tenant router.
pub struct HttpServer {
    router: Router,
    config: RouterConfig,
    tenant_router: SharedRouter,
}

impl HttpServer {
    /// Create a new HTTP server with the given (validated) configuration.
    pub fn new(config: RouterConfig) -> Result<Self, ServerError> {
        let tenant_router: SharedRouter =
            Arc::new(ArcSwap::from_pointee(TenantRouter::from_config(&config.tenancy)));

        let upstream = Arc::new(Upstream::from_config(&config.upstream)?);
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState { client, upstream };
        let router = Self::build_router(&config, state, tenant_router.clone());

        Ok(Self {
            router,
            config,
            tenant_router,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &RouterConfig, state: AppState, tenant_router: SharedRouter) -> Router {
        Router::new()
            .fallback(forward_handler)
            .with_state(state)
            .layer(middleware::from_fn_with_state(
                tenant_router,
                tenant_rewrite_middleware,
            ))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(RequestIdLayer)
    }

    /// Run the server on a plain TCP listener until shutdown is signalled.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<RouterConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        tracing::info!(address = %addr, "HTTP server starting");

        let reloader = spawn_reloader(self.tenant_router.clone(), config_updates);

        let (draining_tx, draining_rx) = oneshot::channel::<()>();
        let mut server = tokio::spawn(
            axum::serve(listener, self.router.into_make_service())
                .with_graceful_shutdown(async move {
                    let _ = shutdown.recv().await;
                    tracing::info!("HTTP server draining connections");
                    let _ = draining_tx.send(());
                })
                .into_future(),
        );

        // Long-lived response bodies would otherwise hold the drain open forever.
        let deadline = async move {
            match draining_rx.await {
                Ok(()) => tokio::time::sleep(grace).await,
                Err(_) => std::future::pending().await,
            }
        };

        let result = tokio::select! {
            joined = &mut server => joined.map_err(std::io::Error::other)?,
            _ = deadline => {
                server.abort();
                tracing::warn!(
                    grace_secs = grace.as_secs(),
                    "Shutdown grace period elapsed, no longer waiting for open connections"
                );
                Ok(())
            }
        };

        reloader.abort();
        result?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server with TLS termination on the configured bind address.
    pub async fn run_tls(
        self,
        tls: RustlsConfig,
        config_updates: mpsc::UnboundedReceiver<RouterConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr: SocketAddr = self
            .config
            .listener
            .bind_address
            .parse()
            .map_err(|_| ServerError::InvalidBindAddress(self.config.listener.bind_address.clone()))?;
        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        tracing::info!(address = %addr, "HTTPS server starting");

        let reloader = spawn_reloader(self.tenant_router.clone(), config_updates);

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTPS server draining connections");
            shutdown_handle.graceful_shutdown(Some(grace));
        });

        let result = axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await;

        reloader.abort();
        result?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    /// Handle to the active tenant router, shared with the admin API.
    pub fn tenant_router(&self) -> SharedRouter {
        self.tenant_router.clone()
    }

    /// The fully layered application, for in-process use.
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }
}

/// Apply reloaded configs to the shared router until the sender closes.
fn spawn_reloader(
    router: SharedRouter,
    mut updates: mpsc::UnboundedReceiver<RouterConfig>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(config) = updates.recv().await {
            router.store(Arc::new(TenantRouter::from_config(&config.tenancy)));
            metrics::record_config_reload(true);
            tracing::info!(
                rules = config.tenancy.rules.len(),
                namespace_prefix = %config.tenancy.namespace_prefix,
                "Tenant rules reloaded"
            );
        }
    })
}

/// Span for one request; runs inside [`RequestIdLayer`] so the ID is known.
fn request_span(request: &Request<Body>) -> Span {
    let request_id = request.request_id().map(RequestId::as_str).unwrap_or("unknown");
    tracing::debug_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

/// Replace any client-supplied `x-forwarded-host` with the host it addressed.
fn set_forwarded_host(headers: &mut HeaderMap, uri: &Uri) {
    headers.remove(X_FORWARDED_HOST);
    let host = headers.get(HOST).cloned().or_else(|| {
        uri.authority()
            .and_then(|authority| HeaderValue::from_str(authority.as_str()).ok())
    });
    if let Some(host) = host {
        headers.insert(X_FORWARDED_HOST, host);
    }
}

/// Forwards the (possibly rewritten) request to the upstream application.
async fn forward_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request
        .request_id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let method = request.method().to_string();

    let (mut parts, body) = request.into_parts();

    let uri = match state.upstream.uri_for(&parts.uri) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Could not build upstream URI");
            metrics::record_request(&method, 502, start_time);
            return (StatusCode::BAD_GATEWAY, "Invalid upstream request").into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        "Forwarding request"
    );

    for name in &HOP_BY_HOP {
        parts.headers.remove(name);
    }
    set_forwarded_host(&mut parts.headers, &parts.uri);
    // Only the router decides the tenant.
    parts.headers.remove(&state.upstream.tenant_header);
    if let Some(ctx) = parts.extensions.get::<TenantContext>() {
        if let Ok(value) = HeaderValue::from_str(&ctx.tenant) {
            parts.headers.insert(state.upstream.tenant_header.clone(), value);
        }
    }
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        parts.headers.insert(X_REQUEST_ID, value);
    }

    parts.uri = uri;
    parts.version = Version::HTTP_11;
    let upstream_request = Request::from_parts(parts, body);

    match state.client.request(upstream_request).await {
        Ok(response) => {
            metrics::record_request(&method, response.status().as_u16(), start_time);
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            metrics::record_request(&method, 502, start_time);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
