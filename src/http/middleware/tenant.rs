//! Tenant rewrite middleware.
//! Moves tenant traffic under `/<prefix>/<subdomain>/...` before it is forwarded.

use axum::{
    body::Body,
    extract::State,
    http::{header::HOST, uri::PathAndQuery, Request, Uri},
    middleware::Next,
    response::Response,
};

use crate::http::request::RequestIdExt;
use crate::observability::metrics;
use crate::routing::{Decision, SharedRouter};

/// Context attached to rewritten requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant: String,
    pub rule: Option<String>,
    pub original_path: String,
}

/// Host of the request: the `Host` header, or the URI authority (HTTP/2).
pub fn request_host<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| req.uri().authority().map(|a| a.as_str()))
}

/// Replace the path of `uri`, keeping its query string.
pub fn rewrite_uri(uri: &Uri, path: &str) -> Result<Uri, axum::http::Error> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query)?);
    Ok(Uri::from_parts(parts)?)
}

pub async fn tenant_rewrite_middleware(
    State(router): State<SharedRouter>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let host = request_host(&req).map(str::to_owned);
    let path = req.uri().path().to_owned();

    let decision = router.load().decide(host.as_deref(), &path);
    metrics::record_decision(decision.outcome());

    if let Decision::Rewrite { tenant, rule, path: target } = decision {
        let request_id = req.request_id().map(|id| id.to_string()).unwrap_or_default();
        match rewrite_uri(req.uri(), &target) {
            Ok(uri) => {
                tracing::debug!(
                    request_id = %request_id,
                    host = ?host,
                    tenant = %tenant,
                    rule = ?rule,
                    from = %path,
                    to = %target,
                    "Rewriting request to tenant route"
                );
                *req.uri_mut() = uri;
                req.extensions_mut().insert(TenantContext {
                    tenant,
                    rule,
                    original_path: path,
                });
            }
            Err(e) => {
                // Fail open: serve the request unrewritten.
                tracing::warn!(
                    request_id = %request_id,
                    tenant = %tenant,
                    to = %target,
                    error = %e,
                    "Could not build tenant URI, passing through"
                );
            }
        }
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arc_swap::ArcSwap;
    use axum::{middleware, Router};
    use tower::ServiceExt;

    use crate::routing::TenantRouter;

    /// Echoes the URI the inner service saw plus the resolved tenant.
    fn app() -> Router {
        let router: SharedRouter = Arc::new(ArcSwap::from_pointee(TenantRouter::default()));
        Router::new()
            .fallback(|req: Request<Body>| async move {
                let tenant = req
                    .extensions()
                    .get::<TenantContext>()
                    .map(|ctx| ctx.tenant.clone())
                    .unwrap_or_else(|| "-".to_string());
                format!("{} {}", tenant, req.uri())
            })
            .layer(middleware::from_fn_with_state(router, tenant_rewrite_middleware))
    }

    async fn call(host: &str, uri: &str) -> String {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header(HOST, host)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_rewrites_tenant_request() {
        assert_eq!(call("acme.example.com", "/cohorts/42").await, "acme /tenant/acme/cohort/42");
        assert_eq!(call("acme.example.com", "/").await, "acme /tenant/acme/login");
    }

    #[tokio::test]
    async fn test_preserves_query_string() {
        assert_eq!(
            call("acme.example.com", "/dashboard?range=30d&sort=asc").await,
            "acme /tenant/acme/dashboard?range=30d&sort=asc"
        );
    }

    #[tokio::test]
    async fn test_passes_through_unscoped_requests() {
        assert_eq!(call("admin.example.com", "/cohorts").await, "- /cohorts");
        assert_eq!(call("localhost:3000", "/login").await, "- /login");
        assert_eq!(call("acme.example.com", "/api/cohorts").await, "- /api/cohorts");
        assert_eq!(call("acme.example.com", "/tenant/acme/login").await, "- /tenant/acme/login");
    }

    #[tokio::test]
    async fn test_uses_authority_when_host_header_missing() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("http://sub.localhost:3000/cohorts")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        assert_eq!(&body[..], b"sub http://sub.localhost:3000/tenant/sub/cohort");
    }

    #[test]
    fn test_rewrite_uri_keeps_authority() {
        let uri: Uri = "http://acme.example.com/cohorts?x=1".parse().unwrap();
        let rewritten = rewrite_uri(&uri, "/tenant/acme/cohort").unwrap();
        assert_eq!(rewritten.to_string(), "http://acme.example.com/tenant/acme/cohort?x=1");
    }
}
