//! End-to-end tenant routing through a live router and mock upstream.

use std::time::Duration;

use reqwest::StatusCode;
use tenant_router::config::RouterConfig;

mod common;

#[tokio::test]
async fn test_tenant_request_reaches_namespaced_route() {
    let upstream = common::start_echo_upstream().await;
    let router = common::start_router(RouterConfig::default(), upstream).await;

    let (status, body) = common::get_via(&router, "acme.example.com", "/cohorts/42?tab=members").await;

    assert_eq!(status, 200);
    assert_eq!(body["path"], "/tenant/acme/cohort/42");
    assert_eq!(body["query"], "tab=members");
    assert_eq!(body["host"], "acme.example.com", "client-visible host is unchanged");
    assert_eq!(body["forwarded_host"], "acme.example.com");
    assert_eq!(body["tenant"], "acme");
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn test_spec_rewrite_table() {
    let upstream = common::start_echo_upstream().await;
    let router = common::start_router(RouterConfig::default(), upstream).await;

    let cases = [
        ("/", "/tenant/acme/login"),
        ("/login", "/tenant/acme/login"),
        ("/dashboard", "/tenant/acme/dashboard"),
        ("/cohorts", "/tenant/acme/cohort"),
        ("/cohort/42", "/tenant/acme/cohort/42"),
        ("/unknown/path", "/tenant/acme/unknown/path"),
        ("/tenant/acme/login", "/tenant/acme/login"),
    ];

    for (path, expected) in cases {
        let (_, body) = common::get_via(&router, "acme.example.com", path).await;
        assert_eq!(body["path"], expected, "path {path}");
    }

    let (_, body) = common::get_via(&router, "sub.localhost:3000", "/cohorts/7").await;
    assert_eq!(body["path"], "/tenant/sub/cohort/7");
}

#[tokio::test]
async fn test_unscoped_hosts_and_exempt_paths_pass_through() {
    let upstream = common::start_echo_upstream().await;
    let router = common::start_router(RouterConfig::default(), upstream).await;

    for host in ["admin.example.com", "localhost:3000", "example.com"] {
        let (_, body) = common::get_via(&router, host, "/cohorts").await;
        assert_eq!(body["path"], "/cohorts", "host {host}");
        assert!(body["tenant"].is_null(), "host {host}");
    }

    for path in ["/api", "/api/cohorts", "/_next/static/app.js", "/_next/image/a.png", "/favicon.ico"] {
        let (_, body) = common::get_via(&router, "acme.example.com", path).await;
        assert_eq!(body["path"], path);
    }
}

#[tokio::test]
async fn test_client_cannot_spoof_tenant_header() {
    let upstream = common::start_echo_upstream().await;
    let router = common::start_router(RouterConfig::default(), upstream).await;

    let res = common::client()
        .get(format!("http://{}/cohorts", router.addr))
        .header("host", "admin.example.com")
        .header("x-tenant", "acme")
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();

    assert!(body["tenant"].is_null());
}

#[tokio::test]
async fn test_config_reload_swaps_rules() {
    let upstream = common::start_echo_upstream().await;
    let router = common::start_router(RouterConfig::default(), upstream).await;

    let mut reloaded = RouterConfig::default();
    reloaded.tenancy.namespace_prefix = "org".into();
    reloaded.tenancy.reserved_subdomains.push("www".into());
    router.updates.send(reloaded).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (_, body) = common::get_via(&router, "acme.example.com", "/dashboard").await;
    assert_eq!(body["path"], "/org/acme/dashboard");

    let (_, body) = common::get_via(&router, "www.example.com", "/dashboard").await;
    assert_eq!(body["path"], "/dashboard");
}

#[tokio::test]
async fn test_unreachable_upstream_returns_bad_gateway() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = listener.local_addr().unwrap();
    drop(listener);

    let router = common::start_router(RouterConfig::default(), dead).await;
    let res = common::client()
        .get(format!("http://{}/dashboard", router.addr))
        .header("host", "acme.example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_shutdown_stops_server() {
    let upstream = common::start_echo_upstream().await;
    let router = common::start_router(RouterConfig::default(), upstream).await;

    router.shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), router.task)
        .await
        .expect("server did not stop")
        .unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_streaming_responses_after_grace() {
    let upstream = common::start_streaming_upstream().await;
    let mut config = RouterConfig::default();
    config.timeouts.shutdown_grace_secs = 1;
    let router = common::start_router(config, upstream).await;

    let mut res = common::client()
        .get(format!("http://{}/events", router.addr))
        .header("host", "acme.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.chunk().await.unwrap().is_some());

    router.shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(4), router.task)
        .await
        .expect("server kept draining past the grace period")
        .unwrap();
}
