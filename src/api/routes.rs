//! API route definitions

use axum::routing::{delete, get, post};
use axum::Router;

use super::handlers;
use super::server::AppState;

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/status", get(handlers::health::status))
        .nest("/api", relay_routes())
        .with_state(state)
}

fn relay_routes() -> Router<AppState> {
    Router::new()
        // Pool
        .route("/proxies/refresh", post(handlers::proxy::refresh_proxies))
        // DNS
        .route("/dns/resolve", get(handlers::dns::resolve))
        .route("/dns/cache", delete(handlers::dns::clear_cache))
        // Fetch
        .route("/fetch", post(handlers::fetch::fetch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::{Config, PoolConfig};
    use crate::dns::DohResolver;
    use crate::manager::RelayService;
    use crate::models::{ProxyCandidate, ProxyProtocol};
    use crate::test_support::{spawn_stub, StaticSource, StubResponse};

    fn config() -> Config {
        Config {
            pool: PoolConfig {
                test_url: "http://probe.invalid/ip".to_string(),
                test_timeout: Duration::from_secs(2),
                ..PoolConfig::default()
            },
            ..Config::default()
        }
    }

    fn router(service: RelayService) -> Router {
        create_router(AppState {
            service: Arc::new(service),
        })
    }

    async fn call(
        app: Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_health_is_503_when_degraded() {
        let app = router(RelayService::with_sources(config(), vec![]).unwrap());

        let (status, body) = call(app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["active_proxies"], 0);
    }

    #[tokio::test]
    async fn test_status_always_200() {
        let app = router(RelayService::with_sources(config(), vec![]).unwrap());

        let (status, body) = call(app, Method::GET, "/api/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stats"]["total_requests"], 0);
        assert!(body["top_proxies"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_reports_new_pool() {
        let proxy = spawn_stub(vec![StubResponse::text(200, "ok")]).await;
        let source = StaticSource::new(
            "static",
            vec![ProxyCandidate::new(
                proxy.addr.ip().to_string(),
                proxy.addr.port(),
                ProxyProtocol::Http,
            )
            .with_country("NL")],
        );
        let app = router(RelayService::with_sources(config(), vec![source]).unwrap());

        let (status, body) = call(app, Method::POST, "/api/proxies/refresh", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["active_proxies"], 1);
        assert_eq!(body["top_proxies"][0]["country"], "NL");
    }

    #[tokio::test]
    async fn test_resolve_and_clear_cache() {
        let doh = spawn_stub(vec![StubResponse::json(
            200,
            r#"{"Answer":[{"data":"10.0.0.5"}]}"#,
        )])
        .await;
        let resolver = DohResolver::new(config().dns)
            .unwrap()
            .with_endpoint("cloudflare", doh.url("/dns-query"));
        let app = router(
            RelayService::with_sources(config(), vec![])
                .unwrap()
                .with_resolver(resolver),
        );

        let (status, body) = call(
            app.clone(),
            Method::GET,
            "/api/dns/resolve?hostname=api.binance.com",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "hostname": "api.binance.com", "ip": "10.0.0.5" }));

        let (status, body) = call(app, Method::DELETE, "/api/dns/cache", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cleared"], 1);
    }

    #[tokio::test]
    async fn test_resolve_rejects_blank_hostname() {
        let app = router(RelayService::with_sources(config(), vec![]).unwrap());

        let (status, body) = call(app, Method::GET, "/api/dns/resolve?hostname=%20", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("hostname"));
    }

    #[tokio::test]
    async fn test_fetch_returns_upstream_body() {
        let target = spawn_stub(vec![StubResponse::json(200, r#"{"price": "42.0"}"#)]).await;
        let app = router(RelayService::with_sources(config(), vec![]).unwrap());

        let (status, body) = call(
            app,
            Method::POST,
            "/api/fetch",
            Some(json!({
                "url": target.url("/api/v3/ticker/price"),
                "provider": "coincap",
                "params": { "symbol": "BTCUSDT" }
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["price"], "42.0");
        assert!(target.requests()[0].starts_with("GET /api/v3/ticker/price?symbol=BTCUSDT"));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_502() {
        let target = spawn_stub(vec![StubResponse::text(500, "boom")]).await;
        let mut config = config();
        config.fetch.backoff_base = Duration::from_millis(1);
        let app = router(RelayService::with_sources(config, vec![]).unwrap());

        let (status, body) = call(
            app,
            Method::POST,
            "/api/fetch",
            Some(json!({ "url": target.url("/"), "max_retries": 2 })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("2 attempts"));
        assert_eq!(target.hits(), 2);
    }

    #[tokio::test]
    async fn test_fetch_rejects_bad_url() {
        let app = router(RelayService::with_sources(config(), vec![]).unwrap());

        let (status, _) = call(
            app.clone(),
            Method::POST,
            "/api/fetch",
            Some(json!({ "url": "not a url" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            app,
            Method::POST,
            "/api/fetch",
            Some(json!({ "url": "ftp://example.com/file" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
