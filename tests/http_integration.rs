//! HTTP integration tests
//!
//! These tests drive the assembled router: short URL creation, redirects
//! with click recording, and the analytics endpoint.

use anyhow::Result as AnyResult;
use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use chrono::{TimeDelta, Utc};
use serde_json::{json, Value};
use snip::analytics::{GeoDatabase, GeoLocation, GeoResolver};
use snip::clock::ManualClock;
use snip::config::{AnalyticsConfig, Config, LinkConfig, ServerConfig, TrustedProxyMode};
use snip::registry::LinkRegistry;
use snip::server::create_app;
use snip::storage::MemoryStore;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower::{Layer, ServiceExt};

const BASE_URL: &str = "http://sho.rt";

/// Helper layer to inject ConnectInfo for tests
#[derive(Clone)]
struct TestConnectInfoLayer(SocketAddr);

impl<S> Layer<S> for TestConnectInfoLayer {
    type Service = TestConnectInfoMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TestConnectInfoMiddleware {
            inner,
            addr: self.0,
        }
    }
}

#[derive(Clone)]
struct TestConnectInfoMiddleware<S> {
    inner: S,
    addr: SocketAddr,
}

impl<S, B> tower::Service<Request<B>> for TestConnectInfoMiddleware<S>
where
    S: tower::Service<Request<B>> + Clone,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        req.extensions_mut()
            .insert(axum::extract::connect_info::ConnectInfo(self.addr));
        self.inner.call(req)
    }
}

/// Geo database that knows a single address
struct OneAddressDatabase;

impl GeoDatabase for OneAddressDatabase {
    fn lookup(&self, ip: IpAddr) -> AnyResult<Option<GeoLocation>> {
        if ip == "84.208.20.110".parse::<IpAddr>()? {
            Ok(Some(GeoLocation {
                country: "NO".to_string(),
                region: "Oslo County".to_string(),
                city: "Oslo".to_string(),
                timezone: Some("Europe/Oslo".to_string()),
            }))
        } else {
            Ok(None)
        }
    }
}

fn create_test_config(trusted_proxy_mode: TrustedProxyMode) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
        },
        base_url: BASE_URL.to_string(),
        links: LinkConfig::default(),
        analytics: AnalyticsConfig {
            trusted_proxy_mode,
            ..AnalyticsConfig::default()
        },
    }
}

struct TestApp {
    clock: Arc<ManualClock>,
    registry: Arc<LinkRegistry>,
    config: Config,
}

impl TestApp {
    fn new(trusted_proxy_mode: TrustedProxyMode) -> Self {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let registry = Arc::new(LinkRegistry::new(
            Arc::new(MemoryStore::new()),
            clock.clone(),
        ));
        Self {
            clock,
            registry,
            config: create_test_config(trusted_proxy_mode),
        }
    }

    fn router_from(&self, peer: &str) -> Router {
        let resolver = GeoResolver::new(Arc::new(OneAddressDatabase));
        create_app(Arc::clone(&self.registry), resolver, &self.config)
            .layer(TestConnectInfoLayer(peer.parse().unwrap()))
    }

    fn router(&self) -> Router {
        self.router_from("127.0.0.1:12345")
    }
}

async fn json_body(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn create_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/shorturls")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_create_short_url() {
    let app = TestApp::new(TrustedProxyMode::None);

    let response = app
        .router()
        .oneshot(create_request(json!({
            "url": "https://example.com/docs",
            "shortcode": "docs1",
            "validity": 5
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["shortLink"], "http://sho.rt/docs1");
    assert_eq!(body["shortcode"], "docs1");
    assert_eq!(body["url"], "https://example.com/docs");
    assert!(body["expiryTime"].is_string());
    assert!(body["createdAt"].is_string());

    let link = app.registry.lookup("docs1").await.unwrap();
    assert_eq!(link.expires_at - link.created_at, TimeDelta::minutes(5));
}

#[tokio::test]
async fn test_create_generates_shortcode_when_absent_or_empty() {
    let app = TestApp::new(TrustedProxyMode::None);

    for payload in [
        json!({ "url": "https://example.com" }),
        json!({ "url": "https://example.com", "shortcode": "" }),
    ] {
        let response = app.router().oneshot(create_request(payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = json_body(response).await;
        let code = body["shortcode"].as_str().unwrap();
        assert_eq!(code.len(), 6);
        assert!(app.registry.shortcode_exists(code).await.unwrap());
    }
}

#[tokio::test]
async fn test_create_rejects_bad_input() {
    let app = TestApp::new(TrustedProxyMode::None);

    let cases = [
        (json!({}), "URL is required"),
        (json!({ "url": "   " }), "URL is required"),
        (json!({ "url": "not-a-url" }), "Invalid URL format"),
        (
            json!({ "url": "https://x.com", "shortcode": "ab" }),
            "Shortcode must be 3-10 alphanumeric characters",
        ),
        (
            json!({ "url": "https://x.com", "shortcode": "has space" }),
            "Shortcode must be 3-10 alphanumeric characters",
        ),
        (
            json!({ "url": "https://x.com", "validity": -3 }),
            "Validity must be a positive number (minutes)",
        ),
        (
            json!({ "url": "https://x.com", "validity": "abc" }),
            "Validity must be a positive number (minutes)",
        ),
        (json!({ "url": 123 }), "Invalid request body"),
        (
            json!({ "url": "https://x.com", "validity": [5] }),
            "Invalid request body",
        ),
    ];

    for (payload, message) in cases {
        let response = app.router().oneshot(create_request(payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], message);
    }
}

#[tokio::test]
async fn test_create_rejects_malformed_json() {
    let app = TestApp::new(TrustedProxyMode::None);
    let request = Request::builder()
        .method("POST")
        .uri("/shorturls")
        .header("content-type", "application/json")
        .body(Body::from("{\"url\": "))
        .unwrap();

    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Invalid request body");
}

#[tokio::test]
async fn test_create_accepts_numeric_string_validity() {
    let app = TestApp::new(TrustedProxyMode::None);

    let response = app
        .router()
        .oneshot(create_request(json!({
            "url": "https://example.com",
            "shortcode": "text15",
            "validity": "15"
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let link = app.registry.lookup("text15").await.unwrap();
    assert_eq!(link.expires_at - link.created_at, TimeDelta::minutes(15));
}

#[tokio::test]
async fn test_duplicate_shortcode_is_bad_request() {
    let app = TestApp::new(TrustedProxyMode::None);
    let payload = json!({ "url": "https://example.com", "shortcode": "taken" });

    let first = app
        .router()
        .oneshot(create_request(payload.clone()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app.router().oneshot(create_request(payload)).await.unwrap();
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(second).await["error"], "Shortcode already exists");
}

#[tokio::test]
async fn test_redirect_records_click() {
    let app = TestApp::new(TrustedProxyMode::None);
    app.registry
        .create("https://example.com/destination", Some("go123"), None)
        .await
        .unwrap();

    let request = Request::builder()
        .uri("/go123")
        .header(header::USER_AGENT, "Mozilla/5.0")
        .header(header::REFERER, "https://news.example")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()[header::LOCATION].to_str().unwrap(),
        "https://example.com/destination"
    );

    let (_, analytics) = app.registry.get_analytics("go123").await.unwrap();
    assert_eq!(analytics.click_count(), 1);
    let click = &analytics.click_history()[0];
    assert_eq!(click.ip, "127.0.0.1".parse::<IpAddr>().unwrap());
    assert_eq!(click.user_agent.as_deref(), Some("Mozilla/5.0"));
    assert_eq!(click.referrer, "https://news.example");
    assert_eq!(click.location, GeoLocation::local());
}

#[tokio::test]
async fn test_redirect_resolves_public_address() {
    let app = TestApp::new(TrustedProxyMode::None);
    app.registry
        .create("https://example.com", Some("geo"), None)
        .await
        .unwrap();

    let response = app
        .router_from("84.208.20.110:40000")
        .oneshot(get("/geo"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    let response = app
        .router_from("203.0.113.50:40000")
        .oneshot(get("/geo"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    let (_, analytics) = app.registry.get_analytics("geo").await.unwrap();
    let history = analytics.click_history();
    assert_eq!(history[0].location.city, "Oslo");
    assert_eq!(history[0].location.timezone.as_deref(), Some("Europe/Oslo"));
    assert_eq!(history[0].referrer, "Direct");
    assert_eq!(history[1].location, GeoLocation::unknown());
}

#[tokio::test]
async fn test_redirect_uses_forwarded_address_behind_proxy() {
    let app = TestApp::new(TrustedProxyMode::Standard);
    app.registry
        .create("https://example.com", Some("proxied"), None)
        .await
        .unwrap();

    let request = Request::builder()
        .uri("/proxied")
        .header("x-forwarded-for", "84.208.20.110")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);

    let (_, analytics) = app.registry.get_analytics("proxied").await.unwrap();
    let click = &analytics.click_history()[0];
    assert_eq!(click.ip, "84.208.20.110".parse::<IpAddr>().unwrap());
    assert_eq!(click.location.country, "NO");
}

#[tokio::test]
async fn test_redirect_unknown_shortcode_is_not_found() {
    let app = TestApp::new(TrustedProxyMode::None);

    let response = app.router().oneshot(get("/ghost")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "Short URL not found");
}

#[tokio::test]
async fn test_redirect_expired_link_is_gone() {
    let app = TestApp::new(TrustedProxyMode::None);
    app.registry
        .create("https://example.com", Some("brief"), Some(1.0))
        .await
        .unwrap();
    app.clock.advance(TimeDelta::seconds(61));

    let response = app.router().oneshot(get("/brief")).await.unwrap();
    assert_eq!(response.status(), StatusCode::GONE);
    assert_eq!(json_body(response).await["error"], "Short URL has expired");

    // Denied redirects are not counted
    let (_, analytics) = app.registry.get_analytics("brief").await.unwrap();
    assert_eq!(analytics.click_count(), 0);
}

#[tokio::test]
async fn test_analytics_endpoint() {
    let app = TestApp::new(TrustedProxyMode::None);
    app.registry
        .create("https://example.com/stats", Some("stats"), Some(1.0))
        .await
        .unwrap();

    for _ in 0..3 {
        let response = app.router().oneshot(get("/stats")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
    }

    let response = app.router().oneshot(get("/shorturls/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["shortcode"], "stats");
    assert_eq!(body["url"], "https://example.com/stats");
    assert_eq!(body["isExpired"], false);
    assert_eq!(body["clicks"], 3);
    assert_eq!(body["clickHistory"].as_array().unwrap().len(), 3);
    assert_eq!(body["clickHistory"][0]["referrer"], "Direct");
    assert_eq!(body["clickHistory"][0]["location"]["city"], "Local");

    // Expired but not yet swept: still queryable, flagged as expired
    app.clock.advance(TimeDelta::minutes(2));
    let response = app.router().oneshot(get("/shorturls/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["isExpired"], true);
    assert_eq!(body["clicks"], 3);
}

#[tokio::test]
async fn test_analytics_unknown_shortcode_is_not_found() {
    let app = TestApp::new(TrustedProxyMode::None);

    let response = app
        .router()
        .oneshot(get("/shorturls/missing"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new(TrustedProxyMode::None);

    let response = app.router().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "OK");
}
