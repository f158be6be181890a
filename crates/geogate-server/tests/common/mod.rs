#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Request, StatusCode},
};
use geogate_auth::HashingConfig;
use geogate_server::{
    Address, AddressLookup, AppConfig, DynCache, DynLookup, GeogateServer, LookupError,
    MemoryCache, Metrics, MetricsOptions, ServerBuilder,
};
use tower::ServiceExt;

/// Provider double that answers deterministically and counts its calls.
#[derive(Default)]
pub struct StubProvider {
    calls: AtomicUsize,
}

impl StubProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AddressLookup for StubProvider {
    async fn search(&self, query: &str) -> Result<Vec<Address>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![
            Address {
                value: Some(format!("{query}, first")),
                city: Some("Москва".into()),
                ..Default::default()
            },
            Address {
                value: Some(format!("{query}, second")),
                ..Default::default()
            },
        ])
    }

    async fn geocode(&self, lat: &str, lng: &str) -> Result<Vec<Address>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![Address {
            value: Some(format!("near {lat},{lng}")),
            lat: Some(lat.to_string()),
            lon: Some(lng.to_string()),
            ..Default::default()
        }])
    }
}

/// Configuration for tests: in-memory cache, cheap hashing, given upstream.
pub fn test_config(upstream: &str) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.upstream.url = upstream.to_string();
    cfg.upstream.timeout_ms = 2_000;
    cfg.redis.enabled = false;
    cfg.auth.hashing = HashingConfig::minimal();
    cfg
}

pub struct TestGateway {
    pub server: GeogateServer,
    pub provider: Arc<StubProvider>,
    pub metrics: Metrics,
}

impl TestGateway {
    pub fn router(&self) -> Router {
        self.server.router()
    }
}

/// Build a gateway around the given cache and provider.
pub async fn build_server(
    cfg: AppConfig,
    cache: DynCache,
    provider: DynLookup,
    metrics: Metrics,
) -> GeogateServer {
    ServerBuilder::new()
        .with_config(cfg)
        .with_cache(cache)
        .with_provider(provider)
        .with_metrics(metrics)
        .build()
        .await
        .expect("build gateway")
}

pub async fn gateway_with(cfg: AppConfig) -> TestGateway {
    let provider = Arc::new(StubProvider::default());
    let metrics = Metrics::new(MetricsOptions::default()).unwrap();
    let server = build_server(
        cfg,
        Arc::new(MemoryCache::new()),
        provider.clone(),
        metrics.clone(),
    )
    .await;

    TestGateway {
        server,
        provider,
        metrics,
    }
}

pub async fn gateway() -> TestGateway {
    gateway_with(test_config("http://127.0.0.1:1")).await
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("json body")
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    TestResponse {
        status,
        headers,
        body,
    }
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn post_json_with_token(uri: &str, token: &str, body: serde_json::Value) -> Request<Body> {
    let mut request = post_json(uri, body);
    request
        .headers_mut()
        .insert("authorization", format!("Bearer {token}").parse().unwrap());
    request
}

/// Register `login` and return a token from logging in.
pub async fn register_and_login(router: &Router, login: &str, password: &str) -> String {
    let credentials = serde_json::json!({ "login": login, "password": password });

    let registered = send(router, post_json("/api/register", credentials.clone())).await;
    assert_eq!(registered.status, StatusCode::OK);

    let logged_in = send(router, post_json("/api/login", credentials)).await;
    assert_eq!(logged_in.status, StatusCode::OK);
    logged_in.json()["token"]
        .as_str()
        .expect("token in body")
        .to_string()
}
