use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    middleware,
    routing::{get, post},
};
use geogate_auth::AuthService;
use tower_http::trace::TraceLayer;

use crate::cache::{DynCache, create_cache};
use crate::config::AppConfig;
use crate::gateway::{ReverseProxy, proxy_fallback};
use crate::geo::{CachedLookup, DadataClient, DynLookup};
use crate::metrics::{Metrics, MetricsOptions};
use crate::{middleware as app_middleware, routes};

/// Name and lifetime of the cookie set on login.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub name: String,
    pub ttl: time::Duration,
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub lookup: DynLookup,
    pub proxy: ReverseProxy,
    pub metrics: Metrics,
    pub session_cookie: SessionCookie,
}

impl FromRef<AppState> for Metrics {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

pub struct GeogateServer {
    addr: SocketAddr,
    app: Router,
    shutdown_grace: Duration,
}

pub fn build_app(state: AppState, body_limit: usize) -> Router {
    let metrics = state.metrics.clone();

    let protected = Router::new()
        .route("/api/address/search", post(routes::address::search))
        .route("/api/address/geocode", post(routes::address::geocode))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            app_middleware::authentication_middleware,
        ));

    Router::new()
        .route("/api/register", post(routes::auth::register))
        .route("/api/login", post(routes::auth::login))
        .route("/metrics", get(routes::metrics::metrics_handler))
        .merge(protected)
        // Everything else goes upstream
        .fallback(proxy_fallback)
        // Middleware stack (order: body limit -> trace -> metrics, metrics outermost)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &tracing::Span| {
                        span.record("http.status_code", tracing::field::display(res.status().as_u16()));
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(middleware::from_fn_with_state(
            metrics,
            app_middleware::metrics_middleware,
        ))
        .with_state(state)
}

/// Assembles the gateway from configuration.
///
/// The cache and the geo provider default to what the configuration names and
/// can be replaced, which is how tests run without Redis or DaData.
pub struct ServerBuilder {
    config: AppConfig,
    cache: Option<DynCache>,
    provider: Option<DynLookup>,
    metrics: Option<Metrics>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            cache: None,
            provider: None,
            metrics: None,
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    /// Use `cache` instead of the backend named by `redis.enabled`.
    pub fn with_cache(mut self, cache: DynCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use `provider` instead of the DaData client.
    pub fn with_provider(mut self, provider: DynLookup) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn build(self) -> anyhow::Result<GeogateServer> {
        let cfg = self.config;

        let metrics = match self.metrics {
            Some(metrics) => metrics,
            None => Metrics::new(MetricsOptions::default())?,
        };

        let auth = Arc::new(AuthService::from_config(&cfg.auth)?);
        auth.seed(&cfg.auth.seed_users).await?;
        if !cfg.auth.seed_users.is_empty() {
            tracing::info!(count = cfg.auth.seed_users.len(), "Seed users registered");
        }

        let cache = match self.cache {
            Some(cache) => cache,
            None => create_cache(&cfg.redis).await,
        };
        let provider: DynLookup = match self.provider {
            Some(provider) => provider,
            None => Arc::new(DadataClient::new(&cfg.geo)?),
        };
        let lookup: DynLookup = Arc::new(CachedLookup::new(
            provider,
            cache,
            metrics.clone(),
            cfg.cache.ttl(),
        ));

        let proxy = ReverseProxy::new(&cfg.upstream, cfg.server.body_limit_bytes)?;
        tracing::info!(upstream = %proxy.upstream(), "Forwarding unmatched requests");

        let state = AppState {
            auth,
            lookup,
            proxy,
            metrics,
            session_cookie: SessionCookie {
                name: cfg.auth.cookie_name.clone(),
                // Bounded by AuthConfig::validate.
                ttl: time::Duration::seconds(cfg.auth.cookie_ttl_secs as i64),
            },
        };

        Ok(GeogateServer {
            addr: cfg.addr(),
            app: build_app(state, cfg.server.body_limit_bytes),
            shutdown_grace: cfg.shutdown_grace(),
        })
    }
}

impl GeogateServer {
    /// The assembled router, for driving the gateway without a listener.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Serve until SIGINT/SIGTERM, then give in-flight requests the grace
    /// period to finish before aborting them.
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);

        let signalled = Arc::new(tokio::sync::Notify::new());
        let notify = signalled.clone();

        let serve = axum::serve(
            listener,
            self.app
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            notify.notify_one();
        });
        let mut serving = tokio::spawn(async move { serve.await });

        tokio::select! {
            result = &mut serving => result??,
            _ = signalled.notified() => {
                match tokio::time::timeout(self.shutdown_grace, &mut serving).await {
                    Ok(result) => result??,
                    Err(_) => {
                        tracing::warn!(
                            grace = ?self.shutdown_grace,
                            "Grace period elapsed, aborting in-flight requests"
                        );
                        serving.abort();
                    }
                }
            }
        }

        tracing::info!("server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
