//! Phantom Gateway
//!
//! Deceptive edge relay and decoy API. Suspicious traffic is silently diverted
//! to a fake backend that answers convincingly while reporting what the caller
//! did.
//!
//! # Architecture
//!
//! ```text
//!  caller ──► ┌──────────────────────┐  benign   ┌──────────────┐
//!             │  GATEWAY (:5000)     │──────────►│ real upstream│
//!             │  screen ─► relay     │           └──────────────┘
//!             └──────────┬───────────┘
//!                        │ suspicious (X-Real-IP, X-Forwarded-For)
//!                        ▼
//!             ┌──────────────────────┐
//!             │  DECOY (:8080)       │
//!             │  forensics ─► trap   │── X-Honeypot-Data ──┐
//!             └──────────────────────┘                     │
//!                                                          ▼
//!                                                ┌──────────────────┐
//!                                                │ forensic store   │
//!                                                │ (Postgres / mem) │
//!                                                └──────────────────┘
//! ```

mod config;
mod db;
mod models;
mod handlers;
mod middleware;
mod error;
mod classifier;
mod telemetry;
mod geo;
mod store;
mod relay;
mod decoy;

#[cfg(test)]
mod pipeline_tests;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Router,
    middleware as axum_middleware,
    routing::{any, get},
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use decoy::{DecoyState, FakeLatency, FakeTokenIssuer, Forensics, LoginThrottle};
use geo::{DisabledGeoLocator, GeoLocator, HttpGeoLocator};
use relay::Relay;
use store::{ForensicStore, MemoryStore, PgStore};

pub use error::{AppError, AppResult};

const THROTTLE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Arc::new(Config::from_env());

    // Initialize logging
    init_tracing(config.json_logs);

    tracing::info!("Phantom Gateway starting (role: {:?})", config.role);

    // Forensic store
    let store: Arc<dyn ForensicStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("Database: {}", url.split('@').last().unwrap_or("***"));
            let pool = db::create_pool(url)
                .await
                .context("Failed to create database pool")?;

            tracing::info!("Running database migrations...");
            db::run_migrations(&pool)
                .await
                .context("Failed to run migrations")?;

            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!(
                "DATABASE_URL not set, keeping the last {} records in memory only",
                config.memory_store_capacity
            );
            Arc::new(MemoryStore::new(config.memory_store_capacity))
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut servers = JoinSet::new();
    let mut sweeper = None;

    if config.role.runs_decoy() {
        let geo: Arc<dyn GeoLocator> = match &config.geo_lookup_url {
            Some(url) => Arc::new(HttpGeoLocator::new(url.clone(), config.geo_timeout())?),
            None => Arc::new(DisabledGeoLocator),
        };
        let throttle = Arc::new(LoginThrottle::new(
            config.login_rate_limit,
            config.login_rate_window(),
        ));
        sweeper = Some(throttle.clone().spawn_sweeper(THROTTLE_SWEEP_INTERVAL));

        let state = DecoyState {
            forensics: Arc::new(Forensics::new(geo, config.decoy_trust_forwarded)),
            throttle,
            tokens: Arc::new(FakeTokenIssuer::new(&config.decoy_token_secret)),
        };
        let app = create_decoy_router(state, FakeLatency::new(config.fake_delay_range()));
        let listener = bind(config.decoy_port).await?;
        tracing::info!("🍯 Decoy listening on http://{}", listener.local_addr()?);
        servers.spawn(serve("decoy", listener, app, shutdown_rx.clone()));
    }

    if config.role.runs_gateway() {
        let state = GatewayState::new(config.clone(), store.clone())?;
        tracing::info!(
            "Gateway prefix '{}' mode {:?}, decoy {}, upstream {}",
            config.gateway_prefix,
            config.gateway_mode,
            state.decoy.target(),
            state.upstream.target()
        );
        let app = create_gateway_router(state);
        let listener = bind(config.gateway_port).await?;
        tracing::info!("🚀 Gateway listening on http://{}", listener.local_addr()?);
        servers.spawn(serve("gateway", listener, app, shutdown_rx.clone()));
    }

    tokio::select! {
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received");
        }
        Some(result) = servers.join_next() => {
            tracing::error!("Listener exited early: {:?}", result);
        }
    }

    let _ = shutdown_tx.send(true);
    while let Some(result) = servers.join_next().await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("Listener failed: {}", e),
            Err(e) => tracing::error!("Listener task failed: {}", e),
        }
    }

    // Teardown
    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    store.close().await;
    tracing::info!("Phantom Gateway stopped");

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "phantom_gateway=debug,tower_http=info".into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn bind(port: u16) -> anyhow::Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))
}

async fn serve(
    name: &'static str,
    listener: TcpListener,
    app: Router,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
            tracing::info!("{} draining connections", name);
        })
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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
}

/// Shared gateway state
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub decoy: Relay,
    pub upstream: Relay,
    pub store: Arc<dyn ForensicStore>,
}

impl GatewayState {
    pub fn new(config: Arc<Config>, store: Arc<dyn ForensicStore>) -> Result<Self, error::RelayError> {
        Ok(Self {
            decoy: Relay::new(config.decoy_url.clone(), config.relay_timeout())?,
            upstream: Relay::new(config.upstream_url.clone(), config.relay_timeout())?,
            config,
            store,
        })
    }
}

/// Gateway router: everything under the prefix is intercepted
fn create_gateway_router(state: GatewayState) -> Router {
    let prefix = state.config.gateway_prefix.clone();

    let mut router = Router::new()
        .route("/health", get(handlers::health::check));

    router = if prefix.is_empty() {
        router
            .route("/", any(handlers::gateway::intercept))
            .route("/*rest", any(handlers::gateway::intercept))
    } else {
        router
            .route(&prefix, any(handlers::gateway::intercept))
            .route(&format!("{}/", prefix), any(handlers::gateway::intercept))
            .route(&format!("{}/*rest", prefix), any(handlers::gateway::intercept))
    };

    router
        .fallback(handlers::gateway::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Decoy router: the trap table under `/api` plus a root status page, all
/// behind the fake latency
fn create_decoy_router(state: DecoyState, latency: FakeLatency) -> Router {
    Router::new()
        .route(
            "/",
            get(handlers::health::decoy_status).fallback(handlers::decoy::catch_all),
        )
        .nest("/api", decoy::api_router())
        .fallback(handlers::decoy::catch_all)
        .layer(axum_middleware::from_fn_with_state(latency, decoy::fake_delay))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
