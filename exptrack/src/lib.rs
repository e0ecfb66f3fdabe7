//! # exptrack: Experiment Tracker
//!
//! `exptrack` keeps a catalog of business experiments (A/B tests, vendor comparisons, feature
//! flags) together with the people who own them. It exposes a small JSON API for creating,
//! browsing, filtering, updating and deleting experiments, and serves a single-page front end
//! that drives that API.
//!
//! ## Architecture
//!
//! The HTTP layer is built on [Axum](https://github.com/tokio-rs/axum). Everything is stored in a
//! single SQLite database accessed through `sqlx`, and the schema is created by the embedded
//! migrations on startup.
//!
//! - The **API layer** ([`api`]) holds the handlers and their wire models. Experiments are
//!   served at `/api/experiments` and candidate owners at `/api/users`.
//! - The **database layer** ([`db`]) uses the repository pattern. Each table has a repository
//!   wrapping a single connection, and multi-statement writes run in a transaction.
//! - Anything that is not an API route falls through to the embedded front end
//!   ([`static_assets`]).
//!
//! An OpenAPI document is generated from the handlers and served at `/api-docs/openapi.json`,
//! with an interactive reference at `/docs`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use exptrack::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = exptrack::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     exptrack::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Demo data
//!
//! `exptrack seed` (or `seed_on_startup: true`) wipes the database and loads a demo dataset of
//! five users and fourteen experiments. See [`seed`].
pub mod api;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod seed;
pub mod static_assets;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::config::{CorsOrigin, DatabaseConfig};
use crate::openapi::ApiDoc;
use axum::{
    Json, Router,
    http::HeaderValue,
    routing::get,
};
use bon::Builder;
pub use config::Config;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument, warn};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::{ExperimentId, UserId};

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder().db(pool).config(config).build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
}

/// Get the exptrack database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Open a connection pool for the configured SQLite database, creating the file if needed.
///
/// Foreign keys are enforced on every connection. File databases use WAL so readers do not
/// block the writer. An in-memory database only lives as long as its connection, so the pool is
/// pinned to a single connection that is never reaped.
pub async fn connect_pool(database: &DatabaseConfig) -> anyhow::Result<SqlitePool> {
    let settings = &database.pool;

    let mut options = SqliteConnectOptions::from_str(&database.url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(settings.busy_timeout());

    let pool_options = if database.is_in_memory() {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        options = options.journal_mode(SqliteJournalMode::Wal);
        SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .idle_timeout(settings.idle_timeout())
    };

    let pool = pool_options
        .acquire_timeout(settings.acquire_timeout())
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Run migrations, then load the demo dataset if the configuration asks for it.
#[instrument(skip_all)]
async fn setup_database(config: &Config, pool: &SqlitePool) -> anyhow::Result<()> {
    migrator().run(pool).await?;

    if config.seed_on_startup {
        warn!("seed_on_startup is enabled; existing data will be replaced");
        seed::reset_and_seed(pool).await?;
    }

    Ok(())
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors = &config.cors;

    let allow_origin = if cors.allowed_origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::with_capacity(cors.allowed_origins.len());
        for origin in &cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Url serializes with a trailing slash; the Origin header never carries one
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut layer = CorsLayer::new().allow_origin(allow_origin).allow_methods(Any).allow_headers(Any);

    if let Some(max_age) = cors.max_age {
        layer = layer.max_age(Duration::from_secs(max_age));
    }

    Ok(layer)
}

/// Build the application router.
///
/// - `/api/*`: the JSON API
/// - `/api-docs/openapi.json` and `/docs`: generated API documentation
/// - `/healthz`: liveness probe
/// - everything else: embedded front end with SPA fallback
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let api_routes = Router::new()
        .route(
            "/experiments",
            get(api::handlers::experiments::list_experiments).post(api::handlers::experiments::create_experiment),
        )
        .route(
            "/experiments/{id}",
            get(api::handlers::experiments::get_experiment)
                .put(api::handlers::experiments::update_experiment)
                .delete(api::handlers::experiments::delete_experiment),
        )
        .route("/users", get(api::handlers::users::list_users))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api", api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .fallback(api::handlers::static_assets::serve_embedded_asset);

    let router = router.layer(create_cors_layer(&state.config)?);

    // Add tracing layer
    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// A fully wired application: database ready, router built.
pub struct Application {
    router: Router,
    config: Config,
    pool: SqlitePool,
}

impl Application {
    /// Create a new application instance, connecting to the configured database
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::new_with_pool(config, None).await
    }

    /// Create a new application instance, optionally on an existing pool (used by tests)
    pub async fn new_with_pool(config: Config, pool: Option<SqlitePool>) -> anyhow::Result<Self> {
        debug!("Starting experiment tracker with configuration: {:#?}", config);

        let pool = match pool {
            Some(pool) => pool,
            None => {
                info!(url = %config.database.url, "Opening database");
                connect_pool(&config.database).await?
            }
        };

        setup_database(&config, &pool).await?;

        let app_state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Experiment tracker listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
