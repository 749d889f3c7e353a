//! Authgate - social login starter service
//!
//! # Architecture
//!
//! ```text
//! request ──▶ Route Guard ──▶ (redirect | continue) ──▶ page / API handler
//!                 │                                          │
//!                 └── SessionIssuer::read (cookie) ◀─────────┘
//!                                │
//!                     enrich_token / project_session
//! ```
//!
//! # Modules
//!
//! - `auth`: OAuth flow, session tokens, claim shaping, route guard
//! - `pages`: Login chooser, dashboard and settings pages
//! - `api`: Operational endpoints (metrics)
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pages;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Everything here is read-only after start; cloning only bumps
/// reference counts.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Session token issuer bound to the signing secret
    pub issuer: Arc<auth::SessionIssuer>,

    /// Enabled identity providers
    pub providers: Arc<auth::ProviderSet>,

    /// Route protection rules
    pub guard: Arc<auth::RouteGuard>,

    /// HTTP client for provider token and profile requests
    pub http_client: Arc<reqwest::Client>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        config.validate()?;

        let providers = auth::ProviderSet::from_config(&config.providers);
        if providers.is_empty() {
            tracing::warn!("No identity providers configured; nobody will be able to sign in");
        } else {
            tracing::info!(
                providers = ?providers.iter().map(|p| p.kind.id()).collect::<Vec<_>>(),
                "Identity providers enabled"
            );
        }

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("Authgate/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| error::AppError::Internal(e.into()))?;

        let issuer = auth::SessionIssuer::new(&config.auth);
        let guard = auth::RouteGuard::from_config(&config);

        Ok(Self {
            config: Arc::new(config),
            issuer: Arc::new(issuer),
            providers: Arc::new(providers),
            guard: Arc::new(guard),
            http_client: Arc::new(http_client),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, middleware};
    use tower::ServiceBuilder;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(pages::pages_router())
        .merge(auth::auth_router())
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth::route_guard,
                )),
        )
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn not_found() -> error::AppError {
    error::AppError::NotFound
}
