//! Authgate binary entry point

use authgate::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(logging: &config::LoggingConfig) -> Result<(), authgate::error::AppError> {
    let env_filter = logging.env_filter()?;
    let registry = tracing_subscriber::registry().with(env_filter);

    if logging.is_json() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    }
    Ok(())
}

/// Application entry point
///
/// # Setup
/// 1. Load and validate configuration (refuses to start without a secret)
/// 2. Initialize tracing/logging from `logging.*`
/// 3. Initialize metrics
/// 4. Initialize AppState
/// 5. Build Axum router
/// 6. Start HTTP server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration; logging falls back to defaults so a failure is still reported
    let loaded = config::AppConfig::load();

    // 2. Initialize tracing/logging
    let logging = match &loaded {
        Ok(config) => config.logging.clone(),
        Err(_) => config::LoggingConfig::default(),
    };
    init_tracing(&logging)?;

    let config = match loaded {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(%error, "Refusing to start");
            return Err(error.into());
        }
    };

    tracing::info!("Starting Authgate...");
    tracing::info!(
        domain = %config.server.domain,
        protocol = %config.server.protocol,
        filter = %config.logging.level,
        "Configuration loaded"
    );

    // 3. Initialize metrics
    authgate::metrics::init_metrics();

    // 4. Initialize application state
    let state = AppState::new(config.clone())?;

    // 5. Build Axum router
    let app = authgate::build_router(state);

    // 6. Start HTTP server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Public URL: {}", config.server.base_url());

    axum::serve(listener, app).await?;

    Ok(())
}
