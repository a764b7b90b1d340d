use pocket_ml_api::artifacts::ModelContext;
use pocket_ml_api::config::Config;
use pocket_ml_api::handlers::AppState;
use pocket_ml_api::orchestrator::InferenceOrchestrator;
use pocket_ml_api::routes::build_router;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// Initializes logging, loads configuration, loads every model artifact the
/// configured variant needs, and starts the Axum server. Any missing artifact
/// stops the process before it binds a port.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pocket_ml_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully (variant: {})", config.variant);

    // Load models once; the context is read-only from here on
    let models = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || ModelContext::load(&config)).await??
    };
    tracing::info!("Model context ready: {} artifacts", models.artifacts().len());

    let orchestrator = InferenceOrchestrator::new(Arc::new(models));
    let app_state = Arc::new(AppState::new(orchestrator));
    let app = build_router(app_state, config.max_body_bytes);

    // Start server
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
