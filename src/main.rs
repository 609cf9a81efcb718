use anyhow::Result;
use logout_gate::{config::Config, load_provider, web, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting logout gate");

    // Load configuration from environment; a malformed ROOT_URL stops here
    let config = Config::load()?;
    tracing::info!(
        bind_address = %config.bind_address(),
        root_url_override = ?config.root_url.root_override().map(|r| r.to_string()),
        "Configuration loaded"
    );

    let provider = load_provider(&config.provider)?;

    // Discovery (if needed) happens before we accept traffic
    let state = Arc::new(AppState::build(provider, config.root_url.clone()).await?);

    let app = web::create_router(state);

    // Bind and serve
    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Logout gate listening on {}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
