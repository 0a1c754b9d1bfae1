//! slide_agent - HTTP Server Entry Point
//!
//! Serves the presentation request form and API.

use slide_agent::{api, config::Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slide_agent=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: model={}, workspace={}, max_steps={}",
        config.default_model,
        config.workspace_path.display(),
        config.max_steps
    );
    if config.pexels_api_key.is_none() {
        info!("PEXELS_API_KEY not set; image search will be unavailable");
    }

    api::serve(config).await?;

    Ok(())
}
