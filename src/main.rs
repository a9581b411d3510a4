use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use encoder::config::settings::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting encoder...");

    let config = AppConfig::new()?;
    encoder::app::run(config).await
}
