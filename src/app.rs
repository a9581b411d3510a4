use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::settings::AppConfig;
use crate::infrastructure::db::pool::{connect_to_db, run_migrations};
use crate::infrastructure::queue::rabbitmq::RabbitMqService;
use crate::infrastructure::storage::s3::StorageService;
use crate::infrastructure::tools::process::ProcessTool;
use crate::modules::job::repository::PgJobRepository;
use crate::modules::video::repository::PgVideoRepository;
use crate::state::AppState;
use crate::workers::dispatcher::spawn_job_workers;
use crate::workers::manager::JobManager;

pub fn create_app(state: AppState) -> Router {
    crate::routes::configure_routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wires the ports together and runs until the broker consumer ends.
pub async fn run(config: AppConfig) -> Result<()> {
    let db = connect_to_db(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    if config.auto_migrate_db {
        run_migrations(&db).await.context("Failed to run migrations")?;
    }

    let storage = StorageService::new(
        &config.minio_url,
        &config.aws_region,
        &config.minio_access_key,
        &config.minio_secret_key,
    );
    let rabbitmq = RabbitMqService::new(&config.rabbitmq).await?;

    tokio::fs::create_dir_all(&config.pipeline.local_storage_path)
        .await
        .context("Failed to create local storage path")?;

    let state = AppState::new(
        config.pipeline.clone(),
        Arc::new(PgVideoRepository::new(db.clone())),
        Arc::new(PgJobRepository::new(db)),
        Arc::new(storage),
        Arc::new(ProcessTool),
    );

    let workers = config.pipeline.max_conversion_concurrency;
    let (delivery_tx, deliveries) = async_channel::bounded(workers);
    let prefetch = u16::try_from(workers).unwrap_or(u16::MAX);
    rabbitmq.consume(delivery_tx, prefetch).await?;

    let (result_tx, result_rx) = mpsc::channel(workers);
    spawn_job_workers(state.clone(), deliveries, result_tx);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.server_port))
        .await
        .context("Failed to bind status server")?;
    info!("Status server running on http://0.0.0.0:{}", config.server_port);
    let app = create_app(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Status server stopped: {}", e);
        }
    });

    JobManager::new(Arc::new(rabbitmq)).run(result_rx).await;
    Ok(())
}
