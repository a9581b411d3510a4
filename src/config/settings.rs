use std::path::PathBuf;

use serde::Deserialize;

use crate::config::env::{self, EnvKey};
use crate::error::{EncoderError, EncoderResult};

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub server_port: u16,
    pub database_url: String,
    pub auto_migrate_db: bool,
    pub rabbitmq: RabbitMqConfig,
    pub minio_url: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
    pub aws_region: String,
    pub pipeline: PipelineSettings,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RabbitMqConfig {
    pub dsn: String,
    pub consumer_queue: String,
    pub consumer_name: String,
    pub dead_letter_exchange: Option<String>,
    pub notification_exchange: String,
    pub notification_routing_key: String,
}

/// Values the dispatch pool and job pipeline consume at runtime.
#[derive(Clone, Debug, Deserialize)]
pub struct PipelineSettings {
    pub input_bucket: String,
    pub output_bucket: String,
    pub local_storage_path: PathBuf,
    pub max_conversion_concurrency: usize,
    pub max_upload_concurrency: usize,
}

impl PipelineSettings {
    pub fn validate(&self) -> EncoderResult<()> {
        if self.max_conversion_concurrency == 0 {
            return Err(EncoderError::Config(format!(
                "{} must be a positive integer",
                EnvKey::MaxConversionConcurrency.as_str()
            )));
        }
        if self.max_upload_concurrency == 0 {
            return Err(EncoderError::Config(format!(
                "{} must be a positive integer",
                EnvKey::MaxUploadConcurrency.as_str()
            )));
        }
        if self.input_bucket.trim().is_empty() || self.output_bucket.trim().is_empty() {
            return Err(EncoderError::Config("bucket names can't be empty".to_string()));
        }
        Ok(())
    }
}

impl AppConfig {
    pub fn new() -> EncoderResult<Self> {
        let required = |key: EnvKey| {
            let name = key.as_str();
            env::get(key).map_err(|_| EncoderError::Config(format!("{name} is not set")))
        };

        let pipeline = PipelineSettings {
            input_bucket: required(EnvKey::InputBucket)?,
            output_bucket: required(EnvKey::OutputBucket)?,
            local_storage_path: PathBuf::from(env::get_or(EnvKey::LocalStoragePath, "/tmp")),
            max_conversion_concurrency: env::get_parsed(EnvKey::MaxConversionConcurrency, 1)?,
            max_upload_concurrency: env::get_parsed(EnvKey::MaxUploadConcurrency, 50)?,
        };
        pipeline.validate()?;

        Ok(Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 3000)?,
            database_url: required(EnvKey::DatabaseUrl)?,
            auto_migrate_db: env::get_parsed(EnvKey::AutoMigrateDb, false)?,
            rabbitmq: RabbitMqConfig {
                dsn: required(EnvKey::RabbitMqDsn)?,
                consumer_queue: env::get_or(EnvKey::RabbitMqConsumerQueue, "videos"),
                consumer_name: env::get_or(EnvKey::RabbitMqConsumerName, "encoder"),
                dead_letter_exchange: env::get_opt(EnvKey::RabbitMqDlx),
                notification_exchange: env::get_or(EnvKey::NotificationExchange, "amq.direct"),
                notification_routing_key: env::get_or(EnvKey::NotificationRoutingKey, "jobs"),
            },
            minio_url: required(EnvKey::MinioUrl)?,
            minio_access_key: required(EnvKey::MinioAccessKey)?,
            minio_secret_key: required(EnvKey::MinioSecretKey)?,
            aws_region: env::get_or(EnvKey::AwsRegion, "us-east-1"),
            pipeline,
        })
    }
}
