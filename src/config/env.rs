use std::env;
use std::str::FromStr;

use crate::error::{EncoderError, EncoderResult};

#[derive(Debug, Clone, Copy)]
pub enum EnvKey {
    ServerPort,
    DatabaseUrl,
    AutoMigrateDb,
    RabbitMqDsn,
    RabbitMqConsumerQueue,
    RabbitMqConsumerName,
    RabbitMqDlx,
    NotificationExchange,
    NotificationRoutingKey,
    MinioUrl,
    MinioAccessKey,
    MinioSecretKey,
    AwsRegion,
    InputBucket,
    OutputBucket,
    LocalStoragePath,
    MaxConversionConcurrency,
    MaxUploadConcurrency,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::DatabaseUrl => "DATABASE_URL",
            EnvKey::AutoMigrateDb => "AUTO_MIGRATE_DB",
            EnvKey::RabbitMqDsn => "RABBITMQ_DSN",
            EnvKey::RabbitMqConsumerQueue => "RABBITMQ_CONSUMER_QUEUE_NAME",
            EnvKey::RabbitMqConsumerName => "RABBITMQ_CONSUMER_NAME",
            EnvKey::RabbitMqDlx => "RABBITMQ_DLX",
            EnvKey::NotificationExchange => "RABBITMQ_NOTIFICATION_EX",
            EnvKey::NotificationRoutingKey => "RABBITMQ_NOTIFICATION_ROUTING_KEY",
            EnvKey::MinioUrl => "MINIO_ENDPOINT",
            EnvKey::MinioAccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::MinioSecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::AwsRegion => "AWS_REGION",
            EnvKey::InputBucket => "INPUT_BUCKET_NAME",
            EnvKey::OutputBucket => "OUTPUT_BUCKET_NAME",
            EnvKey::LocalStoragePath => "LOCAL_STORAGE_PATH",
            EnvKey::MaxConversionConcurrency => "MAX_CONVERSION_CONCURRENCY",
            EnvKey::MaxUploadConcurrency => "MAX_UPLOAD_CONCURRENCY",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_opt(key: EnvKey) -> Option<String> {
    env::var(key.as_str()).ok().filter(|v| !v.trim().is_empty())
}

/// Reads and parses `key`, falling back to `default` when it is unset.
/// A value that is set but doesn't parse is a configuration error.
pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> EncoderResult<T> {
    parse_value(&key, get(key).ok().as_deref(), default)
}

pub(crate) fn parse_value<T: FromStr>(key: &EnvKey, raw: Option<&str>, default: T) -> EncoderResult<T> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(val) => val.parse::<T>().map_err(|_| {
            EncoderError::Config(format!("{} has an invalid value: {}", key.as_str(), val))
        }),
    }
}
