use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::config::env::{self, EnvKey};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is not a valid URL: {reason}")]
    InvalidUrl { key: &'static str, reason: String },

    #[error("{key} must use one of the schemes {expected:?}, got {found:?}")]
    UnsupportedScheme {
        key: &'static str,
        expected: &'static [&'static str],
        found: String,
    },

    #[error("{key} must not be empty")]
    Empty { key: &'static str },

    #[error("{key} must be a positive integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub rabbitmq_url: String,
    pub queue_name: String,
    pub consumer_tag: String,
    pub minio_url: String,
    pub minio_bucket: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
    pub minio_region: String,
    pub ffmpeg_path: String,
    pub work_dir: PathBuf,
    pub fetch_timeout: Option<Duration>,
    pub ladder_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_lookup(env::get)
    }

    /// Builds the configuration from an arbitrary key lookup. Keys the lookup
    /// does not know fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(EnvKey) -> Option<String>,
    {
        let value = |key: EnvKey| -> String {
            lookup(key)
                .or_else(|| key.default_value().map(str::to_string))
                .unwrap_or_default()
        };

        let rabbitmq_url = value(EnvKey::RabbitMqUrl);
        check_url(EnvKey::RabbitMqUrl, &rabbitmq_url, &["amqp", "amqps"])?;

        let minio_url = normalize_endpoint(&value(EnvKey::MinioUrl));
        check_url(EnvKey::MinioUrl, &minio_url, &["http", "https"])?;

        let fetch_timeout = match lookup(EnvKey::FetchTimeoutSecs) {
            Some(raw) => Some(parse_secs(EnvKey::FetchTimeoutSecs, &raw)?),
            None => None,
        };

        let work_dir = lookup(EnvKey::WorkDir)
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);

        Ok(Self {
            rabbitmq_url,
            queue_name: non_empty(EnvKey::RabbitMqQueue, value(EnvKey::RabbitMqQueue))?,
            consumer_tag: value(EnvKey::RabbitMqConsumerTag),
            minio_url,
            minio_bucket: non_empty(EnvKey::MinioBucket, value(EnvKey::MinioBucket))?,
            minio_access_key: value(EnvKey::MinioAccessKey),
            minio_secret_key: value(EnvKey::MinioSecretKey),
            minio_region: value(EnvKey::MinioRegion),
            ffmpeg_path: non_empty(EnvKey::FfmpegPath, value(EnvKey::FfmpegPath))?,
            work_dir,
            fetch_timeout,
            ladder_file: lookup(EnvKey::LadderFile).map(PathBuf::from),
        })
    }
}

// MinIO endpoints are commonly given as bare host:port.
fn normalize_endpoint(raw: &str) -> String {
    let raw = raw.trim();
    if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    }
}

fn check_url(key: EnvKey, raw: &str, schemes: &'static [&'static str]) -> Result<(), ConfigError> {
    let parsed = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        key: key.as_str(),
        reason: e.to_string(),
    })?;

    if !schemes.contains(&parsed.scheme()) {
        return Err(ConfigError::UnsupportedScheme {
            key: key.as_str(),
            expected: schemes,
            found: parsed.scheme().to_string(),
        });
    }

    Ok(())
}

fn non_empty(key: EnvKey, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Empty { key: key.as_str() });
    }
    Ok(value)
}

fn parse_secs(key: EnvKey, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidNumber {
            key: key.as_str(),
            value: raw.to_string(),
        }),
    }
}
