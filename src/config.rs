//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

/// Broker settings
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    /// Bootstrap servers, comma separated
    pub brokers: String,

    /// Consumer group id
    pub group_id: String,

    /// Where a new consumer group starts reading
    pub auto_offset_reset: String,

    /// Upper bound on a single broker poll
    pub poll_interval: Duration,

    /// Producer send timeout
    pub publish_timeout: Duration,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// The `<core>` segment of every topic name
    pub service_name: String,

    /// Optional environment prefix of the telemetry topic
    pub telemetry_topic_prefix: Option<String>,

    /// Version segment of the telemetry topic
    pub telemetry_topic_version: u32,

    pub kafka: KafkaConfig,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary lookup, e.g. a map in tests
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = var("DATABASE_MAX_CONNECTIONS", "10")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let service_name = var("SERVICE_NAME", "auth");
        if service_name.is_empty() {
            return Err(ConfigError::InvalidValue("SERVICE_NAME"));
        }

        let telemetry_topic_prefix = lookup("TELEMETRY_TOPIC_PREFIX").filter(|p| !p.is_empty());

        let telemetry_topic_version = var("TELEMETRY_TOPIC_VERSION", "1")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("TELEMETRY_TOPIC_VERSION"))?;

        let poll_interval_ms: u64 = var("POLL_INTERVAL_MS", "1000")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("POLL_INTERVAL_MS"))?;

        let publish_timeout_ms: u64 = var("PUBLISH_TIMEOUT_MS", "5000")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PUBLISH_TIMEOUT_MS"))?;

        let auto_offset_reset = var("KAFKA_AUTO_OFFSET_RESET", "earliest");
        if !matches!(auto_offset_reset.as_str(), "earliest" | "latest") {
            return Err(ConfigError::InvalidValue("KAFKA_AUTO_OFFSET_RESET"));
        }

        let kafka = KafkaConfig {
            brokers: var("KAFKA_BROKERS", "localhost:9092"),
            group_id: lookup("KAFKA_GROUP_ID")
                .unwrap_or_else(|| format!("{service_name}-service-group")),
            auto_offset_reset,
            poll_interval: Duration::from_millis(poll_interval_ms),
            publish_timeout: Duration::from_millis(publish_timeout_ms),
        };

        let environment = var("ENVIRONMENT", "development");

        Ok(Self {
            database_url,
            database_max_connections,
            service_name,
            telemetry_topic_prefix,
            telemetry_topic_version,
            kafka,
            environment,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
