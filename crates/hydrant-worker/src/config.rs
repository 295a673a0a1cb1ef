use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WorkerConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // MQTT ingest
    #[serde(default = "default_mqtt_host")]
    pub mqtt_host: String,

    #[serde(default = "default_mqtt_port")]
    pub mqtt_port: u16,

    #[serde(default = "default_mqtt_client_id")]
    pub mqtt_client_id: String,

    #[serde(default)]
    pub mqtt_username: String,

    #[serde(default)]
    pub mqtt_password: String,

    // Fragment reassembly buffer
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Expiry for incomplete fragment sets in seconds; 0 disables expiry.
    #[serde(default = "default_fragment_ttl_secs")]
    pub fragment_ttl_secs: u64,

    // Metadata store
    #[serde(default = "default_postgres_host")]
    pub postgres_host: String,

    #[serde(default = "default_postgres_port")]
    pub postgres_port: u16,

    #[serde(default = "default_postgres_database")]
    pub postgres_database: String,

    #[serde(default = "default_postgres_user")]
    pub postgres_user: String,

    #[serde(default)]
    pub postgres_password: String,

    #[serde(default = "default_postgres_pool_size")]
    pub postgres_pool_size: usize,

    // NATS egress
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    #[serde(default = "default_nats_stream")]
    pub nats_stream: String,

    /// Base subject for the two routing keys (`.telemetry` and `.event`).
    #[serde(default = "default_publish_subject")]
    pub publish_subject: String,

    /// Interval between burst samples when the envelope carries no usable
    /// sample rate, in microseconds.
    #[serde(default = "default_sample_interval_us")]
    pub default_sample_interval_us: i64,

    /// Startup timeout for initialization operations in seconds
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_mqtt_host() -> String {
    "localhost".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_mqtt_client_id() -> String {
    "hydrant-worker".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_fragment_ttl_secs() -> u64 {
    3600
}

fn default_postgres_host() -> String {
    "localhost".to_string()
}

fn default_postgres_port() -> u16 {
    5432
}

fn default_postgres_database() -> String {
    "hydrant".to_string()
}

fn default_postgres_user() -> String {
    "hydrant".to_string()
}

fn default_postgres_pool_size() -> usize {
    8
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_nats_stream() -> String {
    "telemetry".to_string()
}

fn default_publish_subject() -> String {
    "telemetry".to_string()
}

fn default_sample_interval_us() -> i64 {
    1_000_000
}

fn default_startup_timeout_secs() -> u64 {
    30
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_prefix("HYDRANT")
    }

    fn from_env_with_prefix(prefix: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix(prefix))
            .build()?
            .try_deserialize()
    }
}
