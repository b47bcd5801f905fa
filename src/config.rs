use std::collections::HashMap;
use std::env;
use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_DB_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_QUEUE_CAPACITY: usize = 1000;
const DEFAULT_QUEUE_IDLE_POLL_MS: u64 = 50;

/// Per-warehouse manual-recount thresholds.
///
/// A bin whose available quantity (total minus reserve) drops below the
/// threshold for its warehouse is flagged for recount after fulfillment.
/// A threshold of `0` disables the check.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ApprovalConfig {
    /// Fallback threshold for warehouses without an explicit entry.
    #[serde(default)]
    #[validate(range(min = 0))]
    pub default_threshold: i32,

    /// Threshold overrides keyed by warehouse id.
    #[serde(default)]
    pub thresholds: HashMap<String, i32>,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            default_threshold: 0,
            thresholds: HashMap::new(),
        }
    }
}

impl ApprovalConfig {
    pub fn threshold_for(&self, warehouse_id: Uuid) -> i32 {
        self.thresholds
            .get(&warehouse_id.to_string())
            .copied()
            .unwrap_or(self.default_threshold)
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    #[validate(length(min = 1))]
    pub database_url: String,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Maximum number of database connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// Minimum number of database connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// Maximum number of buffered messages per topic
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Sleep between empty polls of the consumer loop, in milliseconds
    #[serde(default = "default_queue_idle_poll_ms")]
    pub queue_idle_poll_ms: u64,

    /// Manual-recount threshold configuration
    #[serde(default)]
    pub approval: ApprovalConfig,
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_db_max_connections() -> u32 {
    DEFAULT_DB_MAX_CONNECTIONS
}

fn default_db_min_connections() -> u32 {
    DEFAULT_DB_MIN_CONNECTIONS
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_queue_idle_poll_ms() -> u64 {
    DEFAULT_QUEUE_IDLE_POLL_MS
}

impl AppConfig {
    /// Directly construct a configuration, used by tests and tooling.
    pub fn new(database_url: String, environment: String) -> Self {
        Self {
            database_url,
            environment,
            log_level: default_log_level(),
            auto_migrate: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            queue_capacity: default_queue_capacity(),
            queue_idle_poll_ms: default_queue_idle_poll_ms(),
            approval: ApprovalConfig::default(),
        }
    }

    /// Load configuration from layered files plus `STOCKROOM_*` environment
    /// overrides. `config/default.*` applies first, then the file matching
    /// `STOCKROOM_ENV`, then the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let environment = env::var("STOCKROOM_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

        let builder = Config::builder()
            .add_source(File::from(Path::new(CONFIG_DIR).join("default")).required(false))
            .add_source(File::from(Path::new(CONFIG_DIR).join(&environment)).required(false))
            .add_source(Environment::with_prefix("STOCKROOM").separator("__"));

        let cfg: AppConfig = builder.build()?.try_deserialize()?;
        cfg.validate()
            .map_err(|e| ConfigError::Message(format!("invalid configuration: {}", e)))?;

        info!(
            environment = %cfg.environment,
            log_level = %cfg.log_level,
            "Configuration loaded"
        );
        Ok(cfg)
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}
