use domain::services::BookingPolicy;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Bound on a single row-lock wait inside a booking transaction.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// Purchases close this many minutes before the event starts.
    #[serde(default = "default_purchase_cutoff")]
    pub purchase_cutoff_minutes: i64,

    /// Cancellations close this many minutes before the event starts.
    #[serde(default = "default_cancellation_cutoff")]
    pub cancellation_cutoff_minutes: i64,

    /// Unset means a purchase is limited only by availability.
    #[serde(default)]
    pub max_quantity_per_purchase: Option<i32>,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            purchase_cutoff_minutes: default_purchase_cutoff(),
            cancellation_cutoff_minutes: default_cancellation_cutoff(),
            max_quantity_per_purchase: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Serve a Prometheus scrape endpoint.
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_metrics_listen_addr")]
    pub listen_addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: default_metrics_listen_addr(),
        }
    }
}

// Default value functions
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_lock_timeout_ms() -> u64 {
    5000
}
fn default_purchase_cutoff() -> i64 {
    60
}
fn default_cancellation_cutoff() -> i64 {
    120
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_metrics_listen_addr() -> String {
    "0.0.0.0:9090".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with TICKETING__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("TICKETING").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds from embedded defaults only, so tests never read config files.
    /// Validation is skipped to allow partial configs.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [database]
            url = ""
            max_connections = 20
            min_connections = 5
            connect_timeout_secs = 10
            idle_timeout_secs = 600
            lock_timeout_ms = 5000

            [booking]
            purchase_cutoff_minutes = 60
            cancellation_cutoff_minutes = 120

            [logging]
            level = "info"
            format = "json"

            [metrics]
            enabled = false
            listen_addr = "0.0.0.0:9090"
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "TICKETING__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.database.lock_timeout_ms == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "lock_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.booking.purchase_cutoff_minutes < 0 || self.booking.cancellation_cutoff_minutes < 0
        {
            return Err(ConfigValidationError::InvalidValue(
                "booking cutoffs cannot be negative".to_string(),
            ));
        }

        if let Some(max) = self.booking.max_quantity_per_purchase {
            if max < 1 {
                return Err(ConfigValidationError::InvalidValue(
                    "max_quantity_per_purchase must be at least 1".to_string(),
                ));
            }
        }

        if self.metrics.enabled && self.metrics.listen_addr.parse::<std::net::SocketAddr>().is_err()
        {
            return Err(ConfigValidationError::InvalidValue(format!(
                "metrics.listen_addr '{}' is not a socket address",
                self.metrics.listen_addr
            )));
        }

        Ok(())
    }
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: config.idle_timeout_secs,
            lock_timeout_ms: config.lock_timeout_ms,
        }
    }
}

impl From<&BookingConfig> for BookingPolicy {
    fn from(config: &BookingConfig) -> Self {
        Self {
            purchase_cutoff: chrono::Duration::minutes(config.purchase_cutoff_minutes),
            cancellation_cutoff: chrono::Duration::minutes(config.cancellation_cutoff_minutes),
            max_quantity_per_purchase: config.max_quantity_per_purchase,
        }
    }
}
