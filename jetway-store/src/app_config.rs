use jetway_core::{BookingRules, SurgePolicy};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub redis: Option<RedisConfig>,
    pub kafka: Option<KafkaConfig>,
    pub auth: AuthConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    pub tax_rate: Decimal,
    pub surge_window_seconds: i64,
    pub surge_threshold: u32,
    pub surge_multiplier: Decimal,
    pub pnr_max_attempts: u32,
    pub require_seat_selection: bool,
    pub rate_limit_per_minute: i64,
}

impl Default for BusinessRules {
    fn default() -> Self {
        let rules = BookingRules::default();
        Self {
            tax_rate: rules.tax_rate,
            surge_window_seconds: rules.surge.window.num_seconds(),
            surge_threshold: rules.surge.threshold,
            surge_multiplier: rules.surge.multiplier,
            pnr_max_attempts: rules.pnr_max_attempts,
            require_seat_selection: rules.require_seat_selection,
            rate_limit_per_minute: 100,
        }
    }
}

impl BusinessRules {
    pub fn booking_rules(&self) -> BookingRules {
        BookingRules {
            tax_rate: self.tax_rate,
            surge: SurgePolicy {
                window: chrono::Duration::seconds(self.surge_window_seconds),
                threshold: self.surge_threshold,
                multiplier: self.surge_multiplier,
            },
            pnr_max_attempts: self.pnr_max_attempts.max(1),
            require_seat_selection: self.require_seat_selection,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Take the client address from `X-Forwarded-For`. Only safe behind a proxy
    /// that overwrites the header.
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_true")]
    pub run_migrations: bool,
    #[serde(default)]
    pub seed_on_startup: bool,
}

fn default_max_connections() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Untracked developer overrides
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `JETWAY__DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("JETWAY").prefix_separator("__").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
