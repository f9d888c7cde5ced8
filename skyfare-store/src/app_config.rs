use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub booking: BookingRules,
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub pricing: PricingRules,
    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

fn default_max_connections() -> u32 { 5 }
fn default_acquire_timeout_ms() -> u64 { 3_000 }

#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    /// Longest a request waits for a flight lock before failing as busy
    pub lock_wait_ms: u64,
    /// Probability that a simulated payment succeeds
    #[serde(default = "default_payment_success_rate")]
    pub payment_success_rate: f64,
    #[serde(default = "default_identifier_attempts")]
    pub max_identifier_attempts: u32,
}

fn default_payment_success_rate() -> f64 { 2.0 / 3.0 }
fn default_identifier_attempts() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub market_interval_seconds: u64,
    pub history_interval_seconds: u64,
}

/// Pricing coefficients. Defaults reproduce the published fare model.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PricingRules {
    pub seat_weight: f64,
    pub demand_low: f64,
    pub demand_high: f64,
    pub premium_markers: Vec<String>,
    pub premium_tier_factor: f64,
    pub standard_tier_factor: f64,
    pub floor_cents: i64,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            seat_weight: 0.4,
            demand_low: -0.08,
            demand_high: 0.25,
            premium_markers: vec!["premium".to_string(), "air india".to_string()],
            premium_tier_factor: 0.12,
            standard_tier_factor: -0.03,
            floor_cents: 5_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SeedConfig {
    pub sample_flights: bool,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self { sample_flights: true }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `SKYFARE__DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("SKYFARE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
