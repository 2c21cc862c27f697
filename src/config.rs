//! Configuration management for the GSE checkout server

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
    /// When set, logs are also written to a daily rolling file in this directory
    pub directory: Option<String>,
}

/// Where equipment and certification records come from
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Fixtures,
    Http,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Base URL of the fleet REST API (used when kind = "http")
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FixturesConfig {
    pub equipment_path: String,
    pub certifications_path: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    Simulated,
    Http,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GatewayConfig {
    pub kind: GatewayKind,
    /// Endpoint receiving checkout/reservation submissions (kind = "http")
    pub url: String,
    pub simulated_latency_ms: u64,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CheckoutConfig {
    /// Wall-clock time the "end of shift" return policy resolves to (HH:MM)
    pub end_of_shift: String,
    pub session_ttl_minutes: u64,
    pub sweep_interval_secs: u64,
    /// Only count active, unexpired certifications toward eligibility
    pub enforce_certification_expiry: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScanConfig {
    /// Sampling period of the scanner loop
    pub frame_interval_ms: u64,
    /// Frames queued for the scanner before new ones are dropped
    pub frame_buffer: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SettingsConfig {
    /// JSON file holding feature flags and theme
    pub path: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub fixtures: FixturesConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub checkout: CheckoutConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // e.g. GSE_CHECKOUT__SESSION_TTL_MINUTES=10
            .add_source(
                Environment::with_prefix("GSE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("auth.jwt_secret", env::var("JWT_SECRET").ok())?
            .set_override_option("source.base_url", env::var("FLEET_API_URL").ok())?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-this-secret-in-production".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            directory: None,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Fixtures,
            base_url: "http://localhost:3001/api".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for FixturesConfig {
    fn default() -> Self {
        Self {
            equipment_path: "fixtures/equipment.json".to_string(),
            certifications_path: "fixtures/certifications.json".to_string(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            kind: GatewayKind::Simulated,
            url: "http://localhost:3001/api/checkouts".to_string(),
            simulated_latency_ms: 1500,
            timeout_secs: 15,
        }
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            end_of_shift: "18:00".to_string(),
            session_ttl_minutes: 30,
            sweep_interval_secs: 60,
            enforce_certification_expiry: false,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            frame_buffer: 2,
        }
    }
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: "data/portal-settings.json".to_string(),
        }
    }
}
