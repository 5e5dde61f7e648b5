//! Service settings.
//!
//! Layered lowest to highest: built-in defaults, the TOML file
//! (`config/default.toml` or `$REBATE_CONFIG`), `REBATE__*` variables, then
//! the few plain variables shared with other deployments.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use api::{CorsConfig, TrackingConfig};
use promotion_store::StoreConfig;
use rebate_core::CalculatorConfig;

const DEFAULT_CONFIG_FILE: &str = "config/default";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// "production" hides internal error details from callers
    pub environment: String,
    /// Seconds between expired-promotion sweeps
    pub expiry_sweep_secs: u64,
    pub cors: CorsConfig,
    pub calculator: CalculatorConfig,
    pub store: StoreConfig,
    pub tracking: TrackingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            environment: "development".into(),
            expiry_sweep_secs: 300,
            cors: CorsConfig::default(),
            calculator: CalculatorConfig::default(),
            store: StoreConfig::default(),
            tracking: TrackingConfig::default(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let file = std::env::var("REBATE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.into());

        let mut settings: Settings = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(config::File::with_name(&file).required(false))
            .add_source(
                config::Environment::with_prefix("REBATE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read settings (file: {file})"))?
            .try_deserialize()
            .context("Invalid settings")?;

        settings.apply_env_overrides()?;
        Ok(settings)
    }

    /// Single-underscore variables used by existing deployments.
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(origins) = std::env::var("ALLOWED_ORIGINS") {
            self.cors = CorsConfig::from_list(&origins);
        }
        if let Ok(environment) = std::env::var("REBATE_ENVIRONMENT") {
            self.environment = environment;
        }
        if let Ok(path) = std::env::var("REBATE_STORE_SEED_PATH") {
            self.store.seed_path = Some(path);
        }
        if let Ok(commission) = std::env::var("REBATE_STANDARD_COMMISSION_PER_LOT") {
            self.calculator.standard_commission_per_lot = commission
                .parse()
                .context("REBATE_STANDARD_COMMISSION_PER_LOT must be a number")?;
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("Invalid host address {:?}", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Never zero, so the sweep interval cannot spin.
    pub fn expiry_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_sweep_secs.max(1))
    }
}
