//! Wallet configuration.
//!
//! [`WalletConfig`] has working defaults for every field. [`WalletConfig::load`]
//! layers, in order: the defaults, an optional TOML file, and `COINFLOW_*`
//! environment variables (nested keys use `__`, e.g.
//! `COINFLOW_CURRENCY__CODE=EUR`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{COMPLETION_THRESHOLD, DECIMALS, DEFAULT_DUST_THRESHOLD, DEFAULT_PAGE_SIZE};
use crate::error::ConfigError;
use crate::types::InputType;

/// Fiat currency used for conversions and display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// ISO code, e.g. "USD".
    pub code: String,
    /// Display symbol, e.g. "$".
    pub symbol: String,
    /// Fractional digits shown and accepted for input.
    pub decimals: u32,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            code: "USD".to_string(),
            symbol: "$".to_string(),
            decimals: 2,
        }
    }
}

/// Configuration for a wallet instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Confirmations after which a transaction counts as completed.
    pub completion_threshold: u64,
    /// Ticker of the wallet's coin, e.g. "BTC".
    pub coin_code: String,
    pub currency: CurrencyConfig,
    /// Unit the send flow starts in.
    pub default_input_type: InputType,
    /// History page size.
    pub page_size: usize,
    /// Change below this value is folded into the fee.
    pub dust_threshold: u64,
    /// Log level filter string (e.g. "info", "coinflow_core=debug").
    pub log_level: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            completion_threshold: COMPLETION_THRESHOLD,
            coin_code: "BTC".to_string(),
            currency: CurrencyConfig::default(),
            default_input_type: InputType::Coin,
            page_size: DEFAULT_PAGE_SIZE,
            dust_threshold: DEFAULT_DUST_THRESHOLD,
            log_level: "info".to_string(),
        }
    }
}

impl WalletConfig {
    /// Default location of the config file.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("coinflow")
            .join("config.toml")
    }

    /// Load the configuration: defaults, then `path` (if given), then the
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = config::Config::try_from(&Self::default())
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            debug!(path = %path.display(), "loading wallet config file");
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("COINFLOW")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let cfg: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.completion_threshold == 0 {
            return Err(ConfigError::ZeroCompletionThreshold);
        }
        if self.currency.decimals > DECIMALS {
            return Err(ConfigError::CurrencyTooPrecise(self.currency.decimals));
        }
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        Ok(())
    }
}
