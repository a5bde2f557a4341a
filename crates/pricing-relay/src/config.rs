//! # Pricing Configuration
//!
//! Tunables for the pricing engine and its event relay.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     PRICING_FORMULA_BETA=0.35                                          │
//! │     PRICING_DEFAULT_STRATEGY=volume-pricing                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/pricing-engine/pricing.toml (Linux)                      │
//! │     ~/Library/Application Support/com.pricing.engine/pricing.toml      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     β 0.4, γ 0.5, 45 days, fixed-pricing, 256 queued events            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # pricing.toml
//! [formula]
//! beta = 0.4
//! gamma = 0.5
//! max_days = 45.0
//!
//! [strategies]
//! default_strategy = "fixed-pricing"
//! currency = "BBD"
//!
//! [[strategies.volume_brackets]]
//! min_quantity = 1
//! discount_percentage = 0.0
//!
//! [[strategies.volume_brackets]]
//! min_quantity = 10
//! discount_percentage = 8.0
//!
//! [relay]
//! channel_capacity = 256
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use pricing_core::formula::{DEFAULT_BETA, DEFAULT_GAMMA, DEFAULT_MAX_DAYS};
use pricing_core::strategies::volume::{default_volume_brackets, validate_volume_brackets};
use pricing_core::strategies::{
    DynamicMarkdownPricingStrategy, VolumeBracket, VolumePricingStrategy, DYNAMIC_MARKDOWN,
    VOLUME_PRICING,
};
use pricing_core::{Currency, DynamicPricingFormula, StrategyRegistry, DEFAULT_CURRENCY};

use crate::error::{RelayError, RelayResult};

// =============================================================================
// Formula Settings
// =============================================================================

/// Coefficients of the near-expiry markdown curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormulaSettings {
    /// Weight of demand, 0..=1.
    #[serde(default = "default_beta")]
    pub beta: f64,

    /// Weight of profitability, 0..=1.
    #[serde(default = "default_gamma")]
    pub gamma: f64,

    /// Shelf-life horizon in days.
    #[serde(default = "default_max_days")]
    pub max_days: f64,
}

fn default_beta() -> f64 {
    DEFAULT_BETA
}

fn default_gamma() -> f64 {
    DEFAULT_GAMMA
}

fn default_max_days() -> f64 {
    DEFAULT_MAX_DAYS
}

impl Default for FormulaSettings {
    fn default() -> Self {
        FormulaSettings {
            beta: default_beta(),
            gamma: default_gamma(),
            max_days: default_max_days(),
        }
    }
}

// =============================================================================
// Strategy Settings
// =============================================================================

/// One row of the volume discount table, as written in `pricing.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeBracketSettings {
    pub min_quantity: u32,
    pub discount_percentage: f64,
}

impl From<VolumeBracketSettings> for VolumeBracket {
    fn from(s: VolumeBracketSettings) -> Self {
        VolumeBracket::new(s.min_quantity, s.discount_percentage)
    }
}

impl From<VolumeBracket> for VolumeBracketSettings {
    fn from(b: VolumeBracket) -> Self {
        VolumeBracketSettings {
            min_quantity: b.min_quantity,
            discount_percentage: b.discount_percentage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySettings {
    /// Strategy used when the context does not call for another.
    #[serde(default = "default_strategy")]
    pub default_strategy: String,

    /// ISO code prices are quoted in.
    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_brackets")]
    pub volume_brackets: Vec<VolumeBracketSettings>,
}

fn default_strategy() -> String {
    pricing_core::DEFAULT_STRATEGY_ID.to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_brackets() -> Vec<VolumeBracketSettings> {
    default_volume_brackets().into_iter().map(Into::into).collect()
}

impl Default for StrategySettings {
    fn default() -> Self {
        StrategySettings {
            default_strategy: default_strategy(),
            currency: default_currency(),
            volume_brackets: default_brackets(),
        }
    }
}

// =============================================================================
// Relay Settings
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaySettings {
    /// Events buffered before publishers start dropping.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for RelaySettings {
    fn default() -> Self {
        RelaySettings {
            channel_capacity: default_channel_capacity(),
        }
    }
}

// =============================================================================
// Pricing Config
// =============================================================================

/// Complete configuration for the pricing engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default)]
    pub formula: FormulaSettings,

    #[serde(default)]
    pub strategies: StrategySettings,

    #[serde(default)]
    pub relay: RelaySettings,
}

impl PricingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (pricing.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> RelayResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading pricing config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load pricing config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a `pricing.toml` document. Does not validate.
    pub fn from_toml(contents: &str) -> RelayResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> RelayResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| RelayError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| RelayError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| RelayError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Pricing config saved");
        Ok(())
    }

    pub fn validate(&self) -> RelayResult<()> {
        self.formula()?;
        self.currency()?;

        if self.relay.channel_capacity == 0 {
            return Err(RelayError::InvalidConfig(
                "channel_capacity must be greater than 0".into(),
            ));
        }

        if !StrategyRegistry::with_default_strategies().contains(&self.strategies.default_strategy)
        {
            return Err(RelayError::InvalidConfig(format!(
                "Unknown default strategy: '{}'",
                self.strategies.default_strategy
            )));
        }

        validate_volume_brackets(&self.volume_brackets())?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `PRICING_*` overrides from `lookup`. Unparseable numbers are
    /// logged and ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(beta) = parse_override(&lookup, "PRICING_FORMULA_BETA") {
            debug!(beta, "Overriding formula beta from environment");
            self.formula.beta = beta;
        }

        if let Some(gamma) = parse_override(&lookup, "PRICING_FORMULA_GAMMA") {
            debug!(gamma, "Overriding formula gamma from environment");
            self.formula.gamma = gamma;
        }

        if let Some(max_days) = parse_override(&lookup, "PRICING_FORMULA_MAX_DAYS") {
            self.formula.max_days = max_days;
        }

        if let Some(id) = lookup("PRICING_DEFAULT_STRATEGY") {
            debug!(strategy = %id, "Overriding default strategy from environment");
            self.strategies.default_strategy = id;
        }

        if let Some(capacity) = parse_override(&lookup, "PRICING_RELAY_CAPACITY") {
            self.relay.channel_capacity = capacity;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "pricing", "engine")
            .map(|dirs| dirs.config_dir().join("pricing.toml"))
    }

    // =========================================================================
    // Conversions into core types
    // =========================================================================

    pub fn formula(&self) -> RelayResult<DynamicPricingFormula> {
        Ok(DynamicPricingFormula::create(
            self.formula.beta,
            self.formula.gamma,
            self.formula.max_days,
        )?)
    }

    pub fn currency(&self) -> RelayResult<Currency> {
        Ok(Currency::new(&self.strategies.currency)?)
    }

    pub fn volume_brackets(&self) -> Vec<VolumeBracket> {
        self.strategies
            .volume_brackets
            .iter()
            .copied()
            .map(Into::into)
            .collect()
    }

    pub fn default_strategy(&self) -> &str {
        &self.strategies.default_strategy
    }

    /// The built-in strategies, with the volume table and markdown formula
    /// taken from this config.
    pub fn strategy_registry(&self) -> RelayResult<StrategyRegistry> {
        let mut registry = StrategyRegistry::with_default_strategies();
        registry.register(
            VOLUME_PRICING,
            Arc::new(VolumePricingStrategy::new(self.volume_brackets())?),
        );
        registry.register(
            DYNAMIC_MARKDOWN,
            Arc::new(DynamicMarkdownPricingStrategy::new(self.formula()?)),
        );
        Ok(registry)
    }
}

fn parse_override<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}
