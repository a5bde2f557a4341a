//! # Relay Error Types
//!
//! Error types for configuration loading and event delivery.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Relay Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Delivery     │  │       Domain            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  DeliveryFailed │  │  Pricing                │ │
//! │  │  ConfigLoad     │  │  ChannelClosed  │  │  Validation             │ │
//! │  │  ConfigSave     │  │  Serialization  │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use pricing_core::{PricingError, ValidationError};
use thiserror::Error;

/// Result type alias for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// A loaded value is out of range or inconsistent.
    #[error("Invalid pricing configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    /// A global tracing subscriber was already installed.
    #[error("Failed to install tracing subscriber: {0}")]
    TracingInit(String),

    // =========================================================================
    // Delivery Errors
    // =========================================================================
    /// A sink refused an event.
    #[error("Delivery of {event} failed: {reason}")]
    DeliveryFailed { event: String, reason: String },

    #[error("Event channel closed")]
    ChannelClosed,

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    // =========================================================================
    // Domain Errors
    // =========================================================================
    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::SerializationFailed(err.to_string())
    }
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for RelayError {
    fn from(err: toml::de::Error) -> Self {
        RelayError::ConfigLoadFailed(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for RelayError {
    fn from(err: toml::ser::Error) -> Self {
        RelayError::ConfigSaveFailed(format!("TOML serialize error: {}", err))
    }
}
