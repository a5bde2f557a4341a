//! # pricing-relay: Runtime Plumbing for the Pricing Engine
//!
//! Configuration, logging and asynchronous event delivery around
//! `pricing-core`.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  1. telemetry::init_tracing()         PRICING_LOG / RUST_LOG           │
//! │  2. PricingConfig::load(None)         defaults → pricing.toml → env    │
//! │  3. EventRelay::from_config(&config)  bounded channel                  │
//! │  4. tokio::spawn(relay.run(sink))                                      │
//! │  5. PriceCalculationService::new(..)                                   │
//! │        .with_registry(config.strategy_registry()?)                     │
//! │        .with_publisher(Arc::new(publisher))                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pricing_core::{MarginGuardRailService, PriceCalculationService};
//! use pricing_relay::{telemetry, EventRelay, LogSink, PricingConfig};
//!
//! # async fn start() -> pricing_relay::RelayResult<()> {
//! telemetry::init_tracing()?;
//! let config = PricingConfig::load(None)?;
//! let (relay, publisher, handle) = EventRelay::from_config(&config)?;
//! tokio::spawn(relay.run(LogSink));
//!
//! let service = PriceCalculationService::new(Arc::new(MarginGuardRailService::new()))
//!     .with_registry(config.strategy_registry()?)
//!     .with_publisher(Arc::new(publisher));
//! # drop(service);
//! handle.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod relay;
pub mod telemetry;

pub use config::PricingConfig;
pub use error::{RelayError, RelayResult};
pub use relay::{ChannelPublisher, EventRelay, EventRelayHandle, EventSink, LogSink, RelayStats};
