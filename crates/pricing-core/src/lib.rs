//! # pricing-core: Pricing & Margin-Guard Engine
//!
//! This crate computes currency-safe selling prices for line items and
//! refuses prices that would sink a tier's gross margin. Everything here is
//! synchronous, in-memory logic; transport and configuration live in
//! `pricing-relay`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Pricing Engine Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │           Callers (checkout, catalog jobs, back office)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ PricingContext                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ pricing-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   PriceCalculationService ──► strategies ──► modifiers          │   │
//! │  │            │                       │                            │   │
//! │  │            ▼                       ▼                            │   │
//! │  │   MarginGuardRailService    tier · formula · percentages        │   │
//! │  │            │                                                    │   │
//! │  │            ▼                                                    │   │
//! │  │   PricingGovernanceService (freeze / unfreeze)                  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ dyn EventPublisher                     │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          pricing-relay (config, tracing, event channel)         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Integer `Money` with a currency code
//! - [`percentage`] - Bounded discount and markup percentages
//! - [`tier`] - Customer pricing tiers and their constants
//! - [`modifier`] - Discounts and surcharges, and the priority pipeline
//! - [`rule`] - Conditional pricing rules
//! - [`formula`] - Near-expiry markdown curve
//! - [`context`] - Input for pricing a line item
//! - [`strategies`] - The five pricing strategies and their registry
//! - [`margin`] - Margin floor checks and violation history
//! - [`calculation`] - The orchestrating service
//! - [`governance`] - Dynamic pricing freeze and promotion stacking
//! - [`events`] - Emitted events and publishers
//! - [`clock`] - Injectable time source
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Integer Money**: prices are minor units; percentages round back to
//!    whole cents on every multiply
//! 2. **Explicit Errors**: every failure is a typed `Result`, never a panic
//! 3. **One shared mutable thing**: the per-tier violation history
//! 4. **Injected edges**: clock and publisher are traits
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use pricing_core::{
//!     Currency, MarginGuardRailService, Money, PriceCalculationService, PriceModifier,
//!     PricingContext, PricingTier, StrategyRegistry,
//! };
//!
//! let service = PriceCalculationService::new(Arc::new(MarginGuardRailService::new()))
//!     .with_registry(StrategyRegistry::with_default_strategies());
//!
//! let cost = Money::new(1000, Currency::new("BBD").unwrap()).unwrap();
//! let promo = PriceModifier::percent_discount("Promo", "5% off", 5.0, 1).unwrap();
//! let ctx = PricingContext::new(cost, 1, PricingTier::Retail)
//!     .unwrap()
//!     .with_modifiers(vec![promo]);
//!
//! // 10.00 cost × 250% = 25.00, less 5% = 23.75
//! let price = service
//!     .calculate_with_appropriate_strategy(&ctx, "fixed-pricing", None, None)
//!     .unwrap();
//! assert_eq!(price.minor(), 2375);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod calculation;
pub mod clock;
pub mod context;
pub mod error;
pub mod events;
pub mod formula;
pub mod governance;
pub mod margin;
pub mod modifier;
pub mod money;
pub mod percentage;
pub mod rule;
pub mod strategies;
pub mod tier;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use calculation::PriceCalculationService;
pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{MarkdownInputs, PricingContext, SubscriptionPurchase};
pub use error::{FloorRule, MarginBreach, PricingError, PricingResult, ValidationError, ValidationResult};
pub use events::{EventPublisher, InMemoryPublisher, NoopPublisher, PricingEvent};
pub use formula::DynamicPricingFormula;
pub use governance::PricingGovernanceService;
pub use margin::{MarginGuardRailService, ViolationHistory};
pub use modifier::{PriceModifier, PriceModifierKind};
pub use money::{Currency, Money};
pub use percentage::{DiscountPercentage, MarkupPercentage};
pub use rule::{ConditionOperator, NewPricingRule, PricingRule, RuleCondition, RuleConditionType};
pub use strategies::{PricingStrategy, StrategyRegistry};
pub use tier::PricingTier;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Strategy used when nothing about the context points elsewhere.
pub const DEFAULT_STRATEGY_ID: &str = strategies::FIXED_PRICING;

/// Currency the business prices in.
pub const DEFAULT_CURRENCY: &str = "BBD";
