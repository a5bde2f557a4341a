//! # Pricing Strategies
//!
//! Each strategy turns a [`PricingContext`] into a line total.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Id                   Strategy                         Floor handling   │
//! │  ───────────────────  ───────────────────────────────  ──────────────   │
//! │  fixed-pricing        tier markup + modifiers          raise to floor   │
//! │  volume-pricing       markup - quantity bracket        fail (breach)    │
//! │  tiered-pricing       subscription fee / discount      target margin    │
//! │  dynamic-markdown     markup - expiry markdown         raise to floor   │
//! │  negotiated-pricing   per-customer agreement           fail (breach)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tier Floor Price
//! Strategies read the tier floor constant as a markup on cost:
//! `floor price = cost × (1 + floor/100)`. A RETAIL line costing 10.00 can
//! never be sold under 23.00.

pub mod fixed;
pub mod markdown;
pub mod negotiated;
pub mod tiered;
pub mod volume;

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::PricingContext;
use crate::error::{FloorRule, MarginBreach, PricingError, PricingResult, ValidationResult};
use crate::margin::markup_on_cost_percentage;
use crate::money::Money;
use crate::tier::PricingTier;

pub use fixed::FixedPricingStrategy;
pub use markdown::DynamicMarkdownPricingStrategy;
pub use negotiated::{NegotiatedPrice, NegotiatedPricingStrategy, NegotiatedTerms};
pub use tiered::{SubscriptionTier, SubscriptionTierConfig, TieredPricingStrategy};
pub use volume::{VolumeBracket, VolumePricingStrategy};

pub const FIXED_PRICING: &str = "fixed-pricing";
pub const VOLUME_PRICING: &str = "volume-pricing";
pub const TIERED_PRICING: &str = "tiered-pricing";
pub const DYNAMIC_MARKDOWN: &str = "dynamic-markdown";
pub const NEGOTIATED_PRICING: &str = "negotiated-pricing";

/// Computes a selling price.
pub trait PricingStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Total price for the whole line (all units).
    fn calculate_price(&self, context: &PricingContext) -> PricingResult<Money>;
}

/// Lowest price a tier may charge for `cost`: the floor constant read as
/// markup on cost ([`FloorRule::MarkupOnCost`]).
pub fn tier_floor_price(cost: &Money, tier: PricingTier) -> ValidationResult<Money> {
    cost.multiply(1.0 + tier.floor_gross_margin_percentage() / 100.0)
}

/// Fails with a breach when `price` is under the tier floor price. The breach
/// reports the markup on cost the price achieved.
pub(crate) fn ensure_floor(price: &Money, cost: &Money, tier: PricingTier) -> PricingResult<()> {
    let floor_price = tier_floor_price(cost, tier)?;
    if price.minor() >= floor_price.minor() {
        return Ok(());
    }
    Err(PricingError::MarginFloorViolation(Box::new(MarginBreach {
        tier,
        selling_price: *price,
        cost: *cost,
        rule: FloorRule::MarkupOnCost,
        calculated_margin: markup_on_cost_percentage(price, cost)?,
        floor_margin: tier.floor_gross_margin_percentage(),
    })))
}

// =============================================================================
// Registry
// =============================================================================

/// Strategies by id.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<String, Arc<dyn PricingStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All five built-in strategies under their standard ids.
    pub fn with_default_strategies() -> Self {
        let mut registry = Self::new();
        registry.register(FIXED_PRICING, Arc::new(FixedPricingStrategy::new()));
        registry.register(VOLUME_PRICING, Arc::new(VolumePricingStrategy::default()));
        registry.register(TIERED_PRICING, Arc::new(TieredPricingStrategy::default()));
        registry.register(DYNAMIC_MARKDOWN, Arc::new(DynamicMarkdownPricingStrategy::default()));
        registry.register(NEGOTIATED_PRICING, Arc::new(NegotiatedPricingStrategy::new()));
        registry
    }

    /// Adds or replaces a strategy.
    pub fn register(&mut self, id: impl Into<String>, strategy: Arc<dyn PricingStrategy>) {
        self.strategies.insert(id.into(), strategy);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn PricingStrategy>> {
        self.strategies.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.strategies.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.strategies.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    fn bbd(minor: i64) -> Money {
        Money::new(minor, Currency::new("BBD").unwrap()).unwrap()
    }

    #[test]
    fn test_floor_price_per_tier() {
        let cost = bbd(1000);
        assert_eq!(tier_floor_price(&cost, PricingTier::Retail).unwrap().minor(), 2300);
        assert_eq!(tier_floor_price(&cost, PricingTier::Wholesale).unwrap().minor(), 1700);
        assert_eq!(tier_floor_price(&cost, PricingTier::Importer).unwrap().minor(), 1300);
    }

    #[test]
    fn test_ensure_floor() {
        assert!(ensure_floor(&bbd(2300), &bbd(1000), PricingTier::Retail).is_ok());
        let err = ensure_floor(&bbd(2299), &bbd(1000), PricingTier::Retail).unwrap_err();
        let breach = err.margin_breach().unwrap();
        assert_eq!(breach.floor_margin, 130.0);
        assert_eq!(breach.selling_price.minor(), 2299);
        assert_eq!(breach.rule, FloorRule::MarkupOnCost);
        assert!((breach.calculated_margin - 129.9).abs() < 1e-9);
    }

    #[test]
    fn test_breach_numbers_match_the_rule_that_was_applied() {
        use crate::margin::{gross_margin_percentage, MarginGuardRailService};

        // Wholesale floor is 70: floor price 1700 on a cost of 1000.
        let cost = bbd(1000);
        let tier = PricingTier::Wholesale;
        let guard = MarginGuardRailService::new();

        for minor in [1600, 1699, 1700, 2000, 3333, 3334, 4000] {
            let price = bbd(minor);
            let markup = markup_on_cost_percentage(&price, &cost).unwrap();
            let gross = gross_margin_percentage(&price, &cost).unwrap();

            match ensure_floor(&price, &cost, tier) {
                Ok(()) => assert!(markup >= 70.0, "{} passed with markup {}", minor, markup),
                Err(err) => {
                    let breach = err.margin_breach().unwrap();
                    assert_eq!(breach.rule, FloorRule::MarkupOnCost);
                    assert_eq!(breach.calculated_margin, markup);
                    assert!(breach.calculated_margin < breach.floor_margin);
                }
            }

            match guard.check_margin_floor(&price, &cost, tier, None, None) {
                Ok(()) => assert!(gross >= 70.0, "{} passed with margin {}", minor, gross),
                Err(err) => {
                    let breach = err.margin_breach().unwrap();
                    assert_eq!(breach.rule, FloorRule::GrossMargin);
                    assert_eq!(breach.calculated_margin, gross);
                    assert!(breach.calculated_margin < breach.floor_margin);
                }
            }
        }

        // The strategy floor price clears the markup rule but not the
        // gross-margin rule; each breach says which one it failed.
        let floor_price = tier_floor_price(&cost, tier).unwrap();
        assert!(ensure_floor(&floor_price, &cost, tier).is_ok());
        let err = guard
            .check_margin_floor(&floor_price, &cost, tier, None, None)
            .unwrap_err();
        assert_eq!(err.margin_breach().unwrap().rule, FloorRule::GrossMargin);
    }

    #[test]
    fn test_default_registry() {
        let registry = StrategyRegistry::with_default_strategies();
        assert_eq!(
            registry.ids(),
            vec![
                DYNAMIC_MARKDOWN,
                FIXED_PRICING,
                NEGOTIATED_PRICING,
                TIERED_PRICING,
                VOLUME_PRICING
            ]
        );
        assert!(registry.get("unknown").is_none());
    }
}
