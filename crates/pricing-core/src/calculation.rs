//! # Price Calculation Service
//!
//! The entry point for pricing a line item.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  calculate_price(strategy_id, context, product_id, old_price)           │
//! │       │                                                                 │
//! │       ├── registry lookup ──► StrategyNotFound                          │
//! │       ▼                                                                 │
//! │  strategy.calculate_price(context)                                      │
//! │       │                                                                 │
//! │       ├── Ok(price)                                                     │
//! │       │     └── old price given and different ──► PriceChanged          │
//! │       │                                                                 │
//! │       └── Err(MarginFloorViolation)                                     │
//! │             ├── guard rail records a violation for the tier             │
//! │             └── product known ──► MarginFloorBreached                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::context::PricingContext;
use crate::error::{PricingError, PricingResult};
use crate::events::{self, EventPublisher, MarginFloorBreached, NoopPublisher, PricingEvent};
use crate::margin::MarginGuardRailService;
use crate::modifier::{self, PriceModifier};
use crate::money::Money;
use crate::rule::PricingRule;
use crate::strategies::{
    PricingStrategy, StrategyRegistry, DYNAMIC_MARKDOWN, NEGOTIATED_PRICING, TIERED_PRICING,
    VOLUME_PRICING,
};

/// Quantities above this go to volume pricing.
pub const VOLUME_PRICING_MIN_QUANTITY: u32 = 10;

/// Orchestrates strategies, modifiers, the guard rail and event publishing.
pub struct PriceCalculationService {
    registry: StrategyRegistry,
    guard_rail: Arc<MarginGuardRailService>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
}

impl PriceCalculationService {
    /// Empty registry, no publisher.
    pub fn new(guard_rail: Arc<MarginGuardRailService>) -> Self {
        PriceCalculationService {
            registry: StrategyRegistry::new(),
            guard_rail,
            publisher: Arc::new(NoopPublisher),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_registry(mut self, registry: StrategyRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn register_strategy(&mut self, id: impl Into<String>, strategy: Arc<dyn PricingStrategy>) {
        self.registry.register(id, strategy);
    }

    pub fn strategy(&self, id: &str) -> Option<Arc<dyn PricingStrategy>> {
        self.registry.get(id)
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn guard_rail(&self) -> &Arc<MarginGuardRailService> {
        &self.guard_rail
    }

    /// Prices `context` with the strategy registered under `strategy_id`.
    ///
    /// `product_id` falls back to the context's product. A `PriceChanged`
    /// event needs both a product and `old_price`; a breach event needs a
    /// product.
    ///
    /// ## Example
    /// ```rust
    /// use std::sync::Arc;
    /// use pricing_core::calculation::PriceCalculationService;
    /// use pricing_core::context::PricingContext;
    /// use pricing_core::margin::MarginGuardRailService;
    /// use pricing_core::money::{Currency, Money};
    /// use pricing_core::strategies::{StrategyRegistry, FIXED_PRICING};
    /// use pricing_core::tier::PricingTier;
    ///
    /// let service = PriceCalculationService::new(Arc::new(MarginGuardRailService::new()))
    ///     .with_registry(StrategyRegistry::with_default_strategies());
    ///
    /// let cost = Money::new(1000, Currency::new("BBD").unwrap()).unwrap();
    /// let ctx = PricingContext::new(cost, 1, PricingTier::Retail).unwrap();
    /// let price = service.calculate_price(FIXED_PRICING, &ctx, None, None).unwrap();
    /// assert_eq!(price.minor(), 2500);
    /// ```
    pub fn calculate_price(
        &self,
        strategy_id: &str,
        context: &PricingContext,
        product_id: Option<&str>,
        old_price: Option<&Money>,
    ) -> PricingResult<Money> {
        let strategy = self
            .registry
            .get(strategy_id)
            .ok_or_else(|| PricingError::StrategyNotFound(strategy_id.to_string()))?;

        let calculation_id = Uuid::new_v4().to_string();
        let product_id = product_id.or(context.product_id.as_deref());

        match strategy.calculate_price(context) {
            Ok(price) => {
                if let (Some(product_id), Some(old_price)) = (product_id, old_price) {
                    if *old_price != price {
                        self.publisher.publish(events::price_changed(
                            product_id,
                            old_price,
                            &price,
                            &format!("Calculated using {}", strategy.name()),
                            &calculation_id,
                            self.clock.now(),
                        ));
                    }
                }
                debug!(
                    strategy = strategy_id,
                    calculation_id = %calculation_id,
                    price = %price,
                    "Price calculated"
                );
                Ok(price)
            }
            Err(err) => {
                if let Some(breach) = err.margin_breach() {
                    self.guard_rail.record_margin_violation(breach.tier);
                    warn!(
                        strategy = strategy_id,
                        tier = %breach.tier,
                        rule = breach.rule.as_str(),
                        margin = breach.calculated_margin,
                        floor = breach.floor_margin,
                        "Strategy price breached margin floor"
                    );
                    if let Some(product_id) = product_id {
                        self.publisher
                            .publish(PricingEvent::MarginFloorBreached(MarginFloorBreached::from_breach(
                                breach,
                                product_id,
                                &calculation_id,
                                None,
                                self.clock.now(),
                            )));
                    }
                }
                Err(err)
            }
        }
    }

    /// Applies `modifiers` to `base`, highest priority first.
    pub fn apply_price_modifiers(
        &self,
        base: &Money,
        modifiers: &[PriceModifier],
    ) -> PricingResult<Money> {
        modifier::apply_price_modifiers(base, modifiers)
    }

    /// Picks a strategy id for `context`. The first registered match wins:
    ///
    /// 1. subscription → `tiered-pricing`
    /// 2. markdown inputs → `dynamic-markdown`
    /// 3. quantity above 10 → `volume-pricing`
    /// 4. customer with negotiated prices → `negotiated-pricing`
    /// 5. `default_id`
    pub fn determine_appropriate_pricing_strategy(
        &self,
        context: &PricingContext,
        default_id: &str,
    ) -> String {
        let candidates = [
            (context.subscription.is_some(), TIERED_PRICING),
            (context.markdown.is_some(), DYNAMIC_MARKDOWN),
            (context.quantity > VOLUME_PRICING_MIN_QUANTITY, VOLUME_PRICING),
            (context.has_negotiated_prices(), NEGOTIATED_PRICING),
        ];

        let chosen = candidates
            .into_iter()
            .find(|(applies, id)| *applies && self.registry.contains(id))
            .map(|(_, id)| id)
            .unwrap_or(default_id);

        debug!(strategy = chosen, "Pricing strategy resolved");
        chosen.to_string()
    }

    /// Resolves the strategy, then prices with it.
    pub fn calculate_with_appropriate_strategy(
        &self,
        context: &PricingContext,
        default_id: &str,
        product_id: Option<&str>,
        old_price: Option<&Money>,
    ) -> PricingResult<Money> {
        let strategy_id = self.determine_appropriate_pricing_strategy(context, default_id);
        self.calculate_price(&strategy_id, context, product_id, old_price)
    }

    /// Modifiers of the rules that apply to `context` right now.
    ///
    /// A rule applies when it is active at the context's `at` (else the
    /// service clock's time), covers the context tier and all its conditions
    /// match the context attributes.
    pub fn modifiers_from_rules(
        &self,
        rules: &[PricingRule],
        context: &PricingContext,
    ) -> Vec<PriceModifier> {
        let at = context.at.unwrap_or_else(|| self.clock.now());
        rules
            .iter()
            .filter(|rule| {
                rule.is_active_at(at)
                    && rule.is_applicable_to(context.tier)
                    && rule.matches_conditions(&context.attributes)
            })
            .map(|rule| rule.modifier().with_priority(rule.priority()))
            .collect()
    }
}
