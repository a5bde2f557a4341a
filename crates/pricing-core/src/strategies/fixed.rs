//! Cost-plus pricing: tier (or custom) markup, then modifiers.

use tracing::debug;

use super::{tier_floor_price, PricingStrategy};
use crate::context::PricingContext;
use crate::error::PricingResult;
use crate::modifier::apply_price_modifiers;
use crate::money::Money;

/// `cost × markup × quantity`, modifiers applied, never under the tier floor.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedPricingStrategy;

impl FixedPricingStrategy {
    pub fn new() -> Self {
        FixedPricingStrategy
    }
}

impl PricingStrategy for FixedPricingStrategy {
    fn name(&self) -> &str {
        "Fixed Pricing Strategy"
    }

    fn description(&self) -> &str {
        "Applies the tier's markup to cost, then any price modifiers"
    }

    fn calculate_price(&self, context: &PricingContext) -> PricingResult<Money> {
        let unit_price = context.effective_markup()?.apply_to_money(&context.base_cost)?;
        let list_price = unit_price.multiply_quantity(context.quantity)?;
        let price = apply_price_modifiers(&list_price, &context.modifiers)?;

        let floor_price = tier_floor_price(&context.total_cost()?, context.tier)?;
        if price.minor() < floor_price.minor() {
            debug!(
                tier = %context.tier,
                price = %price,
                floor = %floor_price,
                "Fixed price under tier floor, raising to floor"
            );
            return Ok(floor_price);
        }
        Ok(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::PriceModifier;
    use crate::money::Currency;
    use crate::percentage::MarkupPercentage;
    use crate::tier::PricingTier;

    fn bbd(minor: i64) -> Money {
        Money::new(minor, Currency::new("BBD").unwrap()).unwrap()
    }

    #[test]
    fn test_retail_markup_and_quantity() {
        let strategy = FixedPricingStrategy::new();
        let one = PricingContext::new(bbd(1000), 1, PricingTier::Retail).unwrap();
        assert_eq!(strategy.calculate_price(&one).unwrap(), bbd(2500));

        let three = PricingContext::new(bbd(1000), 3, PricingTier::Retail).unwrap();
        assert_eq!(strategy.calculate_price(&three).unwrap(), bbd(7500));
    }

    #[test]
    fn test_custom_markup_and_surcharge() {
        let ctx = PricingContext::new(bbd(1000), 1, PricingTier::Importer)
            .unwrap()
            .with_custom_markup(MarkupPercentage::create(80.0).unwrap())
            .with_modifiers(vec![PriceModifier::percent_surcharge("Fee", "d", 10.0, 0).unwrap()]);
        assert_eq!(FixedPricingStrategy.calculate_price(&ctx).unwrap(), bbd(1980));
    }

    #[test]
    fn test_deep_discount_is_raised_to_floor() {
        let ctx = PricingContext::new(bbd(1000), 2, PricingTier::Retail)
            .unwrap()
            .with_modifiers(vec![PriceModifier::percent_discount("Clearance", "d", 50.0, 0).unwrap()]);
        assert_eq!(FixedPricingStrategy.calculate_price(&ctx).unwrap(), bbd(4600));
    }

    #[test]
    fn test_modifier_failure_propagates() {
        let usd = Currency::new("USD").unwrap();
        let ctx = PricingContext::new(bbd(1000), 1, PricingTier::Retail)
            .unwrap()
            .with_modifiers(vec![PriceModifier::fixed_discount("Coupon", "d", 100, usd, 0).unwrap()]);
        assert!(FixedPricingStrategy.calculate_price(&ctx).is_err());
    }
}
