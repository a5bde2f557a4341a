//! Near-expiry markdown driven by [`DynamicPricingFormula`].

use tracing::{debug, info};

use super::{tier_floor_price, PricingStrategy};
use crate::context::PricingContext;
use crate::error::{PricingResult, ValidationError};
use crate::formula::DynamicPricingFormula;
use crate::money::Money;
use crate::percentage::DiscountPercentage;

/// Markup price less the formula markdown, capped at the tier's max
/// discount and never under the tier floor price.
#[derive(Debug, Clone, Default)]
pub struct DynamicMarkdownPricingStrategy {
    formula: DynamicPricingFormula,
}

impl DynamicMarkdownPricingStrategy {
    pub fn new(formula: DynamicPricingFormula) -> Self {
        DynamicMarkdownPricingStrategy { formula }
    }

    pub fn formula(&self) -> &DynamicPricingFormula {
        &self.formula
    }
}

impl PricingStrategy for DynamicMarkdownPricingStrategy {
    fn name(&self) -> &str {
        "Dynamic Markdown Pricing Strategy"
    }

    fn description(&self) -> &str {
        "Marks down near-expiry stock based on shelf life, demand and profitability"
    }

    fn calculate_price(&self, context: &PricingContext) -> PricingResult<Money> {
        let inputs = context.markdown.ok_or_else(|| ValidationError::Required {
            field: "markdown".to_string(),
        })?;

        let markdown = self.formula.calculate_discount_percentage(
            inputs.days_remaining,
            inputs.demand_factor,
            inputs.profitability_factor,
        )?;
        let capped = markdown.min(context.tier.max_discount_percentage());
        let discount = DiscountPercentage::create(capped)?;

        let unit_price = context.effective_markup()?.apply_to_money(&context.base_cost)?;
        let list_price = unit_price.multiply_quantity(context.quantity)?;
        let price = discount.apply_to_money(&list_price)?;

        debug!(
            days_remaining = inputs.days_remaining,
            markdown,
            applied = capped,
            "Dynamic markdown computed"
        );

        let floor_price = tier_floor_price(&context.total_cost()?, context.tier)?;
        if price.minor() < floor_price.minor() {
            info!(
                tier = %context.tier,
                price = %price,
                floor = %floor_price,
                "Markdown would breach margin floor, using floor price"
            );
            return Ok(floor_price);
        }
        Ok(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MarkdownInputs;
    use crate::money::Currency;
    use crate::tier::PricingTier;

    fn bbd(minor: i64) -> Money {
        Money::new(minor, Currency::new("BBD").unwrap()).unwrap()
    }

    fn ctx(tier: PricingTier, days: f64) -> PricingContext {
        PricingContext::new(bbd(1000), 1, tier)
            .unwrap()
            .with_markdown(MarkdownInputs {
                days_remaining: days,
                demand_factor: 0.8,
                profitability_factor: 0.5,
            })
    }

    #[test]
    fn test_far_from_expiry_is_full_price() {
        let s = DynamicMarkdownPricingStrategy::default();
        assert_eq!(s.calculate_price(&ctx(PricingTier::Wholesale, 60.0)).unwrap(), bbd(2000));
    }

    #[test]
    fn test_markdown_capped_by_tier() {
        // Formula gives ~15% at 30 days; Wholesale cap is 30% so it applies.
        let s = DynamicMarkdownPricingStrategy::default();
        let price = s.calculate_price(&ctx(PricingTier::Wholesale, 30.0)).unwrap();
        assert!(price.minor() < 2000 && price.minor() >= 1700);

        // At 0 days the formula says 100% but Wholesale stops at 30%,
        // which lands on 1400 < floor 1700.
        let at_expiry = s.calculate_price(&ctx(PricingTier::Wholesale, 0.0)).unwrap();
        assert_eq!(at_expiry, bbd(1700));
    }

    #[test]
    fn test_requires_markdown_inputs() {
        let c = PricingContext::new(bbd(1000), 1, PricingTier::Retail).unwrap();
        assert!(DynamicMarkdownPricingStrategy::default().calculate_price(&c).is_err());
    }
}
