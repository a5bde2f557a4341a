//! # Volume Pricing
//!
//! Quantity brackets on top of the tier markup.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  min qty    1     5     10    20    50    100                           │
//! │  discount   0%    5%    8%    12%   15%   20%   (capped at tier max)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A bracket applies from its `min_quantity` until the next one starts.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ensure_floor, PricingStrategy};
use crate::context::PricingContext;
use crate::error::{PricingResult, ValidationError, ValidationResult};
use crate::money::Money;
use crate::percentage::DiscountPercentage;

/// One row of the discount table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "BracketRecord")]
pub struct VolumeBracket {
    pub min_quantity: u32,
    pub discount_percentage: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BracketRecord {
    min_quantity: u32,
    discount_percentage: f64,
}

impl TryFrom<BracketRecord> for VolumeBracket {
    type Error = ValidationError;

    fn try_from(record: BracketRecord) -> Result<Self, Self::Error> {
        let bracket = VolumeBracket::new(record.min_quantity, record.discount_percentage);
        bracket.validate()?;
        Ok(bracket)
    }
}

impl VolumeBracket {
    pub const fn new(min_quantity: u32, discount_percentage: f64) -> Self {
        VolumeBracket {
            min_quantity,
            discount_percentage,
        }
    }

    /// Quantity of at least 1 and a discount in `[0, 100]`.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.min_quantity == 0 {
            return Err(ValidationError::MustBePositive {
                field: "minQuantity".to_string(),
            });
        }
        DiscountPercentage::create(self.discount_percentage)?;
        Ok(())
    }
}

/// The standard table.
pub fn default_volume_brackets() -> Vec<VolumeBracket> {
    vec![
        VolumeBracket::new(1, 0.0),
        VolumeBracket::new(5, 5.0),
        VolumeBracket::new(10, 8.0),
        VolumeBracket::new(20, 12.0),
        VolumeBracket::new(50, 15.0),
        VolumeBracket::new(100, 20.0),
    ]
}

/// Brackets must be strictly ascending, start at 1 and carry valid discounts.
pub fn validate_volume_brackets(brackets: &[VolumeBracket]) -> ValidationResult<()> {
    if brackets.is_empty() {
        return Err(ValidationError::Empty {
            field: "volumeBrackets".to_string(),
        });
    }
    if !brackets.iter().any(|b| b.min_quantity == 1) {
        return Err(ValidationError::InvalidFormat {
            field: "volumeBrackets".to_string(),
            reason: "must include a bracket for quantity 1".to_string(),
        });
    }
    if brackets.windows(2).any(|w| w[0].min_quantity >= w[1].min_quantity) {
        return Err(ValidationError::InvalidFormat {
            field: "volumeBrackets".to_string(),
            reason: "minimum quantities must be in ascending order".to_string(),
        });
    }
    brackets.iter().try_for_each(VolumeBracket::validate)
}

#[derive(Debug, Clone)]
pub struct VolumePricingStrategy {
    brackets: Vec<VolumeBracket>,
}

impl Default for VolumePricingStrategy {
    fn default() -> Self {
        VolumePricingStrategy {
            brackets: default_volume_brackets(),
        }
    }
}

impl VolumePricingStrategy {
    pub fn new(brackets: Vec<VolumeBracket>) -> ValidationResult<Self> {
        validate_volume_brackets(&brackets)?;
        Ok(VolumePricingStrategy { brackets })
    }

    pub fn brackets(&self) -> &[VolumeBracket] {
        &self.brackets
    }

    /// Discount of the highest bracket `quantity` reaches.
    pub fn discount_for_quantity(brackets: &[VolumeBracket], quantity: u32) -> f64 {
        brackets
            .iter()
            .filter(|b| b.min_quantity <= quantity)
            .map(|b| b.discount_percentage)
            .last()
            .unwrap_or(0.0)
    }
}

impl PricingStrategy for VolumePricingStrategy {
    fn name(&self) -> &str {
        "Volume Pricing Strategy"
    }

    fn description(&self) -> &str {
        "Applies quantity-based discounts on top of the tier markup"
    }

    fn calculate_price(&self, context: &PricingContext) -> PricingResult<Money> {
        let brackets = match &context.volume_brackets {
            Some(custom) => {
                validate_volume_brackets(custom)?;
                custom.as_slice()
            }
            None => self.brackets.as_slice(),
        };

        let bracket_discount = Self::discount_for_quantity(brackets, context.quantity);
        let capped = bracket_discount.min(context.tier.max_discount_percentage());
        let discount = DiscountPercentage::create(capped)?;

        let unit_price = context.effective_markup()?.apply_to_money(&context.base_cost)?;
        let list_price = unit_price.multiply_quantity(context.quantity)?;
        let price = discount.apply_to_money(&list_price)?;

        debug!(
            quantity = context.quantity,
            bracket_discount,
            applied_discount = capped,
            "Volume discount applied"
        );

        ensure_floor(&price, &context.total_cost()?, context.tier)?;
        Ok(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PricingError;
    use crate::money::Currency;
    use crate::tier::PricingTier;

    fn bbd(minor: i64) -> Money {
        Money::new(minor, Currency::new("BBD").unwrap()).unwrap()
    }

    #[test]
    fn test_bracket_lookup() {
        let b = default_volume_brackets();
        assert_eq!(VolumePricingStrategy::discount_for_quantity(&b, 1), 0.0);
        assert_eq!(VolumePricingStrategy::discount_for_quantity(&b, 4), 0.0);
        assert_eq!(VolumePricingStrategy::discount_for_quantity(&b, 5), 5.0);
        assert_eq!(VolumePricingStrategy::discount_for_quantity(&b, 49), 12.0);
        assert_eq!(VolumePricingStrategy::discount_for_quantity(&b, 500), 20.0);
    }

    #[test]
    fn test_bracket_deserialize_validates() {
        let ok: VolumeBracket =
            serde_json::from_str(r#"{"minQuantity":10,"discountPercentage":8.0}"#).unwrap();
        assert_eq!(ok, VolumeBracket::new(10, 8.0));
        assert!(serde_json::from_str::<VolumeBracket>(
            r#"{"minQuantity":10,"discountPercentage":120.0}"#
        )
        .is_err());
        assert!(serde_json::from_str::<VolumeBracket>(
            r#"{"minQuantity":0,"discountPercentage":5.0}"#
        )
        .is_err());
    }

    #[test]
    fn test_bracket_validation() {
        assert!(validate_volume_brackets(&default_volume_brackets()).is_ok());
        assert!(validate_volume_brackets(&[]).is_err());
        assert!(validate_volume_brackets(&[VolumeBracket::new(5, 5.0)]).is_err());
        assert!(validate_volume_brackets(&[
            VolumeBracket::new(1, 0.0),
            VolumeBracket::new(10, 8.0),
            VolumeBracket::new(5, 5.0),
        ])
        .is_err());
        assert!(VolumePricingStrategy::new(vec![VolumeBracket::new(1, 120.0)]).is_err());
    }

    #[test]
    fn test_wholesale_volume_price() {
        let ctx = PricingContext::new(bbd(1000), 20, PricingTier::Wholesale).unwrap();
        // 2000 × 20 = 40000, less 12%.
        let price = VolumePricingStrategy::default().calculate_price(&ctx).unwrap();
        assert_eq!(price, bbd(35200));
    }

    #[test]
    fn test_discount_capped_by_tier_then_floor_checked() {
        // Importer cap is 15%: 1600 × 100 less 15% = 136000, floor 130000.
        let ctx = PricingContext::new(bbd(1000), 100, PricingTier::Importer).unwrap();
        let price = VolumePricingStrategy::default().calculate_price(&ctx).unwrap();
        assert_eq!(price, bbd(136000));
    }

    #[test]
    fn test_under_floor_fails_with_breach() {
        // Wholesale 20% on 2000 = 1600 per unit, floor is 1700.
        let ctx = PricingContext::new(bbd(1000), 100, PricingTier::Wholesale).unwrap();
        let err = VolumePricingStrategy::default().calculate_price(&ctx).unwrap_err();
        assert!(matches!(err, PricingError::MarginFloorViolation(_)));
        assert_eq!(err.margin_breach().unwrap().tier, PricingTier::Wholesale);
    }

    #[test]
    fn test_context_brackets_override() {
        let ctx = PricingContext::new(bbd(1000), 2, PricingTier::Wholesale)
            .unwrap()
            .with_volume_brackets(vec![VolumeBracket::new(1, 0.0), VolumeBracket::new(2, 10.0)]);
        let price = VolumePricingStrategy::default().calculate_price(&ctx).unwrap();
        assert_eq!(price, bbd(3600));
    }
}
