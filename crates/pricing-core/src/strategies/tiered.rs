//! # Subscription Pricing
//!
//! Prices either the monthly subscription fee or a subscriber's purchase.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Tier      Monthly fee   Basket credit   Store-wide   Target GM         │
//! │  ────────  ───────────   ─────────────   ──────────   ─────────         │
//! │  BASIC     60.00         60.00            5%          40%               │
//! │  PREMIUM   90.00         95.00            8%          42%               │
//! │  VIP       180.00        200.00          10%          45%               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Purchases start from the customer tier's markup price, take the
//! store-wide discount when asked to, and must still clear the subscription
//! tier's target gross margin.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::PricingStrategy;
use crate::context::PricingContext;
use crate::error::{PricingError, PricingResult, ValidationError, ValidationResult};
use crate::margin::gross_margin_percentage;
use crate::money::Money;
use crate::percentage::DiscountPercentage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionTier {
    Basic,
    Premium,
    Vip,
}

impl SubscriptionTier {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Basic => "BASIC",
            SubscriptionTier::Premium => "PREMIUM",
            SubscriptionTier::Vip => "VIP",
        }
    }
}

/// Terms of one subscription tier. Amounts are minor units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionTierConfig {
    pub tier: SubscriptionTier,
    pub monthly_fee: i64,
    pub basket_credit: i64,
    pub store_wide_discount_percentage: f64,
    pub target_gross_margin_percentage: f64,
    pub benefits: Vec<String>,
}

impl SubscriptionTierConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.monthly_fee <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "monthlyFee".to_string(),
            });
        }
        if self.basket_credit < 0 {
            return Err(ValidationError::Negative {
                field: "basketCredit".to_string(),
            });
        }
        DiscountPercentage::create(self.store_wide_discount_percentage)?;
        if !(0.0..100.0).contains(&self.target_gross_margin_percentage) {
            return Err(ValidationError::OutOfRange {
                field: "targetGrossMarginPercentage".to_string(),
                min: 0.0,
                max: 100.0,
                actual: self.target_gross_margin_percentage,
            });
        }
        Ok(())
    }
}

pub fn default_subscription_tiers() -> Vec<SubscriptionTierConfig> {
    let benefits = |list: &[&str]| list.iter().map(|b| b.to_string()).collect();
    vec![
        SubscriptionTierConfig {
            tier: SubscriptionTier::Basic,
            monthly_fee: 6000,
            basket_credit: 6000,
            store_wide_discount_percentage: 5.0,
            target_gross_margin_percentage: 40.0,
            benefits: benefits(&["Recipe pack"]),
        },
        SubscriptionTierConfig {
            tier: SubscriptionTier::Premium,
            monthly_fee: 9000,
            basket_credit: 9500,
            store_wide_discount_percentage: 8.0,
            target_gross_margin_percentage: 42.0,
            benefits: benefits(&["Recipe pack", "Discovery bundle"]),
        },
        SubscriptionTierConfig {
            tier: SubscriptionTier::Vip,
            monthly_fee: 18000,
            basket_credit: 20000,
            store_wide_discount_percentage: 10.0,
            target_gross_margin_percentage: 45.0,
            benefits: benefits(&["Recipe pack", "Discovery bundle", "Free delivery", "Early access"]),
        },
    ]
}

#[derive(Debug, Clone)]
pub struct TieredPricingStrategy {
    tiers: HashMap<SubscriptionTier, SubscriptionTierConfig>,
}

impl Default for TieredPricingStrategy {
    fn default() -> Self {
        TieredPricingStrategy {
            tiers: default_subscription_tiers()
                .into_iter()
                .map(|c| (c.tier, c))
                .collect(),
        }
    }
}

impl TieredPricingStrategy {
    /// Replaces the default terms. Tiers missing from `configs` cannot be
    /// priced.
    pub fn new(configs: Vec<SubscriptionTierConfig>) -> ValidationResult<Self> {
        for config in &configs {
            config.validate()?;
        }
        Ok(TieredPricingStrategy {
            tiers: configs.into_iter().map(|c| (c.tier, c)).collect(),
        })
    }

    pub fn config(&self, tier: SubscriptionTier) -> Option<&SubscriptionTierConfig> {
        self.tiers.get(&tier)
    }
}

impl PricingStrategy for TieredPricingStrategy {
    fn name(&self) -> &str {
        "Tiered Pricing Strategy"
    }

    fn description(&self) -> &str {
        "Applies pricing based on subscription tiers with different benefits and pricing levels"
    }

    fn calculate_price(&self, context: &PricingContext) -> PricingResult<Money> {
        let subscription = context.subscription.ok_or_else(|| ValidationError::Required {
            field: "subscription".to_string(),
        })?;
        let config = self
            .tiers
            .get(&subscription.tier)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "subscriptionTier".to_string(),
                allowed: self.tiers.keys().map(|t| t.as_str().to_string()).collect(),
            })?;

        if subscription.recurring_fee {
            return Ok(Money::new(config.monthly_fee, context.base_cost.currency())?);
        }

        let mut unit_price = context.effective_markup()?.apply_to_money(&context.base_cost)?;
        if subscription.apply_store_wide_discount {
            let discount = DiscountPercentage::create(config.store_wide_discount_percentage)?;
            unit_price = discount.apply_to_money(&unit_price)?;
        }
        let price = unit_price.multiply_quantity(context.quantity)?;

        let margin = gross_margin_percentage(&price, &context.total_cost()?)?;
        if margin < config.target_gross_margin_percentage {
            return Err(PricingError::TargetMarginNotMet {
                scope: format!("subscription tier {}", subscription.tier.as_str()),
                margin,
                target: config.target_gross_margin_percentage,
            });
        }
        Ok(price)
    }
}
