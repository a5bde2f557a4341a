//! # Pricing Context
//!
//! Everything a strategy needs to price one line item.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Always present         Optional (selects / feeds a strategy)           │
//! │  ──────────────         ──────────────────────────────────────────      │
//! │  base_cost (per unit)   subscription      → tiered-pricing              │
//! │  quantity (> 0)         markdown          → dynamic-markdown            │
//! │  tier                   quantity > 10     → volume-pricing              │
//! │                         customer_id +                                   │
//! │                         negotiated_prices → negotiated-pricing          │
//! │                                                                         │
//! │  modifiers, custom_markup, product_id, at, attributes                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{ValidationError, ValidationResult};
use crate::modifier::PriceModifier;
use crate::money::Money;
use crate::percentage::MarkupPercentage;
use crate::strategies::negotiated::NegotiatedPrice;
use crate::strategies::tiered::SubscriptionTier;
use crate::strategies::volume::VolumeBracket;
use crate::tier::PricingTier;

/// Near-expiry inputs for the markdown formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkdownInputs {
    pub days_remaining: f64,
    /// 0 = no demand, 1 = strong demand.
    pub demand_factor: f64,
    /// 0 = thin margin product, 1 = very profitable.
    pub profitability_factor: f64,
}

/// A subscriber purchase, or the subscription fee itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPurchase {
    pub tier: SubscriptionTier,
    /// Price the monthly fee instead of a product.
    pub recurring_fee: bool,
    pub apply_store_wide_discount: bool,
}

/// Input to every [`PricingStrategy`](crate::strategies::PricingStrategy).
#[derive(Debug, Clone, PartialEq)]
pub struct PricingContext {
    pub base_cost: Money,
    pub quantity: u32,
    pub tier: PricingTier,
    pub modifiers: Vec<PriceModifier>,
    pub custom_markup: Option<MarkupPercentage>,
    pub markdown: Option<MarkdownInputs>,
    pub subscription: Option<SubscriptionPurchase>,
    pub customer_id: Option<String>,
    pub product_id: Option<String>,
    pub negotiated_prices: Option<Vec<NegotiatedPrice>>,
    pub volume_brackets: Option<Vec<VolumeBracket>>,
    /// Evaluation instant for validity windows; `None` means now.
    pub at: Option<DateTime<Utc>>,
    /// Free-form keys for rule conditions.
    pub attributes: HashMap<String, Value>,
}

impl PricingContext {
    /// A bare context. Quantity must be at least 1.
    ///
    /// ## Example
    /// ```rust
    /// use pricing_core::context::PricingContext;
    /// use pricing_core::money::{Currency, Money};
    /// use pricing_core::tier::PricingTier;
    ///
    /// let cost = Money::new(1000, Currency::new("BBD").unwrap()).unwrap();
    /// let ctx = PricingContext::new(cost, 3, PricingTier::Retail).unwrap();
    /// assert!(PricingContext::new(cost, 0, PricingTier::Retail).is_err());
    /// # let _ = ctx;
    /// ```
    pub fn new(base_cost: Money, quantity: u32, tier: PricingTier) -> ValidationResult<Self> {
        if quantity == 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            });
        }
        Ok(PricingContext {
            base_cost,
            quantity,
            tier,
            modifiers: Vec::new(),
            custom_markup: None,
            markdown: None,
            subscription: None,
            customer_id: None,
            product_id: None,
            negotiated_prices: None,
            volume_brackets: None,
            at: None,
            attributes: HashMap::new(),
        })
    }

    pub fn with_modifiers(mut self, modifiers: Vec<PriceModifier>) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_custom_markup(mut self, markup: MarkupPercentage) -> Self {
        self.custom_markup = Some(markup);
        self
    }

    pub fn with_markdown(mut self, markdown: MarkdownInputs) -> Self {
        self.markdown = Some(markdown);
        self
    }

    pub fn with_subscription(mut self, subscription: SubscriptionPurchase) -> Self {
        self.subscription = Some(subscription);
        self
    }

    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_product(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub fn with_negotiated_prices(mut self, prices: Vec<NegotiatedPrice>) -> Self {
        self.negotiated_prices = Some(prices);
        self
    }

    pub fn with_volume_brackets(mut self, brackets: Vec<VolumeBracket>) -> Self {
        self.volume_brackets = Some(brackets);
        self
    }

    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = Some(at);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// `at`, or the current time.
    pub fn evaluation_time(&self) -> DateTime<Utc> {
        self.at.unwrap_or_else(Utc::now)
    }

    /// Markup to use: the custom one, else the tier's.
    pub fn effective_markup(&self) -> ValidationResult<MarkupPercentage> {
        match self.custom_markup {
            Some(markup) => Ok(markup),
            None => MarkupPercentage::for_tier(self.tier),
        }
    }

    /// Cost of the whole line (`base_cost × quantity`).
    pub fn total_cost(&self) -> ValidationResult<Money> {
        self.base_cost.multiply_quantity(self.quantity)
    }

    /// True when a customer is set and has at least one agreement on file.
    pub fn has_negotiated_prices(&self) -> bool {
        self.customer_id.is_some()
            && self
                .negotiated_prices
                .as_ref()
                .is_some_and(|prices| !prices.is_empty())
    }
}
