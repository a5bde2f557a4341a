//! # Negotiated Pricing
//!
//! Per-customer agreements, mostly for wholesale supply. An agreement fixes
//! either a unit price or a markup for one product over a validity window.
//! Customers without a matching agreement get the tier markup.
//!
//! Agreements come from the context when present, otherwise from the
//! strategy's own store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::{ensure_floor, PricingStrategy};
use crate::context::PricingContext;
use crate::error::{PricingResult, ValidationError, ValidationResult};
use crate::money::Money;
use crate::percentage::MarkupPercentage;

/// What was agreed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NegotiatedTerms {
    /// Unit price.
    Price { price: Money },
    Markup { markup: MarkupPercentage },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "AgreementRecord")]
pub struct NegotiatedPrice {
    customer_id: String,
    product_id: String,
    terms: NegotiatedTerms,
    valid_from: DateTime<Utc>,
    valid_until: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgreementRecord {
    customer_id: String,
    product_id: String,
    terms: NegotiatedTerms,
    valid_from: DateTime<Utc>,
    #[serde(default)]
    valid_until: Option<DateTime<Utc>>,
}

impl TryFrom<AgreementRecord> for NegotiatedPrice {
    type Error = ValidationError;

    fn try_from(r: AgreementRecord) -> Result<Self, Self::Error> {
        NegotiatedPrice::new(&r.customer_id, &r.product_id, r.terms, r.valid_from, r.valid_until)
    }
}

impl NegotiatedPrice {
    pub fn new(
        customer_id: &str,
        product_id: &str,
        terms: NegotiatedTerms,
        valid_from: DateTime<Utc>,
        valid_until: Option<DateTime<Utc>>,
    ) -> ValidationResult<Self> {
        if customer_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "customerId".to_string(),
            });
        }
        if product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "productId".to_string(),
            });
        }
        if valid_until.is_some_and(|until| valid_from > until) {
            return Err(ValidationError::InvalidDateRange);
        }
        Ok(NegotiatedPrice {
            customer_id: customer_id.to_string(),
            product_id: product_id.to_string(),
            terms,
            valid_from,
            valid_until,
        })
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn terms(&self) -> NegotiatedTerms {
        self.terms
    }

    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && self.valid_until.map_or(true, |until| at <= until)
    }

    fn unit_price(&self, base_cost: &Money) -> ValidationResult<Money> {
        match self.terms {
            NegotiatedTerms::Price { price } => {
                base_cost.ensure_same_currency(&price)?;
                Ok(price)
            }
            NegotiatedTerms::Markup { markup } => markup.apply_to_money(base_cost),
        }
    }
}

/// Agreement lookup plus tier-markup fallback; floor breaches fail.
#[derive(Debug, Default)]
pub struct NegotiatedPricingStrategy {
    agreements: RwLock<HashMap<String, Vec<NegotiatedPrice>>>,
}

impl NegotiatedPricingStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an agreement, replacing any for the same customer and product.
    pub fn add_negotiated_price(&self, price: NegotiatedPrice) {
        let mut agreements = self.agreements.write().unwrap_or_else(PoisonError::into_inner);
        let entries = agreements.entry(price.customer_id.clone()).or_default();
        entries.retain(|p| p.product_id != price.product_id);
        entries.push(price);
    }

    /// Returns true if an agreement was removed.
    pub fn remove_negotiated_price(&self, customer_id: &str, product_id: &str) -> bool {
        let mut agreements = self.agreements.write().unwrap_or_else(PoisonError::into_inner);
        let Some(entries) = agreements.get_mut(customer_id) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|p| p.product_id != product_id);
        entries.len() < before
    }

    pub fn negotiated_prices_for_customer(&self, customer_id: &str) -> Vec<NegotiatedPrice> {
        self.agreements
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(customer_id)
            .cloned()
            .unwrap_or_default()
    }

    fn find_agreement(&self, context: &PricingContext) -> Option<NegotiatedPrice> {
        let customer_id = context.customer_id.as_deref()?;
        let product_id = context.product_id.as_deref()?;
        let at = context.evaluation_time();
        let matches = |p: &&NegotiatedPrice| {
            p.customer_id == customer_id && p.product_id == product_id && p.is_valid_at(at)
        };

        match &context.negotiated_prices {
            Some(prices) => prices.iter().find(matches).cloned(),
            None => self
                .agreements
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(customer_id)
                .and_then(|prices| prices.iter().find(matches).cloned()),
        }
    }
}

impl PricingStrategy for NegotiatedPricingStrategy {
    fn name(&self) -> &str {
        "Negotiated Pricing Strategy"
    }

    fn description(&self) -> &str {
        "Applies customer-specific negotiated prices or markups"
    }

    fn calculate_price(&self, context: &PricingContext) -> PricingResult<Money> {
        let unit_price = match self.find_agreement(context) {
            Some(agreement) => agreement.unit_price(&context.base_cost)?,
            None => MarkupPercentage::for_tier(context.tier)?.apply_to_money(&context.base_cost)?,
        };
        let price = unit_price.multiply_quantity(context.quantity)?;
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
    use chrono::{Duration, TimeZone};

    fn bbd(minor: i64) -> Money {
        Money::new(minor, Currency::new("BBD").unwrap()).unwrap()
    }

    fn jan() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn agreement(terms: NegotiatedTerms) -> NegotiatedPrice {
        NegotiatedPrice::new("C1", "P1", terms, jan(), Some(jan() + Duration::days(90))).unwrap()
    }

    fn ctx() -> PricingContext {
        PricingContext::new(bbd(1000), 10, PricingTier::Wholesale)
            .unwrap()
            .with_customer("C1")
            .with_product("P1")
            .at(jan() + Duration::days(10))
    }

    #[test]
    fn test_direct_price_from_context() {
        let c = ctx().with_negotiated_prices(vec![agreement(NegotiatedTerms::Price { price: bbd(1800) })]);
        let price = NegotiatedPricingStrategy::new().calculate_price(&c).unwrap();
        assert_eq!(price, bbd(18000));
    }

    #[test]
    fn test_stored_markup_agreement() {
        let s = NegotiatedPricingStrategy::new();
        s.add_negotiated_price(agreement(NegotiatedTerms::Markup {
            markup: MarkupPercentage::create(90.0).unwrap(),
        }));
        assert_eq!(s.calculate_price(&ctx()).unwrap(), bbd(19000));
        assert_eq!(s.negotiated_prices_for_customer("C1").len(), 1);

        assert!(s.remove_negotiated_price("C1", "P1"));
        assert!(!s.remove_negotiated_price("C1", "P1"));
        // Falls back to the Wholesale markup of 100%.
        assert_eq!(s.calculate_price(&ctx()).unwrap(), bbd(20000));
    }

    #[test]
    fn test_expired_agreement_is_ignored() {
        let c = ctx()
            .with_negotiated_prices(vec![agreement(NegotiatedTerms::Price { price: bbd(1800) })])
            .at(jan() + Duration::days(200));
        assert_eq!(NegotiatedPricingStrategy::new().calculate_price(&c).unwrap(), bbd(20000));
    }

    #[test]
    fn test_price_under_floor_fails() {
        let c = ctx().with_negotiated_prices(vec![agreement(NegotiatedTerms::Price { price: bbd(1500) })]);
        let err = NegotiatedPricingStrategy::new().calculate_price(&c).unwrap_err();
        assert!(matches!(err, PricingError::MarginFloorViolation(_)));
    }

    #[test]
    fn test_agreement_deserialize_validates() {
        let stored = serde_json::to_value(agreement(NegotiatedTerms::Markup {
            markup: MarkupPercentage::create(90.0).unwrap(),
        }))
        .unwrap();
        let back: NegotiatedPrice = serde_json::from_value(stored.clone()).unwrap();
        assert_eq!(back.customer_id(), "C1");

        let mut blank = stored.clone();
        blank["customerId"] = serde_json::json!("");
        assert!(serde_json::from_value::<NegotiatedPrice>(blank).is_err());

        let mut huge_markup = stored;
        huge_markup["terms"]["markup"] = serde_json::json!(900.0);
        assert!(serde_json::from_value::<NegotiatedPrice>(huge_markup).is_err());
    }

    #[test]
    fn test_agreement_validation() {
        let terms = NegotiatedTerms::Price { price: bbd(1800) };
        assert!(NegotiatedPrice::new("", "P1", terms, jan(), None).is_err());
        assert!(NegotiatedPrice::new("C1", "P1", terms, jan(), Some(jan() - Duration::days(1))).is_err());
    }
}
