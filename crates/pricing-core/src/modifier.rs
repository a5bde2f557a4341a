//! # Price Modifiers
//!
//! A single discount or surcharge, either a percentage or a fixed amount.
//!
//! ## Application Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Kind               Effect on price             Currency               │
//! │  ─────────────────  ──────────────────────────  ────────────────────   │
//! │  PercentDiscount    × (1 - value/100)           not needed             │
//! │  FixedDiscount      - value, clamped at 0       must match price       │
//! │  PercentSurcharge   × (1 + value/100)           not needed             │
//! │  FixedSurcharge     + value                     must match price       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! When several modifiers apply, the one with the higher `priority` runs
//! first (see [`apply_price_modifiers`]).

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;

use crate::error::{PricingError, PricingResult, ValidationError, ValidationResult};
use crate::money::{Currency, Money};

/// What a modifier does to a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceModifierKind {
    PercentDiscount,
    FixedDiscount,
    PercentSurcharge,
    FixedSurcharge,
}

/// An immutable price adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ModifierRecord")]
pub struct PriceModifier {
    kind: PriceModifierKind,
    name: String,
    description: String,
    /// Percentage for percent kinds, minor units for fixed kinds.
    value: f64,
    currency: Option<Currency>,
    priority: i32,
}

/// Stored form; rebuilt through the typed constructors.
#[derive(Deserialize)]
struct ModifierRecord {
    kind: PriceModifierKind,
    name: String,
    description: String,
    value: f64,
    #[serde(default)]
    currency: Option<Currency>,
    #[serde(default)]
    priority: i32,
}

impl TryFrom<ModifierRecord> for PriceModifier {
    type Error = ValidationError;

    fn try_from(r: ModifierRecord) -> Result<Self, Self::Error> {
        let (name, description) = (r.name.as_str(), r.description.as_str());
        match r.kind {
            PriceModifierKind::PercentDiscount => {
                PriceModifier::percent_discount(name, description, r.value, r.priority)
            }
            PriceModifierKind::PercentSurcharge => {
                PriceModifier::percent_surcharge(name, description, r.value, r.priority)
            }
            PriceModifierKind::FixedDiscount => {
                let (amount, currency) = fixed_parts(r.value, r.currency)?;
                PriceModifier::fixed_discount(name, description, amount, currency, r.priority)
            }
            PriceModifierKind::FixedSurcharge => {
                let (amount, currency) = fixed_parts(r.value, r.currency)?;
                PriceModifier::fixed_surcharge(name, description, amount, currency, r.priority)
            }
        }
    }
}

/// Fixed kinds carry whole minor units and a currency.
fn fixed_parts(value: f64, currency: Option<Currency>) -> ValidationResult<(i64, Currency)> {
    let currency = currency.ok_or_else(|| ValidationError::Required {
        field: "currency".to_string(),
    })?;
    if !value.is_finite() || value.fract() != 0.0 || value.abs() > i64::MAX as f64 {
        return Err(ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: format!("expected whole minor units, got {}", value),
        });
    }
    Ok((value as i64, currency))
}

fn require_text(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn validate_percentage(value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite {
            field: "percentageValue".to_string(),
        });
    }
    if value <= 0.0 || value > 100.0 {
        return Err(ValidationError::OutOfRange {
            field: "percentageValue".to_string(),
            min: 0.0,
            max: 100.0,
            actual: value,
        });
    }
    Ok(())
}

fn validate_fixed_amount(value: i64) -> ValidationResult<()> {
    if value <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

impl PriceModifier {
    /// Percentage off, `value` in `(0, 100]`.
    ///
    /// ## Example
    /// ```rust
    /// use pricing_core::modifier::PriceModifier;
    /// use pricing_core::money::{Currency, Money};
    ///
    /// let summer = PriceModifier::percent_discount("Summer", "20% off", 20.0, 0).unwrap();
    /// let price = Money::new(1000, Currency::new("BBD").unwrap()).unwrap();
    /// assert_eq!(summer.apply_to_price(&price).unwrap().minor(), 800);
    /// ```
    pub fn percent_discount(
        name: &str,
        description: &str,
        value: f64,
        priority: i32,
    ) -> ValidationResult<Self> {
        validate_percentage(value)?;
        Self::build(PriceModifierKind::PercentDiscount, name, description, value, None, priority)
    }

    /// Fixed amount off in minor units; never takes a price below zero.
    pub fn fixed_discount(
        name: &str,
        description: &str,
        amount: i64,
        currency: Currency,
        priority: i32,
    ) -> ValidationResult<Self> {
        validate_fixed_amount(amount)?;
        Self::build(
            PriceModifierKind::FixedDiscount,
            name,
            description,
            amount as f64,
            Some(currency),
            priority,
        )
    }

    /// Percentage on top, `value` in `(0, 100]`.
    pub fn percent_surcharge(
        name: &str,
        description: &str,
        value: f64,
        priority: i32,
    ) -> ValidationResult<Self> {
        validate_percentage(value)?;
        Self::build(PriceModifierKind::PercentSurcharge, name, description, value, None, priority)
    }

    /// Fixed amount on top in minor units.
    pub fn fixed_surcharge(
        name: &str,
        description: &str,
        amount: i64,
        currency: Currency,
        priority: i32,
    ) -> ValidationResult<Self> {
        validate_fixed_amount(amount)?;
        Self::build(
            PriceModifierKind::FixedSurcharge,
            name,
            description,
            amount as f64,
            Some(currency),
            priority,
        )
    }

    fn build(
        kind: PriceModifierKind,
        name: &str,
        description: &str,
        value: f64,
        currency: Option<Currency>,
        priority: i32,
    ) -> ValidationResult<Self> {
        require_text("name", name)?;
        require_text("description", description)?;
        Ok(PriceModifier {
            kind,
            name: name.to_string(),
            description: description.to_string(),
            value,
            currency,
            priority,
        })
    }

    pub fn kind(&self) -> PriceModifierKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn currency(&self) -> Option<Currency> {
        self.currency
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns a copy with a different priority.
    pub fn with_priority(&self, priority: i32) -> Self {
        PriceModifier {
            priority,
            ..self.clone()
        }
    }

    /// Applies this modifier to a price.
    ///
    /// Fixed kinds fail when the price is in a different currency.
    pub fn apply_to_price(&self, price: &Money) -> ValidationResult<Money> {
        match self.kind {
            PriceModifierKind::PercentDiscount => price.multiply(1.0 - self.value / 100.0),
            PriceModifierKind::FixedDiscount => {
                let discount = self.fixed_amount(price)?;
                price.saturating_subtract(&discount)
            }
            PriceModifierKind::PercentSurcharge => price.multiply(1.0 + self.value / 100.0),
            PriceModifierKind::FixedSurcharge => {
                let surcharge = self.fixed_amount(price)?;
                price.add(&surcharge)
            }
        }
    }

    /// The fixed adjustment as money, checked against the price's currency.
    fn fixed_amount(&self, price: &Money) -> ValidationResult<Money> {
        let currency = self.currency.ok_or_else(|| ValidationError::Required {
            field: "currency".to_string(),
        })?;
        if currency != price.currency() {
            return Err(ValidationError::CurrencyMismatch {
                expected: price.currency().to_string(),
                actual: currency.to_string(),
            });
        }
        Money::new(self.value as i64, currency)
    }

    pub fn is_discount(&self) -> bool {
        matches!(
            self.kind,
            PriceModifierKind::PercentDiscount | PriceModifierKind::FixedDiscount
        )
    }

    pub fn is_surcharge(&self) -> bool {
        !self.is_discount()
    }

    pub fn is_percentage(&self) -> bool {
        matches!(
            self.kind,
            PriceModifierKind::PercentDiscount | PriceModifierKind::PercentSurcharge
        )
    }

    pub fn is_fixed(&self) -> bool {
        !self.is_percentage()
    }
}

impl fmt::Display for PriceModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let currency = self.currency.map(|c| c.to_string()).unwrap_or_default();
        match self.kind {
            PriceModifierKind::PercentDiscount => write!(f, "{}: {}% discount", self.name, self.value),
            PriceModifierKind::FixedDiscount => {
                write!(f, "{}: {} {} discount", self.name, currency, self.value)
            }
            PriceModifierKind::PercentSurcharge => {
                write!(f, "{}: {}% surcharge", self.name, self.value)
            }
            PriceModifierKind::FixedSurcharge => {
                write!(f, "{}: {} {} surcharge", self.name, currency, self.value)
            }
        }
    }
}

/// Applies modifiers highest priority first; equal priorities keep their
/// input order. Stops at the first failure, naming the modifier.
///
/// ## Example
/// ```rust
/// use pricing_core::modifier::{apply_price_modifiers, PriceModifier};
/// use pricing_core::money::{Currency, Money};
///
/// let bbd = Currency::new("BBD").unwrap();
/// let price = Money::new(1000, bbd).unwrap();
/// let coupon = PriceModifier::fixed_discount("Coupon", "1 off", 100, bbd, 5).unwrap();
/// let promo = PriceModifier::percent_discount("Promo", "10% off", 10.0, 10).unwrap();
///
/// // Promo (10) runs before Coupon (5): 1000 → 900 → 800.
/// let result = apply_price_modifiers(&price, &[coupon, promo]).unwrap();
/// assert_eq!(result.minor(), 800);
/// ```
pub fn apply_price_modifiers(price: &Money, modifiers: &[PriceModifier]) -> PricingResult<Money> {
    let mut ordered: Vec<&PriceModifier> = modifiers.iter().collect();
    ordered.sort_by_key(|m| Reverse(m.priority()));

    ordered.into_iter().try_fold(*price, |current, modifier| {
        modifier
            .apply_to_price(&current)
            .map_err(|e| PricingError::ModifierFailed {
                modifier: modifier.name().to_string(),
                source: Box::new(PricingError::Validation(e)),
            })
    })
}
