//! # Percentage Primitives
//!
//! Bounded percentage value objects used by every pricing step.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DiscountPercentage  [0, 100]   20%  → multiplier 0.80                 │
//! │  MarkupPercentage    [0, 500]  150%  → multiplier 2.50                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both are immutable: `add`/`subtract` return a new, re-validated value.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PricingError, PricingResult, ValidationError, ValidationResult};
use crate::money::Money;
use crate::tier::PricingTier;

/// Smallest allowed discount.
pub const MIN_DISCOUNT_PERCENTAGE: f64 = 0.0;

/// Theoretical maximum discount (free).
pub const MAX_DISCOUNT_PERCENTAGE: f64 = 100.0;

/// Upper bound on markups, as a safety net against typos.
pub const MAX_MARKUP_PERCENTAGE: f64 = 500.0;

fn validate_bounded(field: &str, value: f64, min: f64, max: f64) -> ValidationResult<f64> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite {
            field: field.to_string(),
        });
    }
    if value < min {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    if value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max,
            actual: value,
        });
    }
    Ok(value)
}

// =============================================================================
// Discount Percentage
// =============================================================================

/// A discount between 0% and 100%.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct DiscountPercentage(f64);

impl DiscountPercentage {
    /// Creates a discount, failing outside `[0, 100]` or for NaN/infinity.
    ///
    /// ## Example
    /// ```rust
    /// use pricing_core::percentage::DiscountPercentage;
    ///
    /// assert!(DiscountPercentage::create(20.0).is_ok());
    /// assert!(DiscountPercentage::create(-1.0).is_err());
    /// assert!(DiscountPercentage::create(101.0).is_err());
    /// ```
    pub fn create(value: f64) -> ValidationResult<Self> {
        validate_bounded(
            "discountPercentage",
            value,
            MIN_DISCOUNT_PERCENTAGE,
            MAX_DISCOUNT_PERCENTAGE,
        )
        .map(DiscountPercentage)
    }

    /// Creates a discount that must also respect the tier's cap.
    pub fn create_for_tier(value: f64, tier: PricingTier) -> PricingResult<Self> {
        let discount = DiscountPercentage::create(value)?;
        if discount.exceeds_max_for_tier(tier) {
            return Err(PricingError::DiscountExceedsTierMax {
                tier,
                requested: value,
                max: tier.max_discount_percentage(),
            });
        }
        Ok(discount)
    }

    /// The raw percentage, e.g. `20.0`.
    #[inline]
    pub fn value(&self) -> f64 {
        self.0
    }

    /// `1 - value/100`: a 20% discount becomes 0.8.
    #[inline]
    pub fn discount_multiplier(&self) -> f64 {
        1.0 - self.0 / 100.0
    }

    /// Applies the discount to a raw amount.
    #[inline]
    pub fn apply_to_amount(&self, amount: f64) -> f64 {
        amount * self.discount_multiplier()
    }

    /// Applies the discount to money, rounding to minor units.
    pub fn apply_to_money(&self, amount: &Money) -> ValidationResult<Money> {
        amount.multiply(self.discount_multiplier())
    }

    /// Combines two discounts additively (10% + 20% = 30%), not compounding.
    ///
    /// Fails if the sum exceeds 100%.
    pub fn add(&self, other: &DiscountPercentage) -> ValidationResult<DiscountPercentage> {
        DiscountPercentage::create(self.0 + other.0)
    }

    pub fn is_greater_than(&self, other: &DiscountPercentage) -> bool {
        self.0 > other.0
    }

    pub fn exceeds_max_for_tier(&self, tier: PricingTier) -> bool {
        self.0 > tier.max_discount_percentage()
    }
}

impl fmt::Display for DiscountPercentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.0)
    }
}

// =============================================================================
// Markup Percentage
// =============================================================================

/// A markup on cost between 0% and 500%.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct MarkupPercentage(f64);

impl MarkupPercentage {
    pub fn create(value: f64) -> ValidationResult<Self> {
        validate_bounded("markupPercentage", value, 0.0, MAX_MARKUP_PERCENTAGE).map(MarkupPercentage)
    }

    /// The tier's base markup.
    pub fn for_tier(tier: PricingTier) -> ValidationResult<Self> {
        MarkupPercentage::create(tier.base_markup_percentage())
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.0
    }

    /// `1 + value/100`: a 150% markup becomes 2.5.
    #[inline]
    pub fn markup_multiplier(&self) -> f64 {
        1.0 + self.0 / 100.0
    }

    #[inline]
    pub fn apply_to_amount(&self, amount: f64) -> f64 {
        amount * self.markup_multiplier()
    }

    /// Applies the markup to money, rounding to minor units.
    pub fn apply_to_money(&self, cost: &Money) -> ValidationResult<Money> {
        cost.multiply(self.markup_multiplier())
    }

    pub fn add(&self, other: &MarkupPercentage) -> ValidationResult<MarkupPercentage> {
        MarkupPercentage::create(self.0 + other.0)
    }

    pub fn subtract(&self, other: &MarkupPercentage) -> ValidationResult<MarkupPercentage> {
        MarkupPercentage::create(self.0 - other.0)
    }
}

impl fmt::Display for MarkupPercentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.0)
    }
}

// =============================================================================
// Serde Conversions
// =============================================================================

impl TryFrom<f64> for DiscountPercentage {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        DiscountPercentage::create(value)
    }
}

impl From<DiscountPercentage> for f64 {
    fn from(discount: DiscountPercentage) -> Self {
        discount.0
    }
}

impl TryFrom<f64> for MarkupPercentage {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        MarkupPercentage::create(value)
    }
}

impl From<MarkupPercentage> for f64 {
    fn from(markup: MarkupPercentage) -> Self {
        markup.0
    }
}
