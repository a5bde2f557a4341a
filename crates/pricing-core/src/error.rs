//! # Error Types
//!
//! Domain-specific error types for pricing-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  pricing-core errors (this file)                                       │
//! │  ├── PricingError     - Business rule violations                       │
//! │  │   ├── MarginFloorViolation (structured: tier, margin, floor)        │
//! │  │   ├── DiscountExceedsTierMax                                        │
//! │  │   ├── StrategyNotFound                                              │
//! │  │   └── ModifierFailed (wraps the modifier's own failure)             │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  pricing-relay errors (separate crate)                                 │
//! │  └── RelayError       - Config loading, channel delivery               │
//! │                                                                         │
//! │  Flow: ValidationError → PricingError → RelayError → caller            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (tier, modifier name, values)
//! 3. Errors are enum variants, never String
//! 4. Margin breaches carry their numbers, so nobody re-parses messages

use thiserror::Error;

use crate::money::Money;
use crate::tier::PricingTier;

// =============================================================================
// Margin Breach Payload
// =============================================================================

/// How a tier's floor constant was read when a price was tested against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloorRule {
    /// `(price - cost) / price`; the guard rail's check.
    GrossMargin,
    /// `(price - cost) / cost`; the pricing strategies' floor price.
    MarkupOnCost,
}

impl FloorRule {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FloorRule::GrossMargin => "GROSS_MARGIN",
            FloorRule::MarkupOnCost => "MARKUP_ON_COST",
        }
    }

    /// What the percentages measure, for messages.
    pub const fn measure(&self) -> &'static str {
        match self {
            FloorRule::GrossMargin => "margin",
            FloorRule::MarkupOnCost => "markup on cost",
        }
    }
}

/// Numbers describing a price that fell below its tier's margin floor.
///
/// Carried inside [`PricingError::MarginFloorViolation`] so that the
/// calculation service can publish a complete breach event straight from
/// the failure value.
#[derive(Debug, Clone, PartialEq)]
pub struct MarginBreach {
    pub tier: PricingTier,
    pub selling_price: Money,
    pub cost: Money,
    /// Rule the price failed; `calculated_margin` is measured the same way.
    pub rule: FloorRule,
    /// Margin actually achieved under `rule`, in percent.
    pub calculated_margin: f64,
    /// The tier's floor constant, in percent.
    pub floor_margin: f64,
}

// =============================================================================
// Pricing Error
// =============================================================================

/// Business rule violations raised by the pricing engine.
///
/// These errors represent prices or adjustments the business refuses to
/// accept. They should be surfaced to the caller unchanged.
#[derive(Debug, Error)]
pub enum PricingError {
    /// Price falls below the tier's margin floor.
    ///
    /// ## User Workflow
    /// ```text
    /// Strategy computes $12.00 on a $10.00 cost
    ///      │
    ///      ▼
    /// Gross margin 16.67% < floor 30% (IMPORTER)
    ///      │
    ///      ▼
    /// MarginFloorViolation { tier: IMPORTER, ... }
    ///      │
    ///      ▼
    /// Violation recorded + MarginFloorBreached event published
    /// ```
    #[error(
        "Calculated {} ({:.2}%) is below the floor {} ({}%) for tier {}",
        .0.rule.measure(),
        .0.calculated_margin,
        .0.rule.measure(),
        .0.floor_margin,
        .0.tier
    )]
    MarginFloorViolation(Box<MarginBreach>),

    /// Gross margin is below a strategy-specific target (subscription pricing).
    #[error("Calculated margin ({margin:.2}%) is below target margin ({target}%) for {scope}")]
    TargetMarginNotMet {
        scope: String,
        margin: f64,
        target: f64,
    },

    /// Requested discount is larger than the tier allows.
    #[error("Discount percentage {requested}% exceeds maximum allowed {max}% for tier {tier}")]
    DiscountExceedsTierMax {
        tier: PricingTier,
        requested: f64,
        max: f64,
    },

    /// The tier's floor makes a minimum price undefined (floor >= 100%).
    #[error("Invalid floor margin percentage {floor}% for tier {tier}: minimum price is undefined")]
    FloorUndefined { tier: PricingTier, floor: f64 },

    /// No strategy registered under the requested id.
    #[error("Pricing strategy with ID '{0}' not found")]
    StrategyNotFound(String),

    /// A modifier failed mid-pipeline; the pipeline stops at the first one.
    #[error("Failed to apply price modifier ({modifier}): {source}")]
    ModifierFailed {
        modifier: String,
        #[source]
        source: Box<PricingError>,
    },

    /// More than one promotional discount on the same order.
    #[error("Only one promotional discount can be applied per order (found {count})")]
    PromotionStacking { count: usize },

    /// Governance: tier is not frozen, so it cannot be unfrozen.
    #[error("Dynamic pricing is not frozen for tier {0}")]
    NotFrozen(PricingTier),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl PricingError {
    /// Returns the breach payload if this is a margin-floor violation.
    pub fn margin_breach(&self) -> Option<&MarginBreach> {
        match self {
            PricingError::MarginFloorViolation(breach) => Some(breach),
            PricingError::ModifierFailed { source, .. } => source.margin_breach(),
            _ => None,
        }
    }

    /// Returns true if this error is a margin-floor violation.
    pub fn is_margin_floor_violation(&self) -> bool {
        self.margin_breach().is_some()
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when a value object or entity is constructed from
/// input that doesn't meet its invariants. Callers can fix input and retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max} (got {actual})")]
    OutOfRange {
        field: String,
        min: f64,
        max: f64,
        actual: f64,
    },

    /// Value is NaN or infinite.
    #[error("{field} must be a valid number")]
    NotFinite { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Invalid format (e.g., bad currency code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Two monetary values carry different currencies.
    #[error("Currency mismatch: expected {expected} but got {actual}")]
    CurrencyMismatch { expected: String, actual: String },

    /// Start of a date window is after its end.
    #[error("Start date must be before end date")]
    InvalidDateRange,

    /// A collection that must have at least one element is empty.
    #[error("{field} must contain at least one entry")]
    Empty { field: String },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with PricingError.
pub type PricingResult<T> = Result<T, PricingError>;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    #[test]
    fn test_margin_violation_message_names_margin_floor_and_tier() {
        let bbd = Currency::new("BBD").unwrap();
        let err = PricingError::MarginFloorViolation(Box::new(MarginBreach {
            tier: PricingTier::Importer,
            selling_price: Money::new(1200, bbd).unwrap(),
            cost: Money::new(1000, bbd).unwrap(),
            rule: FloorRule::GrossMargin,
            calculated_margin: 16.666_666,
            floor_margin: 30.0,
        }));
        assert_eq!(
            err.to_string(),
            "Calculated margin (16.67%) is below the floor margin (30%) for tier IMPORTER"
        );
        assert!(err.is_margin_floor_violation());

        let markup = PricingError::MarginFloorViolation(Box::new(MarginBreach {
            tier: PricingTier::Wholesale,
            selling_price: Money::new(1600, bbd).unwrap(),
            cost: Money::new(1000, bbd).unwrap(),
            rule: FloorRule::MarkupOnCost,
            calculated_margin: 60.0,
            floor_margin: 70.0,
        }));
        assert_eq!(
            markup.to_string(),
            "Calculated markup on cost (60.00%) is below the floor markup on cost (70%) for tier WHOLESALE"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::CurrencyMismatch {
            expected: "BBD".to_string(),
            actual: "USD".to_string(),
        };
        assert_eq!(err.to_string(), "Currency mismatch: expected BBD but got USD");
    }

    #[test]
    fn test_modifier_failure_exposes_inner_breach() {
        let inner = PricingError::Validation(ValidationError::InvalidDateRange);
        let err = PricingError::ModifierFailed {
            modifier: "Summer".to_string(),
            source: Box::new(inner),
        };
        assert!(err.to_string().starts_with("Failed to apply price modifier (Summer)"));
        assert!(err.margin_breach().is_none());
    }

    #[test]
    fn test_validation_converts_to_pricing_error() {
        let validation_err = ValidationError::Empty {
            field: "conditions".to_string(),
        };
        let err: PricingError = validation_err.into();
        assert!(matches!(err, PricingError::Validation(_)));
    }
}
