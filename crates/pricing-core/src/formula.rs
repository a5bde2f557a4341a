//! # Dynamic Pricing Formula
//!
//! Markdown percentage for near-expiry stock.
//!
//! ## The Curve
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  x            = clamp(days, 0, T) / T                                  │
//! │  base urgency = (1 - x)²                                               │
//! │  demand adj   = 1 + β (1 - demand)          demand, profit ∈ [0, 1]    │
//! │  profit adj   = 1 + γ (1 - profitability)                               │
//! │  discount %   = clamp(urgency × demand adj × profit adj, 0, 1) × 100   │
//! │                                                                         │
//! │  discount %                                                             │
//! │  100 ┤█                                                                 │
//! │      │ ██                                                               │
//! │      │   ███                                                            │
//! │      │      █████                                                       │
//! │    0 ┤           ██████████████                                         │
//! │      └────────────────────────── days remaining ──► T                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Low demand and low profitability both push the markdown up; past `T`
//! days the product is not discounted at all.

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

/// Demand sensitivity used when none is configured.
pub const DEFAULT_BETA: f64 = 0.4;

/// Profitability sensitivity used when none is configured.
pub const DEFAULT_GAMMA: f64 = 0.5;

/// Shelf-life horizon (days) used when none is configured.
pub const DEFAULT_MAX_DAYS: f64 = 45.0;

/// Immutable markdown curve parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FormulaParameters")]
pub struct DynamicPricingFormula {
    beta: f64,
    gamma: f64,
    max_days: f64,
}

#[derive(Deserialize)]
struct FormulaParameters {
    beta: f64,
    gamma: f64,
    max_days: f64,
}

impl TryFrom<FormulaParameters> for DynamicPricingFormula {
    type Error = ValidationError;

    fn try_from(p: FormulaParameters) -> Result<Self, Self::Error> {
        DynamicPricingFormula::create(p.beta, p.gamma, p.max_days)
    }
}

fn unit_interval(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite {
            field: field.to_string(),
        });
    }
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0.0,
            max: 1.0,
            actual: value,
        });
    }
    Ok(())
}

impl DynamicPricingFormula {
    /// Builds a formula; `beta` and `gamma` must lie in `[0, 1]`, `max_days`
    /// must be positive.
    pub fn create(beta: f64, gamma: f64, max_days: f64) -> ValidationResult<Self> {
        unit_interval("beta", beta)?;
        unit_interval("gamma", gamma)?;
        if !max_days.is_finite() {
            return Err(ValidationError::NotFinite {
                field: "maxDays".to_string(),
            });
        }
        if max_days <= 0.0 {
            return Err(ValidationError::MustBePositive {
                field: "maxDays".to_string(),
            });
        }
        Ok(DynamicPricingFormula {
            beta,
            gamma,
            max_days,
        })
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn max_days(&self) -> f64 {
        self.max_days
    }

    /// Markdown percentage in `[0, 100]`.
    ///
    /// ## Example
    /// ```rust
    /// use pricing_core::formula::DynamicPricingFormula;
    ///
    /// let formula = DynamicPricingFormula::default();
    /// let fresh = formula.calculate_discount_percentage(30.0, 0.8, 0.5).unwrap();
    /// let expiring = formula.calculate_discount_percentage(5.0, 0.2, 0.5).unwrap();
    /// assert!(fresh < 20.0);
    /// assert!(expiring > 40.0);
    /// ```
    pub fn calculate_discount_percentage(
        &self,
        days_remaining: f64,
        demand_factor: f64,
        profitability_factor: f64,
    ) -> ValidationResult<f64> {
        if !days_remaining.is_finite() {
            return Err(ValidationError::NotFinite {
                field: "daysRemaining".to_string(),
            });
        }
        if days_remaining < 0.0 {
            return Err(ValidationError::Negative {
                field: "daysRemaining".to_string(),
            });
        }
        unit_interval("demandFactor", demand_factor)?;
        unit_interval("profitabilityFactor", profitability_factor)?;

        let x = days_remaining.min(self.max_days) / self.max_days;
        let base_urgency = (1.0 - x).powi(2);
        let demand_adjustment = 1.0 + self.beta * (1.0 - demand_factor);
        let profit_adjustment = 1.0 + self.gamma * (1.0 - profitability_factor);

        let raw = base_urgency * demand_adjustment * profit_adjustment;
        Ok(raw.clamp(0.0, 1.0) * 100.0)
    }

    /// Price multiplier matching the markdown: `1 - discount%/100`.
    pub fn calculate_discount_factor(
        &self,
        days_remaining: f64,
        demand_factor: f64,
        profitability_factor: f64,
    ) -> ValidationResult<f64> {
        let pct =
            self.calculate_discount_percentage(days_remaining, demand_factor, profitability_factor)?;
        Ok(1.0 - pct / 100.0)
    }
}

impl Default for DynamicPricingFormula {
    fn default() -> Self {
        DynamicPricingFormula {
            beta: DEFAULT_BETA,
            gamma: DEFAULT_GAMMA,
            max_days: DEFAULT_MAX_DAYS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_points_with_defaults() {
        let f = DynamicPricingFormula::default();

        let fresh = f.calculate_discount_percentage(30.0, 0.8, 0.5).unwrap();
        assert!(fresh > 0.0 && fresh < 20.0, "got {}", fresh);

        let expiring = f.calculate_discount_percentage(5.0, 0.2, 0.5).unwrap();
        assert!(expiring > 40.0, "got {}", expiring);

        let today = f.calculate_discount_percentage(0.0, 1.0, 1.0).unwrap();
        assert!((today - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_past_horizon_gives_no_markdown() {
        let f = DynamicPricingFormula::create(0.4, 0.5, 30.0).unwrap();
        let pct = f.calculate_discount_percentage(45.0, 0.5, 0.5).unwrap();
        assert!(pct < 5.0);
        assert_eq!(pct, 0.0);
    }

    #[test]
    fn test_monotone_in_demand_and_profitability() {
        let f = DynamicPricingFormula::default();
        let steps: Vec<f64> = (0..=10).map(|i| i as f64 / 10.0).collect();

        for days in [0.0, 10.0, 20.0, 40.0] {
            for pair in steps.windows(2) {
                let low = f.calculate_discount_percentage(days, pair[0], 0.5).unwrap();
                let high = f.calculate_discount_percentage(days, pair[1], 0.5).unwrap();
                assert!(high <= low + 1e-12);

                let low = f.calculate_discount_percentage(days, 0.5, pair[0]).unwrap();
                let high = f.calculate_discount_percentage(days, 0.5, pair[1]).unwrap();
                assert!(high <= low + 1e-12);
            }
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let f = DynamicPricingFormula::default();
        assert!(f.calculate_discount_percentage(-1.0, 0.5, 0.5).is_err());
        assert!(f.calculate_discount_percentage(10.0, 1.5, 0.5).is_err());
        assert!(f.calculate_discount_percentage(10.0, 0.5, -0.1).is_err());
        assert!(f.calculate_discount_percentage(f64::NAN, 0.5, 0.5).is_err());
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(DynamicPricingFormula::create(1.1, 0.5, 45.0).is_err());
        assert!(DynamicPricingFormula::create(0.4, -0.5, 45.0).is_err());
        assert!(DynamicPricingFormula::create(0.4, 0.5, 0.0).is_err());
        assert!(DynamicPricingFormula::create(0.4, 0.5, -3.0).is_err());
    }

    #[test]
    fn test_value_equality_and_factor() {
        let a = DynamicPricingFormula::create(0.4, 0.5, 45.0).unwrap();
        assert_eq!(a, DynamicPricingFormula::default());
        assert_ne!(a, DynamicPricingFormula::create(0.3, 0.5, 45.0).unwrap());

        let pct = a.calculate_discount_percentage(10.0, 0.5, 0.5).unwrap();
        let factor = a.calculate_discount_factor(10.0, 0.5, 0.5).unwrap();
        assert!((factor - (1.0 - pct / 100.0)).abs() < 1e-12);
    }

    #[test]
    fn test_deserialize_rejects_invalid_parameters() {
        let ok: DynamicPricingFormula =
            serde_json::from_str(r#"{"beta":0.4,"gamma":0.5,"max_days":45.0}"#).unwrap();
        assert_eq!(ok, DynamicPricingFormula::default());

        let bad = r#"{"beta":5.0,"gamma":0.5,"max_days":0.0}"#;
        assert!(serde_json::from_str::<DynamicPricingFormula>(bad).is_err());
        let no_horizon = r#"{"beta":0.4,"gamma":0.5,"max_days":0.0}"#;
        assert!(serde_json::from_str::<DynamicPricingFormula>(no_horizon).is_err());
    }
}
