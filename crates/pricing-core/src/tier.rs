//! # Pricing Tier Catalog
//!
//! The closed set of customer tiers and the constants each one carries.
//!
//! ## Tier Constants
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Tier        Markup %   Max discount %   Floor GM %   Target GM %      │
//! │  ──────────  ────────   ──────────────   ──────────   ───────────      │
//! │  GUEST          150           15             135          140          │
//! │  RETAIL         150           20             130          140          │
//! │  COMMERCIAL     125           25             100          110          │
//! │  WHOLESALE      100           30              70           80          │
//! │  IMPORTER        60           15              30           40          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tiers are pure lookup tables: nothing here is ever mutated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

/// Customer pricing tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingTier {
    /// Unregistered customers.
    Guest,
    /// Registered individual consumers (B2C).
    Retail,
    /// Food trucks, small restaurants.
    Commercial,
    /// Mini-markets, larger establishments.
    Wholesale,
    /// Regional importers at FOB prices.
    Importer,
}

impl PricingTier {
    /// Every tier, in catalog order.
    pub const ALL: [PricingTier; 5] = [
        PricingTier::Guest,
        PricingTier::Retail,
        PricingTier::Commercial,
        PricingTier::Wholesale,
        PricingTier::Importer,
    ];

    /// Looks up a tier by name. Fails for anything outside the catalog.
    ///
    /// ## Example
    /// ```rust
    /// use pricing_core::tier::PricingTier;
    ///
    /// assert_eq!(PricingTier::create("retail").unwrap(), PricingTier::Retail);
    /// assert!(PricingTier::create("PLATINUM").is_err());
    /// ```
    pub fn create(name: &str) -> Result<Self, ValidationError> {
        name.parse()
    }

    /// Upper-case identifier, e.g. `RETAIL`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PricingTier::Guest => "GUEST",
            PricingTier::Retail => "RETAIL",
            PricingTier::Commercial => "COMMERCIAL",
            PricingTier::Wholesale => "WHOLESALE",
            PricingTier::Importer => "IMPORTER",
        }
    }

    /// Display name, e.g. `Retail`.
    pub const fn display_name(&self) -> &'static str {
        match self {
            PricingTier::Guest => "Guest",
            PricingTier::Retail => "Retail",
            PricingTier::Commercial => "Commercial",
            PricingTier::Wholesale => "Wholesale",
            PricingTier::Importer => "Importer",
        }
    }

    /// Position in [`PricingTier::ALL`]; used to index per-tier storage.
    pub(crate) const fn index(&self) -> usize {
        match self {
            PricingTier::Guest => 0,
            PricingTier::Retail => 1,
            PricingTier::Commercial => 2,
            PricingTier::Wholesale => 3,
            PricingTier::Importer => 4,
        }
    }

    /// Markup applied to cost to derive the list price.
    pub const fn base_markup_percentage(&self) -> f64 {
        match self {
            PricingTier::Guest | PricingTier::Retail => 150.0,
            PricingTier::Commercial => 125.0,
            PricingTier::Wholesale => 100.0,
            PricingTier::Importer => 60.0,
        }
    }

    /// Largest discount any promotion may give this tier.
    pub const fn max_discount_percentage(&self) -> f64 {
        match self {
            PricingTier::Guest => 15.0,
            PricingTier::Retail => 20.0,
            PricingTier::Commercial => 25.0,
            PricingTier::Wholesale => 30.0,
            PricingTier::Importer => 15.0,
        }
    }

    /// Minimum acceptable gross margin.
    pub const fn floor_gross_margin_percentage(&self) -> f64 {
        match self {
            PricingTier::Guest => 135.0,
            PricingTier::Retail => 130.0,
            PricingTier::Commercial => 100.0,
            PricingTier::Wholesale => 70.0,
            PricingTier::Importer => 30.0,
        }
    }

    /// Gross margin the business aims for.
    pub const fn target_gross_margin_percentage(&self) -> f64 {
        match self {
            PricingTier::Guest | PricingTier::Retail => 140.0,
            PricingTier::Commercial => 110.0,
            PricingTier::Wholesale => 80.0,
            PricingTier::Importer => 40.0,
        }
    }
}

impl fmt::Display for PricingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PricingTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PricingTier::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "pricingTierType".to_string(),
                allowed: PricingTier::ALL
                    .iter()
                    .map(|t| t.as_str().to_string())
                    .collect(),
            })
    }
}
