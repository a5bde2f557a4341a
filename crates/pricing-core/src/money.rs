//! # Money Module
//!
//! Provides the currency-aware `Money` type every price flows through.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units + currency code                     │
//! │    Money { minor: 2500, currency: BBD }  = BBD 25.00                   │
//! │                                                                         │
//! │  Percentages are f64, but every multiply rounds straight back to       │
//! │  whole minor units, so no fractional cent ever leaks into a total.     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Safety Rules
//! - Amounts are never negative: constructors and `subtract` fail instead.
//! - Mixing currencies fails with `ValidationError::CurrencyMismatch`.
//! - Nothing here panics; every fallible operation returns a `Result`.
//!
//! ## Usage
//! ```rust
//! use pricing_core::money::{Currency, Money};
//!
//! let bbd = Currency::new("BBD").unwrap();
//! let cost = Money::new(1000, bbd).unwrap();           // BBD 10.00
//! let price = cost.multiply(2.5).unwrap();              // BBD 25.00
//! assert_eq!(price.minor(), 2500);
//!
//! let usd = Money::new(100, Currency::new("USD").unwrap()).unwrap();
//! assert!(price.add(&usd).is_err());                    // currency mismatch
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ValidationError, ValidationResult};

// =============================================================================
// Currency
// =============================================================================

/// Three-letter upper-case currency code (ISO-4217 style), e.g. `BBD`.
///
/// Stored inline so `Money` stays `Copy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency([u8; 3]);

impl Currency {
    /// Parses a currency code. Lower-case input is upper-cased.
    pub fn new(code: &str) -> ValidationResult<Self> {
        let code = code.trim();
        let bytes = code.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_alphabetic) {
            return Err(ValidationError::InvalidFormat {
                field: "currency".to_string(),
                reason: format!("expected a three-letter code, got '{}'", code),
            });
        }
        Ok(Currency([
            bytes[0].to_ascii_uppercase(),
            bytes[1].to_ascii_uppercase(),
            bytes[2].to_ascii_uppercase(),
        ]))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        // Only ASCII letters are ever stored.
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Currency::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.as_str().to_string()
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A non-negative monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 minor units**: cents for BBD/USD; `i128` is used internally
///   wherever a multiplication could overflow
/// - **Currency travels with the amount**: arithmetic checks it every time
/// - **Never negative**: the engine models prices and costs, not refunds
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  base cost ──► markup ──► modifiers ──► selling price                  │
/// │                                            │                            │
/// │                                            ▼                            │
/// │                              margin guard rail (price vs cost)          │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "MoneyRecord")]
pub struct Money {
    minor: i64,
    currency: Currency,
}

#[derive(Deserialize)]
struct MoneyRecord {
    minor: i64,
    currency: Currency,
}

impl TryFrom<MoneyRecord> for Money {
    type Error = ValidationError;

    fn try_from(record: MoneyRecord) -> Result<Self, Self::Error> {
        Money::new(record.minor, record.currency)
    }
}

impl Money {
    /// Creates a Money value from minor units (cents).
    ///
    /// Fails for negative amounts.
    pub fn new(minor: i64, currency: Currency) -> ValidationResult<Self> {
        if minor < 0 {
            return Err(ValidationError::Negative {
                field: "amount".to_string(),
            });
        }
        Ok(Money { minor, currency })
    }

    /// Zero in the given currency.
    #[inline]
    pub const fn zero(currency: Currency) -> Self {
        Money { minor: 0, currency }
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.minor
    }

    /// Returns the currency.
    #[inline]
    pub const fn currency(&self) -> Currency {
        self.currency
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.minor == 0
    }

    /// Checks if the value is strictly positive.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.minor > 0
    }

    /// Fails unless `other` carries the same currency.
    pub fn ensure_same_currency(&self, other: &Money) -> ValidationResult<()> {
        if self.currency != other.currency {
            return Err(ValidationError::CurrencyMismatch {
                expected: self.currency.to_string(),
                actual: other.currency.to_string(),
            });
        }
        Ok(())
    }

    /// Adds two amounts of the same currency.
    pub fn add(&self, other: &Money) -> ValidationResult<Money> {
        self.ensure_same_currency(other)?;
        let minor = self
            .minor
            .checked_add(other.minor)
            .ok_or_else(|| overflow("amount"))?;
        Ok(Money {
            minor,
            currency: self.currency,
        })
    }

    /// Subtracts `other`, failing if the result would be negative.
    pub fn subtract(&self, other: &Money) -> ValidationResult<Money> {
        self.ensure_same_currency(other)?;
        Money::new(self.minor - other.minor, self.currency)
    }

    /// Subtracts `other`, clamping the result at zero.
    ///
    /// Still fails on a currency mismatch.
    pub fn saturating_subtract(&self, other: &Money) -> ValidationResult<Money> {
        self.ensure_same_currency(other)?;
        Ok(Money {
            minor: (self.minor - other.minor).max(0),
            currency: self.currency,
        })
    }

    /// Multiplies by a non-negative factor, rounding to the nearest minor
    /// unit (half away from zero).
    ///
    /// ## Example
    /// ```rust
    /// use pricing_core::money::{Currency, Money};
    ///
    /// let price = Money::new(2500, Currency::new("BBD").unwrap()).unwrap();
    /// assert_eq!(price.multiply(0.8).unwrap().minor(), 2000);  // 20% off
    /// assert_eq!(price.multiply(1.1).unwrap().minor(), 2750);  // 10% surcharge
    /// ```
    pub fn multiply(&self, factor: f64) -> ValidationResult<Money> {
        if !factor.is_finite() {
            return Err(ValidationError::NotFinite {
                field: "factor".to_string(),
            });
        }
        if factor < 0.0 {
            return Err(ValidationError::Negative {
                field: "factor".to_string(),
            });
        }
        let scaled = (self.minor as f64 * factor).round();
        if scaled > i64::MAX as f64 {
            return Err(overflow("amount"));
        }
        Ok(Money {
            minor: scaled as i64,
            currency: self.currency,
        })
    }

    /// Multiplies by an integer quantity without any rounding.
    pub fn multiply_quantity(&self, quantity: u32) -> ValidationResult<Money> {
        let total = self.minor as i128 * quantity as i128;
        let minor = i64::try_from(total).map_err(|_| overflow("amount"))?;
        Ok(Money {
            minor,
            currency: self.currency,
        })
    }
}

fn overflow(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0.0,
        max: i64::MAX as f64,
        actual: f64::INFINITY,
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money as `BBD 25.00`.
///
/// ## Note
/// This is for logs. Localised display belongs to whoever renders prices.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}.{:02}",
            self.currency,
            self.minor / 100,
            self.minor % 100
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
