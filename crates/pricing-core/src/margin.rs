//! # Margin Guard Rail
//!
//! Gross-margin checks against each tier's floor, plus the rolling record of
//! floor violations that governance uses to freeze dynamic pricing.
//!
//! ## Violation Windows
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   now-14d              now-7d                 now                       │
//! │     │◄──── older week ───►│◄──── recent week ───►│                      │
//! │     │        ✗            │          ✗           │   threshold exceeded │
//! │     │                     │          ✗ ✗         │   not exceeded       │
//! │  ✗  │                     │          ✗           │   not exceeded       │
//! │  (pruned on next write)                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! The tier set is closed, so [`ViolationHistory`] is a fixed array with one
//! `Mutex` per tier. Append-then-prune happens under that tier's lock; other
//! tiers are never blocked.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::{FloorRule, MarginBreach, PricingError, PricingResult, ValidationError, ValidationResult};
use crate::events::{EventPublisher, MarginFloorBreached, NoopPublisher, PricingEvent};
use crate::money::Money;
use crate::tier::PricingTier;

/// How long a violation is remembered.
pub const VIOLATION_WINDOW_DAYS: i64 = 14;

/// Width of each half of the threshold check.
pub const THRESHOLD_WINDOW_DAYS: i64 = 7;

/// `(selling - cost) / selling × 100`.
///
/// Fails on a currency mismatch or a zero selling price.
pub fn gross_margin_percentage(selling_price: &Money, cost: &Money) -> ValidationResult<f64> {
    selling_price.ensure_same_currency(cost)?;
    if !selling_price.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "sellingPrice".to_string(),
        });
    }
    let selling = selling_price.minor() as f64;
    Ok((selling - cost.minor() as f64) / selling * 100.0)
}

/// `(selling - cost) / cost × 100`, the markup a price carries over cost.
///
/// Fails on a currency mismatch or a zero cost.
pub fn markup_on_cost_percentage(selling_price: &Money, cost: &Money) -> ValidationResult<f64> {
    selling_price.ensure_same_currency(cost)?;
    if !cost.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "cost".to_string(),
        });
    }
    let cost_minor = cost.minor() as f64;
    Ok((selling_price.minor() as f64 - cost_minor) / cost_minor * 100.0)
}

// =============================================================================
// Violation History
// =============================================================================

/// Per-tier violation timestamps, oldest first.
#[derive(Debug, Default)]
pub struct ViolationHistory {
    tiers: [Mutex<Vec<DateTime<Utc>>>; 5],
}

impl ViolationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, tier: PricingTier) -> MutexGuard<'_, Vec<DateTime<Utc>>> {
        // A panic elsewhere cannot leave a Vec of timestamps half-written.
        self.tiers[tier.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `at` and drops entries older than the window. Returns the
    /// number of entries kept.
    pub fn record(&self, tier: PricingTier, at: DateTime<Utc>) -> usize {
        let cutoff = at - Duration::days(VIOLATION_WINDOW_DAYS);
        let mut entries = self.slot(tier);
        entries.push(at);
        entries.retain(|t| *t >= cutoff);
        entries.len()
    }

    /// Snapshot of the tier's entries.
    pub fn entries(&self, tier: PricingTier) -> Vec<DateTime<Utc>> {
        self.slot(tier).clone()
    }

    /// Entries at or after `since`.
    pub fn count_since(&self, tier: PricingTier, since: DateTime<Utc>) -> usize {
        self.slot(tier).iter().filter(|t| **t >= since).count()
    }

    pub fn clear(&self, tier: PricingTier) {
        self.slot(tier).clear();
    }
}

// =============================================================================
// Guard Rail Service
// =============================================================================

/// Enforces tier margin floors and remembers who broke them.
///
/// ## Example
/// ```rust
/// use pricing_core::margin::MarginGuardRailService;
/// use pricing_core::money::{Currency, Money};
/// use pricing_core::tier::PricingTier;
///
/// let guard = MarginGuardRailService::new();
/// let bbd = Currency::new("BBD").unwrap();
/// let cost = Money::new(1000, bbd).unwrap();
///
/// // 50% gross margin clears the IMPORTER floor of 30%.
/// let price = Money::new(2000, bbd).unwrap();
/// assert!(guard.check_margin_floor(&price, &cost, PricingTier::Importer, None, None).is_ok());
///
/// // 16.7% does not.
/// let cheap = Money::new(1200, bbd).unwrap();
/// assert!(guard.check_margin_floor(&cheap, &cost, PricingTier::Importer, None, None).is_err());
/// assert_eq!(guard.recent_violation_count(PricingTier::Importer), 1);
/// ```
pub struct MarginGuardRailService {
    history: Arc<ViolationHistory>,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn EventPublisher>,
}

impl Default for MarginGuardRailService {
    fn default() -> Self {
        Self::new()
    }
}

impl MarginGuardRailService {
    /// System clock, fresh history, no publisher.
    pub fn new() -> Self {
        MarginGuardRailService {
            history: Arc::new(ViolationHistory::new()),
            clock: Arc::new(SystemClock),
            publisher: Arc::new(NoopPublisher),
        }
    }

    pub fn with_history(mut self, history: Arc<ViolationHistory>) -> Self {
        self.history = history;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn history(&self) -> &Arc<ViolationHistory> {
        &self.history
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn calculate_margin_percentage(
        &self,
        selling_price: &Money,
        cost: &Money,
    ) -> PricingResult<f64> {
        Ok(gross_margin_percentage(selling_price, cost)?)
    }

    /// Fails with [`PricingError::MarginFloorViolation`] when the gross
    /// margin is under the tier floor.
    ///
    /// A failure records one violation for the tier. A breach event is
    /// published only when `product_id` is given.
    pub fn check_margin_floor(
        &self,
        selling_price: &Money,
        cost: &Money,
        tier: PricingTier,
        product_id: Option<&str>,
        order_id: Option<&str>,
    ) -> PricingResult<()> {
        let margin = gross_margin_percentage(selling_price, cost)?;
        let floor = tier.floor_gross_margin_percentage();
        if margin >= floor {
            return Ok(());
        }

        let breach = MarginBreach {
            tier,
            selling_price: *selling_price,
            cost: *cost,
            rule: FloorRule::GrossMargin,
            calculated_margin: margin,
            floor_margin: floor,
        };
        self.record_margin_violation(tier);

        if let Some(product_id) = product_id {
            let calculation_id = Uuid::new_v4().to_string();
            self.publisher
                .publish(PricingEvent::MarginFloorBreached(MarginFloorBreached::from_breach(
                    &breach,
                    product_id,
                    &calculation_id,
                    order_id,
                    self.clock.now(),
                )));
        }

        Err(PricingError::MarginFloorViolation(Box::new(breach)))
    }

    /// Smallest price whose gross margin meets the floor:
    /// `cost / (1 - floor/100)`, rounded up to the next minor unit.
    pub fn calculate_minimum_selling_price(
        &self,
        cost: &Money,
        tier: PricingTier,
    ) -> PricingResult<Money> {
        let floor = tier.floor_gross_margin_percentage();
        if floor >= 100.0 {
            return Err(PricingError::FloorUndefined { tier, floor });
        }
        let minimum = (cost.minor() as f64 / (1.0 - floor / 100.0)).ceil();
        Ok(Money::new(minimum as i64, cost.currency())?)
    }

    /// Appends a violation at the current time. Returns the tier's count.
    pub fn record_margin_violation(&self, tier: PricingTier) -> usize {
        let count = self.history.record(tier, self.clock.now());
        warn!(tier = %tier, recent_violations = count, "Margin floor violation recorded");
        count
    }

    /// True only when the tier has violations in both the last week and the
    /// week before it.
    pub fn has_tier_exceeded_violation_threshold(&self, tier: PricingTier) -> bool {
        let now = self.clock.now();
        let week_ago = now - Duration::days(THRESHOLD_WINDOW_DAYS);
        let two_weeks_ago = now - Duration::days(VIOLATION_WINDOW_DAYS);

        let entries = self.history.entries(tier);
        let recent = entries.iter().any(|t| *t >= week_ago && *t <= now);
        let older = entries
            .iter()
            .any(|t| *t < week_ago && *t >= two_weeks_ago);
        recent && older
    }

    /// Violations within the last 14 days.
    pub fn recent_violation_count(&self, tier: PricingTier) -> usize {
        let since = self.clock.now() - Duration::days(VIOLATION_WINDOW_DAYS);
        self.history.count_since(tier, since)
    }

    pub fn clear_violation_history(&self, tier: PricingTier) {
        self.history.clear(tier);
        debug!(tier = %tier, "Violation history cleared");
    }
}
