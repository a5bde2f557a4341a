//! # Pricing Governance
//!
//! Freezes dynamic pricing for a tier whose margin floor keeps getting
//! breached, and releases it only after a named reviewer signs off.
//!
//! ## Freeze Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ACTIVE ── violations in both of the last two weeks ──► FROZEN         │
//! │     ▲                (check_and_update_freeze_status)       │           │
//! │     │                                                       │           │
//! │     └──── unfreeze(reviewer, notes): history cleared ───────┘           │
//! │                         review date recorded                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Also enforces the one-promotion-per-order rule on modifier sets.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{PricingError, PricingResult, ValidationError};
use crate::events::{
    DynamicPricingFrozen, DynamicPricingUnfrozen, EventPublisher, NoopPublisher, PricingEvent,
};
use crate::margin::MarginGuardRailService;
use crate::modifier::PriceModifier;
use crate::tier::PricingTier;

/// Reason recorded when the threshold check freezes a tier.
pub const AUTO_FREEZE_REASON: &str = "Margin floor breached for two consecutive weeks";

#[derive(Debug, Clone, Default)]
struct TierState {
    frozen: bool,
    last_review: Option<DateTime<Utc>>,
}

pub struct PricingGovernanceService {
    guard_rail: Arc<MarginGuardRailService>,
    state: Mutex<[TierState; 5]>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
}

impl PricingGovernanceService {
    /// Every tier starts unfrozen and unreviewed.
    pub fn new(guard_rail: Arc<MarginGuardRailService>) -> Self {
        PricingGovernanceService {
            guard_rail,
            state: Mutex::new(Default::default()),
            publisher: Arc::new(NoopPublisher),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn state(&self) -> MutexGuard<'_, [TierState; 5]> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_dynamic_pricing_frozen(&self, tier: PricingTier) -> bool {
        self.state()[tier.index()].frozen
    }

    pub fn last_review_date(&self, tier: PricingTier) -> Option<DateTime<Utc>> {
        self.state()[tier.index()].last_review
    }

    /// Freezes the tier. Returns false if it was already frozen.
    pub fn freeze_dynamic_pricing(&self, tier: PricingTier, reason: &str) -> bool {
        {
            let mut state = self.state();
            let slot = &mut state[tier.index()];
            if slot.frozen {
                return false;
            }
            slot.frozen = true;
        }

        let recent = self.guard_rail.recent_violation_count(tier);
        warn!(tier = %tier, recent_violations = recent, reason, "Dynamic pricing frozen");
        self.publisher
            .publish(PricingEvent::DynamicPricingFrozen(DynamicPricingFrozen {
                tier_type: tier.as_str().to_string(),
                reason: reason.to_string(),
                recent_violations: u32::try_from(recent).unwrap_or(u32::MAX),
                occurred_at: self.clock.now(),
            }));
        true
    }

    /// Releases a frozen tier after review.
    ///
    /// Clears the tier's violation history and records the review date.
    /// Fails if the tier is not frozen or no reviewer is named.
    pub fn unfreeze_dynamic_pricing(
        &self,
        tier: PricingTier,
        reviewer_id: &str,
        notes: &str,
    ) -> PricingResult<()> {
        if reviewer_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "reviewerId".to_string(),
            }
            .into());
        }

        let now = self.clock.now();
        {
            let mut state = self.state();
            let slot = &mut state[tier.index()];
            if !slot.frozen {
                return Err(PricingError::NotFrozen(tier));
            }
            slot.frozen = false;
            slot.last_review = Some(now);
        }
        self.guard_rail.clear_violation_history(tier);

        info!(tier = %tier, reviewer = reviewer_id, notes, "Dynamic pricing unfrozen");
        self.publisher
            .publish(PricingEvent::DynamicPricingUnfrozen(DynamicPricingUnfrozen {
                tier_type: tier.as_str().to_string(),
                reviewer_id: reviewer_id.to_string(),
                notes: notes.to_string(),
                occurred_at: now,
            }));
        Ok(())
    }

    /// Freezes the tier if it breached its floor in both of the last two
    /// weeks. Returns true only when this call froze it.
    pub fn check_and_update_freeze_status(&self, tier: PricingTier) -> bool {
        if self.is_dynamic_pricing_frozen(tier) {
            return false;
        }
        if self.guard_rail.has_tier_exceeded_violation_threshold(tier) {
            return self.freeze_dynamic_pricing(tier, AUTO_FREEZE_REASON);
        }
        false
    }

    /// Runs the freeze check for every tier.
    pub fn run_governance_check(&self) -> HashMap<PricingTier, bool> {
        PricingTier::ALL
            .into_iter()
            .map(|tier| (tier, self.check_and_update_freeze_status(tier)))
            .collect()
    }

    /// One promotional discount per order. A promotion is a discount whose
    /// name mentions "promo".
    pub fn validate_order_modifiers(&self, modifiers: &[PriceModifier]) -> PricingResult<()> {
        let count = modifiers.iter().filter(|m| is_promotion(m)).count();
        if count > 1 {
            return Err(PricingError::PromotionStacking { count });
        }
        Ok(())
    }

    /// The promotion with the largest value; percentages win over fixed.
    pub fn determine_best_promotion<'a>(
        &self,
        eligible: &'a [PriceModifier],
    ) -> Option<&'a PriceModifier> {
        eligible.iter().max_by(|a, b| {
            a.is_percentage()
                .cmp(&b.is_percentage())
                .then(a.value().total_cmp(&b.value()))
        })
    }
}

fn is_promotion(modifier: &PriceModifier) -> bool {
    modifier.is_discount() && modifier.name().to_lowercase().contains("promo")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::InMemoryPublisher;
    use crate::money::Currency;
    use chrono::{Duration, TimeZone};

    struct Fixture {
        governance: PricingGovernanceService,
        guard: Arc<MarginGuardRailService>,
        clock: Arc<ManualClock>,
        publisher: Arc<InMemoryPublisher>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap(),
        ));
        let publisher = Arc::new(InMemoryPublisher::new());
        let guard = Arc::new(MarginGuardRailService::new().with_clock(clock.clone()));
        let governance = PricingGovernanceService::new(guard.clone())
            .with_clock(clock.clone())
            .with_publisher(publisher.clone());
        Fixture {
            governance,
            guard,
            clock,
            publisher,
        }
    }

    fn breach_two_weeks(f: &Fixture, tier: PricingTier) {
        f.guard.record_margin_violation(tier);
        f.clock.advance(Duration::days(8));
        f.guard.record_margin_violation(tier);
    }

    #[test]
    fn test_auto_freeze_after_two_weeks() {
        let f = fixture();
        assert!(!f.governance.check_and_update_freeze_status(PricingTier::Wholesale));

        breach_two_weeks(&f, PricingTier::Wholesale);
        assert!(f.governance.check_and_update_freeze_status(PricingTier::Wholesale));
        assert!(f.governance.is_dynamic_pricing_frozen(PricingTier::Wholesale));
        // Already frozen: nothing new happens.
        assert!(!f.governance.check_and_update_freeze_status(PricingTier::Wholesale));

        let events = f.publisher.events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            PricingEvent::DynamicPricingFrozen(e) => {
                assert_eq!(e.tier_type, "WHOLESALE");
                assert_eq!(e.reason, AUTO_FREEZE_REASON);
                assert_eq!(e.recent_violations, 2);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_unfreeze_requires_frozen_tier() {
        let f = fixture();
        let err = f
            .governance
            .unfreeze_dynamic_pricing(PricingTier::Retail, "cfo", "ok")
            .unwrap_err();
        assert!(matches!(err, PricingError::NotFrozen(PricingTier::Retail)));
        assert!(f.governance.last_review_date(PricingTier::Retail).is_none());
    }

    #[test]
    fn test_unfreeze_clears_history_and_records_review() {
        let f = fixture();
        breach_two_weeks(&f, PricingTier::Importer);
        f.governance.check_and_update_freeze_status(PricingTier::Importer);

        assert!(f
            .governance
            .unfreeze_dynamic_pricing(PricingTier::Importer, " ", "notes")
            .is_err());

        f.governance
            .unfreeze_dynamic_pricing(PricingTier::Importer, "cfo-1", "Supplier costs renegotiated")
            .unwrap();
        assert!(!f.governance.is_dynamic_pricing_frozen(PricingTier::Importer));
        assert_eq!(f.guard.recent_violation_count(PricingTier::Importer), 0);
        assert_eq!(
            f.governance.last_review_date(PricingTier::Importer),
            Some(f.clock.now())
        );
        assert_eq!(f.publisher.events().last().unwrap().name(), "DynamicPricingUnfrozen");
    }

    #[test]
    fn test_run_governance_check_covers_all_tiers() {
        let f = fixture();
        breach_two_weeks(&f, PricingTier::Commercial);
        let results = f.governance.run_governance_check();
        assert_eq!(results.len(), 5);
        assert!(results[&PricingTier::Commercial]);
        assert!(!results[&PricingTier::Guest]);
    }

    #[test]
    fn test_one_promotion_per_order() {
        let f = fixture();
        let bbd = Currency::new("BBD").unwrap();
        let summer = PriceModifier::percent_discount("Summer Promo", "d", 10.0, 0).unwrap();
        let flash = PriceModifier::fixed_discount("Flash promo", "d", 200, bbd, 0).unwrap();
        let delivery = PriceModifier::fixed_surcharge("Delivery", "d", 500, bbd, 0).unwrap();

        assert!(f
            .governance
            .validate_order_modifiers(&[summer.clone(), delivery.clone()])
            .is_ok());
        assert!(matches!(
            f.governance.validate_order_modifiers(&[summer.clone(), flash.clone(), delivery]),
            Err(PricingError::PromotionStacking { count: 2 })
        ));

        let eligible = [flash, summer];
        let best = f.governance.determine_best_promotion(&eligible).unwrap();
        assert_eq!(best.name(), "Summer Promo");
        assert!(f.governance.determine_best_promotion(&[]).is_none());
    }
}
