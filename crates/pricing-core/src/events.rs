//! # Pricing Events
//!
//! Facts the engine announces to the outside world.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PriceCalculationService ──┬──► PriceChanged                            │
//! │                            └──► MarginFloorBreached                     │
//! │  MarginGuardRailService  ─────► MarginFloorBreached                     │
//! │  PricingGovernanceService ─┬──► DynamicPricingFrozen                    │
//! │                            └──► DynamicPricingUnfrozen                  │
//! │                                       │                                 │
//! │                                       ▼                                 │
//! │                             dyn EventPublisher                          │
//! │                   (Noop / InMemory / pricing-relay channel)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Publishing is fire-and-forget: `publish` returns nothing and must not
//! block. Amounts are carried in minor units next to their currency code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use ts_rs::TS;

use crate::error::MarginBreach;
use crate::money::Money;

// =============================================================================
// Payloads
// =============================================================================

/// A product's selling price moved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PriceChanged {
    pub product_id: String,
    /// Minor units.
    pub old_price: i64,
    /// Minor units.
    pub new_price: i64,
    pub currency: String,
    pub reason: String,
    pub triggering_calculation_id: String,
    #[ts(type = "string")]
    pub occurred_at: DateTime<Utc>,
}

/// A price came in under its tier's margin floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MarginFloorBreached {
    pub product_id: String,
    /// Minor units.
    pub selling_price: i64,
    /// Minor units.
    pub cost: i64,
    pub currency: String,
    pub calculated_margin: f64,
    pub floor_margin: f64,
    /// `GROSS_MARGIN` or `MARKUP_ON_COST`; how both percentages are measured.
    pub floor_rule: String,
    pub tier_type: String,
    pub calculation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[ts(type = "string")]
    pub occurred_at: DateTime<Utc>,
}

impl MarginFloorBreached {
    /// Builds the event straight from a breach payload.
    pub fn from_breach(
        breach: &MarginBreach,
        product_id: &str,
        calculation_id: &str,
        order_id: Option<&str>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        MarginFloorBreached {
            product_id: product_id.to_string(),
            selling_price: breach.selling_price.minor(),
            cost: breach.cost.minor(),
            currency: breach.selling_price.currency().to_string(),
            calculated_margin: breach.calculated_margin,
            floor_margin: breach.floor_margin,
            floor_rule: breach.rule.as_str().to_string(),
            tier_type: breach.tier.as_str().to_string(),
            calculation_id: calculation_id.to_string(),
            order_id: order_id.map(str::to_string),
            occurred_at,
        }
    }
}

/// Governance stopped dynamic pricing for a tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DynamicPricingFrozen {
    pub tier_type: String,
    pub reason: String,
    pub recent_violations: u32,
    #[ts(type = "string")]
    pub occurred_at: DateTime<Utc>,
}

/// A reviewer released a frozen tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DynamicPricingUnfrozen {
    pub tier_type: String,
    pub reviewer_id: String,
    pub notes: String,
    #[ts(type = "string")]
    pub occurred_at: DateTime<Utc>,
}

/// Every event the engine emits.
///
/// Serialized with a `type` tag, e.g.
/// `{"type":"PriceChanged","productId":"P1",...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PricingEvent {
    PriceChanged(PriceChanged),
    MarginFloorBreached(MarginFloorBreached),
    DynamicPricingFrozen(DynamicPricingFrozen),
    DynamicPricingUnfrozen(DynamicPricingUnfrozen),
}

impl PricingEvent {
    /// Event type name, matching the serde tag.
    pub fn name(&self) -> &'static str {
        match self {
            PricingEvent::PriceChanged(_) => "PriceChanged",
            PricingEvent::MarginFloorBreached(_) => "MarginFloorBreached",
            PricingEvent::DynamicPricingFrozen(_) => "DynamicPricingFrozen",
            PricingEvent::DynamicPricingUnfrozen(_) => "DynamicPricingUnfrozen",
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PricingEvent::PriceChanged(e) => e.occurred_at,
            PricingEvent::MarginFloorBreached(e) => e.occurred_at,
            PricingEvent::DynamicPricingFrozen(e) => e.occurred_at,
            PricingEvent::DynamicPricingUnfrozen(e) => e.occurred_at,
        }
    }
}

/// Helper used by the calculation service.
pub(crate) fn price_changed(
    product_id: &str,
    old_price: &Money,
    new_price: &Money,
    reason: &str,
    calculation_id: &str,
    occurred_at: DateTime<Utc>,
) -> PricingEvent {
    PricingEvent::PriceChanged(PriceChanged {
        product_id: product_id.to_string(),
        old_price: old_price.minor(),
        new_price: new_price.minor(),
        currency: new_price.currency().to_string(),
        reason: reason.to_string(),
        triggering_calculation_id: calculation_id.to_string(),
        occurred_at,
    })
}

// =============================================================================
// Publishers
// =============================================================================

/// Sink for pricing events.
///
/// Implementations must return quickly; delivery failures are theirs to
/// log, never the caller's to handle.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: PricingEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: PricingEvent) {}
}

/// Keeps events in memory, in publish order.
#[derive(Debug, Default)]
pub struct InMemoryPublisher {
    events: Mutex<Vec<PricingEvent>>,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far.
    pub fn events(&self) -> Vec<PricingEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes and returns everything published so far.
    pub fn drain(&self) -> Vec<PricingEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl EventPublisher for InMemoryPublisher {
    fn publish(&self, event: PricingEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
