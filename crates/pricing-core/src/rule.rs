//! # Pricing Rules
//!
//! A rule attaches a [`PriceModifier`] to a set of conditions, a tier scope
//! and an optional date window.
//!
//! ## Condition Evaluation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  context: { "CUSTOMER_SEGMENT": "restaurant", "MINIMUM_QUANTITY": 12 }  │
//! │                                                                         │
//! │  condition                          operator       result               │
//! │  ─────────────────────────────────  ─────────────  ──────               │
//! │  CUSTOMER_SEGMENT = "restaurant"    (none)=EQUALS  ✓                    │
//! │  MINIMUM_QUANTITY > 10              GREATER_THAN   ✓                    │
//! │  LOCATION = "north"                 EQUALS         ✗ (key missing)      │
//! │                                                                         │
//! │  Every condition must pass (AND).                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The context is keyed by the condition type's upper-case name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{ValidationError, ValidationResult};
use crate::modifier::PriceModifier;
use crate::tier::PricingTier;

// =============================================================================
// Conditions
// =============================================================================

/// What a condition looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleConditionType {
    CustomerSegment,
    ProductCategory,
    MinimumQuantity,
    MinimumSpend,
    TimeBased,
    Bundle,
    Location,
    FirstPurchase,
}

impl RuleConditionType {
    /// Context key this condition reads.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RuleConditionType::CustomerSegment => "CUSTOMER_SEGMENT",
            RuleConditionType::ProductCategory => "PRODUCT_CATEGORY",
            RuleConditionType::MinimumQuantity => "MINIMUM_QUANTITY",
            RuleConditionType::MinimumSpend => "MINIMUM_SPEND",
            RuleConditionType::TimeBased => "TIME_BASED",
            RuleConditionType::Bundle => "BUNDLE",
            RuleConditionType::Location => "LOCATION",
            RuleConditionType::FirstPurchase => "FIRST_PURCHASE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Contains,
    NotContains,
}

/// One test against the evaluation context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCondition {
    #[serde(rename = "type")]
    pub kind: RuleConditionType,
    pub value: Value,
    /// `None` means equality.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<ConditionOperator>,
}

impl RuleCondition {
    pub fn new(kind: RuleConditionType, value: impl Into<Value>) -> Self {
        RuleCondition {
            kind,
            value: value.into(),
            operator: None,
        }
    }

    pub fn with_operator(mut self, operator: ConditionOperator) -> Self {
        self.operator = Some(operator);
        self
    }

    /// Evaluates this condition; a missing key never matches.
    pub fn matches(&self, context: &HashMap<String, Value>) -> bool {
        let Some(actual) = context.get(self.kind.as_str()) else {
            return false;
        };

        match self.operator.unwrap_or(ConditionOperator::Equals) {
            ConditionOperator::Equals => values_equal(actual, &self.value),
            ConditionOperator::NotEquals => !values_equal(actual, &self.value),
            ConditionOperator::GreaterThan => match (actual.as_f64(), self.value.as_f64()) {
                (Some(a), Some(b)) => a > b,
                _ => false,
            },
            ConditionOperator::LessThan => match (actual.as_f64(), self.value.as_f64()) {
                (Some(a), Some(b)) => a < b,
                _ => false,
            },
            ConditionOperator::Contains => match actual.as_array() {
                Some(items) => contains_any(items, &self.value),
                None => false,
            },
            ConditionOperator::NotContains => match actual.as_array() {
                Some(items) => !contains_any(items, &self.value),
                None => false,
            },
        }
    }
}

/// JSON equality, except that numbers compare by value (`12 == 12.0`).
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn contains_any(items: &[Value], needle: &Value) -> bool {
    match needle.as_array() {
        Some(needles) => needles
            .iter()
            .any(|n| items.iter().any(|item| values_equal(item, n))),
        None => items.iter().any(|item| values_equal(item, needle)),
    }
}

// =============================================================================
// Pricing Rule
// =============================================================================

/// Input for [`PricingRule::create`].
#[derive(Debug, Clone)]
pub struct NewPricingRule {
    pub name: String,
    pub description: String,
    pub conditions: Vec<RuleCondition>,
    pub modifier: PriceModifier,
    pub applicable_tiers: Vec<PricingTier>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub priority: i32,
}

/// A promotional or policy rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "PricingRuleRecord")]
pub struct PricingRule {
    id: Uuid,
    name: String,
    description: String,
    conditions: Vec<RuleCondition>,
    modifier: PriceModifier,
    applicable_tiers: Vec<PricingTier>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    is_active: bool,
    priority: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Stored form of a rule; checked on the way back in.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PricingRuleRecord {
    id: Uuid,
    name: String,
    description: String,
    conditions: Vec<RuleCondition>,
    modifier: PriceModifier,
    applicable_tiers: Vec<PricingTier>,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    is_active: bool,
    priority: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PricingRuleRecord> for PricingRule {
    type Error = ValidationError;

    fn try_from(record: PricingRuleRecord) -> Result<Self, Self::Error> {
        validate_shape(
            &record.name,
            &record.conditions,
            &record.applicable_tiers,
            record.start_date,
            record.end_date,
        )?;
        if record.created_at > record.updated_at {
            return Err(ValidationError::InvalidDateRange);
        }
        Ok(PricingRule {
            id: record.id,
            name: record.name,
            description: record.description,
            conditions: record.conditions,
            modifier: record.modifier,
            applicable_tiers: record.applicable_tiers,
            start_date: record.start_date,
            end_date: record.end_date,
            is_active: record.is_active,
            priority: record.priority,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

fn validate_shape(
    name: &str,
    conditions: &[RuleCondition],
    applicable_tiers: &[PricingTier],
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> ValidationResult<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }
    if conditions.is_empty() {
        return Err(ValidationError::Empty {
            field: "conditions".to_string(),
        });
    }
    if applicable_tiers.is_empty() {
        return Err(ValidationError::Empty {
            field: "applicableTiers".to_string(),
        });
    }
    validate_date_range(start, end)
}

fn validate_date_range(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> ValidationResult<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(ValidationError::InvalidDateRange);
        }
    }
    Ok(())
}

impl PricingRule {
    /// Validates and creates an active rule with a fresh id, stamped with
    /// the clock's time.
    pub fn create(input: NewPricingRule, clock: &dyn Clock) -> ValidationResult<Self> {
        validate_shape(
            &input.name,
            &input.conditions,
            &input.applicable_tiers,
            input.start_date,
            input.end_date,
        )?;

        let now = clock.now();
        Ok(PricingRule {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            conditions: input.conditions,
            modifier: input.modifier,
            applicable_tiers: input.applicable_tiers,
            start_date: input.start_date,
            end_date: input.end_date,
            is_active: true,
            priority: input.priority,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn conditions(&self) -> &[RuleCondition] {
        &self.conditions
    }

    pub fn modifier(&self) -> &PriceModifier {
        &self.modifier
    }

    pub fn applicable_tiers(&self) -> &[PricingTier] {
        &self.applicable_tiers
    }

    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.end_date
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Active flag set and `now` inside the optional window (inclusive).
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        if self.start_date.is_some_and(|start| now < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| now > end) {
            return false;
        }
        true
    }

    pub fn is_currently_active(&self, clock: &dyn Clock) -> bool {
        self.is_active_at(clock.now())
    }

    pub fn is_applicable_to(&self, tier: PricingTier) -> bool {
        self.applicable_tiers.contains(&tier)
    }

    /// True when every condition matches.
    pub fn matches_conditions(&self, context: &HashMap<String, Value>) -> bool {
        self.conditions.iter().all(|c| c.matches(context))
    }

    pub fn activate(&mut self, clock: &dyn Clock) {
        self.is_active = true;
        self.touch(clock);
    }

    pub fn deactivate(&mut self, clock: &dyn Clock) {
        self.is_active = false;
        self.touch(clock);
    }

    /// Replaces the window. Leaves the rule untouched when `start > end`.
    pub fn update_date_range(
        &mut self,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
        clock: &dyn Clock,
    ) -> ValidationResult<()> {
        validate_date_range(start_date, end_date)?;
        self.start_date = start_date;
        self.end_date = end_date;
        self.touch(clock);
        Ok(())
    }

    pub fn update_priority(&mut self, priority: i32, clock: &dyn Clock) {
        self.priority = priority;
        self.touch(clock);
    }

    fn touch(&mut self, clock: &dyn Clock) {
        // Never move backwards, even if the clock does.
        self.updated_at = clock.now().max(self.updated_at);
    }
}
