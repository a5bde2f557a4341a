//! End-to-end pricing flows across the calculation service, guard rail and
//! governance, sharing one violation history and one publisher.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use pricing_core::strategies::{FIXED_PRICING, VOLUME_PRICING};
use pricing_core::{
    Currency, DiscountPercentage, DynamicPricingFormula, InMemoryPublisher, ManualClock,
    MarginGuardRailService, Money, NewPricingRule, PriceCalculationService, PriceModifier,
    PricingContext, PricingError, PricingEvent, PricingGovernanceService, PricingRule,
    PricingTier, RuleCondition, RuleConditionType, StrategyRegistry, ViolationHistory,
};

struct Engine {
    service: PriceCalculationService,
    governance: PricingGovernanceService,
    guard: Arc<MarginGuardRailService>,
    clock: Arc<ManualClock>,
    publisher: Arc<InMemoryPublisher>,
}

fn engine() -> Engine {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 9, 2, 10, 0, 0).unwrap(),
    ));
    let publisher = Arc::new(InMemoryPublisher::new());
    let guard = Arc::new(
        MarginGuardRailService::new()
            .with_history(Arc::new(ViolationHistory::new()))
            .with_clock(clock.clone())
            .with_publisher(publisher.clone()),
    );
    let service = PriceCalculationService::new(guard.clone())
        .with_registry(StrategyRegistry::with_default_strategies())
        .with_publisher(publisher.clone())
        .with_clock(clock.clone());
    let governance = PricingGovernanceService::new(guard.clone())
        .with_publisher(publisher.clone())
        .with_clock(clock.clone());
    Engine {
        service,
        governance,
        guard,
        clock,
        publisher,
    }
}

fn bbd(minor: i64) -> Money {
    Money::new(minor, Currency::new("BBD").unwrap()).unwrap()
}

#[test]
fn discount_percentage_bounds() {
    for v in [0.0, 0.01, 50.0, 100.0] {
        assert!(DiscountPercentage::create(v).is_ok());
    }
    for v in [-0.01, 100.01, 250.0] {
        assert!(DiscountPercentage::create(v).is_err());
    }
}

#[test]
fn modifiers_on_a_thousand() {
    let bbd_code = Currency::new("BBD").unwrap();
    let price = bbd(1000);
    let pct = PriceModifier::percent_discount("Promo", "d", 20.0, 0).unwrap();
    let fixed = PriceModifier::fixed_discount("Coupon", "d", 300, bbd_code, 0).unwrap();
    let big = PriceModifier::fixed_discount("Coupon", "d", 1200, bbd_code, 0).unwrap();

    assert_eq!(pct.apply_to_price(&price).unwrap(), bbd(800));
    assert_eq!(fixed.apply_to_price(&price).unwrap(), bbd(700));
    assert_eq!(big.apply_to_price(&price).unwrap(), bbd(0));
}

#[test]
fn higher_priority_modifier_runs_first_whatever_the_order() {
    let e = engine();
    let bbd_code = Currency::new("BBD").unwrap();
    let p5 = PriceModifier::fixed_surcharge("Fee", "d", 100, bbd_code, 5).unwrap();
    let p10 = PriceModifier::percent_discount("Promo", "d", 50.0, 10).unwrap();

    // Discount first: 1000 → 500 → 600. Fee first would give 550.
    let forward = e.service.apply_price_modifiers(&bbd(1000), &[p5.clone(), p10.clone()]);
    let backward = e.service.apply_price_modifiers(&bbd(1000), &[p10, p5]);
    assert_eq!(forward.unwrap(), bbd(600));
    assert_eq!(backward.unwrap(), bbd(600));
}

#[test]
fn retail_fixed_pricing() {
    let e = engine();
    let one = PricingContext::new(bbd(1000), 1, PricingTier::Retail).unwrap();
    let three = PricingContext::new(bbd(1000), 3, PricingTier::Retail).unwrap();
    assert_eq!(e.service.calculate_price(FIXED_PRICING, &one, None, None).unwrap(), bbd(2500));
    assert_eq!(e.service.calculate_price(FIXED_PRICING, &three, None, None).unwrap(), bbd(7500));
}

#[test]
fn formula_reference_points() {
    let f = DynamicPricingFormula::default();
    let a = f.calculate_discount_percentage(30.0, 0.8, 0.5).unwrap();
    assert!(a > 0.0 && a < 20.0);
    assert!(f.calculate_discount_percentage(5.0, 0.2, 0.5).unwrap() > 40.0);
    for (d, p) in [(0.0, 0.0), (0.5, 0.5), (1.0, 1.0)] {
        let pct = f.calculate_discount_percentage(0.0, d, p).unwrap();
        assert!((pct - 100.0).abs() < 1e-9);
    }
    let short = DynamicPricingFormula::create(0.4, 0.5, 30.0).unwrap();
    assert!(short.calculate_discount_percentage(45.0, 0.5, 0.5).unwrap() < 5.0);
}

#[test]
fn margin_floor_fails_exactly_below_floor_and_records_once() {
    let e = engine();
    let cost = bbd(1000);
    // Wholesale floor is 70% gross margin: 3333.33 is the break-even price.
    for (price, should_fail) in [(3334, false), (5000, false), (3300, true), (1500, true)] {
        let before = e.guard.history().entries(PricingTier::Wholesale).len();
        let result = e
            .guard
            .check_margin_floor(&bbd(price), &cost, PricingTier::Wholesale, None, None);
        let after = e.guard.history().entries(PricingTier::Wholesale).len();
        assert_eq!(result.is_err(), should_fail, "price {}", price);
        assert_eq!(after - before, usize::from(should_fail));
    }
}

#[test]
fn sustained_breaches_freeze_then_review_unfreezes() {
    let e = engine();
    let ctx = PricingContext::new(bbd(1000), 100, PricingTier::Wholesale)
        .unwrap()
        .with_product("SKU-42");

    // Week one: a volume order breaches the floor.
    let err = e.service.calculate_price(VOLUME_PRICING, &ctx, None, None).unwrap_err();
    assert!(matches!(err, PricingError::MarginFloorViolation(_)));
    assert!(!e.service.registry().is_empty());
    assert!(!e.governance.check_and_update_freeze_status(PricingTier::Wholesale));

    // Week two: it happens again.
    e.clock.advance(Duration::days(8));
    assert!(e.service.calculate_price(VOLUME_PRICING, &ctx, None, None).is_err());
    let results = e.governance.run_governance_check();
    assert!(results[&PricingTier::Wholesale]);
    assert!(e.governance.is_dynamic_pricing_frozen(PricingTier::Wholesale));

    let names: Vec<&str> = e.publisher.events().iter().map(|ev| ev.name()).collect();
    assert_eq!(
        names,
        vec!["MarginFloorBreached", "MarginFloorBreached", "DynamicPricingFrozen"]
    );

    e.governance
        .unfreeze_dynamic_pricing(PricingTier::Wholesale, "cfo", "Volume table revised")
        .unwrap();
    assert_eq!(e.guard.recent_violation_count(PricingTier::Wholesale), 0);
    assert!(!e.guard.has_tier_exceeded_violation_threshold(PricingTier::Wholesale));
}

#[test]
fn rule_driven_modifiers_feed_fixed_pricing() {
    let e = engine();
    let input = NewPricingRule {
        name: "Restaurant promo".to_string(),
        description: "10% off for restaurants".to_string(),
        conditions: vec![RuleCondition::new(RuleConditionType::CustomerSegment, "restaurant")],
        modifier: PriceModifier::percent_discount("Restaurant promo", "10% off", 10.0, 0).unwrap(),
        applicable_tiers: vec![PricingTier::Commercial],
        start_date: None,
        end_date: None,
        priority: 3,
    };
    let rule = PricingRule::create(input, e.clock.as_ref()).unwrap();

    let ctx = PricingContext::new(bbd(1000), 2, PricingTier::Commercial)
        .unwrap()
        .with_attribute("CUSTOMER_SEGMENT", "restaurant");
    let modifiers = e.service.modifiers_from_rules(&[rule], &ctx);
    let ctx = ctx.with_modifiers(modifiers);

    // 2250 × 2 = 4500, less 10% = 4050; floor is 2000 × 2 = 4000.
    let price = e
        .service
        .calculate_price(FIXED_PRICING, &ctx, Some("SKU-7"), Some(&bbd(4500)))
        .unwrap();
    assert_eq!(price, bbd(4050));

    match e.publisher.events().as_slice() {
        [PricingEvent::PriceChanged(changed)] => {
            assert_eq!(changed.product_id, "SKU-7");
            assert_eq!(changed.old_price, 4500);
            assert_eq!(changed.new_price, 4050);
        }
        other => panic!("unexpected events {:?}", other),
    }
}
