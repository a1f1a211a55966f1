//! Offline turn accrual through the engine.

mod common;

use common::{ctx, found, patch, stored, world, TURN};
use dominion_core::{
    accrual::accrue,
    config::{GameConfig, StructureBonus},
    economy::{income_per_turn, vault_capacity},
    empire::Empire,
    engine::{GameEngine, TEST_EPOCH},
    rng::GameRng,
};

#[test]
fn twenty_five_minutes_applies_two_turns() {
    let (mut engine, clock) = world(1);
    let id = found(&mut engine, "Vega Prime");
    patch(&mut engine, id, |e| e.workers = 10);

    clock.advance_secs(25 * 60);
    let c = ctx(&engine, id);
    let accrual = engine.sync_empire(&c).unwrap();

    assert_eq!(accrual.turns_applied, 2);
    assert_eq!(accrual.credits_gained, 11_000);
    assert_eq!(accrual.attack_turns_gained, 4);
    assert_eq!(accrual.citizens_gained, 2);

    let e = stored(&engine, id);
    assert_eq!(e.credits, 100_000 + 11_000);
    assert_eq!(e.attack_turns, 14);
    assert_eq!(e.untrained_citizens, 252);
    // 300s of the partial turn are kept for next time.
    assert_eq!(e.last_updated_at, TEST_EPOCH + 1_200);
}

#[test]
fn second_sync_at_same_instant_is_a_noop() {
    let (mut engine, clock) = world(2);
    let id = found(&mut engine, "Orion Reach");
    clock.advance_secs(7 * TURN + 30);

    let c = ctx(&engine, id);
    let first = engine.sync_empire(&c).unwrap();
    assert_eq!(first.turns_applied, 7);
    let after_first = stored(&engine, id);

    let second = engine.sync_empire(&c).unwrap();
    assert!(second.is_noop());
    assert_eq!(stored(&engine, id), after_first);

    let accrual_events = engine
        .store()
        .events_for_empire(id)
        .unwrap()
        .into_iter()
        .filter(|e| e.event_type == "turns_accrued")
        .count();
    assert_eq!(accrual_events, 1);
}

fn sync_after(engine: &mut GameEngine, clock: &dominion_core::clock::FixedClock, id: i64, secs: i64) {
    clock.advance_secs(secs);
    let c = ctx(engine, id);
    engine.sync_empire(&c).unwrap();
}

#[test]
fn split_accrual_equals_single_accrual() {
    let (mut once, once_clock) = world(3);
    let (mut split, split_clock) = world(3);
    let a = found(&mut once, "Lyra");
    let b = found(&mut split, "Lyra");
    for (engine, id) in [(&mut once, a), (&mut split, b)] {
        patch(engine, id, |e| {
            e.workers = 37;
            e.wealth = 12;
            e.attack_turns = 20;
        });
    }

    sync_after(&mut once, &once_clock, a, 9 * TURN + 599);

    sync_after(&mut split, &split_clock, b, 2 * TURN + 100);
    sync_after(&mut split, &split_clock, b, 3 * TURN + 450);
    sync_after(&mut split, &split_clock, b, 4 * TURN + 49);

    assert_eq!(stored(&once, a), stored(&split, b));
}

#[test]
fn attack_turns_stop_at_cap_and_never_drop() {
    let (mut engine, clock) = world(4);
    let id = found(&mut engine, "Draco");
    patch(&mut engine, id, |e| e.attack_turns = 23);

    sync_after(&mut engine, &clock, id, 3 * TURN);
    assert_eq!(stored(&engine, id).attack_turns, 24);

    patch(&mut engine, id, |e| e.attack_turns = 30);
    sync_after(&mut engine, &clock, id, TURN);
    assert_eq!(stored(&engine, id).attack_turns, 30);
}

#[test]
fn income_above_vault_capacity_is_burned() {
    let (mut engine, clock) = world(5);
    let id = found(&mut engine, "Cygnus");
    let cap = vault_capacity(&stored(&engine, id), engine.config());
    patch(&mut engine, id, |e| e.credits = cap - 3_000);

    clock.advance_secs(2 * TURN);
    let c = ctx(&engine, id);
    let accrual = engine.sync_empire(&c).unwrap();

    assert_eq!(accrual.credits_gained, 3_000);
    assert_eq!(accrual.credits_burned, 7_000);
    assert_eq!(stored(&engine, id).credits, cap);
}

#[test]
fn vault_cap_holds_for_any_elapsed_time() {
    let (mut engine, clock) = world(6);
    let id = found(&mut engine, "Altair");
    patch(&mut engine, id, |e| e.workers = 400);
    let cap = vault_capacity(&stored(&engine, id), engine.config());

    for step in [1, 7, 60, 3, 500, 2_000] {
        sync_after(&mut engine, &clock, id, step * TURN + 17);
        assert!(stored(&engine, id).credits <= cap);
    }
    assert_eq!(stored(&engine, id).credits, cap);
}

#[test]
fn income_is_exact_and_capped_across_workers_and_wealth() {
    let config = GameConfig::default();
    let mut rng = GameRng::new(0x5EED, 0, 0);
    let trade_hub = StructureBonus { income_pct: 0.05, ..Default::default() };

    for case in 0..2_000 {
        let mut e = Empire::founding(1, "Sweep", &config, 0);
        e.workers = rng.next_u64_below(20_000) as i64;
        e.wealth = rng.next_u64_below(76) as i64;
        e.vault_level = 1 + rng.next_u64_below(10) as u32;
        let cap = vault_capacity(&e, &config);
        e.credits = rng.next_u64_below(cap as u64 + 1) as i64;
        let turns = 1 + rng.next_u64_below(300) as i64;
        let now = turns * TURN + rng.next_u64_below(TURN as u64) as i64;

        let gross = 5_000 + e.workers * 50;
        let (bonus, per_turn) = if case % 2 == 0 {
            (StructureBonus::default(), gross * (100 + e.wealth) / 100)
        } else {
            (trade_hub, gross * (100 + e.wealth) * 105 / 10_000)
        };
        assert_eq!(income_per_turn(&e, &config, &bonus), per_turn, "case {case}: {e:?}");

        let accrual = accrue(&e, now, &config, &bonus);
        let earned = per_turn * turns;
        let credited = earned.min(cap - e.credits);
        assert_eq!(accrual.turns_applied, turns);
        assert_eq!(accrual.credits_gained, credited, "case {case}");
        assert_eq!(accrual.credits_burned, earned - credited, "case {case}");
        assert_eq!(accrual.empire.credits, e.credits + credited);
        assert!(accrual.empire.credits <= cap);
    }
}

#[test]
fn credits_over_capacity_are_clamped_on_next_turn() {
    let (mut engine, clock) = world(7);
    let id = found(&mut engine, "Rigel");
    let cap = vault_capacity(&stored(&engine, id), engine.config());
    patch(&mut engine, id, |e| e.credits = cap + 1_000);

    // Under a whole turn: nothing applies, nothing is clamped.
    sync_after(&mut engine, &clock, id, TURN - 1);
    assert_eq!(stored(&engine, id).credits, cap + 1_000);

    sync_after(&mut engine, &clock, id, 1);
    assert_eq!(stored(&engine, id).credits, cap);
}

#[test]
fn clock_skew_applies_no_turns() {
    let (mut engine, clock) = world(8);
    let id = found(&mut engine, "Sirius");
    let before = stored(&engine, id);

    clock.set(TEST_EPOCH - 5_000);
    let c = ctx(&engine, id);
    let accrual = engine.sync_empire(&c).unwrap();

    assert!(accrual.is_noop());
    assert_eq!(stored(&engine, id), before);
}

#[test]
fn alliance_income_structure_raises_income() {
    let (mut engine, clock) = world(9);
    let id = found(&mut engine, "Antares");
    common::alliance_with_bank(&mut engine, id, 5_000_000);
    let c = ctx(&engine, id);
    engine.purchase_structure(&c, "trade_hub_1").unwrap();

    clock.advance_secs(TURN);
    let c = ctx(&engine, id);
    let accrual = engine.sync_empire(&c).unwrap();
    assert_eq!(accrual.credits_gained, 5_250);
}
