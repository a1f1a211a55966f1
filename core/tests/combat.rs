//! Battle resolution through the engine.

mod common;

use common::{battle_pair, ctx, found, patch, stored, world};
use dominion_core::{
    combat::BattleOutcome,
    economy::vault_capacity,
    error::GameError,
};

#[test]
fn victory_plunders_and_damages_fortifications() {
    let (mut engine, _clock) = world(10);
    let (a, d) = battle_pair(&mut engine);

    let c = ctx(&engine, a);
    let report = engine.attack(&c, d, 10).unwrap();
    let battle = &report.encounter;

    assert_eq!(battle.outcome, BattleOutcome::Victory);
    assert_eq!(battle.credits_stolen, 200_000);
    assert_eq!(battle.structure_damage, 1_000);
    assert_eq!(battle.attacker_xp_gained, 500);
    assert_eq!(battle.defender_xp_gained, 50);
    assert_eq!(battle.attacker_losses, 9);
    assert_eq!(battle.defender_losses, 9);
    assert_eq!(report.credits_burned, 0);

    let attacker = stored(&engine, a);
    assert_eq!(attacker.credits, 300_000);
    assert_eq!(attacker.attack_turns, 14);
    assert_eq!(attacker.soldiers, 991);
    assert_eq!(attacker.experience, 500);

    let defender = stored(&engine, d);
    assert_eq!(defender.credits, 800_000);
    assert_eq!(defender.guards, 91);
    assert_eq!(defender.fortification_hp, engine.config().economy.max_fortification_hp - 1_000);
    assert_eq!(defender.experience, 50);
}

#[test]
fn tie_goes_to_defender_and_both_earn_xp() {
    let (mut engine, _clock) = world(11);
    let (a, d) = battle_pair(&mut engine);
    patch(&mut engine, a, |e| e.soldiers = 100);

    let c = ctx(&engine, a);
    let report = engine.attack(&c, d, 10).unwrap();

    assert_eq!(report.encounter.outcome, BattleOutcome::Defeat);
    assert_eq!(report.encounter.credits_stolen, 0);
    assert_eq!(report.encounter.structure_damage, 0);
    assert_eq!(stored(&engine, a).experience, 50);
    assert_eq!(stored(&engine, d).experience, 50);
    assert_eq!(stored(&engine, d).credits, 1_000_000);
    assert_eq!(stored(&engine, a).attack_turns, 14);
}

#[test]
fn self_attack_is_rejected_without_side_effects() {
    let (mut engine, clock) = world(12);
    let (a, _) = battle_pair(&mut engine);
    clock.advance_secs(3_600);
    let before = stored(&engine, a);
    let events = engine.store().event_count().unwrap();

    let c = ctx(&engine, a);
    let err = engine.attack(&c, a, 5).unwrap_err();

    assert!(matches!(err, GameError::SelfAttack));
    assert_eq!(stored(&engine, a), before);
    assert_eq!(engine.store().event_count().unwrap(), events);
}

#[test]
fn attack_turn_limits_are_enforced() {
    let (mut engine, _clock) = world(13);
    let (a, d) = battle_pair(&mut engine);
    let c = ctx(&engine, a);

    assert!(matches!(
        engine.attack(&c, d, 0),
        Err(GameError::InvalidAttackTurns { requested: 0, max: 10 })
    ));
    assert!(matches!(
        engine.attack(&c, d, 11),
        Err(GameError::InvalidAttackTurns { requested: 11, .. })
    ));

    patch(&mut engine, a, |e| e.attack_turns = 3);
    assert!(matches!(
        engine.attack(&c, d, 5),
        Err(GameError::InsufficientAttackTurns { needed: 5, available: 3 })
    ));
    assert_eq!(stored(&engine, d).credits, 1_000_000);
}

#[test]
fn banked_credits_cannot_be_plundered() {
    let (mut engine, _clock) = world(14);
    let (a, d) = battle_pair(&mut engine);
    patch(&mut engine, d, |e| e.banked_credits = 4_000_000);

    let c = ctx(&engine, a);
    let report = engine.attack(&c, d, 10).unwrap();

    assert!(report.encounter.credits_stolen <= 1_000_000);
    assert_eq!(stored(&engine, d).banked_credits, 4_000_000);
}

#[test]
fn plunder_beyond_vault_capacity_is_burned() {
    let (mut engine, _clock) = world(15);
    let (a, d) = battle_pair(&mut engine);
    let cap = vault_capacity(&stored(&engine, a), engine.config());
    patch(&mut engine, a, |e| e.credits = cap - 50_000);

    let c = ctx(&engine, a);
    let report = engine.attack(&c, d, 10).unwrap();

    assert_eq!(report.encounter.credits_stolen, 200_000);
    assert_eq!(report.credits_burned, 150_000);
    assert_eq!(stored(&engine, a).credits, cap);
    assert_eq!(stored(&engine, d).credits, 800_000);
}

#[test]
fn plunder_scales_with_turns_up_to_cap() {
    for (turns, expected) in [(1, 20_000), (5, 100_000), (10, 200_000)] {
        let (mut engine, _clock) = world(16);
        let (a, d) = battle_pair(&mut engine);
        let c = ctx(&engine, a);
        let report = engine.attack(&c, d, turns).unwrap();
        assert_eq!(report.encounter.credits_stolen, expected, "turns={turns}");
    }
}

#[test]
fn battle_is_logged_with_full_encounter() {
    let (mut engine, _clock) = world(17);
    let (a, d) = battle_pair(&mut engine);
    let c = ctx(&engine, a);
    let report = engine.attack(&c, d, 7).unwrap();

    let logged = engine.store().read(|tx| tx.battles_for(d, 10)).unwrap();
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].0, report.battle_id);
    assert_eq!(logged[0].1, report.encounter);

    // Indexed by both participants and nobody else.
    let by_attacker = engine.store().read(|tx| tx.battles_for(a, 10)).unwrap();
    assert_eq!(by_attacker.len(), 1);
    let bystander = found(&mut engine, "Bystander");
    assert!(engine.store().read(|tx| tx.battles_for(bystander, 10)).unwrap().is_empty());

    let types: Vec<String> = engine
        .store()
        .events_for_empire(a)
        .unwrap()
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert!(types.contains(&"battle_resolved".to_string()));
}

#[test]
fn alliance_members_cannot_attack_each_other() {
    let (mut engine, _clock) = world(18);
    let (a, d) = battle_pair(&mut engine);
    let alliance = common::alliance_with_bank(&mut engine, a, 0);
    let c = ctx(&engine, d);
    engine.join_alliance(&c, alliance).unwrap();

    let c = ctx(&engine, a);
    assert!(matches!(engine.attack(&c, d, 5), Err(GameError::SameAlliance)));
}

#[test]
fn missing_defender_is_reported() {
    let (mut engine, _clock) = world(19);
    let a = found(&mut engine, "Lonely");
    patch(&mut engine, a, |e| e.soldiers = 10);
    let c = ctx(&engine, a);
    assert!(matches!(engine.attack(&c, 999, 5), Err(GameError::EmpireNotFound(999))));
}

#[test]
fn large_victory_levels_up_attacker() {
    let (mut engine, _clock) = world(20);
    let (a, d) = battle_pair(&mut engine);
    patch(&mut engine, a, |e| e.soldiers = 10_000);

    let c = ctx(&engine, a);
    let report = engine.attack(&c, d, 10).unwrap();

    assert_eq!(report.attacker_levels_gained, 1);
    let attacker = stored(&engine, a);
    assert_eq!(attacker.level, 2);
    assert_eq!(attacker.proficiency_points, 1);
    assert!(engine
        .store()
        .events_for_empire(a)
        .unwrap()
        .iter()
        .any(|e| e.event_type == "level_gained"));
}
