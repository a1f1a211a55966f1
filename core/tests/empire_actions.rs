//! Training, upgrades, proficiencies and the personal bank.

mod common;

use common::{ctx, found, patch, stored, world, TURN};
use dominion_core::{
    command::PlayerCommand,
    empire::{Proficiency, UnitKind},
    engine::CommandOutcome,
    error::GameError,
    training::ArmoryTrack,
};

#[test]
fn training_spends_credits_and_citizens() {
    let (mut engine, _clock) = world(70);
    let id = found(&mut engine, "Forge");
    let c = ctx(&engine, id);

    let change = engine.train(&c, UnitKind::Soldier, 100).unwrap();
    assert_eq!(change.spent, 25_000);

    let e = stored(&engine, id);
    assert_eq!(e.credits, 75_000);
    assert_eq!(e.untrained_citizens, 150);
    assert_eq!(e.soldiers, 100);

    assert!(matches!(
        engine.train(&c, UnitKind::Guard, 151),
        Err(GameError::InsufficientCitizens { needed: 151, available: 150 })
    ));
    assert!(matches!(
        engine.train(&c, UnitKind::Spy, 100),
        Err(GameError::InsufficientCredits { needed: 100_000, available: 75_000 })
    ));
    assert!(matches!(engine.train(&c, UnitKind::Worker, 0), Err(GameError::InvalidAmount(0))));
}

#[test]
fn training_sees_credits_accrued_while_offline() {
    let (mut engine, clock) = world(71);
    let id = found(&mut engine, "Patience");
    patch(&mut engine, id, |e| e.credits = 0);

    clock.advance_secs(2 * TURN);
    let c = ctx(&engine, id);
    let change = engine.train(&c, UnitKind::Guard, 40).unwrap();

    assert_eq!(change.spent, 10_000);
    assert_eq!(change.empire.credits, 0);
    assert_eq!(change.empire.untrained_citizens, 250 + 2 - 40);
    assert_eq!(stored(&engine, id).last_updated_at, common::TURN * 2 + dominion_core::engine::TEST_EPOCH);
}

#[test]
fn disbanding_refunds_part_of_the_cost() {
    let (mut engine, _clock) = world(72);
    let id = found(&mut engine, "Thrift");
    let c = ctx(&engine, id);
    engine.train(&c, UnitKind::Worker, 100).unwrap();

    let change = engine.disband(&c, UnitKind::Worker, 40).unwrap();
    assert_eq!(change.received, 3_000);
    assert_eq!(change.burned, 0);

    let e = stored(&engine, id);
    assert_eq!(e.credits, 93_000);
    assert_eq!(e.workers, 60);
    assert_eq!(e.untrained_citizens, 190);

    assert!(matches!(
        engine.disband(&c, UnitKind::Spy, 1),
        Err(GameError::InsufficientUnits { unit: "spies", needed: 1, available: 0 })
    ));
}

#[test]
fn vault_and_armory_upgrades_scale_in_cost() {
    let (mut engine, _clock) = world(73);
    let id = found(&mut engine, "Citadel");
    patch(&mut engine, id, |e| e.credits = 2_000_000);
    let c = ctx(&engine, id);

    assert_eq!(engine.upgrade_vault(&c).unwrap().spent, 1_000_000);
    assert_eq!(engine.upgrade_armory(&c, ArmoryTrack::Offense).unwrap().spent, 250_000);
    assert_eq!(engine.upgrade_armory(&c, ArmoryTrack::Offense).unwrap().spent, 500_000);

    let e = stored(&engine, id);
    assert_eq!(e.vault_level, 2);
    assert_eq!(e.offense_upgrade_level, 2);
    assert_eq!(e.defense_upgrade_level, 0);
    assert_eq!(e.credits, 250_000);

    assert!(matches!(
        engine.upgrade_vault(&c),
        Err(GameError::InsufficientCredits { needed: 2_000_000, .. })
    ));

    patch(&mut engine, id, |e| {
        e.vault_level = 10;
        e.credits = 40_000_000;
    });
    assert!(matches!(
        engine.upgrade_vault(&c),
        Err(GameError::UpgradeMaxed { track: "vault", max: 10 })
    ));
}

#[test]
fn repairs_restore_only_missing_hit_points() {
    let (mut engine, _clock) = world(74);
    let id = found(&mut engine, "Bulwark");
    patch(&mut engine, id, |e| e.fortification_hp = 9_000);
    let c = ctx(&engine, id);

    let change = engine.repair_fortifications(&c, 5_000).unwrap();
    assert_eq!(change.spent, 10_000);
    let e = stored(&engine, id);
    assert_eq!(e.fortification_hp, 10_000);
    assert_eq!(e.credits, 90_000);

    assert!(matches!(engine.repair_fortifications(&c, 0), Err(GameError::InvalidAmount(0))));
}

#[test]
fn proficiency_points_are_spent_up_to_the_cap() {
    let (mut engine, _clock) = world(75);
    let id = found(&mut engine, "Scholar");
    patch(&mut engine, id, |e| e.proficiency_points = 3);
    let c = ctx(&engine, id);

    engine.spend_proficiency(&c, Proficiency::Strength, 2).unwrap();
    let e = stored(&engine, id);
    assert_eq!(e.strength, 2);
    assert_eq!(e.proficiency_points, 1);

    assert!(matches!(
        engine.spend_proficiency(&c, Proficiency::Wealth, 5),
        Err(GameError::InsufficientProficiencyPoints { needed: 5, available: 1 })
    ));

    patch(&mut engine, id, |e| e.charisma = 75);
    assert!(matches!(
        engine.spend_proficiency(&c, Proficiency::Charisma, 1),
        Err(GameError::ProficiencyCapReached { proficiency: "charisma", cap: 75 })
    ));
}

#[test]
fn personal_bank_limits_deposits_and_guards_the_vault() {
    let (mut engine, _clock) = world(76);
    let id = found(&mut engine, "Miser");
    let c = ctx(&engine, id);

    engine.bank_deposit(&c, 80_000).unwrap();
    let e = stored(&engine, id);
    assert_eq!((e.credits, e.banked_credits), (20_000, 80_000));

    assert!(matches!(
        engine.bank_deposit(&c, 20_000),
        Err(GameError::DepositLimitExceeded { amount: 20_000, limit: 16_000 })
    ));

    engine.bank_withdraw(&c, 30_000).unwrap();
    let e = stored(&engine, id);
    assert_eq!((e.credits, e.banked_credits), (50_000, 50_000));

    assert!(matches!(
        engine.bank_withdraw(&c, 60_000),
        Err(GameError::InsufficientBankCredits { needed: 60_000, available: 50_000 })
    ));
}

#[test]
fn commands_dispatch_to_their_operations() {
    let (mut engine, clock) = world(77);
    let id = found(&mut engine, "Dispatcher");
    clock.advance_secs(TURN);
    let c = ctx(&engine, id);

    let outcome = engine.execute(&c, PlayerCommand::Sync).unwrap();
    assert!(matches!(outcome, CommandOutcome::Synced { ref accrual } if accrual.turns_applied == 1));

    let cmd: PlayerCommand = serde_json::from_str(r#"{"cmd":"train","unit":"guard","quantity":10}"#).unwrap();
    let outcome = engine.execute(&c, cmd).unwrap();
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["outcome"], "empire");
    assert_eq!(json["change"]["spent"], 2_500);
    assert_eq!(stored(&engine, id).guards, 10);

    let err = engine
        .execute(&c, PlayerCommand::Attack { target: id, turns: 1 })
        .unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn empire_names_are_validated_and_unique() {
    let (mut engine, _clock) = world(78);
    found(&mut engine, "Unique");

    assert!(matches!(engine.found_empire("Unique"), Err(GameError::NameTaken(_))));
    assert!(matches!(engine.found_empire("   "), Err(GameError::InvalidName(_))));
    assert!(matches!(
        engine.found_empire(&"x".repeat(33)),
        Err(GameError::InvalidName(_))
    ));
    let e = engine.found_empire("  Padded  ").unwrap();
    assert_eq!(e.name, "Padded");
}

#[test]
fn leaderboard_ranks_stored_state() {
    let (mut engine, _clock) = world(79);
    let weak = found(&mut engine, "Weak");
    let strong = found(&mut engine, "Strong");
    let rich = found(&mut engine, "Rich");
    patch(&mut engine, strong, |e| e.soldiers = 500);
    patch(&mut engine, rich, |e| e.banked_credits = 1_000_000);

    let board = engine.leaderboard().unwrap();
    let order: Vec<_> = board.iter().map(|r| r.empire_id).collect();
    assert_eq!(order, vec![strong, rich, weak]);
    assert_eq!(board[1].net_worth, 1_100_000);
    assert_eq!(board[2].rank, 3);
}
