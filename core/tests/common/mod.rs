//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use dominion_core::{
    clock::FixedClock,
    command::RequestContext,
    empire::Empire,
    engine::GameEngine,
    types::EmpireId,
};
use std::sync::Arc;

pub const TURN: i64 = 600;

pub fn world(seed: u64) -> (GameEngine, Arc<FixedClock>) {
    GameEngine::build_test(seed).expect("test world")
}

pub fn found(engine: &mut GameEngine, name: &str) -> EmpireId {
    engine.found_empire(name).expect("found empire").id
}

pub fn ctx(engine: &GameEngine, empire_id: EmpireId) -> RequestContext {
    engine.context(empire_id)
}

/// Overwrite stored fields directly, bypassing game rules.
/// `last_updated_at` is preserved.
pub fn patch(engine: &mut GameEngine, empire_id: EmpireId, f: impl FnOnce(&mut Empire)) {
    engine
        .store_mut()
        .atomically(|tx| {
            let mut e = tx.load_empire(empire_id)?;
            let stamp = e.last_updated_at;
            f(&mut e);
            e.last_updated_at = stamp;
            tx.save_empire(&e, stamp)
        })
        .expect("patch empire");
}

pub fn stored(engine: &GameEngine, empire_id: EmpireId) -> Empire {
    engine.empire(empire_id).expect("load empire")
}

/// An attacker with an army and a weak defender holding credits.
pub fn battle_pair(engine: &mut GameEngine) -> (EmpireId, EmpireId) {
    let attacker = found(engine, "Attacker");
    let defender = found(engine, "Defender");
    patch(engine, attacker, |e| {
        e.soldiers = 1_000;
        e.attack_turns = 24;
    });
    patch(engine, defender, |e| {
        e.guards = 100;
        e.credits = 1_000_000;
    });
    (attacker, defender)
}

/// Found an alliance led by `leader` with the given bank balance.
pub fn alliance_with_bank(engine: &mut GameEngine, leader: EmpireId, bank: i64) -> i64 {
    let c = engine.context(leader);
    let alliance = engine.found_alliance(&c, &format!("Alliance {leader}"), &format!("A{leader}"))
        .expect("found alliance");
    engine
        .store_mut()
        .atomically(|tx| tx.adjust_alliance_bank(alliance.id, bank))
        .expect("fund alliance");
    alliance.id
}
