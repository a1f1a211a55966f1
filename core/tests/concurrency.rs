//! Racing requests against one on-disk world.
//!
//! Each thread owns its own connection, as separate server workers would.
//! A barrier releases them together so their transactions contend.

mod common;

use common::TURN;
use dominion_core::{
    clock::FixedClock,
    config::GameConfig,
    empire::{AllianceRole, Empire},
    engine::{GameEngine, TEST_EPOCH},
    error::GameError,
    store::GameStore,
    types::EmpireId,
};
use std::{
    path::PathBuf,
    sync::{Arc, Barrier},
    thread,
};

struct DiskWorld {
    path:  PathBuf,
    clock: Arc<FixedClock>,
    main:  GameEngine,
}

impl DiskWorld {
    fn create(seed: u64) -> Self {
        let path = std::env::temp_dir().join(format!("dominion-{}.db", uuid::Uuid::new_v4()));
        let clock = Arc::new(FixedClock::at(TEST_EPOCH));
        let store = GameStore::open(&path.to_string_lossy()).expect("open store");
        let main = GameEngine::create_world(store, GameConfig::default(), clock.clone(), seed)
            .expect("create world");
        Self { path, clock, main }
    }

    /// A second engine on its own connection to the same file.
    fn worker(&self) -> GameEngine {
        let store = GameStore::open(&self.path.to_string_lossy()).expect("open store");
        GameEngine::open(store, GameConfig::default(), self.clock.clone()).expect("open engine")
    }

    fn patch(&mut self, id: EmpireId, f: impl FnOnce(&mut Empire)) {
        common::patch(&mut self.main, id, f);
    }
}

impl Drop for DiskWorld {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut p = self.path.clone().into_os_string();
            p.push(suffix);
            let _ = std::fs::remove_file(p);
        }
    }
}

/// Run `action` once per worker, all released at the same instant.
fn race<T, F>(world: &DiskWorld, workers: usize, action: F) -> Vec<Result<T, GameError>>
where
    T: Send + 'static,
    F: Fn(&mut GameEngine, usize) -> Result<T, GameError> + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(workers));
    let action = Arc::new(action);
    let handles: Vec<_> = (0..workers)
        .map(|i| {
            let mut engine = world.worker();
            let barrier = barrier.clone();
            let action = action.clone();
            thread::spawn(move || {
                barrier.wait();
                action(&mut engine, i)
            })
        })
        .collect();
    handles
        .into_iter()
        .map(|h| h.join().expect("worker panicked"))
        .collect()
}

#[test]
fn concurrent_syncs_apply_each_turn_once() {
    let mut world = DiskWorld::create(50);
    let id = common::found(&mut world.main, "Contested");
    world.clock.advance_secs(6 * TURN);

    let results = race(&world, 4, move |engine, _| {
        let c = engine.context(id);
        engine.sync_empire(&c).map(|a| a.turns_applied)
    });

    let total: i64 = results.into_iter().map(|r| r.expect("sync")).sum();
    assert_eq!(total, 6);

    let e = common::stored(&world.main, id);
    assert_eq!(e.credits, 100_000 + 6 * 5_000);
    assert_eq!(e.last_updated_at, TEST_EPOCH + 6 * TURN);
}

#[test]
fn concurrent_purchases_of_one_structure_succeed_once() {
    let mut world = DiskWorld::create(51);
    let leader = common::found(&mut world.main, "Leader");
    let officer = common::found(&mut world.main, "Officer");
    let alliance = common::alliance_with_bank(&mut world.main, leader, 12_000_000);
    let c = world.main.context(officer);
    world.main.join_alliance(&c, alliance).expect("join");
    let c = world.main.context(leader);
    world.main.set_member_role(&c, officer, AllianceRole::Officer).expect("promote");

    let buyers = [leader, officer];
    let results = race(&world, 2, move |engine, i| {
        let c = engine.context(buyers[i]);
        engine.purchase_structure(&c, "trade_hub_1")
    });

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(GameError::StructureAlreadyOwned(_)))));

    assert_eq!(world.main.alliance(alliance).unwrap().bank_credits, 7_000_000);
    let owned = world.main.store().read(|tx| tx.owned_structures(alliance)).unwrap();
    assert_eq!(owned.len(), 1);
}

#[test]
fn concurrent_attacks_on_one_defender_lose_no_updates() {
    let mut world = DiskWorld::create(52);
    let first = common::found(&mut world.main, "Raider One");
    let second = common::found(&mut world.main, "Raider Two");
    let defender = common::found(&mut world.main, "Target");
    for id in [first, second] {
        world.patch(id, |e| {
            e.soldiers = 1_000;
            e.attack_turns = 24;
        });
    }
    world.patch(defender, |e| {
        e.guards = 100;
        e.credits = 1_000_000;
    });

    let raiders = [first, second];
    let results = race(&world, 2, move |engine, i| {
        let c = engine.context(raiders[i]);
        engine.attack(&c, defender, 10)
    });

    let stolen: i64 = results
        .into_iter()
        .map(|r| r.expect("attack").encounter.credits_stolen)
        .sum();
    // Sequential plunder of 20% each: 200k then 160k.
    assert_eq!(stolen, 360_000);
    assert_eq!(common::stored(&world.main, defender).credits, 640_000);
}
