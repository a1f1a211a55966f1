//! The game engine: one entry point per player action.
//!
//! REQUEST LIFECYCLE (every mutating operation, no exceptions):
//!   1. Open one IMMEDIATE store transaction.
//!   2. Load every empire the action touches and bring it up to `now`
//!      with offline accrual.
//!   3. Validate. Any rule violation returns `Err` and rolls back.
//!   4. Apply the pure formulas from the domain modules.
//!   5. Save each empire (compare-and-swap on `last_updated_at`), write
//!      log rows and append events.
//!   6. Commit.
//!
//! RULES:
//!   - The engine never issues SQL; it calls `StoreTx` methods.
//!   - Every empire loaded in step 2 is saved in step 5, so an accrual
//!     event is never logged without the accrual being persisted.
//!   - All randomness flows through the RngBank with a persisted sequence.
//!   - Time comes from the `Clock` via `RequestContext::now`.

use crate::{
    accrual::{accrue, Accrual},
    alliance::{
        check_structure_purchase, require_leader, require_treasury_role, structure_bonus,
        Alliance, AllianceBankTransaction, BankTransactionKind,
    },
    bank,
    black_market::{self, BlackMarketPlay},
    clock::{Clock, FixedClock},
    combat::{resolve_battle, validate_attack, BattleEncounter},
    command::{PlayerCommand, RequestContext},
    config::{GameConfig, StructureBonus},
    diplomacy::{war_points, Treaty, TreatyStatus, War},
    economy::{credit_with_cap, vault_headroom},
    empire::{AllianceRole, Empire, Proficiency, UnitKind},
    error::{GameError, GameResult},
    espionage::{resolve_mission, validate_mission, SpyEffect, SpyMission, SpyReport},
    event::{EventLogEntry, GameEvent},
    progression::{award_xp, spend_points},
    ranking::{rank_empires, RankEntry},
    rng::{RngBank, RngSlot},
    store::{GameStore, StoreTx},
    training::{self, ArmoryTrack},
    types::{AllianceId, Credits, EmpireId, Timestamp},
};
use serde::Serialize;
use std::sync::Arc;

/// Fixed start time for test worlds.
pub const TEST_EPOCH: Timestamp = 1_700_000_000;

const MAX_NAME_LEN: usize = 32;
const MAX_TAG_LEN: usize = 5;

// ── Outcomes ───────────────────────────────────────────────────────

/// An empire after a self-contained economic action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmpireChange {
    pub empire:   Empire,
    /// Credits paid for the action.
    pub spent:    Credits,
    /// Credits received (refunds, withdrawals, winnings).
    pub received: Credits,
    /// Credits that did not fit in the vault.
    pub burned:   Credits,
}

impl EmpireChange {
    fn spent(empire: Empire, spent: Credits) -> Self {
        Self { empire, spent, received: 0, burned: 0 }
    }

    fn received(empire: Empire, received: Credits, burned: Credits) -> Self {
        Self { empire, spent: 0, received, burned }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarUpdate {
    pub war_id:      i64,
    pub alliance_id: AllianceId,
    pub points:      i64,
    pub concluded:   bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BattleReport {
    pub battle_id:              i64,
    pub encounter:              BattleEncounter,
    /// Plunder the attacker's vault could not hold.
    pub credits_burned:         Credits,
    pub attacker_levels_gained: i64,
    pub defender_levels_gained: i64,
    pub war:                    Option<WarUpdate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpyOutcome {
    pub report_id: i64,
    pub report:    SpyReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructurePurchase {
    pub alliance_id:  AllianceId,
    pub key:          String,
    pub cost:         Credits,
    pub bank_credits: Credits,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlackMarketOutcome {
    pub play_id: i64,
    pub play:    BlackMarketPlay,
}

/// What `GameEngine::execute` returns, one variant per command family.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Synced { accrual: Accrual },
    Empire { change: EmpireChange },
    Battle { report: BattleReport },
    Spy { result: SpyOutcome },
    Alliance { alliance: Alliance },
    Member { empire: Empire },
    Structure { purchase: StructurePurchase },
    War { war: War },
    Treaty { treaty: Treaty },
    BlackMarket { result: BlackMarketOutcome },
}

// ── Engine ─────────────────────────────────────────────────────────

pub struct GameEngine {
    config:   GameConfig,
    store:    GameStore,
    clock:    Arc<dyn Clock>,
    rng_bank: RngBank,
}

/// An empire brought up to `now` inside the open transaction.
struct Current {
    empire: Empire,
    /// `last_updated_at` as stored; `save_empire` must match it.
    stamp:  Timestamp,
    bonus:  StructureBonus,
}

impl GameEngine {
    /// Attach to an existing world. Migrations are applied if missing.
    pub fn open(store: GameStore, config: GameConfig, clock: Arc<dyn Clock>) -> GameResult<Self> {
        store.migrate()?;
        let seed = store.world_seed()?;
        Ok(Self {
            config,
            store,
            clock,
            rng_bank: RngBank::new(seed),
        })
    }

    /// Create the world record if absent, then attach. An existing world
    /// keeps its original seed.
    pub fn create_world(
        mut store: GameStore,
        config: GameConfig,
        clock: Arc<dyn Clock>,
        seed: u64,
    ) -> GameResult<Self> {
        store.migrate()?;
        let now = clock.now_ts();
        let created = store.init_world(seed, env!("CARGO_PKG_VERSION"), now)?;
        if created {
            let ctx = RequestContext::new(0, now);
            store.atomically(|tx| emit(tx, &ctx, None, &GameEvent::WorldInitialized { seed }))?;
            log::info!("world: created with seed {seed}");
        }
        Self::open(store, config, clock)
    }

    /// In-memory world with the default balance and a pinned clock.
    pub fn build_test(seed: u64) -> GameResult<(Self, Arc<FixedClock>)> {
        let clock = Arc::new(FixedClock::at(TEST_EPOCH));
        let engine = Self::create_world(
            GameStore::in_memory()?,
            GameConfig::default(),
            clock.clone(),
            seed,
        )?;
        Ok((engine, clock))
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn store(&self) -> &GameStore {
        &self.store
    }

    /// Direct store access for admin tooling and test fixtures. Writes made
    /// here bypass validation and the event log.
    pub fn store_mut(&mut self) -> &mut GameStore {
        &mut self.store
    }

    pub fn master_seed(&self) -> u64 {
        self.rng_bank.master_seed()
    }

    /// A fresh request for `empire_id` stamped with the engine clock.
    pub fn context(&self, empire_id: EmpireId) -> RequestContext {
        RequestContext::new(empire_id, self.clock.now_ts())
    }

    // ── Reads ──────────────────────────────────────────────────────

    /// The stored record, without accrual.
    pub fn empire(&self, empire_id: EmpireId) -> GameResult<Empire> {
        self.store.read(|tx| tx.load_empire(empire_id))
    }

    pub fn alliance(&self, alliance_id: AllianceId) -> GameResult<Alliance> {
        self.store.read(|tx| tx.load_alliance(alliance_id))
    }

    /// Ranks stored records. Reads never accrue, so stale empires rank
    /// on their last saved state.
    pub fn leaderboard(&self) -> GameResult<Vec<RankEntry>> {
        let empires = self.store.read(|tx| tx.all_empires())?;
        Ok(rank_empires(&empires, &self.config))
    }

    // ── Empire ─────────────────────────────────────────────────────

    pub fn found_empire(&mut self, name: &str) -> GameResult<Empire> {
        let name = validate_name(name, MAX_NAME_LEN)?;
        let ctx = self.context(0);
        let config = &self.config;
        let empire = self.store.atomically(|tx| {
            if tx.find_empire_by_name(&name)?.is_some() {
                return Err(GameError::NameTaken(name.clone()));
            }
            let mut empire = Empire::founding(0, &name, config, ctx.now);
            empire.id = tx.insert_empire(&empire)?;
            emit(
                tx,
                &ctx,
                Some(empire.id),
                &GameEvent::EmpireFounded { empire_id: empire.id, name: name.clone() },
            )?;
            Ok(empire)
        })?;
        log::info!("empire={} founded: '{}'", empire.id, empire.name);
        Ok(empire)
    }

    /// Bring an empire up to `ctx.now`. A second call with no whole turn
    /// elapsed changes nothing.
    pub fn sync_empire(&mut self, ctx: &RequestContext) -> GameResult<Accrual> {
        let config = &self.config;
        self.store.atomically(|tx| {
            let (current, accrual) = accrue_in_tx(tx, ctx, ctx.empire_id, config)?;
            if !accrual.is_noop() {
                tx.save_empire(&current.empire, current.stamp)?;
            }
            Ok(accrual)
        })
    }

    pub fn train(&mut self, ctx: &RequestContext, unit: UnitKind, quantity: i64) -> GameResult<EmpireChange> {
        let config = &self.config;
        self.store.atomically(|tx| {
            let mut cur = load_current(tx, ctx, ctx.empire_id, config)?;
            let cost = training::train(&mut cur.empire, unit, quantity, config)?;
            tx.save_empire(&cur.empire, cur.stamp)?;
            emit(
                tx,
                ctx,
                Some(ctx.empire_id),
                &GameEvent::UnitsTrained { empire_id: ctx.empire_id, unit, quantity, cost },
            )?;
            log::info!("empire={} training: {quantity} {} for {cost}", ctx.empire_id, unit.as_str());
            Ok(EmpireChange::spent(cur.empire, cost))
        })
    }

    pub fn disband(&mut self, ctx: &RequestContext, unit: UnitKind, quantity: i64) -> GameResult<EmpireChange> {
        let config = &self.config;
        self.store.atomically(|tx| {
            let mut cur = load_current(tx, ctx, ctx.empire_id, config)?;
            let result = training::disband(&mut cur.empire, unit, quantity, config)?;
            tx.save_empire(&cur.empire, cur.stamp)?;
            emit(
                tx,
                ctx,
                Some(ctx.empire_id),
                &GameEvent::UnitsDisbanded {
                    empire_id: ctx.empire_id,
                    unit,
                    quantity,
                    refunded: result.refunded,
                    burned: result.burned,
                },
            )?;
            Ok(EmpireChange::received(cur.empire, result.refunded, result.burned))
        })
    }

    pub fn upgrade_vault(&mut self, ctx: &RequestContext) -> GameResult<EmpireChange> {
        let config = &self.config;
        self.store.atomically(|tx| {
            let mut cur = load_current(tx, ctx, ctx.empire_id, config)?;
            let cost = training::upgrade_vault(&mut cur.empire, config)?;
            tx.save_empire(&cur.empire, cur.stamp)?;
            emit(
                tx,
                ctx,
                Some(ctx.empire_id),
                &GameEvent::VaultUpgraded {
                    empire_id: ctx.empire_id,
                    level: cur.empire.vault_level,
                    cost,
                },
            )?;
            Ok(EmpireChange::spent(cur.empire, cost))
        })
    }

    pub fn upgrade_armory(&mut self, ctx: &RequestContext, track: ArmoryTrack) -> GameResult<EmpireChange> {
        let config = &self.config;
        self.store.atomically(|tx| {
            let mut cur = load_current(tx, ctx, ctx.empire_id, config)?;
            let cost = training::upgrade_armory(&mut cur.empire, track, config)?;
            let level = match track {
                ArmoryTrack::Offense => cur.empire.offense_upgrade_level,
                ArmoryTrack::Defense => cur.empire.defense_upgrade_level,
            };
            tx.save_empire(&cur.empire, cur.stamp)?;
            emit(
                tx,
                ctx,
                Some(ctx.empire_id),
                &GameEvent::ArmoryUpgraded { empire_id: ctx.empire_id, track, level, cost },
            )?;
            Ok(EmpireChange::spent(cur.empire, cost))
        })
    }

    pub fn repair_fortifications(&mut self, ctx: &RequestContext, hp: i64) -> GameResult<EmpireChange> {
        let config = &self.config;
        self.store.atomically(|tx| {
            let mut cur = load_current(tx, ctx, ctx.empire_id, config)?;
            let (restored, cost) = training::repair_fortifications(&mut cur.empire, hp, config)?;
            tx.save_empire(&cur.empire, cur.stamp)?;
            emit(
                tx,
                ctx,
                Some(ctx.empire_id),
                &GameEvent::FortificationsRepaired { empire_id: ctx.empire_id, hp: restored, cost },
            )?;
            Ok(EmpireChange::spent(cur.empire, cost))
        })
    }

    pub fn spend_proficiency(
        &mut self,
        ctx: &RequestContext,
        proficiency: Proficiency,
        points: i64,
    ) -> GameResult<EmpireChange> {
        let config = &self.config;
        self.store.atomically(|tx| {
            let mut cur = load_current(tx, ctx, ctx.empire_id, config)?;
            spend_points(&mut cur.empire, proficiency, points, config)?;
            tx.save_empire(&cur.empire, cur.stamp)?;
            emit(
                tx,
                ctx,
                Some(ctx.empire_id),
                &GameEvent::ProficiencyRaised { empire_id: ctx.empire_id, proficiency, points },
            )?;
            Ok(EmpireChange::spent(cur.empire, 0))
        })
    }

    pub fn bank_deposit(&mut self, ctx: &RequestContext, amount: Credits) -> GameResult<EmpireChange> {
        let config = &self.config;
        self.store.atomically(|tx| {
            let mut cur = load_current(tx, ctx, ctx.empire_id, config)?;
            bank::deposit(&mut cur.empire, amount, config)?;
            tx.save_empire(&cur.empire, cur.stamp)?;
            emit(
                tx,
                ctx,
                Some(ctx.empire_id),
                &GameEvent::BankDeposit { empire_id: ctx.empire_id, amount },
            )?;
            Ok(EmpireChange::spent(cur.empire, amount))
        })
    }

    pub fn bank_withdraw(&mut self, ctx: &RequestContext, amount: Credits) -> GameResult<EmpireChange> {
        let config = &self.config;
        self.store.atomically(|tx| {
            let mut cur = load_current(tx, ctx, ctx.empire_id, config)?;
            bank::withdraw(&mut cur.empire, amount, config)?;
            tx.save_empire(&cur.empire, cur.stamp)?;
            emit(
                tx,
                ctx,
                Some(ctx.empire_id),
                &GameEvent::BankWithdrawal { empire_id: ctx.empire_id, amount },
            )?;
            Ok(EmpireChange::received(cur.empire, amount, 0))
        })
    }

    // ── Conflict ───────────────────────────────────────────────────

    /// Resolve a battle and persist both sides, the battle log row, any
    /// war score and the events in one transaction.
    pub fn attack(&mut self, ctx: &RequestContext, target: EmpireId, turns: u32) -> GameResult<BattleReport> {
        if target == ctx.empire_id {
            return Err(GameError::SelfAttack);
        }
        let config = &self.config;
        let report = self.store.atomically(|tx| {
            let mut attacker = load_current(tx, ctx, ctx.empire_id, config)?;
            let mut defender = load_current(tx, ctx, target, config)?;
            let treaty = alliances_at_peace(tx, &attacker.empire, &defender.empire, ctx.now)?;
            validate_attack(&attacker.empire, &defender.empire, turns, treaty, config)?;

            let battle = resolve_battle(
                &attacker.empire,
                &defender.empire,
                turns,
                &attacker.bonus,
                &defender.bonus,
                config,
            );

            let a = &mut attacker.empire;
            let d = &mut defender.empire;
            a.attack_turns -= i64::from(turns);
            a.soldiers -= battle.attacker_losses;
            d.guards -= battle.defender_losses;
            d.credits -= battle.credits_stolen;
            d.fortification_hp -= battle.structure_damage;
            let plunder = credit_with_cap(a, battle.credits_stolen, config);
            let attacker_levels = award_xp(a, battle.attacker_xp_gained, config);
            let defender_levels = award_xp(d, battle.defender_xp_gained, config);

            tx.save_empire(a, attacker.stamp)?;
            tx.save_empire(d, defender.stamp)?;
            let battle_id = tx.insert_battle(&battle, ctx.now)?;

            emit(
                tx,
                ctx,
                Some(a.id),
                &GameEvent::BattleResolved {
                    battle_id,
                    attacker_id: a.id,
                    defender_id: d.id,
                    outcome: battle.outcome,
                    credits_stolen: battle.credits_stolen,
                    credits_burned: plunder.burned,
                    structure_damage: battle.structure_damage,
                },
            )?;
            emit_levels(tx, ctx, a, attacker_levels)?;
            emit_levels(tx, ctx, d, defender_levels)?;
            let war = score_war(tx, ctx, &battle, a, d, config)?;

            Ok(BattleReport {
                battle_id,
                encounter: battle,
                credits_burned: plunder.burned,
                attacker_levels_gained: attacker_levels,
                defender_levels_gained: defender_levels,
                war,
            })
        })?;

        log::info!(
            "empire={} attack: battle={} vs empire={} with {turns} turns, {} ({:.0} vs {:.0}), stole {}",
            ctx.empire_id,
            report.battle_id,
            target,
            report.encounter.outcome.as_str(),
            report.encounter.attacker_power,
            report.encounter.defender_power,
            report.encounter.credits_stolen
        );
        Ok(report)
    }

    pub fn spy(&mut self, ctx: &RequestContext, target: EmpireId, mission: SpyMission) -> GameResult<SpyOutcome> {
        if target == ctx.empire_id {
            return Err(GameError::SelfAttack);
        }
        let config = &self.config;
        let rng_bank = self.rng_bank;
        let outcome = self.store.atomically(|tx| {
            let mut attacker = load_current(tx, ctx, ctx.empire_id, config)?;
            let mut defender = load_current(tx, ctx, target, config)?;
            let treaty = alliances_at_peace(tx, &attacker.empire, &defender.empire, ctx.now)?;
            validate_mission(&attacker.empire, &defender.empire, treaty, config)?;

            let sequence = tx.next_rng_sequence(RngSlot::Espionage)?;
            let mut rng = rng_bank.for_slot(RngSlot::Espionage, sequence);
            let report = resolve_mission(&attacker.empire, &defender.empire, mission, &mut rng, config);

            let a = &mut attacker.empire;
            let d = &mut defender.empire;
            a.attack_turns -= config.espionage.turn_cost;
            a.spies -= report.spies_lost;
            match &report.effect {
                SpyEffect::FortificationDamage { hp } => d.fortification_hp -= hp,
                SpyEffect::WorkersEliminated { workers } => d.workers -= workers,
                SpyEffect::Intel { .. } | SpyEffect::None => {}
            }
            let levels = award_xp(a, report.xp_gained, config);

            tx.save_empire(a, attacker.stamp)?;
            tx.save_empire(d, defender.stamp)?;
            let report_id = tx.insert_spy_report(&report, ctx.now)?;
            emit(
                tx,
                ctx,
                Some(a.id),
                &GameEvent::SpyMissionResolved {
                    report_id,
                    attacker_id: a.id,
                    defender_id: d.id,
                    mission,
                    success: report.success,
                },
            )?;
            emit_levels(tx, ctx, a, levels)?;
            Ok(SpyOutcome { report_id, report })
        })?;

        log::info!(
            "empire={} espionage: {} vs empire={} {} (chance {:.2})",
            ctx.empire_id,
            mission.as_str(),
            target,
            if outcome.report.success { "succeeded" } else { "failed" },
            outcome.report.success_chance
        );
        Ok(outcome)
    }

    // ── Alliance ───────────────────────────────────────────────────

    pub fn found_alliance(&mut self, ctx: &RequestContext, name: &str, tag: &str) -> GameResult<Alliance> {
        let name = validate_name(name, MAX_NAME_LEN)?;
        let tag = validate_name(tag, MAX_TAG_LEN)?;
        let config = &self.config;
        let alliance = self.store.atomically(|tx| {
            let mut cur = load_current(tx, ctx, ctx.empire_id, config)?;
            if cur.empire.alliance_id.is_some() {
                return Err(GameError::AlreadyInAlliance(ctx.empire_id));
            }
            if tx.alliance_name_taken(&name, &tag)? {
                return Err(GameError::NameTaken(format!("{name} [{tag}]")));
            }
            let alliance_id = tx.insert_alliance(&name, &tag, ctx.empire_id, ctx.now)?;
            cur.empire.alliance_id = Some(alliance_id);
            cur.empire.alliance_role = Some(AllianceRole::Leader);
            tx.save_empire(&cur.empire, cur.stamp)?;
            emit(
                tx,
                ctx,
                Some(ctx.empire_id),
                &GameEvent::AllianceFounded { alliance_id, leader_id: ctx.empire_id, name: name.clone() },
            )?;
            tx.load_alliance(alliance_id)
        })?;
        log::info!("alliance={} founded: '{}' [{}] led by empire={}", alliance.id, alliance.name, alliance.tag, ctx.empire_id);
        Ok(alliance)
    }

    /// Join an alliance. Joining one with no members makes the joiner its leader.
    pub fn join_alliance(&mut self, ctx: &RequestContext, alliance_id: AllianceId) -> GameResult<Empire> {
        let config = &self.config;
        self.store.atomically(|tx| {
            let mut cur = load_current(tx, ctx, ctx.empire_id, config)?;
            if cur.empire.alliance_id.is_some() {
                return Err(GameError::AlreadyInAlliance(ctx.empire_id));
            }
            tx.load_alliance(alliance_id)?;
            let role = if tx.member_count(alliance_id)? == 0 {
                tx.set_alliance_leader(alliance_id, ctx.empire_id)?;
                AllianceRole::Leader
            } else {
                AllianceRole::Member
            };
            cur.empire.alliance_id = Some(alliance_id);
            cur.empire.alliance_role = Some(role);
            tx.save_empire(&cur.empire, cur.stamp)?;
            emit(
                tx,
                ctx,
                Some(ctx.empire_id),
                &GameEvent::AllianceJoined { alliance_id, empire_id: ctx.empire_id },
            )?;
            log::info!("alliance={alliance_id} membership: empire={} joined as {}", ctx.empire_id, role.as_str());
            Ok(cur.empire)
        })
    }

    /// Leave the current alliance. A leader must hand over leadership
    /// first unless they are the last member.
    pub fn leave_alliance(&mut self, ctx: &RequestContext) -> GameResult<Empire> {
        let config = &self.config;
        self.store.atomically(|tx| {
            let mut cur = load_current(tx, ctx, ctx.empire_id, config)?;
            let alliance_id = cur.empire.alliance_id.ok_or(GameError::NotAllianceMember(ctx.empire_id))?;
            if cur.empire.alliance_role == Some(AllianceRole::Leader) && tx.member_count(alliance_id)? > 1 {
                return Err(GameError::PermissionDenied("leader must transfer leadership before leaving"));
            }
            cur.empire.alliance_id = None;
            cur.empire.alliance_role = None;
            tx.save_empire(&cur.empire, cur.stamp)?;
            emit(
                tx,
                ctx,
                Some(ctx.empire_id),
                &GameEvent::AllianceLeft { alliance_id, empire_id: ctx.empire_id },
            )?;
            log::info!("alliance={alliance_id} membership: empire={} left", ctx.empire_id);
            Ok(cur.empire)
        })
    }

    /// Leader only. Granting `Leader` transfers leadership and demotes
    /// the acting leader to officer.
    pub fn set_member_role(
        &mut self,
        ctx: &RequestContext,
        member: EmpireId,
        role: AllianceRole,
    ) -> GameResult<Empire> {
        if member == ctx.empire_id {
            return Err(GameError::PermissionDenied("leader cannot change their own role"));
        }
        let config = &self.config;
        self.store.atomically(|tx| {
            let mut leader = load_current(tx, ctx, ctx.empire_id, config)?;
            let alliance_id = require_leader(&leader.empire)?;
            let mut target = load_current(tx, ctx, member, config)?;
            if target.empire.alliance_id != Some(alliance_id) {
                return Err(GameError::NotAllianceMember(member));
            }

            target.empire.alliance_role = Some(role);
            if role == AllianceRole::Leader {
                leader.empire.alliance_role = Some(AllianceRole::Officer);
                tx.set_alliance_leader(alliance_id, member)?;
                emit(
                    tx,
                    ctx,
                    Some(ctx.empire_id),
                    &GameEvent::AllianceRoleChanged {
                        alliance_id,
                        empire_id: ctx.empire_id,
                        role: AllianceRole::Officer.as_str().to_string(),
                    },
                )?;
            }
            tx.save_empire(&leader.empire, leader.stamp)?;
            tx.save_empire(&target.empire, target.stamp)?;
            emit(
                tx,
                ctx,
                Some(member),
                &GameEvent::AllianceRoleChanged {
                    alliance_id,
                    empire_id: member,
                    role: role.as_str().to_string(),
                },
            )?;
            log::info!("alliance={alliance_id} roles: empire={member} is now {}", role.as_str());
            Ok(target.empire)
        })
    }

    pub fn alliance_deposit(&mut self, ctx: &RequestContext, amount: Credits) -> GameResult<EmpireChange> {
        let config = &self.config;
        self.store.atomically(|tx| {
            let mut cur = load_current(tx, ctx, ctx.empire_id, config)?;
            let alliance_id = cur.empire.alliance_id.ok_or(GameError::NotAllianceMember(ctx.empire_id))?;
            if amount <= 0 {
                return Err(GameError::InvalidAmount(amount));
            }
            if amount > cur.empire.credits {
                return Err(GameError::InsufficientCredits { needed: amount, available: cur.empire.credits });
            }

            cur.empire.credits -= amount;
            tx.save_empire(&cur.empire, cur.stamp)?;
            tx.adjust_alliance_bank(alliance_id, amount)?;
            tx.insert_bank_log(&AllianceBankTransaction {
                id: None,
                alliance_id,
                empire_id: ctx.empire_id,
                kind: BankTransactionKind::Deposit,
                amount,
                description: format!("Deposit from {}", cur.empire.name),
                created_at: ctx.now,
            })?;
            emit(
                tx,
                ctx,
                Some(ctx.empire_id),
                &GameEvent::AllianceDeposit { alliance_id, empire_id: ctx.empire_id, amount },
            )?;
            Ok(EmpireChange::spent(cur.empire, amount))
        })
    }

    /// Leader or officer only. Refused if the withdrawal would overflow
    /// the member's vault.
    pub fn alliance_withdraw(&mut self, ctx: &RequestContext, amount: Credits) -> GameResult<EmpireChange> {
        let config = &self.config;
        self.store.atomically(|tx| {
            let mut cur = load_current(tx, ctx, ctx.empire_id, config)?;
            let alliance_id = require_treasury_role(&cur.empire)?;
            if amount <= 0 {
                return Err(GameError::InvalidAmount(amount));
            }
            let alliance = tx.load_alliance(alliance_id)?;
            if amount > alliance.bank_credits {
                return Err(GameError::InsufficientBankCredits {
                    needed: amount,
                    available: alliance.bank_credits,
                });
            }
            let headroom = vault_headroom(&cur.empire, config);
            if amount > headroom {
                return Err(GameError::VaultFull { amount, headroom });
            }

            cur.empire.credits += amount;
            tx.save_empire(&cur.empire, cur.stamp)?;
            tx.adjust_alliance_bank(alliance_id, -amount)?;
            tx.insert_bank_log(&AllianceBankTransaction {
                id: None,
                alliance_id,
                empire_id: ctx.empire_id,
                kind: BankTransactionKind::Withdrawal,
                amount,
                description: format!("Withdrawal by {}", cur.empire.name),
                created_at: ctx.now,
            })?;
            emit(
                tx,
                ctx,
                Some(ctx.empire_id),
                &GameEvent::AllianceWithdrawal { alliance_id, empire_id: ctx.empire_id, amount },
            )?;
            Ok(EmpireChange::received(cur.empire, amount, 0))
        })
    }

    /// Buy the next tier of an alliance structure from the alliance bank.
    /// Every check runs under the transaction's write lock; a concurrent
    /// purchase of the same key sees it owned and fails.
    pub fn purchase_structure(&mut self, ctx: &RequestContext, key: &str) -> GameResult<StructurePurchase> {
        let config = &self.config;
        let purchase = self.store.atomically(|tx| {
            let cur = load_current(tx, ctx, ctx.empire_id, config)?;
            let alliance_id = require_treasury_role(&cur.empire)?;
            let alliance = tx.load_alliance(alliance_id)?;
            let owned = tx.owned_structures(alliance_id)?;
            let tier = check_structure_purchase(key, &owned, alliance.bank_credits, config)?;

            tx.save_empire(&cur.empire, cur.stamp)?;
            tx.adjust_alliance_bank(alliance_id, -tier.cost)?;
            tx.insert_structure(alliance_id, &tier.key, ctx.now)?;
            tx.insert_bank_log(&AllianceBankTransaction {
                id: None,
                alliance_id,
                empire_id: ctx.empire_id,
                kind: BankTransactionKind::StructurePurchase,
                amount: tier.cost,
                description: format!("Purchased {}", tier.name),
                created_at: ctx.now,
            })?;
            emit(
                tx,
                ctx,
                Some(ctx.empire_id),
                &GameEvent::StructurePurchased {
                    alliance_id,
                    structure_key: tier.key.clone(),
                    cost: tier.cost,
                },
            )?;
            Ok(StructurePurchase {
                alliance_id,
                key: tier.key.clone(),
                cost: tier.cost,
                bank_credits: alliance.bank_credits - tier.cost,
            })
        })?;
        log::info!(
            "alliance={} treasury: purchased '{}' for {} (bank now {})",
            purchase.alliance_id,
            purchase.key,
            purchase.cost,
            purchase.bank_credits
        );
        Ok(purchase)
    }

    // ── Diplomacy ──────────────────────────────────────────────────

    pub fn declare_war(
        &mut self,
        ctx: &RequestContext,
        target: AllianceId,
        goal_score: Option<i64>,
    ) -> GameResult<War> {
        let config = &self.config;
        let war = self.store.atomically(|tx| {
            let cur = load_current(tx, ctx, ctx.empire_id, config)?;
            let own = require_leader(&cur.empire)?;
            if target == own {
                return Err(GameError::SameAlliance);
            }
            tx.load_alliance(target)?;
            if tx.active_treaty_between(own, target, ctx.now)? {
                return Err(GameError::TreatyProtected);
            }
            if tx.active_war_between(own, target)?.is_some() {
                return Err(GameError::AlreadyAtWar(own, target));
            }
            let goal = goal_score.unwrap_or(config.diplomacy.default_war_goal);
            if goal <= 0 {
                return Err(GameError::InvalidAmount(goal));
            }

            tx.save_empire(&cur.empire, cur.stamp)?;
            let war = tx.insert_war(own, target, goal, ctx.now)?;
            emit(
                tx,
                ctx,
                Some(ctx.empire_id),
                &GameEvent::WarDeclared {
                    war_id: war.id,
                    aggressor_id: own,
                    defender_id: target,
                    goal_score: goal,
                },
            )?;
            Ok(war)
        })?;
        log::info!(
            "war={} declared: alliance={} vs alliance={}, goal {}",
            war.id,
            war.aggressor_id,
            war.defender_id,
            war.goal_score
        );
        Ok(war)
    }

    pub fn propose_treaty(&mut self, ctx: &RequestContext, target: AllianceId) -> GameResult<Treaty> {
        let config = &self.config;
        self.store.atomically(|tx| {
            let cur = load_current(tx, ctx, ctx.empire_id, config)?;
            let own = require_leader(&cur.empire)?;
            if target == own {
                return Err(GameError::SameAlliance);
            }
            tx.load_alliance(target)?;
            if let Some(existing) = tx.treaty_between(own, target)? {
                if existing.status == TreatyStatus::Proposed || existing.is_active_at(ctx.now) {
                    return Err(GameError::TreatyExists(own, target));
                }
            }

            tx.save_empire(&cur.empire, cur.stamp)?;
            let treaty = tx.insert_treaty(own, target, ctx.now)?;
            emit(
                tx,
                ctx,
                Some(ctx.empire_id),
                &GameEvent::TreatyProposed { treaty_id: treaty.id, proposer_id: own, target_id: target },
            )?;
            Ok(treaty)
        })
    }

    /// The target alliance's leader accepts. Any active war between the
    /// two ends without a winner.
    pub fn accept_treaty(&mut self, ctx: &RequestContext, treaty_id: i64) -> GameResult<Treaty> {
        let config = &self.config;
        let treaty = self.store.atomically(|tx| {
            let cur = load_current(tx, ctx, ctx.empire_id, config)?;
            let own = require_leader(&cur.empire)?;
            let mut treaty = tx.load_treaty(treaty_id)?;
            if treaty.status != TreatyStatus::Proposed || treaty.target_id != own {
                return Err(GameError::TreatyNotFound(treaty_id));
            }

            let expires_at = ctx.now + config.diplomacy.treaty_duration_hours * 3600;
            treaty.status = TreatyStatus::Active;
            treaty.expires_at = Some(expires_at);
            tx.save_empire(&cur.empire, cur.stamp)?;
            tx.save_treaty(&treaty)?;
            emit(
                tx,
                ctx,
                Some(ctx.empire_id),
                &GameEvent::TreatyAccepted { treaty_id, expires_at },
            )?;

            if let Some(mut war) = tx.active_war_between(treaty.proposer_id, treaty.target_id)? {
                war.end_in_peace(ctx.now);
                tx.save_war(&war)?;
                emit(
                    tx,
                    ctx,
                    Some(ctx.empire_id),
                    &GameEvent::WarConcluded { war_id: war.id, winner_id: None },
                )?;
                log::info!("war={} concluded: peace signed", war.id);
            }
            Ok(treaty)
        })?;
        log::info!(
            "treaty={} active: alliance={} and alliance={} until {}",
            treaty.id,
            treaty.proposer_id,
            treaty.target_id,
            treaty.expires_at.unwrap_or_default()
        );
        Ok(treaty)
    }

    /// Either party's leader may cancel a proposed or active treaty.
    pub fn cancel_treaty(&mut self, ctx: &RequestContext, treaty_id: i64) -> GameResult<Treaty> {
        let config = &self.config;
        self.store.atomically(|tx| {
            let cur = load_current(tx, ctx, ctx.empire_id, config)?;
            let own = require_leader(&cur.empire)?;
            let mut treaty = tx.load_treaty(treaty_id)?;
            if !treaty.involves(own) || treaty.status == TreatyStatus::Cancelled {
                return Err(GameError::TreatyNotFound(treaty_id));
            }
            treaty.status = TreatyStatus::Cancelled;
            tx.save_empire(&cur.empire, cur.stamp)?;
            tx.save_treaty(&treaty)?;
            emit(tx, ctx, Some(ctx.empire_id), &GameEvent::TreatyCancelled { treaty_id })?;
            Ok(treaty)
        })
    }

    // ── Black market ───────────────────────────────────────────────

    pub fn play_black_market(
        &mut self,
        ctx: &RequestContext,
        game_id: &str,
        stake: Credits,
    ) -> GameResult<BlackMarketOutcome> {
        let config = &self.config;
        let rng_bank = self.rng_bank;
        let outcome = self.store.atomically(|tx| {
            let mut cur = load_current(tx, ctx, ctx.empire_id, config)?;
            let sequence = tx.next_rng_sequence(RngSlot::BlackMarket)?;
            let mut rng = rng_bank.for_slot(RngSlot::BlackMarket, sequence);
            let play = black_market::play(&mut cur.empire, game_id, stake, &mut rng, config)?;

            tx.save_empire(&cur.empire, cur.stamp)?;
            let play_id = tx.insert_play(&play, ctx.now)?;
            emit(
                tx,
                ctx,
                Some(ctx.empire_id),
                &GameEvent::BlackMarketPlayed {
                    play_id,
                    empire_id: ctx.empire_id,
                    game_id: play.game_id.clone(),
                    stake,
                    payout: play.payout,
                },
            )?;
            Ok(BlackMarketOutcome { play_id, play })
        })?;
        log::debug!(
            "empire={} black market: {} roll {} x{} on {} -> {}",
            ctx.empire_id,
            outcome.play.game_id,
            outcome.play.roll,
            outcome.play.multiplier,
            stake,
            outcome.play.payout
        );
        Ok(outcome)
    }

    // ── Dispatch ───────────────────────────────────────────────────

    /// Run one player command. Rejections are logged and returned.
    pub fn execute(&mut self, ctx: &RequestContext, command: PlayerCommand) -> GameResult<CommandOutcome> {
        let name = command.type_name();
        let result = self.dispatch(ctx, command);
        if let Err(e) = &result {
            if e.is_validation() {
                log::warn!("empire={} command={name} rejected: {e}", ctx.empire_id);
            } else {
                log::error!("empire={} command={name} failed: {e}", ctx.empire_id);
            }
        }
        result
    }

    fn dispatch(&mut self, ctx: &RequestContext, command: PlayerCommand) -> GameResult<CommandOutcome> {
        use CommandOutcome as Out;
        use PlayerCommand as Cmd;

        Ok(match command {
            Cmd::Sync => Out::Synced { accrual: self.sync_empire(ctx)? },
            Cmd::Train { unit, quantity } => Out::Empire { change: self.train(ctx, unit, quantity)? },
            Cmd::Disband { unit, quantity } => Out::Empire { change: self.disband(ctx, unit, quantity)? },
            Cmd::UpgradeVault => Out::Empire { change: self.upgrade_vault(ctx)? },
            Cmd::UpgradeArmory { track } => Out::Empire { change: self.upgrade_armory(ctx, track)? },
            Cmd::RepairFortifications { hp } => Out::Empire { change: self.repair_fortifications(ctx, hp)? },
            Cmd::SpendProficiency { proficiency, points } => Out::Empire {
                change: self.spend_proficiency(ctx, proficiency, points)?,
            },
            Cmd::BankDeposit { amount } => Out::Empire { change: self.bank_deposit(ctx, amount)? },
            Cmd::BankWithdraw { amount } => Out::Empire { change: self.bank_withdraw(ctx, amount)? },
            Cmd::Attack { target, turns } => Out::Battle { report: self.attack(ctx, target, turns)? },
            Cmd::Spy { target, mission } => Out::Spy { result: self.spy(ctx, target, mission)? },
            Cmd::FoundAlliance { name, tag } => Out::Alliance {
                alliance: self.found_alliance(ctx, &name, &tag)?,
            },
            Cmd::JoinAlliance { alliance } => Out::Member { empire: self.join_alliance(ctx, alliance)? },
            Cmd::LeaveAlliance => Out::Member { empire: self.leave_alliance(ctx)? },
            Cmd::SetMemberRole { member, role } => Out::Member {
                empire: self.set_member_role(ctx, member, role)?,
            },
            Cmd::AllianceDeposit { amount } => Out::Empire { change: self.alliance_deposit(ctx, amount)? },
            Cmd::AllianceWithdraw { amount } => Out::Empire { change: self.alliance_withdraw(ctx, amount)? },
            Cmd::PurchaseStructure { key } => Out::Structure { purchase: self.purchase_structure(ctx, &key)? },
            Cmd::DeclareWar { target, goal_score } => Out::War { war: self.declare_war(ctx, target, goal_score)? },
            Cmd::ProposeTreaty { target } => Out::Treaty { treaty: self.propose_treaty(ctx, target)? },
            Cmd::AcceptTreaty { treaty } => Out::Treaty { treaty: self.accept_treaty(ctx, treaty)? },
            Cmd::CancelTreaty { treaty } => Out::Treaty { treaty: self.cancel_treaty(ctx, treaty)? },
            Cmd::PlayBlackMarket { game, stake } => Out::BlackMarket {
                result: self.play_black_market(ctx, &game, stake)?,
            },
        })
    }
}

// ── Transaction helpers ────────────────────────────────────────────

fn emit(
    tx: &StoreTx<'_>,
    ctx: &RequestContext,
    empire_id: Option<EmpireId>,
    event: &GameEvent,
) -> GameResult<()> {
    tx.append_event(&EventLogEntry {
        id:         None,
        request_id: ctx.request_id.clone(),
        empire_id,
        event_type: event.type_name().to_string(),
        payload:    serde_json::to_string(event)?,
        created_at: ctx.now,
    })
}

fn emit_levels(tx: &StoreTx<'_>, ctx: &RequestContext, empire: &Empire, gained: i64) -> GameResult<()> {
    if gained > 0 {
        emit(
            tx,
            ctx,
            Some(empire.id),
            &GameEvent::LevelGained { empire_id: empire.id, level: empire.level },
        )?;
    }
    Ok(())
}

fn alliance_bonus(tx: &StoreTx<'_>, empire: &Empire, config: &GameConfig) -> GameResult<StructureBonus> {
    match empire.alliance_id {
        Some(alliance_id) => Ok(structure_bonus(&tx.owned_structures(alliance_id)?, config)),
        None => Ok(StructureBonus::default()),
    }
}

/// Load an empire and apply offline accrual. Logs the accrual event when
/// at least one turn applied; the caller must save the empire.
fn accrue_in_tx(
    tx: &StoreTx<'_>,
    ctx: &RequestContext,
    empire_id: EmpireId,
    config: &GameConfig,
) -> GameResult<(Current, Accrual)> {
    let stored = tx.load_empire(empire_id)?;
    let bonus = alliance_bonus(tx, &stored, config)?;
    let accrual = accrue(&stored, ctx.now, config, &bonus);
    if !accrual.is_noop() {
        emit(
            tx,
            ctx,
            Some(empire_id),
            &GameEvent::TurnsAccrued {
                empire_id,
                turns: accrual.turns_applied,
                credits_gained: accrual.credits_gained,
                credits_burned: accrual.credits_burned,
                attack_turns_gained: accrual.attack_turns_gained,
                citizens_gained: accrual.citizens_gained,
            },
        )?;
    }
    let current = Current {
        empire: accrual.empire.clone(),
        stamp: stored.last_updated_at,
        bonus,
    };
    Ok((current, accrual))
}

fn load_current(
    tx: &StoreTx<'_>,
    ctx: &RequestContext,
    empire_id: EmpireId,
    config: &GameConfig,
) -> GameResult<Current> {
    accrue_in_tx(tx, ctx, empire_id, config).map(|(current, _)| current)
}

/// Whether the two empires' alliances hold a treaty in force at `now`.
fn alliances_at_peace(tx: &StoreTx<'_>, a: &Empire, b: &Empire, now: Timestamp) -> GameResult<bool> {
    match (a.alliance_id, b.alliance_id) {
        (Some(x), Some(y)) if x != y => tx.active_treaty_between(x, y, now),
        _ => Ok(false),
    }
}

/// Credit the battle winner's alliance if the two alliances are at war.
fn score_war(
    tx: &StoreTx<'_>,
    ctx: &RequestContext,
    battle: &BattleEncounter,
    attacker: &Empire,
    defender: &Empire,
    config: &GameConfig,
) -> GameResult<Option<WarUpdate>> {
    let (Some(a), Some(d)) = (attacker.alliance_id, defender.alliance_id) else {
        return Ok(None);
    };
    let Some(mut war) = tx.active_war_between(a, d)? else {
        return Ok(None);
    };

    let (winner, points) = if battle.attacker_won() {
        (a, war_points(battle.credits_stolen, config))
    } else {
        (d, war_points(0, config))
    };
    let concluded = war.award(winner, points, ctx.now);
    tx.save_war(&war)?;
    emit(
        tx,
        ctx,
        Some(attacker.id),
        &GameEvent::WarScoreUpdated { war_id: war.id, alliance_id: winner, points },
    )?;
    if concluded {
        emit(
            tx,
            ctx,
            Some(attacker.id),
            &GameEvent::WarConcluded { war_id: war.id, winner_id: Some(winner) },
        )?;
        log::info!("war={} concluded: alliance={winner} reached {}", war.id, war.goal_score);
    }
    Ok(Some(WarUpdate { war_id: war.id, alliance_id: winner, points, concluded }))
}

fn validate_name(raw: &str, max_len: usize) -> GameResult<String> {
    let name = raw.trim();
    if name.is_empty() || name.chars().count() > max_len {
        return Err(GameError::InvalidName(raw.to_string()));
    }
    Ok(name.to_string())
}
