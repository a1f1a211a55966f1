//! The event log: every committed mutation, in order.
//!
//! RULE: Events are appended in the same transaction as the mutation
//! they describe. A rolled-back request leaves no event behind.

use crate::{
    combat::BattleOutcome,
    empire::{Proficiency, UnitKind},
    espionage::SpyMission,
    training::ArmoryTrack,
    types::{AllianceId, Credits, EmpireId, Timestamp},
};
use serde::{Deserialize, Serialize};

/// Variants are only ever appended, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    // ── World ─────────────────────────────────────
    WorldInitialized {
        seed: u64,
    },
    EmpireFounded {
        empire_id: EmpireId,
        name: String,
    },

    // ── Turns ─────────────────────────────────────
    TurnsAccrued {
        empire_id: EmpireId,
        turns: i64,
        credits_gained: Credits,
        credits_burned: Credits,
        attack_turns_gained: i64,
        citizens_gained: i64,
    },

    // ── Economy ───────────────────────────────────
    UnitsTrained {
        empire_id: EmpireId,
        unit: UnitKind,
        quantity: i64,
        cost: Credits,
    },
    UnitsDisbanded {
        empire_id: EmpireId,
        unit: UnitKind,
        quantity: i64,
        refunded: Credits,
        burned: Credits,
    },
    VaultUpgraded {
        empire_id: EmpireId,
        level: u32,
        cost: Credits,
    },
    ArmoryUpgraded {
        empire_id: EmpireId,
        track: ArmoryTrack,
        level: u32,
        cost: Credits,
    },
    FortificationsRepaired {
        empire_id: EmpireId,
        hp: i64,
        cost: Credits,
    },
    BankDeposit {
        empire_id: EmpireId,
        amount: Credits,
    },
    BankWithdrawal {
        empire_id: EmpireId,
        amount: Credits,
    },
    ProficiencyRaised {
        empire_id: EmpireId,
        proficiency: Proficiency,
        points: i64,
    },
    LevelGained {
        empire_id: EmpireId,
        level: i64,
    },

    // ── Conflict ──────────────────────────────────
    BattleResolved {
        battle_id: i64,
        attacker_id: EmpireId,
        defender_id: EmpireId,
        outcome: BattleOutcome,
        credits_stolen: Credits,
        credits_burned: Credits,
        structure_damage: i64,
    },
    SpyMissionResolved {
        report_id: i64,
        attacker_id: EmpireId,
        defender_id: EmpireId,
        mission: SpyMission,
        success: bool,
    },

    // ── Alliance ──────────────────────────────────
    AllianceFounded {
        alliance_id: AllianceId,
        leader_id: EmpireId,
        name: String,
    },
    AllianceJoined {
        alliance_id: AllianceId,
        empire_id: EmpireId,
    },
    AllianceLeft {
        alliance_id: AllianceId,
        empire_id: EmpireId,
    },
    AllianceRoleChanged {
        alliance_id: AllianceId,
        empire_id: EmpireId,
        role: String,
    },
    AllianceDeposit {
        alliance_id: AllianceId,
        empire_id: EmpireId,
        amount: Credits,
    },
    AllianceWithdrawal {
        alliance_id: AllianceId,
        empire_id: EmpireId,
        amount: Credits,
    },
    StructurePurchased {
        alliance_id: AllianceId,
        structure_key: String,
        cost: Credits,
    },

    // ── Diplomacy ─────────────────────────────────
    WarDeclared {
        war_id: i64,
        aggressor_id: AllianceId,
        defender_id: AllianceId,
        goal_score: i64,
    },
    WarScoreUpdated {
        war_id: i64,
        alliance_id: AllianceId,
        points: i64,
    },
    WarConcluded {
        war_id: i64,
        winner_id: Option<AllianceId>,
    },
    TreatyProposed {
        treaty_id: i64,
        proposer_id: AllianceId,
        target_id: AllianceId,
    },
    TreatyAccepted {
        treaty_id: i64,
        expires_at: Timestamp,
    },
    TreatyCancelled {
        treaty_id: i64,
    },

    // ── Black market ──────────────────────────────
    BlackMarketPlayed {
        play_id: i64,
        empire_id: EmpireId,
        game_id: String,
        stake: Credits,
        payout: Credits,
    },
}

impl GameEvent {
    /// Stable string name, used for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::WorldInitialized { .. }       => "world_initialized",
            Self::EmpireFounded { .. }          => "empire_founded",
            Self::TurnsAccrued { .. }           => "turns_accrued",
            Self::UnitsTrained { .. }           => "units_trained",
            Self::UnitsDisbanded { .. }         => "units_disbanded",
            Self::VaultUpgraded { .. }          => "vault_upgraded",
            Self::ArmoryUpgraded { .. }         => "armory_upgraded",
            Self::FortificationsRepaired { .. } => "fortifications_repaired",
            Self::BankDeposit { .. }            => "bank_deposit",
            Self::BankWithdrawal { .. }         => "bank_withdrawal",
            Self::ProficiencyRaised { .. }      => "proficiency_raised",
            Self::LevelGained { .. }            => "level_gained",
            Self::BattleResolved { .. }         => "battle_resolved",
            Self::SpyMissionResolved { .. }     => "spy_mission_resolved",
            Self::AllianceFounded { .. }        => "alliance_founded",
            Self::AllianceJoined { .. }         => "alliance_joined",
            Self::AllianceLeft { .. }           => "alliance_left",
            Self::AllianceRoleChanged { .. }    => "alliance_role_changed",
            Self::AllianceDeposit { .. }        => "alliance_deposit",
            Self::AllianceWithdrawal { .. }     => "alliance_withdrawal",
            Self::StructurePurchased { .. }     => "structure_purchased",
            Self::WarDeclared { .. }            => "war_declared",
            Self::WarScoreUpdated { .. }        => "war_score_updated",
            Self::WarConcluded { .. }           => "war_concluded",
            Self::TreatyProposed { .. }         => "treaty_proposed",
            Self::TreatyAccepted { .. }         => "treaty_accepted",
            Self::TreatyCancelled { .. }        => "treaty_cancelled",
            Self::BlackMarketPlayed { .. }      => "black_market_played",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub request_id: String,
    pub empire_id:  Option<EmpireId>,
    pub event_type: String,
    pub payload:    String, // JSON-serialized GameEvent
    pub created_at: Timestamp,
}
