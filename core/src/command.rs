use crate::{
    empire::{AllianceRole, Proficiency, UnitKind},
    espionage::SpyMission,
    training::ArmoryTrack,
    types::{AllianceId, Credits, EmpireId, Timestamp},
};
use serde::{Deserialize, Serialize};

/// Every player-issued action. The acting empire comes from the
/// request context, never from the command body.
/// Variants are only ever appended, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PlayerCommand {
    // ── Empire ────────────────────────────────────
    Sync,
    Train { unit: UnitKind, quantity: i64 },
    Disband { unit: UnitKind, quantity: i64 },
    UpgradeVault,
    UpgradeArmory { track: ArmoryTrack },
    RepairFortifications { hp: i64 },
    SpendProficiency { proficiency: Proficiency, points: i64 },
    BankDeposit { amount: Credits },
    BankWithdraw { amount: Credits },

    // ── Conflict ──────────────────────────────────
    Attack { target: EmpireId, turns: u32 },
    Spy { target: EmpireId, mission: SpyMission },

    // ── Alliance ──────────────────────────────────
    FoundAlliance { name: String, tag: String },
    JoinAlliance { alliance: AllianceId },
    LeaveAlliance,
    SetMemberRole { member: EmpireId, role: AllianceRole },
    AllianceDeposit { amount: Credits },
    AllianceWithdraw { amount: Credits },
    PurchaseStructure { key: String },

    // ── Diplomacy ─────────────────────────────────
    DeclareWar { target: AllianceId, goal_score: Option<i64> },
    ProposeTreaty { target: AllianceId },
    AcceptTreaty { treaty: i64 },
    CancelTreaty { treaty: i64 },

    // ── Black market ──────────────────────────────
    PlayBlackMarket { game: String, stake: Credits },
}

impl PlayerCommand {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Sync                      => "sync",
            Self::Train { .. }              => "train",
            Self::Disband { .. }            => "disband",
            Self::UpgradeVault              => "upgrade_vault",
            Self::UpgradeArmory { .. }      => "upgrade_armory",
            Self::RepairFortifications { .. } => "repair_fortifications",
            Self::SpendProficiency { .. }   => "spend_proficiency",
            Self::BankDeposit { .. }        => "bank_deposit",
            Self::BankWithdraw { .. }       => "bank_withdraw",
            Self::Attack { .. }             => "attack",
            Self::Spy { .. }                => "spy",
            Self::FoundAlliance { .. }      => "found_alliance",
            Self::JoinAlliance { .. }       => "join_alliance",
            Self::LeaveAlliance             => "leave_alliance",
            Self::SetMemberRole { .. }      => "set_member_role",
            Self::AllianceDeposit { .. }    => "alliance_deposit",
            Self::AllianceWithdraw { .. }   => "alliance_withdraw",
            Self::PurchaseStructure { .. }  => "purchase_structure",
            Self::DeclareWar { .. }         => "declare_war",
            Self::ProposeTreaty { .. }      => "propose_treaty",
            Self::AcceptTreaty { .. }       => "accept_treaty",
            Self::CancelTreaty { .. }       => "cancel_treaty",
            Self::PlayBlackMarket { .. }    => "play_black_market",
        }
    }
}

/// Who is acting and when. Replaces ambient session state: every
/// handler receives it explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    pub request_id: String,
    pub empire_id:  EmpireId,
    pub now:        Timestamp,
}

impl RequestContext {
    pub fn new(empire_id: EmpireId, now: Timestamp) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            empire_id,
            now,
        }
    }
}
