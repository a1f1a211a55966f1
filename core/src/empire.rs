//! The empire record: one per player.

use crate::{
    config::GameConfig,
    types::{AllianceId, Credits, EmpireId, Timestamp},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empire {
    pub id:                    EmpireId,
    pub name:                  String,
    pub alliance_id:           Option<AllianceId>,
    pub alliance_role:         Option<AllianceRole>,

    /// On-hand credits, capped by vault capacity.
    pub credits:               Credits,
    /// Banked credits, uncapped and out of reach of plunder.
    pub banked_credits:        Credits,

    pub untrained_citizens:    i64,
    pub workers:               i64,
    pub soldiers:              i64,
    pub guards:                i64,
    pub sentries:              i64,
    pub spies:                 i64,

    pub strength:              i64,
    pub constitution:          i64,
    pub wealth:                i64,
    pub charisma:              i64,
    pub proficiency_points:    i64,

    pub level:                 i64,
    pub experience:            i64,
    pub attack_turns:          i64,

    pub vault_level:           u32,
    pub offense_upgrade_level: u32,
    pub defense_upgrade_level: u32,
    pub fortification_hp:      i64,

    pub last_updated_at:       Timestamp,
}

impl Empire {
    /// A freshly founded empire with the configured starting resources.
    /// `id` is assigned by the store on insert; pass 0 before then.
    pub fn founding(id: EmpireId, name: &str, config: &GameConfig, now: Timestamp) -> Self {
        let start = &config.starting_empire;
        Self {
            id,
            name: name.to_string(),
            alliance_id: None,
            alliance_role: None,
            credits: start.credits,
            banked_credits: 0,
            untrained_citizens: start.untrained_citizens,
            workers: start.workers,
            soldiers: start.soldiers,
            guards: start.guards,
            sentries: 0,
            spies: 0,
            strength: 0,
            constitution: 0,
            wealth: 0,
            charisma: 0,
            proficiency_points: 0,
            level: 1,
            experience: 0,
            attack_turns: start.attack_turns,
            vault_level: 1,
            offense_upgrade_level: 0,
            defense_upgrade_level: 0,
            fortification_hp: config.economy.max_fortification_hp,
            last_updated_at: now,
        }
    }

    pub fn units(&self, kind: UnitKind) -> i64 {
        match kind {
            UnitKind::Worker  => self.workers,
            UnitKind::Soldier => self.soldiers,
            UnitKind::Guard   => self.guards,
            UnitKind::Sentry  => self.sentries,
            UnitKind::Spy     => self.spies,
        }
    }

    pub fn units_mut(&mut self, kind: UnitKind) -> &mut i64 {
        match kind {
            UnitKind::Worker  => &mut self.workers,
            UnitKind::Soldier => &mut self.soldiers,
            UnitKind::Guard   => &mut self.guards,
            UnitKind::Sentry  => &mut self.sentries,
            UnitKind::Spy     => &mut self.spies,
        }
    }

    pub fn proficiency(&self, p: Proficiency) -> i64 {
        match p {
            Proficiency::Strength     => self.strength,
            Proficiency::Constitution => self.constitution,
            Proficiency::Wealth       => self.wealth,
            Proficiency::Charisma     => self.charisma,
        }
    }

    pub fn proficiency_mut(&mut self, p: Proficiency) -> &mut i64 {
        match p {
            Proficiency::Strength     => &mut self.strength,
            Proficiency::Constitution => &mut self.constitution,
            Proficiency::Wealth       => &mut self.wealth,
            Proficiency::Charisma     => &mut self.charisma,
        }
    }

    pub fn shares_alliance_with(&self, other: &Empire) -> bool {
        matches!((self.alliance_id, other.alliance_id), (Some(a), Some(b)) if a == b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Worker,
    Soldier,
    Guard,
    Sentry,
    Spy,
}

impl UnitKind {
    pub const ALL: [UnitKind; 5] = [
        UnitKind::Worker,
        UnitKind::Soldier,
        UnitKind::Guard,
        UnitKind::Sentry,
        UnitKind::Spy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Worker  => "workers",
            Self::Soldier => "soldiers",
            Self::Guard   => "guards",
            Self::Sentry  => "sentries",
            Self::Spy     => "spies",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Proficiency {
    Strength,
    Constitution,
    Wealth,
    Charisma,
}

impl Proficiency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strength     => "strength",
            Self::Constitution => "constitution",
            Self::Wealth       => "wealth",
            Self::Charisma     => "charisma",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllianceRole {
    Leader,
    Officer,
    Member,
}

impl AllianceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leader  => "leader",
            Self::Officer => "officer",
            Self::Member  => "member",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "leader"  => Some(Self::Leader),
            "officer" => Some(Self::Officer),
            "member"  => Some(Self::Member),
            _         => None,
        }
    }

    /// Withdrawals and structure purchases.
    pub fn can_manage_treasury(&self) -> bool {
        matches!(self, Self::Leader | Self::Officer)
    }
}
