//! Frozen views of an empire, as captured at resolution time.
//!
//! Battle and spy logs store these as JSON so a historical report keeps
//! showing what the fight looked like even after both empires change.

use crate::{
    empire::Empire,
    types::{AllianceId, Credits, EmpireId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmpireSnapshot {
    pub empire_id:             EmpireId,
    pub name:                  String,
    pub alliance_id:           Option<AllianceId>,
    pub level:                 i64,
    pub credits:               Credits,
    pub untrained_citizens:    i64,
    pub workers:               i64,
    pub soldiers:              i64,
    pub guards:                i64,
    pub sentries:              i64,
    pub spies:                 i64,
    pub strength:              i64,
    pub constitution:          i64,
    pub offense_upgrade_level: u32,
    pub defense_upgrade_level: u32,
    pub fortification_hp:      i64,
}

impl From<&Empire> for EmpireSnapshot {
    fn from(e: &Empire) -> Self {
        Self {
            empire_id:             e.id,
            name:                  e.name.clone(),
            alliance_id:           e.alliance_id,
            level:                 e.level,
            credits:               e.credits,
            untrained_citizens:    e.untrained_citizens,
            workers:               e.workers,
            soldiers:              e.soldiers,
            guards:                e.guards,
            sentries:              e.sentries,
            spies:                 e.spies,
            strength:              e.strength,
            constitution:          e.constitution,
            offense_upgrade_level: e.offense_upgrade_level,
            defense_upgrade_level: e.defense_upgrade_level,
            fortification_hp:      e.fortification_hp,
        }
    }
}
