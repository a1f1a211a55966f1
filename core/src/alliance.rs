//! Alliances, their treasury and their structure tracks.
//!
//! Structure tracks are linear per category: tier N is purchasable only
//! once tier N-1 of the same category is owned. Ownership is append-only.

use crate::{
    config::{GameConfig, StructureBonus, StructureTier},
    empire::{AllianceRole, Empire},
    error::{GameError, GameResult},
    types::{AllianceId, Credits, EmpireId, Timestamp},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alliance {
    pub id:           AllianceId,
    pub name:         String,
    pub tag:          String,
    pub leader_id:    EmpireId,
    pub bank_credits: Credits,
    pub created_at:   Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankTransactionKind {
    Deposit,
    Withdrawal,
    StructurePurchase,
}

impl BankTransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit           => "deposit",
            Self::Withdrawal        => "withdrawal",
            Self::StructurePurchase => "structure_purchase",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deposit"            => Some(Self::Deposit),
            "withdrawal"         => Some(Self::Withdrawal),
            "structure_purchase" => Some(Self::StructurePurchase),
            _                    => None,
        }
    }
}

/// One row of the alliance bank ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllianceBankTransaction {
    pub id:          Option<i64>,
    pub alliance_id: AllianceId,
    pub empire_id:   EmpireId,
    pub kind:        BankTransactionKind,
    pub amount:      Credits,
    pub description: String,
    pub created_at:  Timestamp,
}

/// Sum of bonuses from every owned structure key.
pub fn structure_bonus<'a, I>(owned: I, config: &GameConfig) -> StructureBonus
where
    I: IntoIterator<Item = &'a String>,
{
    owned
        .into_iter()
        .filter_map(|key| config.structures.get(key))
        .fold(StructureBonus::default(), |acc, s| acc.combine(s.bonus))
}

/// The member's alliance id, if their role may move treasury funds.
pub fn require_treasury_role(empire: &Empire) -> GameResult<AllianceId> {
    let alliance_id = empire.alliance_id.ok_or(GameError::NotAllianceMember(empire.id))?;
    match empire.alliance_role {
        Some(role) if role.can_manage_treasury() => Ok(alliance_id),
        _ => Err(GameError::PermissionDenied("treasury requires leader or officer")),
    }
}

pub fn require_leader(empire: &Empire) -> GameResult<AllianceId> {
    let alliance_id = empire.alliance_id.ok_or(GameError::NotAllianceMember(empire.id))?;
    match empire.alliance_role {
        Some(AllianceRole::Leader) => Ok(alliance_id),
        _ => Err(GameError::PermissionDenied("alliance leader only")),
    }
}

/// All three purchase checks: known key, not owned, prerequisite owned,
/// affordable. Performs no mutation.
pub fn check_structure_purchase<'a>(
    key: &str,
    owned: &HashSet<String>,
    bank_credits: Credits,
    config: &'a GameConfig,
) -> GameResult<&'a StructureTier> {
    let tier = config
        .structures
        .get(key)
        .ok_or_else(|| GameError::UnknownStructure(key.to_string()))?;

    if owned.contains(key) {
        return Err(GameError::StructureAlreadyOwned(key.to_string()));
    }
    if let Some(required) = config.structure_prerequisite(key) {
        if !owned.contains(&required.key) {
            return Err(GameError::PrerequisiteMissing {
                key: key.to_string(),
                required: required.key.clone(),
            });
        }
    }
    if bank_credits < tier.cost {
        return Err(GameError::InsufficientBankCredits {
            needed: tier.cost,
            available: bank_credits,
        });
    }
    Ok(tier)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(keys: &[&str]) -> HashSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn tier_two_requires_tier_one() {
        let config = GameConfig::default();
        let err = check_structure_purchase("trade_hub_2", &owned(&[]), i64::MAX, &config).unwrap_err();
        assert!(matches!(err, GameError::PrerequisiteMissing { ref required, .. } if required == "trade_hub_1"));
        assert!(check_structure_purchase("trade_hub_2", &owned(&["trade_hub_1"]), i64::MAX, &config).is_ok());
    }

    #[test]
    fn bonuses_accumulate_across_tracks() {
        let config = GameConfig::default();
        let keys = owned(&["trade_hub_1", "trade_hub_2", "habitat_ring_1"]);
        let bonus = structure_bonus(&keys, &config);
        assert!((bonus.income_pct - 0.10).abs() < 1e-9);
        assert_eq!(bonus.citizens_per_turn, 1);
        assert_eq!(bonus.offense_pct, 0.0);
    }
}
