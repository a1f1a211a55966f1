//! Ranking formulas.
//!
//! Power score uses base multipliers only (no alliance bonuses), so a
//! player's rank does not jump when an alliance buys a structure.

use crate::{
    combat::{defense_power, offense_power},
    config::{GameConfig, StructureBonus},
    empire::{Empire, UnitKind},
    espionage::{sentry_power, spy_power},
    types::{Credits, EmpireId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    pub rank:        usize,
    pub empire_id:   EmpireId,
    pub name:        String,
    pub level:       i64,
    pub power_score: f64,
    pub net_worth:   Credits,
}

pub fn power_score(empire: &Empire, config: &GameConfig) -> f64 {
    let none = StructureBonus::default();
    offense_power(empire, &none, config)
        + defense_power(empire, &none, config)
        + spy_power(empire, config)
        + sentry_power(empire, config)
}

/// On-hand + banked credits + every trained unit at its training cost.
pub fn net_worth(empire: &Empire, config: &GameConfig) -> Credits {
    let units: Credits = UnitKind::ALL
        .iter()
        .map(|k| empire.units(*k).max(0).saturating_mul(config.units.cost(*k)))
        .sum();
    empire.credits + empire.banked_credits + units
}

/// Sort by power desc, then net worth desc, then id asc. Ranks start at 1.
pub fn rank_empires(empires: &[Empire], config: &GameConfig) -> Vec<RankEntry> {
    let mut entries: Vec<RankEntry> = empires
        .iter()
        .map(|e| RankEntry {
            rank: 0,
            empire_id: e.id,
            name: e.name.clone(),
            level: e.level,
            power_score: power_score(e, config),
            net_worth: net_worth(e, config),
        })
        .collect();

    entries.sort_by(|a, b| {
        b.power_score
            .total_cmp(&a.power_score)
            .then(b.net_worth.cmp(&a.net_worth))
            .then(a.empire_id.cmp(&b.empire_id))
    });
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stronger_empire_ranks_first_and_ties_break_on_id() {
        let config = GameConfig::default();
        let mut a = Empire::founding(3, "A", &config, 0);
        let b = Empire::founding(2, "B", &config, 0);
        let c = Empire::founding(1, "C", &config, 0);
        a.soldiers = 10;

        let ranks = rank_empires(&[b, a, c], &config);
        let order: Vec<EmpireId> = ranks.iter().map(|r| r.empire_id).collect();
        assert_eq!(order, vec![3, 1, 2]);
        assert_eq!(ranks[0].rank, 1);
    }
}
