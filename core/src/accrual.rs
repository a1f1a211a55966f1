//! Offline turn accrual.
//!
//! A stale empire is brought up to wall-clock time by applying every whole
//! turn since `last_updated_at`. Gains are linear per turn, so applying N
//! turns at once equals applying one turn N times, and a second call with
//! no elapsed time changes nothing.

use crate::{
    clock::whole_turns_since,
    config::{GameConfig, StructureBonus},
    economy::{credit_with_cap, income_per_turn},
    empire::Empire,
    types::{Credits, Timestamp},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accrual {
    pub empire:              Empire,
    pub turns_applied:       i64,
    pub credits_gained:      Credits,
    /// Income that did not fit in the vault.
    pub credits_burned:      Credits,
    pub attack_turns_gained: i64,
    pub citizens_gained:     i64,
}

impl Accrual {
    pub fn is_noop(&self) -> bool {
        self.turns_applied == 0
    }
}

/// Apply every whole turn between `empire.last_updated_at` and `now`.
pub fn accrue(
    empire: &Empire,
    now: Timestamp,
    config: &GameConfig,
    alliance: &StructureBonus,
) -> Accrual {
    let (turns, advanced_to) =
        whole_turns_since(empire.last_updated_at, now, config.turns.interval_secs);

    let mut next = empire.clone();
    if turns == 0 {
        return Accrual {
            empire: next,
            turns_applied: 0,
            credits_gained: 0,
            credits_burned: 0,
            attack_turns_gained: 0,
            citizens_gained: 0,
        };
    }

    let income = income_per_turn(empire, config, alliance).saturating_mul(turns);
    let capped = credit_with_cap(&mut next, income, config);

    let max_turns = config.turns.max_attack_turns;
    if next.attack_turns < max_turns {
        let gained = config.turns.attack_turns_per_turn.saturating_mul(turns);
        next.attack_turns = next.attack_turns.saturating_add(gained).min(max_turns);
    }

    let citizens = (config.turns.citizens_per_turn + alliance.citizens_per_turn).saturating_mul(turns);
    next.untrained_citizens = next.untrained_citizens.saturating_add(citizens);

    next.last_updated_at = advanced_to;

    log::debug!(
        "empire={} accrual: {turns} turns, +{} credits ({} burned), turns {} -> {}",
        empire.id,
        capped.credited,
        capped.burned,
        empire.attack_turns,
        next.attack_turns
    );

    Accrual {
        attack_turns_gained: next.attack_turns - empire.attack_turns,
        citizens_gained: citizens,
        credits_gained: capped.credited,
        credits_burned: capped.burned,
        turns_applied: turns,
        empire: next,
    }
}
