//! Unit training, disbanding and armory/vault upgrades.
//!
//! All functions mutate an in-memory empire and return what changed; the
//! engine persists the result inside its transaction.

use crate::{
    config::GameConfig,
    economy::{
        apply_fraction, armory_upgrade_cost, basis_points, credit_with_cap, floor_ratio,
        vault_upgrade_cost, BASIS_POINTS,
    },
    empire::{Empire, UnitKind},
    error::{GameError, GameResult},
    types::Credits,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmoryTrack {
    Offense,
    Defense,
}

impl ArmoryTrack {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offense => "offense",
            Self::Defense => "defense",
        }
    }
}

/// Credits to train `quantity` units after the charisma discount.
pub fn training_cost(kind: UnitKind, quantity: i64, charisma: i64, config: &GameConfig) -> Credits {
    let base = config.units.cost(kind).saturating_mul(quantity);
    let discount_bp = charisma.clamp(0, config.progression.proficiency_cap)
        * basis_points(config.progression.bonus_per_point);
    floor_ratio(
        &[i128::from(base), i128::from(BASIS_POINTS - discount_bp)],
        i128::from(BASIS_POINTS),
    )
}

/// Convert untrained citizens into `kind`. Returns credits spent.
pub fn train(empire: &mut Empire, kind: UnitKind, quantity: i64, config: &GameConfig) -> GameResult<Credits> {
    if quantity <= 0 {
        return Err(GameError::InvalidAmount(quantity));
    }
    if empire.untrained_citizens < quantity {
        return Err(GameError::InsufficientCitizens {
            needed: quantity,
            available: empire.untrained_citizens,
        });
    }
    let cost = training_cost(kind, quantity, empire.charisma, config);
    if empire.credits < cost {
        return Err(GameError::InsufficientCredits { needed: cost, available: empire.credits });
    }

    empire.credits -= cost;
    empire.untrained_citizens -= quantity;
    *empire.units_mut(kind) += quantity;
    Ok(cost)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisbandResult {
    pub refunded: Credits,
    pub burned:   Credits,
}

/// Return `quantity` units of `kind` to the citizen pool with a partial refund.
pub fn disband(empire: &mut Empire, kind: UnitKind, quantity: i64, config: &GameConfig) -> GameResult<DisbandResult> {
    if quantity <= 0 {
        return Err(GameError::InvalidAmount(quantity));
    }
    let have = empire.units(kind);
    if have < quantity {
        return Err(GameError::InsufficientUnits {
            unit: kind.as_str(),
            needed: quantity,
            available: have,
        });
    }
    let refund = apply_fraction(
        config.units.cost(kind).saturating_mul(quantity),
        config.units.disband_refund_fraction,
    );

    *empire.units_mut(kind) -= quantity;
    empire.untrained_citizens += quantity;
    let capped = credit_with_cap(empire, refund, config);
    Ok(DisbandResult { refunded: capped.credited, burned: capped.burned })
}

/// Raise the vault by one level. Returns credits spent.
pub fn upgrade_vault(empire: &mut Empire, config: &GameConfig) -> GameResult<Credits> {
    if empire.vault_level >= config.economy.max_vault_level {
        return Err(GameError::UpgradeMaxed { track: "vault", max: config.economy.max_vault_level });
    }
    let cost = vault_upgrade_cost(empire, config);
    if empire.credits < cost {
        return Err(GameError::InsufficientCredits { needed: cost, available: empire.credits });
    }
    empire.credits -= cost;
    empire.vault_level += 1;
    Ok(cost)
}

/// Raise one armory track by one level. Returns credits spent.
pub fn upgrade_armory(empire: &mut Empire, track: ArmoryTrack, config: &GameConfig) -> GameResult<Credits> {
    let level = match track {
        ArmoryTrack::Offense => empire.offense_upgrade_level,
        ArmoryTrack::Defense => empire.defense_upgrade_level,
    };
    if level >= config.armory.max_level {
        return Err(GameError::UpgradeMaxed { track: track.as_str(), max: config.armory.max_level });
    }
    let cost = armory_upgrade_cost(level, config);
    if empire.credits < cost {
        return Err(GameError::InsufficientCredits { needed: cost, available: empire.credits });
    }
    empire.credits -= cost;
    match track {
        ArmoryTrack::Offense => empire.offense_upgrade_level += 1,
        ArmoryTrack::Defense => empire.defense_upgrade_level += 1,
    }
    Ok(cost)
}

/// Restore fortification hit points. Repairs as much of `hp` as the
/// structure is missing. Returns (hp restored, credits spent).
pub fn repair_fortifications(empire: &mut Empire, hp: i64, config: &GameConfig) -> GameResult<(i64, Credits)> {
    if hp <= 0 {
        return Err(GameError::InvalidAmount(hp));
    }
    let missing = (config.economy.max_fortification_hp - empire.fortification_hp).max(0);
    let restored = hp.min(missing);
    let cost = restored * config.economy.repair_cost_per_hp;
    if empire.credits < cost {
        return Err(GameError::InsufficientCredits { needed: cost, available: empire.credits });
    }
    empire.credits -= cost;
    empire.fortification_hp += restored;
    Ok((restored, cost))
}
