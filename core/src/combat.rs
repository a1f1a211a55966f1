//! Battle resolution.
//!
//! Resolution is a pure, deterministic function of two empire snapshots,
//! the attack turns committed, and the alliance bonuses on each side.
//! The store applies the result; nothing here touches persistence.
//!
//! Policy:
//!   - The attacker wins only with strictly greater power. Ties go to
//!     the defender.
//!   - Both sides earn XP for damage dealt, win or lose.
//!   - Plunder and structure damage happen on attacker victory only.
//!   - Only on-hand credits can be plundered; banked credits are safe.

use crate::{
    config::{GameConfig, StructureBonus},
    empire::Empire,
    error::{GameError, GameResult},
    economy::{basis_points, floor_ratio, BASIS_POINTS},
    progression::proficiency_basis_points,
    snapshot::EmpireSnapshot,
    types::Credits,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleOutcome {
    Victory,
    Defeat,
}

impl BattleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Victory => "victory",
            Self::Defeat  => "defeat",
        }
    }
}

/// A resolved battle, from the attacker's perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleEncounter {
    pub attacker:           EmpireSnapshot,
    pub defender:           EmpireSnapshot,
    pub attack_turns:       u32,
    pub attacker_power:     f64,
    pub defender_power:     f64,
    pub outcome:            BattleOutcome,
    pub credits_stolen:     Credits,
    pub attacker_xp_gained: i64,
    pub defender_xp_gained: i64,
    pub structure_damage:   i64,
    pub attacker_losses:    i64,
    pub defender_losses:    i64,
}

impl BattleEncounter {
    pub fn attacker_won(&self) -> bool {
        self.outcome == BattleOutcome::Victory
    }
}

/// Fixed-point scale of combat power: three basis-point factors.
const POWER_SCALE: i128 = 1_000_000_000_000;

/// Equipment multiplier in basis points, from armory levels plus the
/// alliance structure bonus.
pub fn equipment_basis_points(upgrade_level: u32, alliance_pct: f64, config: &GameConfig) -> i64 {
    BASIS_POINTS
        + i64::from(upgrade_level) * basis_points(config.armory.upgrade_step)
        + basis_points(alliance_pct)
}

fn scaled_power(units: i64, per_unit: f64, proficiency: i64, equipment_bp: i64, config: &GameConfig) -> i128 {
    i128::from(units.max(0))
        .saturating_mul(i128::from(basis_points(per_unit)))
        .saturating_mul(i128::from(proficiency_basis_points(proficiency, config)))
        .saturating_mul(i128::from(equipment_bp))
}

fn scaled_offense(empire: &Empire, alliance: &StructureBonus, config: &GameConfig) -> i128 {
    scaled_power(
        empire.soldiers,
        config.units.soldier_attack,
        empire.strength,
        equipment_basis_points(empire.offense_upgrade_level, alliance.offense_pct, config),
        config,
    )
}

fn scaled_defense(empire: &Empire, alliance: &StructureBonus, config: &GameConfig) -> i128 {
    scaled_power(
        empire.guards,
        config.units.guard_defense,
        empire.constitution,
        equipment_basis_points(empire.defense_upgrade_level, alliance.defense_pct, config),
        config,
    )
}

fn unscaled(power: i128) -> f64 {
    power as f64 / POWER_SCALE as f64
}

/// soldiers * attack * (1 + strength bonus) * equipment.
pub fn offense_power(empire: &Empire, alliance: &StructureBonus, config: &GameConfig) -> f64 {
    unscaled(scaled_offense(empire, alliance, config))
}

/// guards * defense * (1 + constitution bonus) * equipment.
pub fn defense_power(empire: &Empire, alliance: &StructureBonus, config: &GameConfig) -> f64 {
    unscaled(scaled_defense(empire, alliance, config))
}

/// Share of the defender's on-hand credits taken on victory, in basis points.
pub fn plunder_basis_points(attack_turns: u32, config: &GameConfig) -> i64 {
    (i64::from(attack_turns) * basis_points(config.combat.plunder_per_turn))
        .clamp(0, basis_points(config.combat.max_plunder_fraction))
}

/// Checks that must pass before resolution. `treaty_active` is whether
/// the two empires' alliances hold an active peace treaty.
pub fn validate_attack(
    attacker: &Empire,
    defender: &Empire,
    attack_turns: u32,
    treaty_active: bool,
    config: &GameConfig,
) -> GameResult<()> {
    if attacker.id == defender.id {
        return Err(GameError::SelfAttack);
    }
    let max = config.combat.max_turns_per_attack;
    if attack_turns == 0 || attack_turns > max {
        return Err(GameError::InvalidAttackTurns { requested: attack_turns, max });
    }
    if attacker.attack_turns < i64::from(attack_turns) {
        return Err(GameError::InsufficientAttackTurns {
            needed: i64::from(attack_turns),
            available: attacker.attack_turns,
        });
    }
    if attacker.shares_alliance_with(defender) {
        return Err(GameError::SameAlliance);
    }
    if treaty_active {
        return Err(GameError::TreatyProtected);
    }
    Ok(())
}

/// Resolve a battle. Callers must run `validate_attack` first.
pub fn resolve_battle(
    attacker: &Empire,
    defender: &Empire,
    attack_turns: u32,
    attacker_bonus: &StructureBonus,
    defender_bonus: &StructureBonus,
    config: &GameConfig,
) -> BattleEncounter {
    let attacker_power = scaled_offense(attacker, attacker_bonus, config);
    let defender_power = scaled_defense(defender, defender_bonus, config);

    let outcome = if attacker_power > defender_power {
        BattleOutcome::Victory
    } else {
        BattleOutcome::Defeat
    };

    // Damage dealt is power * turns / max turns; rates apply on top.
    let turns = i128::from(attack_turns);
    let max_turns = i128::from(config.combat.max_turns_per_attack);
    let bp = i128::from(BASIS_POINTS);
    let dealt = |power: i128, rate: f64| {
        floor_ratio(&[power, turns, i128::from(basis_points(rate))], POWER_SCALE * max_turns * bp).max(0)
    };

    // Each side loses units in proportion to the opposing share of total power.
    let total = attacker_power.saturating_add(defender_power);
    let casualties = |units: i64, opposing: i128| {
        let units = units.max(0);
        if total == 0 {
            return 0;
        }
        let rate = i128::from(basis_points(config.combat.casualty_rate));
        floor_ratio(&[i128::from(units), rate, turns, opposing], bp.saturating_mul(max_turns).saturating_mul(total))
            .clamp(0, units)
    };
    let attacker_losses = casualties(attacker.soldiers, defender_power);
    let defender_losses = casualties(defender.guards, attacker_power);

    let (credits_stolen, structure_damage) = match outcome {
        BattleOutcome::Victory => {
            let on_hand = defender.credits.max(0);
            let stolen = floor_ratio(
                &[i128::from(on_hand), i128::from(plunder_basis_points(attack_turns, config))],
                bp,
            );
            let damage = dealt(attacker_power, config.combat.structure_damage_rate);
            (
                stolen.clamp(0, on_hand),
                damage.clamp(0, defender.fortification_hp.max(0)),
            )
        }
        BattleOutcome::Defeat => (0, 0),
    };

    BattleEncounter {
        attacker: EmpireSnapshot::from(attacker),
        defender: EmpireSnapshot::from(defender),
        attack_turns,
        attacker_power: unscaled(attacker_power),
        defender_power: unscaled(defender_power),
        outcome,
        credits_stolen,
        attacker_xp_gained: dealt(attacker_power, config.combat.xp_per_damage),
        defender_xp_gained: dealt(defender_power, config.combat.xp_per_damage),
        structure_damage,
        attacker_losses,
        defender_losses,
    }
}
