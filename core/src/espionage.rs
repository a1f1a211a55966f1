//! Spy missions.
//!
//! Unlike battles, missions are chance-based: the success roll comes from
//! the world's `Espionage` RNG stream so outcomes replay identically for
//! the same seed and action order.

use crate::{
    config::GameConfig,
    empire::Empire,
    error::{GameError, GameResult},
    economy::{apply_fraction, basis_points, floor_ratio, BASIS_POINTS},
    progression::proficiency_basis_points,
    rng::GameRng,
    snapshot::EmpireSnapshot,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpyMission {
    /// Reveal the target's current state.
    Intelligence,
    /// Damage the target's fortifications.
    Sabotage,
    /// Eliminate a share of the target's workers.
    Assassination,
}

impl SpyMission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intelligence  => "intelligence",
            Self::Sabotage      => "sabotage",
            Self::Assassination => "assassination",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum SpyEffect {
    None,
    Intel { report: EmpireSnapshot },
    FortificationDamage { hp: i64 },
    WorkersEliminated { workers: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpyReport {
    pub attacker_id:    i64,
    pub defender_id:    i64,
    pub mission:        SpyMission,
    pub spy_power:      f64,
    pub sentry_power:   f64,
    pub success_chance: f64,
    pub success:        bool,
    pub effect:         SpyEffect,
    pub spies_lost:     i64,
    pub xp_gained:      i64,
}

/// Unit count times two basis-point factors.
fn scaled_power(units: i64, per_unit: f64, proficiency: i64, config: &GameConfig) -> i128 {
    i128::from(units.max(0))
        .saturating_mul(i128::from(basis_points(per_unit)))
        .saturating_mul(i128::from(proficiency_basis_points(proficiency, config)))
}

fn unscaled(power: i128) -> f64 {
    power as f64 / (BASIS_POINTS as f64 * BASIS_POINTS as f64)
}

/// spies * infiltration * (1 + charisma bonus).
pub fn spy_power(empire: &Empire, config: &GameConfig) -> f64 {
    unscaled(scaled_power(empire.spies, config.units.spy_infiltration, empire.charisma, config))
}

/// sentries * vigilance * (1 + constitution bonus).
pub fn sentry_power(empire: &Empire, config: &GameConfig) -> f64 {
    unscaled(scaled_power(empire.sentries, config.units.sentry_vigilance, empire.constitution, config))
}

/// spy / (spy + sentry), clamped to the configured band.
pub fn success_chance(spy: f64, sentry: f64, config: &GameConfig) -> f64 {
    let raw = if spy + sentry > 0.0 { spy / (spy + sentry) } else { 0.0 };
    raw.clamp(
        config.espionage.min_success_chance,
        config.espionage.max_success_chance,
    )
}

pub fn validate_mission(
    attacker: &Empire,
    defender: &Empire,
    treaty_active: bool,
    config: &GameConfig,
) -> GameResult<()> {
    if attacker.id == defender.id {
        return Err(GameError::SelfAttack);
    }
    if attacker.spies <= 0 {
        return Err(GameError::InsufficientUnits {
            unit: "spies",
            needed: 1,
            available: attacker.spies,
        });
    }
    let cost = config.espionage.turn_cost;
    if attacker.attack_turns < cost {
        return Err(GameError::InsufficientAttackTurns {
            needed: cost,
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

/// Roll and describe a mission. Callers must run `validate_mission` first.
pub fn resolve_mission(
    attacker: &Empire,
    defender: &Empire,
    mission: SpyMission,
    rng: &mut GameRng,
    config: &GameConfig,
) -> SpyReport {
    let spy = spy_power(attacker, config);
    let sentry = sentry_power(defender, config);
    let chance = success_chance(spy, sentry, config);
    let success = rng.chance(chance);

    let (effect, spies_lost, xp_gained) = if success {
        let effect = match mission {
            SpyMission::Intelligence => SpyEffect::Intel {
                report: EmpireSnapshot::from(defender),
            },
            SpyMission::Sabotage => {
                let scaled = scaled_power(attacker.spies, config.units.spy_infiltration, attacker.charisma, config);
                let bp = i128::from(BASIS_POINTS);
                let hp = floor_ratio(
                    &[scaled, i128::from(basis_points(config.espionage.sabotage_rate))],
                    bp * bp * bp,
                );
                SpyEffect::FortificationDamage {
                    hp: hp.clamp(0, defender.fortification_hp.max(0)),
                }
            }
            SpyMission::Assassination => {
                let workers = apply_fraction(defender.workers.max(0), config.espionage.assassination_rate);
                SpyEffect::WorkersEliminated {
                    workers: workers.clamp(0, defender.workers.max(0)),
                }
            }
        };
        (effect, 0, config.espionage.xp_success)
    } else {
        // ceil(x) == -floor(-x)
        let lost = -apply_fraction(-attacker.spies.max(0), config.espionage.spy_loss_rate);
        (SpyEffect::None, lost.clamp(0, attacker.spies), config.espionage.xp_failure)
    };

    SpyReport {
        attacker_id: attacker.id,
        defender_id: defender.id,
        mission,
        spy_power: spy,
        sentry_power: sentry,
        success_chance: chance,
        success,
        effect,
        spies_lost,
        xp_gained,
    }
}
