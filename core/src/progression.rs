//! Experience, levels and proficiency points.

use crate::{
    config::GameConfig,
    economy::{basis_points, BASIS_POINTS},
    empire::{Empire, Proficiency},
    error::{GameError, GameResult},
};

/// Total experience required to reach `level`.
pub fn xp_for_level(level: i64, config: &GameConfig) -> i64 {
    config.progression.xp_per_level_base * level * level
}

/// Add experience and apply any level-ups it unlocks.
/// Returns the number of levels gained.
pub fn award_xp(empire: &mut Empire, xp: i64, config: &GameConfig) -> i64 {
    if xp <= 0 {
        return 0;
    }
    empire.experience = empire.experience.saturating_add(xp);

    let mut gained = 0;
    while empire.experience >= xp_for_level(empire.level + 1, config) {
        empire.level += 1;
        empire.proficiency_points += config.progression.points_per_level;
        gained += 1;
    }
    if gained > 0 {
        log::info!("empire={} progression: reached level {}", empire.id, empire.level);
    }
    gained
}

/// Spend unspent points on one proficiency, respecting the cap.
pub fn spend_points(
    empire: &mut Empire,
    proficiency: Proficiency,
    points: i64,
    config: &GameConfig,
) -> GameResult<()> {
    if points <= 0 {
        return Err(GameError::InvalidAmount(points));
    }
    if points > empire.proficiency_points {
        return Err(GameError::InsufficientProficiencyPoints {
            needed: points,
            available: empire.proficiency_points,
        });
    }
    let cap = config.progression.proficiency_cap;
    let current = empire.proficiency(proficiency);
    if current + points > cap {
        return Err(GameError::ProficiencyCapReached {
            proficiency: proficiency.as_str(),
            cap,
        });
    }
    *empire.proficiency_mut(proficiency) = current + points;
    empire.proficiency_points -= points;
    Ok(())
}

/// Proficiency multiplier in basis points (10_000 = no bonus).
pub fn proficiency_basis_points(points: i64, config: &GameConfig) -> i64 {
    BASIS_POINTS
        + points.clamp(0, config.progression.proficiency_cap)
            * basis_points(config.progression.bonus_per_point)
}
