//! Income, vault and credit-cap formulas.
//!
//! These are pure functions of an empire and the balance config. The
//! per-turn income formula is linear in turns so accrual never compounds.
//!
//! Balance fractions are stored as decimals but every floored amount is
//! computed in whole basis points, so `floor` sees the exact product.

use crate::{
    config::{GameConfig, StructureBonus},
    empire::Empire,
    types::Credits,
};

/// Fixed-point denominator for balance fractions.
pub const BASIS_POINTS: i64 = 10_000;

/// A configured fraction as whole basis points (0.05 -> 500).
pub fn basis_points(fraction: f64) -> i64 {
    (fraction * BASIS_POINTS as f64).round() as i64
}

/// `floor(product(factors) / denominator)` in exact integer math,
/// saturating at the i64 range. `denominator` must be positive.
pub fn floor_ratio(factors: &[i128], denominator: i128) -> i64 {
    let numerator = factors.iter().fold(1i128, |acc, f| acc.saturating_mul(*f));
    numerator
        .div_euclid(denominator)
        .clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// `floor(amount * fraction)` with the fraction taken in basis points.
pub fn apply_fraction(amount: i64, fraction: f64) -> i64 {
    floor_ratio(
        &[i128::from(amount), i128::from(basis_points(fraction))],
        i128::from(BASIS_POINTS),
    )
}

/// Maximum on-hand credits for an empire.
pub fn vault_capacity(empire: &Empire, config: &GameConfig) -> Credits {
    config.economy.vault_capacity_per_level * i64::from(empire.vault_level.max(1))
}

/// Room left in the vault. Zero when the vault is at or over capacity.
pub fn vault_headroom(empire: &Empire, config: &GameConfig) -> Credits {
    (vault_capacity(empire, config) - empire.credits).max(0)
}

/// Credits produced by one turn:
/// floor((base + workers * per_worker) * (1 + wealth * bonus) * (1 + alliance income %)).
pub fn income_per_turn(empire: &Empire, config: &GameConfig, alliance: &StructureBonus) -> Credits {
    let gross = config.economy.base_income + empire.workers * config.economy.income_per_worker;
    let wealth_bp = BASIS_POINTS + empire.wealth * basis_points(config.progression.bonus_per_point);
    let alliance_bp = BASIS_POINTS + basis_points(alliance.income_pct);
    let scale = i128::from(BASIS_POINTS);
    floor_ratio(
        &[i128::from(gross), i128::from(wealth_bp), i128::from(alliance_bp)],
        scale * scale,
    )
}

/// Outcome of crediting an empire subject to its vault cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CappedCredit {
    pub credited: Credits,
    pub burned:   Credits,
}

/// Add `amount` to on-hand credits. Anything above capacity is burned,
/// and credits already above capacity are clamped down to it.
pub fn credit_with_cap(empire: &mut Empire, amount: Credits, config: &GameConfig) -> CappedCredit {
    let cap = vault_capacity(empire, config);
    let before = empire.credits;
    let target = before.saturating_add(amount);
    empire.credits = target.min(cap);
    CappedCredit {
        credited: empire.credits - before,
        burned:   target - empire.credits,
    }
}

/// Cost to raise the vault from its current level.
pub fn vault_upgrade_cost(empire: &Empire, config: &GameConfig) -> Credits {
    config.economy.vault_upgrade_base_cost * i64::from(empire.vault_level.max(1))
}

/// Cost to raise an armory track from `current_level`.
pub fn armory_upgrade_cost(current_level: u32, config: &GameConfig) -> Credits {
    config.armory.base_cost * i64::from(current_level + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empire() -> Empire {
        Empire::founding(1, "Test", &GameConfig::default(), 0)
    }

    #[test]
    fn income_matches_worked_example() {
        let config = GameConfig::default();
        let mut e = empire();
        e.workers = 10;
        assert_eq!(income_per_turn(&e, &config, &StructureBonus::default()), 5_500);
    }

    #[test]
    fn wealth_and_alliance_bonuses_multiply() {
        let config = GameConfig::default();
        let mut e = empire();
        e.workers = 100;
        e.wealth = 10;
        let bonus = StructureBonus { income_pct: 0.05, ..Default::default() };
        // (5000 + 5000) * 1.10 * 1.05
        assert_eq!(income_per_turn(&e, &config, &bonus), 11_550);
    }

    #[test]
    fn exact_products_are_not_floored_away() {
        let config = GameConfig::default();
        let mut e = empire();
        e.wealth = 13;
        // 5000 * 1.13 is exactly 5650.
        assert_eq!(income_per_turn(&e, &config, &StructureBonus::default()), 5_650);
        e.workers = 7;
        e.wealth = 29;
        assert_eq!(income_per_turn(&e, &config, &StructureBonus::default()), 6_901);
    }

    #[test]
    fn fractions_floor_in_whole_credits() {
        assert_eq!(basis_points(0.05), 500);
        assert_eq!(apply_fraction(17_250, 0.94), 16_215);
        assert_eq!(apply_fraction(999, 0.5), 499);
        assert_eq!(floor_ratio(&[i128::from(i64::MAX), 4], 2), i64::MAX);
    }

    #[test]
    fn overflow_is_burned() {
        let config = GameConfig::default();
        let mut e = empire();
        e.credits = vault_capacity(&e, &config) - 100;
        let result = credit_with_cap(&mut e, 500, &config);
        assert_eq!(result, CappedCredit { credited: 100, burned: 400 });
        assert_eq!(e.credits, vault_capacity(&e, &config));
    }
}
