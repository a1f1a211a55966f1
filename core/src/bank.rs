//! Personal bank: moving credits between the vault and the bank.
//!
//! Banked credits cannot be plundered and are not subject to the vault
//! cap. Each deposit may move at most a fixed share of on-hand credits.

use crate::{
    config::GameConfig,
    economy::{apply_fraction, vault_headroom},
    empire::Empire,
    error::{GameError, GameResult},
    types::Credits,
};

/// Largest single deposit the empire may make right now.
pub fn deposit_limit(empire: &Empire, config: &GameConfig) -> Credits {
    apply_fraction(empire.credits.max(0), config.bank.max_deposit_fraction)
}

pub fn deposit(empire: &mut Empire, amount: Credits, config: &GameConfig) -> GameResult<()> {
    if amount <= 0 {
        return Err(GameError::InvalidAmount(amount));
    }
    let limit = deposit_limit(empire, config);
    if amount > limit {
        return Err(GameError::DepositLimitExceeded { amount, limit });
    }
    empire.credits -= amount;
    empire.banked_credits += amount;
    Ok(())
}

/// Withdrawals never burn: one that would overflow the vault is refused.
pub fn withdraw(empire: &mut Empire, amount: Credits, config: &GameConfig) -> GameResult<()> {
    if amount <= 0 {
        return Err(GameError::InvalidAmount(amount));
    }
    if amount > empire.banked_credits {
        return Err(GameError::InsufficientBankCredits {
            needed: amount,
            available: empire.banked_credits,
        });
    }
    let headroom = vault_headroom(empire, config);
    if amount > headroom {
        return Err(GameError::VaultFull { amount, headroom });
    }
    empire.banked_credits -= amount;
    empire.credits += amount;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::vault_capacity;

    #[test]
    fn deposit_is_limited_to_share_of_on_hand() {
        let config = GameConfig::default();
        let mut e = Empire::founding(1, "Lyra", &config, 0);
        e.credits = 10_000;
        assert!(matches!(
            deposit(&mut e, 8_001, &config),
            Err(GameError::DepositLimitExceeded { limit: 8_000, .. })
        ));
        deposit(&mut e, 8_000, &config).unwrap();
        assert_eq!(e.credits, 2_000);
        assert_eq!(e.banked_credits, 8_000);
    }

    #[test]
    fn deposit_limit_floors_exactly() {
        let config = GameConfig::default();
        let mut e = Empire::founding(1, "Lyra", &config, 0);
        for credits in [5, 35, 1_235, 987_654_321] {
            e.credits = credits;
            assert_eq!(deposit_limit(&e, &config), credits * 4 / 5);
        }
    }

    #[test]
    fn withdrawal_refuses_to_overflow_vault() {
        let config = GameConfig::default();
        let mut e = Empire::founding(1, "Lyra", &config, 0);
        e.credits = vault_capacity(&e, &config) - 50;
        e.banked_credits = 1_000;
        assert!(matches!(
            withdraw(&mut e, 51, &config),
            Err(GameError::VaultFull { headroom: 50, .. })
        ));
        withdraw(&mut e, 50, &config).unwrap();
        assert_eq!(e.credits, vault_capacity(&e, &config));
        assert_eq!(e.banked_credits, 950);
    }
}
