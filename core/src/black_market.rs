//! Black market games of chance.
//!
//! A play deducts the stake, rolls 1..=100 on the `BlackMarket` stream and
//! pays `floor(stake * multiplier)` from the game's tier table. Winnings
//! obey the vault cap like any other income.

use crate::{
    config::{BlackMarketGame, GameConfig},
    economy::{apply_fraction, credit_with_cap},
    empire::Empire,
    error::{GameError, GameResult},
    rng::GameRng,
    types::Credits,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlackMarketPlay {
    pub empire_id:  i64,
    pub game_id:    String,
    pub stake:      Credits,
    pub roll:       u32,
    pub multiplier: f64,
    pub payout:     Credits,
    pub burned:     Credits,
}

impl BlackMarketPlay {
    /// Net change to the player's credits.
    pub fn net(&self) -> Credits {
        self.payout - self.burned - self.stake
    }
}

pub fn find_game<'a>(game_id: &str, config: &'a GameConfig) -> GameResult<&'a BlackMarketGame> {
    config
        .black_market
        .get(game_id)
        .ok_or_else(|| GameError::UnknownGame(game_id.to_string()))
}

pub fn play(
    empire: &mut Empire,
    game_id: &str,
    stake: Credits,
    rng: &mut GameRng,
    config: &GameConfig,
) -> GameResult<BlackMarketPlay> {
    let game = find_game(game_id, config)?;
    if stake < game.min_stake || stake > game.max_stake {
        return Err(GameError::StakeOutOfRange {
            stake,
            min: game.min_stake,
            max: game.max_stake,
        });
    }
    if empire.credits < stake {
        return Err(GameError::InsufficientCredits { needed: stake, available: empire.credits });
    }

    empire.credits -= stake;
    let roll = rng.roll_inclusive(1, 100);
    let multiplier = game.multiplier_for(roll);
    let payout = apply_fraction(stake, multiplier);
    let capped = credit_with_cap(empire, payout, config);

    Ok(BlackMarketPlay {
        empire_id: empire.id,
        game_id: game.game_id.clone(),
        stake,
        roll,
        multiplier,
        payout,
        burned: capped.burned,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payouts_floor_the_exact_product() {
        let config = GameConfig::default();
        let mut rng = GameRng::new(7, 0, 0);
        for stake in [1_001, 3_333, 77_777] {
            let mut e = Empire::founding(1, "Dealer", &config, 0);
            e.credits = 1_000_000;
            let p = play(&mut e, "data_dice", stake, &mut rng, &config).unwrap();
            let exact = match p.roll {
                1..=60 => 0,
                61..=88 => stake * 3 / 2,
                89..=98 => stake * 3,
                _ => stake * 10,
            };
            assert_eq!(p.payout, exact, "roll {}", p.roll);
            assert_eq!(e.credits, 1_000_000 - stake + exact);
        }
    }
}
