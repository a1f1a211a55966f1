//! Game balance configuration.
//!
//! Every number the formulas use lives here. `GameConfig::default()` is the
//! canonical balance; `GameConfig::load()` reads the same shape from the
//! `data/` directory so a world can be rebalanced without a rebuild.

use crate::{empire::UnitKind, types::Credits};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

// ── Turns ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnConfig {
    /// Real-time length of one turn.
    pub interval_secs: i64,
    pub attack_turns_per_turn: i64,
    pub max_attack_turns: i64,
    pub citizens_per_turn: i64,
}

// ── Economy ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyConfig {
    pub base_income: i64,
    pub income_per_worker: i64,
    pub vault_capacity_per_level: Credits,
    pub vault_upgrade_base_cost: Credits,
    pub max_vault_level: u32,
    pub max_fortification_hp: i64,
    pub repair_cost_per_hp: Credits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartingEmpire {
    pub credits: Credits,
    pub untrained_citizens: i64,
    pub workers: i64,
    pub soldiers: i64,
    pub guards: i64,
    pub attack_turns: i64,
}

// ── Units ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitCosts {
    pub worker: Credits,
    pub soldier: Credits,
    pub guard: Credits,
    pub sentry: Credits,
    pub spy: Credits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitConfig {
    pub costs: UnitCosts,
    pub soldier_attack: f64,
    pub guard_defense: f64,
    pub spy_infiltration: f64,
    pub sentry_vigilance: f64,
    /// Share of the training cost returned when a unit is disbanded.
    pub disband_refund_fraction: f64,
}

impl UnitConfig {
    pub fn cost(&self, kind: UnitKind) -> Credits {
        match kind {
            UnitKind::Worker  => self.costs.worker,
            UnitKind::Soldier => self.costs.soldier,
            UnitKind::Guard   => self.costs.guard,
            UnitKind::Sentry  => self.costs.sentry,
            UnitKind::Spy     => self.costs.spy,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmoryConfig {
    /// Multiplier added per upgrade level.
    pub upgrade_step: f64,
    pub base_cost: Credits,
    pub max_level: u32,
}

// ── Combat ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatConfig {
    pub max_turns_per_attack: u32,
    pub plunder_per_turn: f64,
    pub max_plunder_fraction: f64,
    pub xp_per_damage: f64,
    pub structure_damage_rate: f64,
    pub casualty_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EspionageConfig {
    pub turn_cost: i64,
    pub min_success_chance: f64,
    pub max_success_chance: f64,
    pub sabotage_rate: f64,
    pub assassination_rate: f64,
    pub spy_loss_rate: f64,
    pub xp_success: i64,
    pub xp_failure: i64,
}

// ── Progression ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionConfig {
    pub xp_per_level_base: i64,
    pub points_per_level: i64,
    pub proficiency_cap: i64,
    /// Fractional bonus per proficiency point (0.01 = 1%).
    pub bonus_per_point: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankConfig {
    pub max_deposit_fraction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiplomacyConfig {
    pub war_points_per_victory: i64,
    pub war_credits_per_point: Credits,
    pub default_war_goal: i64,
    pub treaty_duration_hours: i64,
}

// ── Alliance structures ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureBonus {
    #[serde(default)]
    pub income_pct: f64,
    #[serde(default)]
    pub offense_pct: f64,
    #[serde(default)]
    pub defense_pct: f64,
    #[serde(default)]
    pub citizens_per_turn: i64,
}

impl StructureBonus {
    pub fn combine(self, other: StructureBonus) -> StructureBonus {
        StructureBonus {
            income_pct:        self.income_pct + other.income_pct,
            offense_pct:       self.offense_pct + other.offense_pct,
            defense_pct:       self.defense_pct + other.defense_pct,
            citizens_per_turn: self.citizens_per_turn + other.citizens_per_turn,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureTier {
    pub key: String,
    pub category: String,
    pub tier: u32,
    pub name: String,
    pub cost: Credits,
    pub bonus: StructureBonus,
}

#[derive(Debug, Clone, Deserialize)]
struct StructureCatalogFile {
    structures: Vec<StructureTier>,
}

// ── Black market ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutTier {
    /// Lowest roll (1..=100) that lands in this tier.
    pub min_roll: u32,
    pub multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlackMarketGame {
    pub game_id: String,
    pub label: String,
    pub min_stake: Credits,
    pub max_stake: Credits,
    pub payouts: Vec<PayoutTier>,
}

impl BlackMarketGame {
    /// Multiplier for a roll. Tiers are sorted by `min_roll`.
    pub fn multiplier_for(&self, roll: u32) -> f64 {
        self.payouts
            .iter()
            .rev()
            .find(|t| roll >= t.min_roll)
            .map(|t| t.multiplier)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct BlackMarketFile {
    games: Vec<BlackMarketGame>,
}

#[derive(Debug, Clone, Deserialize)]
struct BalanceFile {
    turns: TurnConfig,
    economy: EconomyConfig,
    starting_empire: StartingEmpire,
    units: UnitConfig,
    armory: ArmoryConfig,
    combat: CombatConfig,
    espionage: EspionageConfig,
    progression: ProgressionConfig,
    bank: BankConfig,
    diplomacy: DiplomacyConfig,
}

// ── Root ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub turns: TurnConfig,
    pub economy: EconomyConfig,
    pub starting_empire: StartingEmpire,
    pub units: UnitConfig,
    pub armory: ArmoryConfig,
    pub combat: CombatConfig,
    pub espionage: EspionageConfig,
    pub progression: ProgressionConfig,
    pub bank: BankConfig,
    pub diplomacy: DiplomacyConfig,
    /// Keyed by structure key.
    pub structures: BTreeMap<String, StructureTier>,
    pub black_market: HashMap<String, BlackMarketGame>,
}

impl GameConfig {
    /// Load from the data/ directory.
    /// In tests, use GameConfig::default().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let balance_path = format!("{data_dir}/balance.json");
        let balance_content = std::fs::read_to_string(&balance_path)
            .with_context(|| format!("Cannot read {balance_path}"))?;
        let balance: BalanceFile = serde_json::from_str(&balance_content)
            .with_context(|| format!("Cannot parse {balance_path}"))?;

        let structure_path = format!("{data_dir}/alliance_structures.json");
        let structure_content = std::fs::read_to_string(&structure_path)
            .with_context(|| format!("Cannot read {structure_path}"))?;
        let structure_file: StructureCatalogFile = serde_json::from_str(&structure_content)
            .with_context(|| format!("Cannot parse {structure_path}"))?;

        let market_path = format!("{data_dir}/black_market.json");
        let market_content = std::fs::read_to_string(&market_path)
            .with_context(|| format!("Cannot read {market_path}"))?;
        let market_file: BlackMarketFile = serde_json::from_str(&market_content)
            .with_context(|| format!("Cannot parse {market_path}"))?;

        let config = Self {
            turns: balance.turns,
            economy: balance.economy,
            starting_empire: balance.starting_empire,
            units: balance.units,
            armory: balance.armory,
            combat: balance.combat,
            espionage: balance.espionage,
            progression: balance.progression,
            bank: balance.bank,
            diplomacy: balance.diplomacy,
            structures: index_structures(structure_file.structures)?,
            black_market: market_file
                .games
                .into_iter()
                .map(|g| (g.game_id.clone(), g))
                .collect(),
        };
        config.validate()?;

        log::info!(
            "config: loaded {} alliance structures and {} black market games from {data_dir}",
            config.structures.len(),
            config.black_market.len()
        );
        Ok(config)
    }

    /// Reject catalogs the engine cannot reason about.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.turns.interval_secs > 0, "turn interval must be positive");
        anyhow::ensure!(
            self.combat.max_turns_per_attack > 0,
            "max_turns_per_attack must be positive"
        );
        anyhow::ensure!(
            self.progression.xp_per_level_base > 0,
            "xp_per_level_base must be positive"
        );
        anyhow::ensure!(
            self.economy.vault_capacity_per_level > 0,
            "vault_capacity_per_level must be positive"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.bank.max_deposit_fraction),
            "max_deposit_fraction must be within 0..=1"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.combat.max_plunder_fraction),
            "max_plunder_fraction must be within 0..=1"
        );
        anyhow::ensure!(self.combat.plunder_per_turn >= 0.0, "plunder_per_turn must not be negative");
        anyhow::ensure!(self.combat.casualty_rate >= 0.0, "casualty_rate must not be negative");
        anyhow::ensure!(
            self.progression.bonus_per_point >= 0.0
                && self.progression.bonus_per_point * (self.progression.proficiency_cap as f64) < 1.0,
            "a capped proficiency must stay below a 100% bonus"
        );

        let mut by_category: HashMap<&str, Vec<u32>> = HashMap::new();
        for s in self.structures.values() {
            anyhow::ensure!(s.cost > 0, "structure '{}' must have a positive cost", s.key);
            by_category.entry(s.category.as_str()).or_default().push(s.tier);
        }
        for (category, mut tiers) in by_category {
            tiers.sort_unstable();
            for (i, tier) in tiers.iter().enumerate() {
                anyhow::ensure!(
                    *tier == i as u32 + 1,
                    "structure category '{category}' has tiers {tiers:?}; expected 1..={}",
                    tiers.len()
                );
            }
        }

        for game in self.black_market.values() {
            anyhow::ensure!(
                game.min_stake > 0 && game.min_stake <= game.max_stake,
                "game '{}' has an invalid stake range",
                game.game_id
            );
            anyhow::ensure!(
                game.payouts.first().map(|t| t.min_roll) == Some(1),
                "game '{}' payout table must start at roll 1",
                game.game_id
            );
            let mut prev = 0;
            for tier in &game.payouts {
                anyhow::ensure!(
                    tier.min_roll > prev && tier.min_roll <= 100,
                    "game '{}' payout tiers must be strictly increasing within 1..=100",
                    game.game_id
                );
                anyhow::ensure!(
                    tier.multiplier >= 0.0,
                    "game '{}' has a negative multiplier",
                    game.game_id
                );
                prev = tier.min_roll;
            }
        }
        Ok(())
    }

    /// The tier directly below `key` in the same category, if any.
    pub fn structure_prerequisite(&self, key: &str) -> Option<&StructureTier> {
        let tier = self.structures.get(key)?;
        if tier.tier <= 1 {
            return None;
        }
        self.structures
            .values()
            .find(|s| s.category == tier.category && s.tier == tier.tier - 1)
    }
}

fn index_structures(tiers: Vec<StructureTier>) -> anyhow::Result<BTreeMap<String, StructureTier>> {
    let mut seen = HashSet::new();
    let mut out = BTreeMap::new();
    for t in tiers {
        anyhow::ensure!(seen.insert(t.key.clone()), "duplicate structure key '{}'", t.key);
        out.insert(t.key.clone(), t);
    }
    Ok(out)
}

impl Default for GameConfig {
    fn default() -> Self {
        let structures = vec![
            tier("trade_hub_1", "economy", 1, "Trade Hub", 5_000_000,
                 StructureBonus { income_pct: 0.05, ..Default::default() }),
            tier("trade_hub_2", "economy", 2, "Orbital Exchange", 15_000_000,
                 StructureBonus { income_pct: 0.05, ..Default::default() }),
            tier("trade_hub_3", "economy", 3, "Galactic Bourse", 45_000_000,
                 StructureBonus { income_pct: 0.10, ..Default::default() }),
            tier("war_academy_1", "offense", 1, "War Academy", 7_500_000,
                 StructureBonus { offense_pct: 0.05, ..Default::default() }),
            tier("war_academy_2", "offense", 2, "Fleet Command", 22_500_000,
                 StructureBonus { offense_pct: 0.10, ..Default::default() }),
            tier("shield_grid_1", "defense", 1, "Shield Grid", 7_500_000,
                 StructureBonus { defense_pct: 0.05, ..Default::default() }),
            tier("shield_grid_2", "defense", 2, "Planetary Aegis", 22_500_000,
                 StructureBonus { defense_pct: 0.10, ..Default::default() }),
            tier("habitat_ring_1", "population", 1, "Habitat Ring", 10_000_000,
                 StructureBonus { citizens_per_turn: 1, ..Default::default() }),
            tier("habitat_ring_2", "population", 2, "Dyson Arcology", 30_000_000,
                 StructureBonus { citizens_per_turn: 2, ..Default::default() }),
        ];

        let games = vec![
            BlackMarketGame {
                game_id: "data_dice".into(),
                label: "Data Dice".into(),
                min_stake: 1_000,
                max_stake: 1_000_000,
                payouts: vec![
                    PayoutTier { min_roll: 1,  multiplier: 0.0 },
                    PayoutTier { min_roll: 61, multiplier: 1.5 },
                    PayoutTier { min_roll: 89, multiplier: 3.0 },
                    PayoutTier { min_roll: 99, multiplier: 10.0 },
                ],
            },
            BlackMarketGame {
                game_id: "quantum_coin".into(),
                label: "Quantum Coin".into(),
                min_stake: 1_000,
                max_stake: 5_000_000,
                payouts: vec![
                    PayoutTier { min_roll: 1,  multiplier: 0.0 },
                    PayoutTier { min_roll: 53, multiplier: 2.0 },
                ],
            },
        ];

        Self {
            turns: TurnConfig {
                interval_secs:         600,
                attack_turns_per_turn: 2,
                max_attack_turns:      24,
                citizens_per_turn:     1,
            },
            economy: EconomyConfig {
                base_income:              5_000,
                income_per_worker:        50,
                vault_capacity_per_level: 5_000_000,
                vault_upgrade_base_cost:  1_000_000,
                max_vault_level:          10,
                max_fortification_hp:     10_000,
                repair_cost_per_hp:       10,
            },
            starting_empire: StartingEmpire {
                credits:            100_000,
                untrained_citizens: 250,
                workers:            0,
                soldiers:           0,
                guards:             0,
                attack_turns:       10,
            },
            units: UnitConfig {
                costs: UnitCosts {
                    worker:  100,
                    soldier: 250,
                    guard:   250,
                    sentry:  500,
                    spy:     1_000,
                },
                soldier_attack:          10.0,
                guard_defense:           10.0,
                spy_infiltration:        8.0,
                sentry_vigilance:        8.0,
                disband_refund_fraction: 0.75,
            },
            armory: ArmoryConfig {
                upgrade_step: 0.10,
                base_cost:    250_000,
                max_level:    10,
            },
            combat: CombatConfig {
                max_turns_per_attack:  10,
                plunder_per_turn:      0.02,
                max_plunder_fraction:  0.20,
                xp_per_damage:         0.05,
                structure_damage_rate: 0.10,
                casualty_rate:         0.10,
            },
            espionage: EspionageConfig {
                turn_cost:          1,
                min_success_chance: 0.05,
                max_success_chance: 0.95,
                sabotage_rate:      0.05,
                assassination_rate: 0.02,
                spy_loss_rate:      0.10,
                xp_success:         50,
                xp_failure:         10,
            },
            progression: ProgressionConfig {
                xp_per_level_base: 1_000,
                points_per_level:  1,
                proficiency_cap:   75,
                bonus_per_point:   0.01,
            },
            bank: BankConfig {
                max_deposit_fraction: 0.80,
            },
            diplomacy: DiplomacyConfig {
                war_points_per_victory: 10,
                war_credits_per_point:  100_000,
                default_war_goal:       500,
                treaty_duration_hours:  72,
            },
            structures: structures.into_iter().map(|s| (s.key.clone(), s)).collect(),
            black_market: games.into_iter().map(|g| (g.game_id.clone(), g)).collect(),
        }
    }
}

fn tier(key: &str, category: &str, tier: u32, name: &str, cost: Credits, bonus: StructureBonus) -> StructureTier {
    StructureTier {
        key: key.into(),
        category: category.into(),
        tier,
        name: name.into(),
        cost,
        bonus,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        GameConfig::default().validate().expect("default balance should validate");
    }

    #[test]
    fn shipped_data_matches_defaults() {
        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../data");
        let loaded = GameConfig::load(dir).expect("data/ should load");
        let default = GameConfig::default();
        assert_eq!(loaded.turns.interval_secs, default.turns.interval_secs);
        assert_eq!(loaded.economy.base_income, default.economy.base_income);
        assert_eq!(loaded.structures.len(), default.structures.len());
        assert_eq!(loaded.black_market.len(), default.black_market.len());
    }

    #[test]
    fn prerequisite_is_previous_tier_in_category() {
        let config = GameConfig::default();
        assert!(config.structure_prerequisite("trade_hub_1").is_none());
        assert_eq!(
            config.structure_prerequisite("trade_hub_3").map(|s| s.key.as_str()),
            Some("trade_hub_2")
        );
    }

    #[test]
    fn payout_lookup_uses_highest_matching_tier() {
        let config = GameConfig::default();
        let dice = &config.black_market["data_dice"];
        assert_eq!(dice.multiplier_for(1), 0.0);
        assert_eq!(dice.multiplier_for(60), 0.0);
        assert_eq!(dice.multiplier_for(61), 1.5);
        assert_eq!(dice.multiplier_for(98), 3.0);
        assert_eq!(dice.multiplier_for(100), 10.0);
    }

    fn rejects(edit: impl FnOnce(&mut GameConfig)) -> bool {
        let mut config = GameConfig::default();
        edit(&mut config);
        config.validate().is_err()
    }

    #[test]
    fn degenerate_balance_is_rejected() {
        assert!(rejects(|c| c.progression.xp_per_level_base = 0));
        assert!(rejects(|c| c.progression.xp_per_level_base = -5));
        assert!(rejects(|c| c.economy.vault_capacity_per_level = 0));
        assert!(rejects(|c| c.bank.max_deposit_fraction = 1.5));
        assert!(rejects(|c| c.bank.max_deposit_fraction = -0.1));
        assert!(rejects(|c| c.combat.max_plunder_fraction = 2.0));
        assert!(rejects(|c| c.combat.plunder_per_turn = -0.02));
        assert!(rejects(|c| c.combat.casualty_rate = -0.1));
        assert!(rejects(|c| c.progression.bonus_per_point = 0.02));
        assert!(!rejects(|c| c.bank.max_deposit_fraction = 1.0));
    }

    #[test]
    fn degenerate_balance_file_fails_to_load() {
        let dir = std::env::temp_dir().join(format!("dominion-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let data = concat!(env!("CARGO_MANIFEST_DIR"), "/../data");
        for file in ["alliance_structures.json", "black_market.json"] {
            std::fs::copy(format!("{data}/{file}"), dir.join(file)).unwrap();
        }
        let balance = std::fs::read_to_string(format!("{data}/balance.json")).unwrap();
        let mut json: serde_json::Value = serde_json::from_str(&balance).unwrap();
        json["progression"]["xp_per_level_base"] = 0.into();
        std::fs::write(dir.join("balance.json"), json.to_string()).unwrap();

        let result = GameConfig::load(dir.to_str().unwrap());
        std::fs::remove_dir_all(&dir).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn gap_in_structure_tiers_is_rejected() {
        let mut config = GameConfig::default();
        config.structures.remove("trade_hub_2");
        assert!(config.validate().is_err());
    }
}
