//! Deterministic random number generation.
//!
//! RULE: Nothing in the engine may call any platform RNG.
//! All randomness flows through GameRng instances derived
//! from the single master seed stored on the world record.
//!
//! Each feature gets its own stream, seeded deterministically from
//! (master_seed, slot, sequence). The sequence is the number of prior
//! draws persisted for that feature, so replaying the same actions in
//! the same order reproduces the same rolls.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for a single feature and action.
pub struct GameRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl GameRng {
    /// Create an RNG from the master seed, a stable slot index and
    /// a per-slot sequence number. The slot index must never change
    /// once assigned.
    pub fn new(master_seed: u64, slot_index: u64, sequence: u64) -> Self {
        let derived_seed = master_seed
            ^ slot_index.wrapping_mul(0x9e37_79b9_7f4a_7c15)
            ^ sequence.wrapping_mul(0xbf58_476d_1ce4_e5b9);
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        use rand::RngCore;
        self.inner.next_u64()
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::Rng;
        assert!(n > 0, "n must be > 0");
        self.inner.gen_range(0..n)
    }

    /// Roll an integer in [lo, hi], inclusive.
    pub fn roll_inclusive(&mut self, lo: u32, hi: u32) -> u32 {
        use rand::Rng;
        self.inner.gen_range(lo..=hi)
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// Hands out per-feature RNG streams for one world.
#[derive(Debug, Clone, Copy)]
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn for_slot(&self, slot: RngSlot, sequence: u64) -> GameRng {
        GameRng::new(self.master_seed, slot as u64, sequence).with_name(slot.name())
    }
}

/// Stable slot assignments.
/// NEVER reorder or remove entries. Only append.
/// Reordering changes every stream's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum RngSlot {
    WorldGen = 0,
    Espionage = 1,
    BlackMarket = 2,
    Activity = 3,
}

impl RngSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::WorldGen    => "world_gen",
            Self::Espionage   => "espionage",
            Self::BlackMarket => "black_market",
            Self::Activity    => "activity",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_slot_and_sequence_repeat() {
        let bank = RngBank::new(7);
        let mut first = bank.for_slot(RngSlot::Espionage, 3);
        let mut second = bank.for_slot(RngSlot::Espionage, 3);
        let a: Vec<u64> = (0..5).map(|_| first.next_u64()).collect();
        let b: Vec<u64> = (0..5).map(|_| second.next_u64()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn sequence_changes_stream() {
        let bank = RngBank::new(7);
        let a = bank.for_slot(RngSlot::BlackMarket, 1).next_u64();
        let b = bank.for_slot(RngSlot::BlackMarket, 2).next_u64();
        assert_ne!(a, b);
    }

    #[test]
    fn rolls_stay_in_range() {
        let mut rng = RngBank::new(99).for_slot(RngSlot::BlackMarket, 0);
        for _ in 0..1_000 {
            let roll = rng.roll_inclusive(1, 100);
            assert!((1..=100).contains(&roll));
        }
    }
}
