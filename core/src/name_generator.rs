//! Deterministic empire and alliance names for generated worlds.
//!
//! All generation draws from a `GameRng`, so the same seed produces the
//! same roster. Names are not guaranteed unique; callers append a suffix
//! on collision.

use crate::rng::GameRng;

pub struct NameGenerator;

impl NameGenerator {
    /// "Prefix Root Title", e.g. "Crimson Vega Hegemony".
    pub fn empire_name(rng: &mut GameRng) -> String {
        format!(
            "{} {} {}",
            Self::pick(rng, EMPIRE_PREFIXES),
            Self::pick(rng, STAR_ROOTS),
            Self::pick(rng, EMPIRE_TITLES)
        )
    }

    /// Alliance name plus a tag built from the initials, at most five
    /// characters.
    pub fn alliance_name(rng: &mut GameRng) -> (String, String) {
        let adjective = Self::pick(rng, ALLIANCE_ADJECTIVES);
        let noun = Self::pick(rng, ALLIANCE_NOUNS);
        let name = format!("{adjective} {noun}");
        let tag: String = name
            .split_whitespace()
            .filter_map(|w| w.chars().next())
            .chain(Self::pick(rng, STAR_ROOTS).chars().take(3))
            .take(5)
            .collect::<String>()
            .to_uppercase();
        (name, tag)
    }

    fn pick(rng: &mut GameRng, list: &'static [&'static str]) -> &'static str {
        list[rng.next_u64_below(list.len() as u64) as usize]
    }
}

const EMPIRE_PREFIXES: &[&str] = &[
    "Crimson", "Azure", "Iron", "Obsidian", "Golden", "Silent", "Radiant", "Shattered",
    "Eternal", "Frozen", "Burning", "Hollow", "Sovereign", "Verdant", "Umbral", "Gilded",
];

const STAR_ROOTS: &[&str] = &[
    "Vega", "Orion", "Lyra", "Draco", "Cygnus", "Altair", "Rigel", "Sirius", "Antares",
    "Deneb", "Castor", "Pollux", "Mira", "Canopus", "Capella", "Arcturus", "Spica",
    "Bellatrix", "Aldebaran", "Procyon",
];

const EMPIRE_TITLES: &[&str] = &[
    "Hegemony", "Dominion", "Imperium", "Directorate", "Collective", "Concordat",
    "Republic", "Sovereignty", "Protectorate", "Ascendancy", "Union", "Throne",
];

const ALLIANCE_ADJECTIVES: &[&str] = &[
    "Void", "Solar", "Nebula", "Stellar", "Quantum", "Dark", "Iron", "Star",
];

const ALLIANCE_NOUNS: &[&str] = &[
    "Pact", "Legion", "Compact", "Syndicate", "Armada", "Covenant", "Accord", "Vanguard",
];
