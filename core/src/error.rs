use crate::types::{AllianceId, Credits, EmpireId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Lookup ─────────────────────────────────────────────────
    #[error("Empire {0} not found")]
    EmpireNotFound(EmpireId),

    #[error("Alliance {0} not found")]
    AllianceNotFound(AllianceId),

    #[error("World not initialized")]
    WorldNotInitialized,

    #[error("Invalid name '{0}'")]
    InvalidName(String),

    #[error("Name '{0}' is already taken")]
    NameTaken(String),

    // ── Combat / espionage ─────────────────────────────────────
    #[error("An empire cannot target itself")]
    SelfAttack,

    #[error("Target is protected by an active peace treaty")]
    TreatyProtected,

    #[error("Target belongs to your own alliance")]
    SameAlliance,

    #[error("Attack turns must be between 1 and {max}, got {requested}")]
    InvalidAttackTurns { requested: u32, max: u32 },

    #[error("Not enough attack turns: need {needed}, have {available}")]
    InsufficientAttackTurns { needed: i64, available: i64 },

    // ── Economy ────────────────────────────────────────────────
    #[error("Not enough credits: need {needed}, have {available}")]
    InsufficientCredits { needed: Credits, available: Credits },

    #[error("Not enough banked credits: need {needed}, have {available}")]
    InsufficientBankCredits { needed: Credits, available: Credits },

    #[error("Not enough untrained citizens: need {needed}, have {available}")]
    InsufficientCitizens { needed: i64, available: i64 },

    #[error("Not enough {unit}: need {needed}, have {available}")]
    InsufficientUnits { unit: &'static str, needed: i64, available: i64 },

    #[error("Vault cannot hold {amount} more credits (headroom {headroom})")]
    VaultFull { amount: Credits, headroom: Credits },

    #[error("Deposit of {amount} exceeds the per-deposit limit of {limit}")]
    DepositLimitExceeded { amount: Credits, limit: Credits },

    #[error("Amount must be positive, got {0}")]
    InvalidAmount(i64),

    #[error("Upgrade track '{track}' is already at its maximum level {max}")]
    UpgradeMaxed { track: &'static str, max: u32 },

    // ── Progression ────────────────────────────────────────────
    #[error("{proficiency} is already at the cap of {cap}")]
    ProficiencyCapReached { proficiency: &'static str, cap: i64 },

    #[error("Not enough proficiency points: need {needed}, have {available}")]
    InsufficientProficiencyPoints { needed: i64, available: i64 },

    // ── Alliance ───────────────────────────────────────────────
    #[error("Empire {0} is not a member of an alliance")]
    NotAllianceMember(EmpireId),

    #[error("Empire {0} is already a member of an alliance")]
    AlreadyInAlliance(EmpireId),

    #[error("Permission denied: {0}")]
    PermissionDenied(&'static str),

    #[error("Unknown alliance structure '{0}'")]
    UnknownStructure(String),

    #[error("Structure '{key}' requires '{required}' to be owned first")]
    PrerequisiteMissing { key: String, required: String },

    #[error("Structure '{0}' is already owned")]
    StructureAlreadyOwned(String),

    // ── Diplomacy ──────────────────────────────────────────────
    #[error("Alliances {0} and {1} are already at war")]
    AlreadyAtWar(AllianceId, AllianceId),

    #[error("Treaty {0} not found or not in a state that allows this action")]
    TreatyNotFound(i64),

    #[error("An active or pending treaty already exists between {0} and {1}")]
    TreatyExists(AllianceId, AllianceId),

    // ── Black market ───────────────────────────────────────────
    #[error("Unknown black market game '{0}'")]
    UnknownGame(String),

    #[error("Stake {stake} outside allowed range {min}..={max}")]
    StakeOutOfRange { stake: Credits, min: Credits, max: Credits },

    // ── Concurrency ────────────────────────────────────────────
    #[error("Empire {0} was modified concurrently")]
    ConcurrentModification(EmpireId),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GameError {
    /// True for rule violations a player can correct and retry.
    /// False for storage and serialization failures.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            Self::Database(_)
                | Self::Serialization(_)
                | Self::WorldNotInitialized
                | Self::ConcurrentModification(_)
                | Self::Other(_)
        )
    }
}

pub type GameResult<T> = Result<T, GameError>;
