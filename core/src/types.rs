//! Shared primitive types used across the entire engine.

/// Unix timestamp in whole seconds.
pub type Timestamp = i64;

/// A credit amount. Signed so that SQLite round-trips are lossless;
/// every stored balance is non-negative.
pub type Credits = i64;

/// Row id of an empire (one per player).
pub type EmpireId = i64;

/// Row id of an alliance.
pub type AllianceId = i64;
