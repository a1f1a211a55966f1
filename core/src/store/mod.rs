//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The engine calls store methods; it never executes SQL directly.
//!
//! Every mutation runs inside `GameStore::atomically`, which opens an
//! IMMEDIATE transaction (the write lock is taken before the first read,
//! the SQLite equivalent of `SELECT ... FOR UPDATE`), hands the handler a
//! `StoreTx`, and commits only if the handler returns `Ok`. Any `Err`
//! rolls back every statement the handler issued.

use crate::{
    error::{GameError, GameResult},
    event::EventLogEntry,
    rng::RngSlot,
    types::{EmpireId, Timestamp},
};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::time::Duration;

mod alliance;
mod black_market;
mod conflict;
mod diplomacy;
mod empire;

/// How long a connection waits for another writer before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

pub struct GameStore {
    conn: Connection,
}

/// Typed repository over one connection. Inside `atomically` every call
/// joins the open transaction; inside `read` calls see committed state.
pub struct StoreTx<'a> {
    conn: &'a Connection,
}

impl GameStore {
    pub fn open(path: &str) -> GameResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> GameResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order. Safe to run more than once.
    pub fn migrate(&self) -> GameResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_empires.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_alliances.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/004_conflict.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/005_diplomacy.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/006_black_market.sql"))?;
        Ok(())
    }

    /// Run `f` in one IMMEDIATE transaction. Commits on `Ok`, rolls back on `Err`.
    pub fn atomically<T, F>(&mut self, f: F) -> GameResult<T>
    where
        F: FnOnce(&StoreTx<'_>) -> GameResult<T>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let result = f(&StoreTx { conn: &tx });
        match result {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                tx.rollback()?;
                Err(e)
            }
        }
    }

    /// Run read-only queries outside a transaction.
    pub fn read<T, F>(&self, f: F) -> GameResult<T>
    where
        F: FnOnce(&StoreTx<'_>) -> GameResult<T>,
    {
        f(&StoreTx { conn: &self.conn })
    }

    // ── World ──────────────────────────────────────────────────

    /// Create the world record. A second call keeps the original seed.
    pub fn init_world(&self, seed: u64, version: &str, now: Timestamp) -> GameResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO world (id, seed, version, created_at) VALUES (1, ?1, ?2, ?3)",
            params![seed as i64, version, now],
        )?;
        Ok(inserted == 1)
    }

    pub fn world_seed(&self) -> GameResult<u64> {
        self.conn
            .query_row("SELECT seed FROM world WHERE id = 1", [], |row| {
                row.get::<_, i64>(0)
            })
            .optional()?
            .map(|s| s as u64)
            .ok_or(GameError::WorldNotInitialized)
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn events_for_empire(&self, empire_id: EmpireId) -> GameResult<Vec<EventLogEntry>> {
        self.query_events(
            "SELECT id, request_id, empire_id, event_type, payload, created_at
             FROM event_log WHERE empire_id = ?1 ORDER BY id ASC",
            Some(empire_id),
        )
    }

    pub fn all_events(&self) -> GameResult<Vec<EventLogEntry>> {
        self.query_events(
            "SELECT id, request_id, empire_id, event_type, payload, created_at
             FROM event_log ORDER BY id ASC",
            None,
        )
    }

    pub fn event_count(&self) -> GameResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM event_log", [], |r| r.get(0))?)
    }

    fn query_events(&self, sql: &str, empire_id: Option<EmpireId>) -> GameResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(sql)?;
        let map = |row: &rusqlite::Row<'_>| {
            Ok(EventLogEntry {
                id:         Some(row.get(0)?),
                request_id: row.get(1)?,
                empire_id:  row.get(2)?,
                event_type: row.get(3)?,
                payload:    row.get(4)?,
                created_at: row.get(5)?,
            })
        };
        let entries = match empire_id {
            Some(id) => stmt.query_map(params![id], map)?.collect::<Result<Vec<_>, _>>()?,
            None => stmt.query_map([], map)?.collect::<Result<Vec<_>, _>>()?,
        };
        Ok(entries)
    }
}

/// Conversion error for a TEXT column holding a value no enum variant matches.
fn unknown_value(column: usize, what: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        format!("unknown {what} '{value}'").into(),
    )
}

impl StoreTx<'_> {
    pub fn append_event(&self, entry: &EventLogEntry) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO event_log (request_id, empire_id, event_type, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.request_id,
                entry.empire_id,
                entry.event_type,
                entry.payload,
                entry.created_at,
            ],
        )?;
        Ok(())
    }

    /// Claim the next sequence number for an RNG slot.
    pub fn next_rng_sequence(&self, slot: RngSlot) -> GameResult<u64> {
        let current: Option<i64> = self
            .conn
            .query_row(
                "SELECT next FROM rng_sequence WHERE slot = ?1",
                params![slot.name()],
                |r| r.get(0),
            )
            .optional()?;
        let seq = current.unwrap_or(0);
        self.conn.execute(
            "INSERT INTO rng_sequence (slot, next) VALUES (?1, ?2)
             ON CONFLICT (slot) DO UPDATE SET next = excluded.next",
            params![slot.name(), seq + 1],
        )?;
        Ok(seq as u64)
    }
}
