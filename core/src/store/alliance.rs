use super::{unknown_value, StoreTx};
use crate::{
    alliance::{Alliance, AllianceBankTransaction, BankTransactionKind},
    error::{GameError, GameResult},
    types::{AllianceId, Credits, EmpireId, Timestamp},
};
use rusqlite::{params, OptionalExtension};
use std::collections::HashSet;

impl StoreTx<'_> {
    // ── Alliance ───────────────────────────────────────────────────

    pub fn insert_alliance(
        &self,
        name: &str,
        tag: &str,
        leader_id: EmpireId,
        now: Timestamp,
    ) -> GameResult<AllianceId> {
        self.conn.execute(
            "INSERT INTO alliance (name, tag, leader_id, bank_credits, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![name, tag, leader_id, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn load_alliance(&self, alliance_id: AllianceId) -> GameResult<Alliance> {
        self.conn
            .query_row(
                "SELECT alliance_id, name, tag, leader_id, bank_credits, created_at
                 FROM alliance WHERE alliance_id = ?1",
                params![alliance_id],
                |row| {
                    Ok(Alliance {
                        id:           row.get(0)?,
                        name:         row.get(1)?,
                        tag:          row.get(2)?,
                        leader_id:    row.get(3)?,
                        bank_credits: row.get(4)?,
                        created_at:   row.get(5)?,
                    })
                },
            )
            .optional()?
            .ok_or(GameError::AllianceNotFound(alliance_id))
    }

    pub fn alliance_name_taken(&self, name: &str, tag: &str) -> GameResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM alliance WHERE name = ?1 OR tag = ?2",
            params![name, tag],
            |r| r.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn set_alliance_leader(&self, alliance_id: AllianceId, leader_id: EmpireId) -> GameResult<()> {
        self.conn.execute(
            "UPDATE alliance SET leader_id = ?1 WHERE alliance_id = ?2",
            params![leader_id, alliance_id],
        )?;
        Ok(())
    }

    /// Move the alliance bank by `delta`. The schema's CHECK constraint
    /// rejects a negative balance, which aborts the whole transaction.
    pub fn adjust_alliance_bank(&self, alliance_id: AllianceId, delta: Credits) -> GameResult<()> {
        let updated = self.conn.execute(
            "UPDATE alliance SET bank_credits = bank_credits + ?1 WHERE alliance_id = ?2",
            params![delta, alliance_id],
        )?;
        if updated == 0 {
            return Err(GameError::AllianceNotFound(alliance_id));
        }
        Ok(())
    }

    pub fn member_count(&self, alliance_id: AllianceId) -> GameResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM empire WHERE alliance_id = ?1",
            params![alliance_id],
            |r| r.get(0),
        )?)
    }

    // ── Structures ─────────────────────────────────────────────────

    pub fn owned_structures(&self, alliance_id: AllianceId) -> GameResult<HashSet<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT structure_key FROM alliance_structure WHERE alliance_id = ?1",
        )?;
        let rows = stmt.query_map(params![alliance_id], |r| r.get::<_, String>(0))?;
        rows.collect::<Result<HashSet<_>, _>>().map_err(Into::into)
    }

    pub fn insert_structure(&self, alliance_id: AllianceId, key: &str, now: Timestamp) -> GameResult<()> {
        self.conn.execute(
            "INSERT INTO alliance_structure (alliance_id, structure_key, purchased_at)
             VALUES (?1, ?2, ?3)",
            params![alliance_id, key, now],
        )?;
        Ok(())
    }

    // ── Bank ledger ────────────────────────────────────────────────

    pub fn insert_bank_log(&self, t: &AllianceBankTransaction) -> GameResult<i64> {
        self.conn.execute(
            "INSERT INTO alliance_bank_log (alliance_id, empire_id, kind, amount, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![t.alliance_id, t.empire_id, t.kind.as_str(), t.amount, t.description, t.created_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent first.
    pub fn bank_log(&self, alliance_id: AllianceId, limit: usize) -> GameResult<Vec<AllianceBankTransaction>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, alliance_id, empire_id, kind, amount, description, created_at
             FROM alliance_bank_log WHERE alliance_id = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![alliance_id, limit as i64], |row| {
            let kind: String = row.get(3)?;
            Ok(AllianceBankTransaction {
                id:          Some(row.get(0)?),
                alliance_id: row.get(1)?,
                empire_id:   row.get(2)?,
                kind:        BankTransactionKind::parse(&kind)
                    .ok_or_else(|| unknown_value(3, "bank transaction kind", &kind))?,
                amount:      row.get(4)?,
                description: row.get(5)?,
                created_at:  row.get(6)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
