use super::{unknown_value, StoreTx};
use crate::{
    diplomacy::{Treaty, TreatyStatus, War, WarStatus},
    error::{GameError, GameResult},
    types::{AllianceId, Timestamp},
};
use rusqlite::{params, OptionalExtension, Row};

const WAR_COLUMNS: &str =
    "war_id, aggressor_id, defender_id, goal_score, aggressor_score, defender_score,
     status, winner_id, declared_at, ended_at";

const TREATY_COLUMNS: &str =
    "treaty_id, proposer_id, target_id, status, proposed_at, expires_at";

fn war_from_row(row: &Row<'_>) -> rusqlite::Result<War> {
    let status: String = row.get(6)?;
    Ok(War {
        id:              row.get(0)?,
        aggressor_id:    row.get(1)?,
        defender_id:     row.get(2)?,
        goal_score:      row.get(3)?,
        aggressor_score: row.get(4)?,
        defender_score:  row.get(5)?,
        status:          WarStatus::parse(&status)
            .ok_or_else(|| unknown_value(6, "war status", &status))?,
        winner_id:       row.get(7)?,
        declared_at:     row.get(8)?,
        ended_at:        row.get(9)?,
    })
}

fn treaty_from_row(row: &Row<'_>) -> rusqlite::Result<Treaty> {
    let status: String = row.get(3)?;
    Ok(Treaty {
        id:          row.get(0)?,
        proposer_id: row.get(1)?,
        target_id:   row.get(2)?,
        status:      TreatyStatus::parse(&status)
            .ok_or_else(|| unknown_value(3, "treaty status", &status))?,
        proposed_at: row.get(4)?,
        expires_at:  row.get(5)?,
    })
}

impl StoreTx<'_> {
    // ── War ────────────────────────────────────────────────────────

    pub fn insert_war(
        &self,
        aggressor_id: AllianceId,
        defender_id: AllianceId,
        goal_score: i64,
        now: Timestamp,
    ) -> GameResult<War> {
        self.conn.execute(
            "INSERT INTO war (aggressor_id, defender_id, goal_score, status, declared_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![aggressor_id, defender_id, goal_score, WarStatus::Active.as_str(), now],
        )?;
        Ok(War {
            id: self.conn.last_insert_rowid(),
            aggressor_id,
            defender_id,
            goal_score,
            aggressor_score: 0,
            defender_score: 0,
            status: WarStatus::Active,
            winner_id: None,
            declared_at: now,
            ended_at: None,
        })
    }

    /// The active war between two alliances, in either direction.
    pub fn active_war_between(&self, a: AllianceId, b: AllianceId) -> GameResult<Option<War>> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {WAR_COLUMNS} FROM war
                     WHERE status = 'active'
                       AND ((aggressor_id = ?1 AND defender_id = ?2)
                         OR (aggressor_id = ?2 AND defender_id = ?1))
                     ORDER BY war_id DESC LIMIT 1"
                ),
                params![a, b],
                war_from_row,
            )
            .optional()?)
    }

    pub fn save_war(&self, w: &War) -> GameResult<()> {
        self.conn.execute(
            "UPDATE war SET aggressor_score = ?1, defender_score = ?2, status = ?3,
                            winner_id = ?4, ended_at = ?5
             WHERE war_id = ?6",
            params![
                w.aggressor_score,
                w.defender_score,
                w.status.as_str(),
                w.winner_id,
                w.ended_at,
                w.id,
            ],
        )?;
        Ok(())
    }

    /// Every war the alliance took part in, most recent first.
    pub fn wars_for(&self, alliance_id: AllianceId) -> GameResult<Vec<War>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {WAR_COLUMNS} FROM war
             WHERE aggressor_id = ?1 OR defender_id = ?1
             ORDER BY war_id DESC"
        ))?;
        let rows = stmt.query_map(params![alliance_id], war_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Treaty ─────────────────────────────────────────────────────

    pub fn insert_treaty(
        &self,
        proposer_id: AllianceId,
        target_id: AllianceId,
        now: Timestamp,
    ) -> GameResult<Treaty> {
        self.conn.execute(
            "INSERT INTO treaty (proposer_id, target_id, status, proposed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![proposer_id, target_id, TreatyStatus::Proposed.as_str(), now],
        )?;
        Ok(Treaty {
            id: self.conn.last_insert_rowid(),
            proposer_id,
            target_id,
            status: TreatyStatus::Proposed,
            proposed_at: now,
            expires_at: None,
        })
    }

    pub fn load_treaty(&self, treaty_id: i64) -> GameResult<Treaty> {
        self.conn
            .query_row(
                &format!("SELECT {TREATY_COLUMNS} FROM treaty WHERE treaty_id = ?1"),
                params![treaty_id],
                treaty_from_row,
            )
            .optional()?
            .ok_or(GameError::TreatyNotFound(treaty_id))
    }

    pub fn save_treaty(&self, t: &Treaty) -> GameResult<()> {
        self.conn.execute(
            "UPDATE treaty SET status = ?1, expires_at = ?2 WHERE treaty_id = ?3",
            params![t.status.as_str(), t.expires_at, t.id],
        )?;
        Ok(())
    }

    /// Latest treaty between two alliances that has not been cancelled.
    /// May be expired; callers check `is_active_at`.
    pub fn treaty_between(&self, a: AllianceId, b: AllianceId) -> GameResult<Option<Treaty>> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {TREATY_COLUMNS} FROM treaty
                     WHERE status != 'cancelled'
                       AND ((proposer_id = ?1 AND target_id = ?2)
                         OR (proposer_id = ?2 AND target_id = ?1))
                     ORDER BY treaty_id DESC LIMIT 1"
                ),
                params![a, b],
                treaty_from_row,
            )
            .optional()?)
    }

    pub fn active_treaty_between(
        &self,
        a: AllianceId,
        b: AllianceId,
        now: Timestamp,
    ) -> GameResult<bool> {
        Ok(self
            .treaty_between(a, b)?
            .is_some_and(|t| t.is_active_at(now)))
    }
}
