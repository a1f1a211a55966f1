use super::StoreTx;
use crate::{
    black_market::BlackMarketPlay,
    error::GameResult,
    types::{EmpireId, Timestamp},
};
use rusqlite::params;

impl StoreTx<'_> {
    pub fn insert_play(&self, p: &BlackMarketPlay, now: Timestamp) -> GameResult<i64> {
        self.conn.execute(
            "INSERT INTO black_market_log
                (empire_id, game_id, stake, roll, multiplier, payout, burned, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![p.empire_id, p.game_id, p.stake, p.roll, p.multiplier, p.payout, p.burned, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent first.
    pub fn plays_for(&self, empire_id: EmpireId, limit: usize) -> GameResult<Vec<BlackMarketPlay>> {
        let mut stmt = self.conn.prepare(
            "SELECT empire_id, game_id, stake, roll, multiplier, payout, burned
             FROM black_market_log WHERE empire_id = ?1
             ORDER BY play_id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![empire_id, limit as i64], |row| {
            Ok(BlackMarketPlay {
                empire_id:  row.get(0)?,
                game_id:    row.get(1)?,
                stake:      row.get(2)?,
                roll:       row.get(3)?,
                multiplier: row.get(4)?,
                payout:     row.get(5)?,
                burned:     row.get(6)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
