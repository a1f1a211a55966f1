use super::StoreTx;
use crate::{
    combat::BattleEncounter,
    error::GameResult,
    espionage::SpyReport,
    types::{EmpireId, Timestamp},
};
use rusqlite::params;

impl StoreTx<'_> {
    // ── Battle log ─────────────────────────────────────────────────

    /// Persist a resolved battle. The full encounter is kept as JSON so
    /// battle reports can be replayed without recomputation.
    pub fn insert_battle(&self, b: &BattleEncounter, now: Timestamp) -> GameResult<i64> {
        let json = serde_json::to_string(b)?;
        self.conn.execute(
            "INSERT INTO battle_log (
                attacker_id, defender_id, attack_turns, attacker_power, defender_power,
                outcome, credits_stolen, attacker_xp_gained, defender_xp_gained,
                structure_damage, attacker_losses, defender_losses, encounter_json, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                b.attacker.empire_id,
                b.defender.empire_id,
                b.attack_turns,
                b.attacker_power,
                b.defender_power,
                b.outcome.as_str(),
                b.credits_stolen,
                b.attacker_xp_gained,
                b.defender_xp_gained,
                b.structure_damage,
                b.attacker_losses,
                b.defender_losses,
                json,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Battles the empire fought on either side, most recent first.
    pub fn battles_for(&self, empire_id: EmpireId, limit: usize) -> GameResult<Vec<(i64, BattleEncounter)>> {
        let mut stmt = self.conn.prepare(
            "SELECT battle_id, encounter_json FROM battle_log
             WHERE attacker_id = ?1 OR defender_id = ?1
             ORDER BY battle_id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![empire_id, limit as i64], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut battles = Vec::new();
        for row in rows {
            let (id, json) = row?;
            battles.push((id, serde_json::from_str(&json)?));
        }
        Ok(battles)
    }

    // ── Spy log ────────────────────────────────────────────────────

    pub fn insert_spy_report(&self, r: &SpyReport, now: Timestamp) -> GameResult<i64> {
        let json = serde_json::to_string(r)?;
        self.conn.execute(
            "INSERT INTO spy_log (attacker_id, defender_id, mission, success, report_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![r.attacker_id, r.defender_id, r.mission.as_str(), r.success, json, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Missions the empire launched, most recent first.
    pub fn spy_reports_for(&self, empire_id: EmpireId, limit: usize) -> GameResult<Vec<(i64, SpyReport)>> {
        let mut stmt = self.conn.prepare(
            "SELECT report_id, report_json FROM spy_log
             WHERE attacker_id = ?1
             ORDER BY report_id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![empire_id, limit as i64], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut reports = Vec::new();
        for row in rows {
            let (id, json) = row?;
            reports.push((id, serde_json::from_str(&json)?));
        }
        Ok(reports)
    }
}
