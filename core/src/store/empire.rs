use super::{unknown_value, StoreTx};
use crate::{
    empire::{AllianceRole, Empire},
    error::{GameError, GameResult},
    types::{EmpireId, Timestamp},
};
use rusqlite::{params, OptionalExtension, Row};

const EMPIRE_COLUMNS: &str =
    "empire_id, name, alliance_id, alliance_role, credits, banked_credits,
     untrained_citizens, workers, soldiers, guards, sentries, spies,
     strength, constitution, wealth, charisma, proficiency_points,
     level, experience, attack_turns, vault_level,
     offense_upgrade_level, defense_upgrade_level, fortification_hp, last_updated_at";

fn empire_from_row(row: &Row<'_>) -> rusqlite::Result<Empire> {
    let role = match row.get::<_, Option<String>>(3)? {
        Some(r) => Some(AllianceRole::parse(&r).ok_or_else(|| unknown_value(3, "alliance role", &r))?),
        None => None,
    };
    Ok(Empire {
        id:                    row.get(0)?,
        name:                  row.get(1)?,
        alliance_id:           row.get(2)?,
        alliance_role:         role,
        credits:               row.get(4)?,
        banked_credits:        row.get(5)?,
        untrained_citizens:    row.get(6)?,
        workers:               row.get(7)?,
        soldiers:              row.get(8)?,
        guards:                row.get(9)?,
        sentries:              row.get(10)?,
        spies:                 row.get(11)?,
        strength:              row.get(12)?,
        constitution:          row.get(13)?,
        wealth:                row.get(14)?,
        charisma:              row.get(15)?,
        proficiency_points:    row.get(16)?,
        level:                 row.get(17)?,
        experience:            row.get(18)?,
        attack_turns:          row.get(19)?,
        vault_level:           row.get(20)?,
        offense_upgrade_level: row.get(21)?,
        defense_upgrade_level: row.get(22)?,
        fortification_hp:      row.get(23)?,
        last_updated_at:       row.get(24)?,
    })
}

impl StoreTx<'_> {
    // ── Empire ─────────────────────────────────────────────────────

    /// Insert a new empire and return its assigned id.
    pub fn insert_empire(&self, e: &Empire) -> GameResult<EmpireId> {
        self.conn.execute(
            "INSERT INTO empire (
                name, alliance_id, alliance_role, credits, banked_credits,
                untrained_citizens, workers, soldiers, guards, sentries, spies,
                strength, constitution, wealth, charisma, proficiency_points,
                level, experience, attack_turns, vault_level,
                offense_upgrade_level, defense_upgrade_level, fortification_hp, last_updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                       ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
            params![
                e.name,
                e.alliance_id,
                e.alliance_role.map(|r| r.as_str()),
                e.credits,
                e.banked_credits,
                e.untrained_citizens,
                e.workers,
                e.soldiers,
                e.guards,
                e.sentries,
                e.spies,
                e.strength,
                e.constitution,
                e.wealth,
                e.charisma,
                e.proficiency_points,
                e.level,
                e.experience,
                e.attack_turns,
                e.vault_level,
                e.offense_upgrade_level,
                e.defense_upgrade_level,
                e.fortification_hp,
                e.last_updated_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn load_empire(&self, empire_id: EmpireId) -> GameResult<Empire> {
        self.conn
            .query_row(
                &format!("SELECT {EMPIRE_COLUMNS} FROM empire WHERE empire_id = ?1"),
                params![empire_id],
                empire_from_row,
            )
            .optional()?
            .ok_or(GameError::EmpireNotFound(empire_id))
    }

    pub fn find_empire_by_name(&self, name: &str) -> GameResult<Option<Empire>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {EMPIRE_COLUMNS} FROM empire WHERE name = ?1"),
                params![name],
                empire_from_row,
            )
            .optional()?)
    }

    pub fn all_empires(&self) -> GameResult<Vec<Empire>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {EMPIRE_COLUMNS} FROM empire ORDER BY empire_id ASC"))?;
        let rows = stmt.query_map([], empire_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Write back every mutable column, guarded by compare-and-swap on
    /// `last_updated_at`: the row must still carry `expected_last_updated`.
    pub fn save_empire(&self, e: &Empire, expected_last_updated: Timestamp) -> GameResult<()> {
        let updated = self.conn.execute(
            "UPDATE empire SET
                alliance_id = ?1, alliance_role = ?2, credits = ?3, banked_credits = ?4,
                untrained_citizens = ?5, workers = ?6, soldiers = ?7, guards = ?8,
                sentries = ?9, spies = ?10, strength = ?11, constitution = ?12,
                wealth = ?13, charisma = ?14, proficiency_points = ?15, level = ?16,
                experience = ?17, attack_turns = ?18, vault_level = ?19,
                offense_upgrade_level = ?20, defense_upgrade_level = ?21,
                fortification_hp = ?22, last_updated_at = ?23
             WHERE empire_id = ?24 AND last_updated_at = ?25",
            params![
                e.alliance_id,
                e.alliance_role.map(|r| r.as_str()),
                e.credits,
                e.banked_credits,
                e.untrained_citizens,
                e.workers,
                e.soldiers,
                e.guards,
                e.sentries,
                e.spies,
                e.strength,
                e.constitution,
                e.wealth,
                e.charisma,
                e.proficiency_points,
                e.level,
                e.experience,
                e.attack_turns,
                e.vault_level,
                e.offense_upgrade_level,
                e.defense_upgrade_level,
                e.fortification_hp,
                e.last_updated_at,
                e.id,
                expected_last_updated,
            ],
        )?;
        if updated == 0 {
            return Err(GameError::ConcurrentModification(e.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::GameConfig, store::GameStore};

    #[test]
    fn unknown_alliance_role_is_a_load_error() {
        let mut store = GameStore::in_memory().unwrap();
        store.migrate().unwrap();
        let id = store
            .atomically(|tx| tx.insert_empire(&Empire::founding(0, "Rogue", &GameConfig::default(), 0)))
            .unwrap();

        store
            .atomically(|tx| {
                tx.conn
                    .execute("UPDATE empire SET alliance_role = 'regent' WHERE empire_id = ?1", params![id])?;
                Ok(())
            })
            .unwrap();

        let err = store.read(|tx| tx.load_empire(id)).unwrap_err();
        assert!(matches!(err, GameError::Database(_)), "{err}");
        assert!(err.to_string().contains("unknown alliance role 'regent'"));
    }
}
