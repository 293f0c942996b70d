//! SQLite record store for all pipeline stages
//!
//! One table per entity kind per stage (raw, clean, feature), each versioned
//! by a write timestamp so a stage can be re-run without touching the others.
//! Raw tables are upserted on their declared unique keys, so repeated
//! ingestion of the same source is idempotent.

use crate::features::{EntityRef, FeatureRow};
use crate::{
    CleanDelivery, CricError, DeliveryRow, MatchId, MatchRow, PlayerId, PlayerRole, PlayerRow,
    Result, TossDecision, VenueId, VenueRow, Wicket,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use std::collections::HashSet;
use std::path::Path;

/// Stage names used as keys in `stage_versions`
pub const STAGE_RAW_MATCHES: &str = "raw_matches";
pub const STAGE_RAW_PLAYERS: &str = "raw_players";
pub const STAGE_RAW_DELIVERIES: &str = "raw_deliveries";
pub const STAGE_VENUES: &str = "venues";
pub const STAGE_CLEAN_MATCHES: &str = "clean_matches";
pub const STAGE_CLEAN_PLAYERS: &str = "clean_players";
pub const STAGE_CLEAN_DELIVERIES: &str = "clean_deliveries";
pub const STAGE_FEATURES: &str = "features";

/// Record store connection and operations
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create the store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Store { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Store { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS raw_matches (
                match_id INTEGER PRIMARY KEY,
                team1 TEXT NOT NULL,
                team2 TEXT NOT NULL,
                venue_id INTEGER NOT NULL,
                toss_winner TEXT NOT NULL,
                toss_decision TEXT NOT NULL,
                winner TEXT,
                margin TEXT,
                date TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS raw_players (
                player_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                role TEXT NOT NULL,
                team_history TEXT NOT NULL DEFAULT '[]'
            );

            CREATE TABLE IF NOT EXISTS raw_deliveries (
                match_id INTEGER NOT NULL,
                innings INTEGER NOT NULL,
                over INTEGER NOT NULL,
                ball INTEGER NOT NULL,
                batter_id INTEGER NOT NULL,
                bowler_id INTEGER NOT NULL,
                runs_scored INTEGER,
                extras INTEGER,
                wicket_kind TEXT,
                player_out INTEGER,
                PRIMARY KEY (match_id, innings, over, ball)
            );

            CREATE TABLE IF NOT EXISTS venues (
                venue_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                city TEXT NOT NULL,
                country TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS clean_matches (
                match_id INTEGER PRIMARY KEY,
                team1 TEXT NOT NULL,
                team2 TEXT NOT NULL,
                venue_id INTEGER NOT NULL,
                toss_winner TEXT NOT NULL,
                toss_decision TEXT NOT NULL,
                winner TEXT,
                margin TEXT,
                date TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS clean_players (
                player_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                role TEXT NOT NULL,
                team_history TEXT NOT NULL DEFAULT '[]'
            );

            CREATE TABLE IF NOT EXISTS clean_deliveries (
                match_id INTEGER NOT NULL,
                innings INTEGER NOT NULL,
                over INTEGER NOT NULL,
                ball INTEGER NOT NULL,
                batter_id INTEGER NOT NULL,
                bowler_id INTEGER NOT NULL,
                runs_scored INTEGER NOT NULL,
                extras INTEGER NOT NULL,
                wicket_kind TEXT,
                player_out INTEGER,
                PRIMARY KEY (match_id, innings, over, ball)
            );

            CREATE TABLE IF NOT EXISTS features (
                entity_kind TEXT NOT NULL,
                entity_key TEXT NOT NULL,
                match_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                strike_rate REAL NOT NULL,
                batting_average REAL NOT NULL,
                win_ratio REAL NOT NULL,
                form_index REAL NOT NULL,
                momentum_score REAL NOT NULL,
                has_history INTEGER NOT NULL,
                PRIMARY KEY (entity_kind, entity_key, match_id)
            );

            CREATE TABLE IF NOT EXISTS stage_versions (
                stage TEXT PRIMARY KEY,
                written_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_raw_deliveries_match ON raw_deliveries(match_id);
            CREATE INDEX IF NOT EXISTS idx_clean_deliveries_match ON clean_deliveries(match_id);
            CREATE INDEX IF NOT EXISTS idx_features_match ON features(match_id);
            "#,
        )?;
        Ok(())
    }

    /// Record that a stage wrote its output just now
    fn mark_stage(&self, stage: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO stage_versions (stage, written_at) VALUES (?1, datetime('now'))
             ON CONFLICT(stage) DO UPDATE SET written_at = excluded.written_at",
            params![stage],
        )?;
        Ok(())
    }

    fn stage_written(&self, stage: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM stage_versions WHERE stage = ?1",
            params![stage],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Write timestamp of every stage that has produced output
    pub fn stage_versions(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT stage, written_at FROM stage_versions ORDER BY stage")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn require_stage(&self, stage: &str) -> Result<()> {
        if self.stage_written(stage)? {
            Ok(())
        } else {
            Err(CricError::NotFound(format!(
                "stage '{}' has never been written",
                stage
            )))
        }
    }

    // ==================== Raw writes (upsert) ====================

    /// Upsert a batch of raw matches; duplicate keys within the batch are rejected
    pub fn write_matches(&self, rows: &[MatchRow]) -> Result<usize> {
        check_unique(rows.iter().map(|m| m.match_id), "match_id")?;
        let tx = self.conn.unchecked_transaction()?;
        for m in rows {
            tx.execute(
                r#"
                INSERT INTO raw_matches (match_id, team1, team2, venue_id, toss_winner,
                                         toss_decision, winner, margin, date)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(match_id) DO UPDATE SET
                    team1 = excluded.team1,
                    team2 = excluded.team2,
                    venue_id = excluded.venue_id,
                    toss_winner = excluded.toss_winner,
                    toss_decision = excluded.toss_decision,
                    winner = excluded.winner,
                    margin = excluded.margin,
                    date = excluded.date
                "#,
                params![
                    m.match_id.0,
                    m.team1,
                    m.team2,
                    m.venue_id.0,
                    m.toss_winner,
                    m.toss_decision.as_str(),
                    m.winner,
                    m.margin,
                    m.date.format("%Y-%m-%d").to_string(),
                ],
            )?;
        }
        tx.commit()?;
        self.mark_stage(STAGE_RAW_MATCHES)?;
        Ok(rows.len())
    }

    /// Upsert a batch of raw players
    pub fn write_players(&self, rows: &[PlayerRow]) -> Result<usize> {
        check_unique(rows.iter().map(|p| p.player_id), "player_id")?;
        let tx = self.conn.unchecked_transaction()?;
        for p in rows {
            let history = serde_json::to_string(&p.team_history)
                .map_err(|e| CricError::Serialize(e.to_string()))?;
            tx.execute(
                r#"
                INSERT INTO raw_players (player_id, name, role, team_history)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(player_id) DO UPDATE SET
                    name = excluded.name,
                    role = excluded.role,
                    team_history = excluded.team_history
                "#,
                params![p.player_id.0, p.name, p.role.as_str(), history],
            )?;
        }
        tx.commit()?;
        self.mark_stage(STAGE_RAW_PLAYERS)?;
        Ok(rows.len())
    }

    /// Upsert a batch of raw deliveries keyed on (match, innings, over, ball)
    pub fn write_deliveries(&self, rows: &[DeliveryRow]) -> Result<usize> {
        check_unique(
            rows.iter().map(|d| (d.match_id, d.innings, d.over, d.ball)),
            "(match_id, innings, over, ball)",
        )?;
        let tx = self.conn.unchecked_transaction()?;
        for d in rows {
            tx.execute(
                r#"
                INSERT INTO raw_deliveries (match_id, innings, over, ball, batter_id,
                                            bowler_id, runs_scored, extras, wicket_kind, player_out)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(match_id, innings, over, ball) DO UPDATE SET
                    batter_id = excluded.batter_id,
                    bowler_id = excluded.bowler_id,
                    runs_scored = excluded.runs_scored,
                    extras = excluded.extras,
                    wicket_kind = excluded.wicket_kind,
                    player_out = excluded.player_out
                "#,
                params![
                    d.match_id.0,
                    d.innings,
                    d.over,
                    d.ball,
                    d.batter_id.0,
                    d.bowler_id.0,
                    d.runs_scored,
                    d.extras,
                    d.wicket.as_ref().map(|w| w.kind.as_str()),
                    d.wicket.as_ref().map(|w| w.player_out.0),
                ],
            )?;
        }
        tx.commit()?;
        self.mark_stage(STAGE_RAW_DELIVERIES)?;
        Ok(rows.len())
    }

    /// Upsert a batch of venues
    pub fn write_venues(&self, rows: &[VenueRow]) -> Result<usize> {
        check_unique(rows.iter().map(|v| v.venue_id), "venue_id")?;
        let tx = self.conn.unchecked_transaction()?;
        for v in rows {
            tx.execute(
                r#"
                INSERT INTO venues (venue_id, name, city, country)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(venue_id) DO UPDATE SET
                    name = excluded.name,
                    city = excluded.city,
                    country = excluded.country
                "#,
                params![v.venue_id.0, v.name, v.city, v.country],
            )?;
        }
        tx.commit()?;
        self.mark_stage(STAGE_VENUES)?;
        Ok(rows.len())
    }

    // ==================== Raw reads ====================

    /// All raw matches ordered by date
    pub fn read_matches(&self) -> Result<Vec<MatchRow>> {
        self.require_stage(STAGE_RAW_MATCHES)?;
        self.query_matches("raw_matches")
    }

    /// All raw players ordered by id
    pub fn read_players(&self) -> Result<Vec<PlayerRow>> {
        self.require_stage(STAGE_RAW_PLAYERS)?;
        self.query_players("raw_players")
    }

    /// All raw deliveries in (match, innings, over, ball) order
    pub fn read_deliveries(&self) -> Result<Vec<DeliveryRow>> {
        self.require_stage(STAGE_RAW_DELIVERIES)?;
        let mut stmt = self.conn.prepare(
            "SELECT match_id, innings, over, ball, batter_id, bowler_id,
                    runs_scored, extras, wicket_kind, player_out
             FROM raw_deliveries
             ORDER BY match_id, innings, over, ball",
        )?;
        let rows = stmt
            .query_map([], Self::row_to_raw_delivery)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// All venues ordered by id
    pub fn read_venues(&self) -> Result<Vec<VenueRow>> {
        self.require_stage(STAGE_VENUES)?;
        let mut stmt = self
            .conn
            .prepare("SELECT venue_id, name, city, country FROM venues ORDER BY venue_id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(VenueRow {
                    venue_id: VenueId(row.get(0)?),
                    name: row.get(1)?,
                    city: row.get(2)?,
                    country: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ==================== Clean tables ====================

    /// Replace the clean matches table (cleaner output only)
    pub fn write_clean_matches(&self, rows: &[MatchRow]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM clean_matches", [])?;
        for m in rows {
            tx.execute(
                "INSERT INTO clean_matches (match_id, team1, team2, venue_id, toss_winner,
                                            toss_decision, winner, margin, date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    m.match_id.0,
                    m.team1,
                    m.team2,
                    m.venue_id.0,
                    m.toss_winner,
                    m.toss_decision.as_str(),
                    m.winner,
                    m.margin,
                    m.date.format("%Y-%m-%d").to_string(),
                ],
            )?;
        }
        tx.commit()?;
        self.mark_stage(STAGE_CLEAN_MATCHES)?;
        Ok(rows.len())
    }

    pub fn read_clean_matches(&self) -> Result<Vec<MatchRow>> {
        self.require_stage(STAGE_CLEAN_MATCHES)?;
        self.query_matches("clean_matches")
    }

    /// Replace the clean players table (cleaner output only)
    pub fn write_clean_players(&self, rows: &[PlayerRow]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM clean_players", [])?;
        for p in rows {
            let history = serde_json::to_string(&p.team_history)
                .map_err(|e| CricError::Serialize(e.to_string()))?;
            tx.execute(
                "INSERT INTO clean_players (player_id, name, role, team_history)
                 VALUES (?1, ?2, ?3, ?4)",
                params![p.player_id.0, p.name, p.role.as_str(), history],
            )?;
        }
        tx.commit()?;
        self.mark_stage(STAGE_CLEAN_PLAYERS)?;
        Ok(rows.len())
    }

    pub fn read_clean_players(&self) -> Result<Vec<PlayerRow>> {
        self.require_stage(STAGE_CLEAN_PLAYERS)?;
        self.query_players("clean_players")
    }

    /// Replace the clean deliveries table (cleaner output only)
    pub fn write_clean_deliveries(&self, rows: &[CleanDelivery]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM clean_deliveries", [])?;
        for d in rows {
            tx.execute(
                "INSERT INTO clean_deliveries (match_id, innings, over, ball, batter_id,
                                               bowler_id, runs_scored, extras, wicket_kind, player_out)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    d.match_id.0,
                    d.innings,
                    d.over,
                    d.ball,
                    d.batter_id.0,
                    d.bowler_id.0,
                    d.runs_scored,
                    d.extras,
                    d.wicket.as_ref().map(|w| w.kind.as_str()),
                    d.wicket.as_ref().map(|w| w.player_out.0),
                ],
            )?;
        }
        tx.commit()?;
        self.mark_stage(STAGE_CLEAN_DELIVERIES)?;
        Ok(rows.len())
    }

    pub fn read_clean_deliveries(&self) -> Result<Vec<CleanDelivery>> {
        self.require_stage(STAGE_CLEAN_DELIVERIES)?;
        let mut stmt = self.conn.prepare(
            "SELECT match_id, innings, over, ball, batter_id, bowler_id,
                    runs_scored, extras, wicket_kind, player_out
             FROM clean_deliveries
             ORDER BY match_id, innings, over, ball",
        )?;
        let rows = stmt
            .query_map([], Self::row_to_clean_delivery)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ==================== Feature table ====================

    /// Replace the feature table (transformer output only)
    pub fn write_features(&self, rows: &[FeatureRow]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM features", [])?;
        for f in rows {
            let (kind, key) = f.entity.storage_key();
            tx.execute(
                "INSERT INTO features (entity_kind, entity_key, match_id, date, strike_rate,
                                       batting_average, win_ratio, form_index, momentum_score, has_history)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    kind,
                    key,
                    f.match_id.0,
                    f.date.format("%Y-%m-%d").to_string(),
                    f.strike_rate,
                    f.batting_average,
                    f.win_ratio,
                    f.form_index,
                    f.momentum_score,
                    f.has_history as i64,
                ],
            )?;
        }
        tx.commit()?;
        self.mark_stage(STAGE_FEATURES)?;
        Ok(rows.len())
    }

    pub fn read_features(&self) -> Result<Vec<FeatureRow>> {
        self.require_stage(STAGE_FEATURES)?;
        let mut stmt = self.conn.prepare(
            "SELECT entity_kind, entity_key, match_id, date, strike_rate, batting_average,
                    win_ratio, form_index, momentum_score, has_history
             FROM features
             ORDER BY date, match_id, entity_kind, entity_key",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let kind: String = row.get(0)?;
                let key: String = row.get(1)?;
                let date_str: String = row.get(3)?;
                Ok(FeatureRow {
                    entity: EntityRef::from_storage_key(&kind, &key).ok_or_else(|| {
                        column_error(0, format!("invalid feature entity '{}:{}'", kind, key))
                    })?,
                    match_id: MatchId(row.get(2)?),
                    date: parse_date(&date_str, 3)?,
                    strike_rate: row.get(4)?,
                    batting_average: row.get(5)?,
                    win_ratio: row.get(6)?,
                    form_index: row.get(7)?,
                    momentum_score: row.get(8)?,
                    has_history: row.get::<_, i64>(9)? != 0,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ==================== Row mapping ====================

    fn query_matches(&self, table: &str) -> Result<Vec<MatchRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT match_id, team1, team2, venue_id, toss_winner, toss_decision,
                    winner, margin, date
             FROM {}
             ORDER BY date, match_id",
            table
        ))?;
        let rows = stmt
            .query_map([], Self::row_to_match)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn query_players(&self, table: &str) -> Result<Vec<PlayerRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT player_id, name, role, team_history FROM {} ORDER BY player_id",
            table
        ))?;
        let rows = stmt
            .query_map([], |row| {
                let role_str: String = row.get(2)?;
                let history_json: String = row.get(3)?;
                Ok(PlayerRow {
                    player_id: PlayerId(row.get(0)?),
                    name: row.get(1)?,
                    role: PlayerRole::parse(&role_str)
                        .ok_or_else(|| column_error(2, format!("unknown role '{}'", role_str)))?,
                    team_history: serde_json::from_str(&history_json).map_err(|e| {
                        column_error(3, format!("invalid team history: {}", e))
                    })?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn row_to_match(row: &Row) -> rusqlite::Result<MatchRow> {
        let toss_str: String = row.get(5)?;
        let date_str: String = row.get(8)?;
        Ok(MatchRow {
            match_id: MatchId(row.get(0)?),
            team1: row.get(1)?,
            team2: row.get(2)?,
            venue_id: VenueId(row.get(3)?),
            toss_winner: row.get(4)?,
            toss_decision: TossDecision::parse(&toss_str)
                .ok_or_else(|| column_error(5, format!("unknown toss decision '{}'", toss_str)))?,
            winner: row.get(6)?,
            margin: row.get(7)?,
            date: parse_date(&date_str, 8)?,
        })
    }

    fn row_to_raw_delivery(row: &Row) -> rusqlite::Result<DeliveryRow> {
        Ok(DeliveryRow {
            match_id: MatchId(row.get(0)?),
            innings: row.get(1)?,
            over: row.get(2)?,
            ball: row.get(3)?,
            batter_id: PlayerId(row.get(4)?),
            bowler_id: PlayerId(row.get(5)?),
            runs_scored: row.get(6)?,
            extras: row.get(7)?,
            wicket: wicket_from_columns(row.get(8)?, row.get(9)?),
        })
    }

    fn row_to_clean_delivery(row: &Row) -> rusqlite::Result<CleanDelivery> {
        Ok(CleanDelivery {
            match_id: MatchId(row.get(0)?),
            innings: row.get(1)?,
            over: row.get(2)?,
            ball: row.get(3)?,
            batter_id: PlayerId(row.get(4)?),
            bowler_id: PlayerId(row.get(5)?),
            runs_scored: row.get(6)?,
            extras: row.get(7)?,
            wicket: wicket_from_columns(row.get(8)?, row.get(9)?),
        })
    }
}

fn wicket_from_columns(kind: Option<String>, player_out: Option<i64>) -> Option<Wicket> {
    match (kind, player_out) {
        (Some(kind), Some(id)) => Some(Wicket {
            kind,
            player_out: PlayerId(id),
        }),
        _ => None,
    }
}

/// Invalid column contents fail the read; a fabricated stand-in value would
/// flow straight into the chronological sort and the split cutoff.
fn column_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, message.into())
}

fn parse_date(s: &str, idx: usize) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| column_error(idx, format!("invalid date '{}': {}", s, e)))
}

/// Reject batches containing duplicate declared keys
fn check_unique<K: std::hash::Hash + Eq + std::fmt::Debug>(
    keys: impl Iterator<Item = K>,
    key_name: &str,
) -> Result<()> {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key) {
            return Err(CricError::Validation(format!(
                "duplicate {} within batch",
                key_name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_match(id: i64, day: u32) -> MatchRow {
        MatchRow {
            match_id: MatchId(id),
            team1: "IND".to_string(),
            team2: "AUS".to_string(),
            venue_id: VenueId(1),
            toss_winner: "IND".to_string(),
            toss_decision: TossDecision::Bat,
            winner: Some("IND".to_string()),
            margin: Some("12 runs".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
        }
    }

    #[test]
    fn test_read_before_write_is_not_found() {
        let store = Store::in_memory().unwrap();
        assert!(matches!(
            store.read_matches(),
            Err(CricError::NotFound(_))
        ));
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let store = Store::in_memory().unwrap();
        let batch = vec![make_match(1, 1), make_match(2, 2)];
        store.write_matches(&batch).unwrap();
        store.write_matches(&batch).unwrap();
        assert_eq!(store.read_matches().unwrap().len(), 2);
    }

    #[test]
    fn test_upsert_replaces_by_key() {
        let store = Store::in_memory().unwrap();
        store.write_matches(&[make_match(1, 1)]).unwrap();
        let mut updated = make_match(1, 1);
        updated.winner = Some("AUS".to_string());
        store.write_matches(&[updated]).unwrap();
        let rows = store.read_matches().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].winner.as_deref(), Some("AUS"));
    }

    #[test]
    fn test_duplicate_keys_in_batch_rejected() {
        let store = Store::in_memory().unwrap();
        let result = store.write_matches(&[make_match(1, 1), make_match(1, 2)]);
        assert!(matches!(result, Err(CricError::Validation(_))));
    }

    #[test]
    fn test_stage_versions_recorded() {
        let store = Store::in_memory().unwrap();
        store.write_matches(&[make_match(1, 1)]).unwrap();
        let versions = store.stage_versions().unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].0, STAGE_RAW_MATCHES);
    }

    #[test]
    fn test_corrupt_date_fails_the_read() {
        let store = Store::in_memory().unwrap();
        store.write_matches(&[make_match(1, 1), make_match(2, 2)]).unwrap();
        store
            .conn
            .execute("UPDATE raw_matches SET date = 'not-a-date' WHERE match_id = 2", [])
            .unwrap();
        assert!(matches!(store.read_matches(), Err(CricError::Database(_))));
    }

    #[test]
    fn test_corrupt_toss_decision_fails_the_read() {
        let store = Store::in_memory().unwrap();
        store.write_matches(&[make_match(1, 1)]).unwrap();
        store
            .conn
            .execute("UPDATE raw_matches SET toss_decision = 'declined'", [])
            .unwrap();
        assert!(matches!(store.read_matches(), Err(CricError::Database(_))));
    }

    #[test]
    fn test_corrupt_player_role_fails_the_read() {
        let store = Store::in_memory().unwrap();
        store
            .write_players(&[PlayerRow {
                player_id: PlayerId(1),
                name: "A Sharma".to_string(),
                role: PlayerRole::Batter,
                team_history: vec![],
            }])
            .unwrap();
        store
            .conn
            .execute("UPDATE raw_players SET role = 'umpire'", [])
            .unwrap();
        assert!(matches!(store.read_players(), Err(CricError::Database(_))));
    }

    #[test]
    fn test_delivery_wicket_round_trip() {
        let store = Store::in_memory().unwrap();
        let d = DeliveryRow {
            match_id: MatchId(1),
            innings: 1,
            over: 3,
            ball: 2,
            batter_id: PlayerId(10),
            bowler_id: PlayerId(20),
            runs_scored: Some(0),
            extras: Some(0),
            wicket: Some(Wicket {
                kind: "bowled".to_string(),
                player_out: PlayerId(10),
            }),
        };
        store.write_deliveries(&[d.clone()]).unwrap();
        let rows = store.read_deliveries().unwrap();
        assert_eq!(rows, vec![d]);
    }
}
