//! Cleaning stage
//!
//! Produces validated, de-duplicated versions of the raw tables. Rows with
//! missing or negative required numerics are dropped, never imputed; name
//! aliases are collapsed to canonical codes; everything removed or flagged is
//! accounted for in a [`CleaningReport`].

pub mod names;

pub use names::{canonical_team, Mapped};

use crate::data::Store;
use crate::{
    CleanDelivery, Config, CricError, DeliveryRow, MatchRow, PlayerRow, Result,
};
use serde::Serialize;
use std::collections::HashSet;

/// Why rows were removed or flagged during cleaning
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReasonCounts {
    /// Exact-duplicate rows, or repeated delivery keys beyond the first
    pub duplicate: usize,
    /// Null or negative required numeric columns
    pub null_required: usize,
    /// Names with no canonical mapping (flagged, row kept)
    pub unmapped_name: usize,
    /// Winners that were neither participant, nulled to no result
    pub foreign_winner: usize,
}

/// Per-table accounting for one cleaning pass
#[derive(Debug, Clone, Serialize)]
pub struct CleaningReport {
    pub entity: String,
    pub rows_before: usize,
    pub rows_removed: usize,
    pub rows_after: usize,
    pub reasons: ReasonCounts,
}

impl CleaningReport {
    fn new(entity: &str, rows_before: usize, rows_after: usize, reasons: ReasonCounts) -> Self {
        CleaningReport {
            entity: entity.to_string(),
            rows_before,
            rows_removed: rows_before - rows_after,
            rows_after,
            reasons,
        }
    }

    /// Fail if too few rows survived - that signals a broken source, not noise
    fn check_survival(&self, min_fraction: f64) -> Result<()> {
        if self.rows_before > 0
            && (self.rows_after as f64) < min_fraction * self.rows_before as f64
        {
            return Err(CricError::Validation(format!(
                "only {}/{} {} rows survived cleaning (minimum fraction {})",
                self.rows_after, self.rows_before, self.entity, min_fraction
            )));
        }
        Ok(())
    }
}

/// Reports for all three entity streams
#[derive(Debug, Clone, Serialize)]
pub struct CleaningSummary {
    pub matches: CleaningReport,
    pub players: CleaningReport,
    pub deliveries: CleaningReport,
}

/// Clean a batch of match rows: dedup, canonicalize names, enforce the
/// winner-is-a-participant invariant
pub fn clean_matches(raw: &[MatchRow]) -> (Vec<MatchRow>, CleaningReport) {
    let mut reasons = ReasonCounts::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());

    for row in raw {
        let fingerprint = format!("{:?}", row);
        if !seen.insert(fingerprint) {
            reasons.duplicate += 1;
            continue;
        }

        let mut m = row.clone();
        for name in [&mut m.team1, &mut m.team2, &mut m.toss_winner] {
            let mapped = canonical_team(name);
            if mapped.is_unmapped() {
                reasons.unmapped_name += 1;
            }
            *name = mapped.into_name();
        }
        if let Some(w) = m.winner.take() {
            let mapped = canonical_team(&w);
            if mapped.is_unmapped() {
                reasons.unmapped_name += 1;
            }
            let w = mapped.into_name();
            // A winner that is neither participant is treated as no result
            if w == m.team1 || w == m.team2 {
                m.winner = Some(w);
            } else {
                reasons.foreign_winner += 1;
            }
        }
        out.push(m);
    }

    let report = CleaningReport::new("matches", raw.len(), out.len(), reasons);
    (out, report)
}

/// Clean a batch of player rows: dedup and trim names
pub fn clean_players(raw: &[PlayerRow]) -> (Vec<PlayerRow>, CleaningReport) {
    let mut reasons = ReasonCounts::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());

    for row in raw {
        let fingerprint = format!("{:?}", row);
        if !seen.insert(fingerprint) {
            reasons.duplicate += 1;
            continue;
        }
        let mut p = row.clone();
        p.name = p.name.trim().to_string();
        out.push(p);
    }

    let report = CleaningReport::new("players", raw.len(), out.len(), reasons);
    (out, report)
}

/// Clean a batch of deliveries: deterministic key dedup (first occurrence
/// wins) and drop of null/negative required numerics
pub fn clean_deliveries(raw: &[DeliveryRow]) -> (Vec<CleanDelivery>, CleaningReport) {
    let mut reasons = ReasonCounts::default();
    let mut seen_keys: HashSet<(i64, i64, i64, i64)> = HashSet::new();
    let mut out = Vec::with_capacity(raw.len());

    for row in raw {
        let key = (row.match_id.0, row.innings, row.over, row.ball);
        if !seen_keys.insert(key) {
            reasons.duplicate += 1;
            continue;
        }

        let runs = match row.runs_scored {
            Some(r) if r >= 0 => r,
            _ => {
                reasons.null_required += 1;
                continue;
            }
        };
        if row.innings < 1 || row.over < 0 || row.ball < 1 {
            reasons.null_required += 1;
            continue;
        }
        let extras = match row.extras {
            Some(e) if e >= 0 => e,
            Some(_) => {
                reasons.null_required += 1;
                continue;
            }
            None => 0,
        };

        out.push(CleanDelivery {
            match_id: row.match_id,
            innings: row.innings,
            over: row.over,
            ball: row.ball,
            batter_id: row.batter_id,
            bowler_id: row.bowler_id,
            runs_scored: runs,
            extras,
            wicket: row.wicket.clone(),
        });
    }

    let report = CleaningReport::new("deliveries", raw.len(), out.len(), reasons);
    (out, report)
}

/// Run all three cleaners against the store and persist the clean tables
pub fn clean_all(store: &Store, config: &Config) -> Result<CleaningSummary> {
    let min = config.cleaning.min_survival_fraction;

    let (matches, matches_report) = clean_matches(&store.read_matches()?);
    matches_report.check_survival(min)?;

    let (players, players_report) = clean_players(&store.read_players()?);
    players_report.check_survival(min)?;

    let (deliveries, deliveries_report) = clean_deliveries(&store.read_deliveries()?);
    deliveries_report.check_survival(min)?;

    store.write_clean_matches(&matches)?;
    store.write_clean_players(&players)?;
    store.write_clean_deliveries(&deliveries)?;

    for report in [&matches_report, &players_report, &deliveries_report] {
        log::info!(
            "Cleaned {}: {} -> {} rows ({} duplicate, {} null_required, {} unmapped_name, {} foreign_winner)",
            report.entity,
            report.rows_before,
            report.rows_after,
            report.reasons.duplicate,
            report.reasons.null_required,
            report.reasons.unmapped_name,
            report.reasons.foreign_winner
        );
    }

    Ok(CleaningSummary {
        matches: matches_report,
        players: players_report,
        deliveries: deliveries_report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MatchId, PlayerId, TossDecision, VenueId};
    use chrono::NaiveDate;

    fn make_match(id: i64, team1: &str, winner: Option<&str>) -> MatchRow {
        MatchRow {
            match_id: MatchId(id),
            team1: team1.to_string(),
            team2: "AUS".to_string(),
            venue_id: VenueId(1),
            toss_winner: team1.to_string(),
            toss_decision: TossDecision::Bat,
            winner: winner.map(|w| w.to_string()),
            margin: None,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        }
    }

    fn make_delivery(over: i64, ball: i64, runs: Option<i64>) -> DeliveryRow {
        DeliveryRow {
            match_id: MatchId(1),
            innings: 1,
            over,
            ball,
            batter_id: PlayerId(1),
            bowler_id: PlayerId(2),
            runs_scored: runs,
            extras: Some(0),
            wicket: None,
        }
    }

    #[test]
    fn test_exact_duplicates_dropped() {
        let rows = vec![make_match(1, "IND", Some("IND")), make_match(1, "IND", Some("IND"))];
        let (clean, report) = clean_matches(&rows);
        assert_eq!(clean.len(), 1);
        assert_eq!(report.rows_removed, 1);
        assert_eq!(report.reasons.duplicate, 1);
    }

    #[test]
    fn test_aliases_canonicalized() {
        let rows = vec![make_match(1, "Chennai Super Kings", Some("Chennai Super Kings"))];
        let (clean, report) = clean_matches(&rows);
        assert_eq!(clean[0].team1, "CSK");
        assert_eq!(clean[0].winner.as_deref(), Some("CSK"));
        assert_eq!(report.reasons.unmapped_name, 0);
    }

    #[test]
    fn test_foreign_winner_becomes_no_result() {
        let rows = vec![make_match(1, "IND", Some("ENG"))];
        let (clean, report) = clean_matches(&rows);
        assert_eq!(clean[0].winner, None);
        // ENG maps fine; it is only foreign, so it must not also count as unmapped
        assert_eq!(report.reasons.foreign_winner, 1);
        assert_eq!(report.reasons.unmapped_name, 0);
    }

    #[test]
    fn test_unmapped_foreign_winner_counted_once_per_reason() {
        let rows = vec![make_match(1, "IND", Some("Wanderers XI"))];
        let (clean, report) = clean_matches(&rows);
        assert_eq!(clean[0].winner, None);
        assert_eq!(report.reasons.unmapped_name, 1);
        assert_eq!(report.reasons.foreign_winner, 1);
    }

    #[test]
    fn test_null_and_negative_runs_dropped() {
        let rows = vec![
            make_delivery(0, 1, Some(4)),
            make_delivery(0, 2, None),
            make_delivery(0, 3, Some(-1)),
        ];
        let (clean, report) = clean_deliveries(&rows);
        assert_eq!(clean.len(), 1);
        assert_eq!(report.reasons.null_required, 2);
    }

    #[test]
    fn test_delivery_dedup_is_deterministic() {
        let mut second = make_delivery(0, 1, Some(6));
        second.batter_id = PlayerId(99);
        let rows = vec![make_delivery(0, 1, Some(4)), second];

        let (first_pass, _) = clean_deliveries(&rows);
        let (second_pass, _) = clean_deliveries(&rows);
        assert_eq!(first_pass, second_pass);
        // First occurrence wins
        assert_eq!(first_pass[0].runs_scored, 4);
        assert_eq!(first_pass[0].batter_id, PlayerId(1));
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let rows = vec![
            make_delivery(0, 1, Some(4)),
            make_delivery(0, 2, None),
            make_delivery(1, 1, Some(2)),
        ];
        let (clean, _) = clean_deliveries(&rows);
        let raw_again: Vec<DeliveryRow> = clean
            .iter()
            .map(|d| DeliveryRow {
                match_id: d.match_id,
                innings: d.innings,
                over: d.over,
                ball: d.ball,
                batter_id: d.batter_id,
                bowler_id: d.bowler_id,
                runs_scored: Some(d.runs_scored),
                extras: Some(d.extras),
                wicket: d.wicket.clone(),
            })
            .collect();
        let (clean2, report2) = clean_deliveries(&raw_again);
        assert_eq!(clean2, clean);
        assert_eq!(report2.rows_removed, 0);
    }

    #[test]
    fn test_survival_threshold_enforced() {
        let store = Store::in_memory().unwrap();
        let rows: Vec<DeliveryRow> = (1..=10)
            .map(|ball| make_delivery(0, ball, if ball <= 8 { None } else { Some(1) }))
            .collect();
        store.write_deliveries(&rows).unwrap();
        store.write_matches(&[make_match(1, "IND", Some("IND"))]).unwrap();
        store
            .write_players(&[PlayerRow {
                player_id: PlayerId(1),
                name: "A Sharma".to_string(),
                role: crate::PlayerRole::Batter,
                team_history: vec![],
            }])
            .unwrap();

        let result = clean_all(&store, &Config::default());
        assert!(matches!(result, Err(CricError::Validation(_))));
    }
}
