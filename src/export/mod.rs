//! Star-schema CSV export
//!
//! Writes three dimension tables and three fact tables from the clean
//! stage. Referential integrity across the whole schema is verified before
//! any file is created, so a failed export never leaves partial output.

use crate::data::Store;
use crate::{
    CleanDelivery, Config, CricError, MatchId, MatchRow, PlayerId, PlayerRow, Result, VenueRow,
};
use log::info;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ExportSummary {
    /// (file name, data rows) per table written
    pub tables: Vec<(String, usize)>,
    pub export_dir: PathBuf,
}

#[derive(Debug, Serialize)]
struct DimTeam<'a> {
    team_code: &'a str,
    matches_played: usize,
    wins: usize,
}

#[derive(Debug, Serialize)]
struct DimPlayer<'a> {
    player_id: i64,
    name: &'a str,
    role: &'a str,
    current_team: &'a str,
}

#[derive(Debug, Serialize)]
struct DimVenue<'a> {
    venue_id: i64,
    name: &'a str,
    city: &'a str,
    country: &'a str,
}

#[derive(Debug, Serialize)]
struct FactMatch<'a> {
    match_id: i64,
    date: String,
    team1: &'a str,
    team2: &'a str,
    venue_id: i64,
    toss_winner: &'a str,
    toss_decision: &'a str,
    winner: &'a str,
    margin: &'a str,
}

#[derive(Debug, Serialize)]
struct FactDelivery<'a> {
    match_id: i64,
    innings: i64,
    over: i64,
    ball: i64,
    batter_id: i64,
    bowler_id: i64,
    runs_scored: i64,
    extras: i64,
    wicket_kind: &'a str,
    player_out: String,
}

#[derive(Debug, Serialize)]
struct FactPlayerInnings {
    match_id: i64,
    innings: i64,
    player_id: i64,
    runs: i64,
    balls_faced: i64,
    dismissed: bool,
}

/// Check every foreign key in the fact tables before anything is written
fn check_integrity(
    matches: &[MatchRow],
    players: &[PlayerRow],
    venues: &[VenueRow],
    deliveries: &[CleanDelivery],
) -> Result<()> {
    let match_ids: HashSet<MatchId> = matches.iter().map(|m| m.match_id).collect();
    let player_ids: HashSet<PlayerId> = players.iter().map(|p| p.player_id).collect();
    let venue_ids: HashSet<_> = venues.iter().map(|v| v.venue_id).collect();

    for m in matches {
        if !venue_ids.contains(&m.venue_id) {
            return Err(CricError::ReferentialIntegrity(format!(
                "{} references unknown {}",
                m.match_id, m.venue_id
            )));
        }
        // dim_teams only carries participants, so a third-party toss winner
        // would export as a dangling team code
        if m.toss_winner != m.team1 && m.toss_winner != m.team2 {
            return Err(CricError::ReferentialIntegrity(format!(
                "{} toss winner '{}' is not a participant",
                m.match_id, m.toss_winner
            )));
        }
    }
    for d in deliveries {
        if !match_ids.contains(&d.match_id) {
            return Err(CricError::ReferentialIntegrity(format!(
                "delivery references unknown {}",
                d.match_id
            )));
        }
        for id in [d.batter_id, d.bowler_id]
            .into_iter()
            .chain(d.wicket.as_ref().map(|w| w.player_out))
        {
            if !player_ids.contains(&id) {
                return Err(CricError::ReferentialIntegrity(format!(
                    "delivery in {} references unknown {}",
                    d.match_id, id
                )));
            }
        }
    }
    Ok(())
}

fn write_table<T: Serialize>(dir: &Path, name: &str, rows: &[T]) -> Result<usize> {
    let path = dir.join(name);
    let mut writer = csv::Writer::from_path(&path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(rows.len())
}

/// Export the clean tables as a star schema under `config.data.export_dir`
pub fn export(store: &Store, config: &Config) -> Result<ExportSummary> {
    let matches = store.read_clean_matches()?;
    let players = store.read_clean_players()?;
    let venues = store.read_venues()?;
    let deliveries = store.read_clean_deliveries()?;

    check_integrity(&matches, &players, &venues, &deliveries)?;

    let dir = PathBuf::from(&config.data.export_dir);
    std::fs::create_dir_all(&dir)?;

    // dim_teams: team codes seen in clean matches, with win/played tallies
    let mut team_tallies: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for m in &matches {
        for team in [m.team1.as_str(), m.team2.as_str()] {
            let entry = team_tallies.entry(team).or_default();
            entry.0 += 1;
            if m.winner.as_deref() == Some(team) {
                entry.1 += 1;
            }
        }
    }
    let dim_teams: Vec<DimTeam> = team_tallies
        .iter()
        .map(|(code, (played, wins))| DimTeam {
            team_code: code,
            matches_played: *played,
            wins: *wins,
        })
        .collect();

    let dim_players: Vec<DimPlayer> = players
        .iter()
        .map(|p| DimPlayer {
            player_id: p.player_id.0,
            name: &p.name,
            role: p.role.as_str(),
            current_team: p
                .team_history
                .last()
                .map(|s| s.team.as_str())
                .unwrap_or(""),
        })
        .collect();

    let dim_venues: Vec<DimVenue> = venues
        .iter()
        .map(|v| DimVenue {
            venue_id: v.venue_id.0,
            name: &v.name,
            city: &v.city,
            country: &v.country,
        })
        .collect();

    let fact_matches: Vec<FactMatch> = matches
        .iter()
        .map(|m| FactMatch {
            match_id: m.match_id.0,
            date: m.date.format("%Y-%m-%d").to_string(),
            team1: &m.team1,
            team2: &m.team2,
            venue_id: m.venue_id.0,
            toss_winner: &m.toss_winner,
            toss_decision: m.toss_decision.as_str(),
            winner: m.winner.as_deref().unwrap_or(""),
            margin: m.margin.as_deref().unwrap_or(""),
        })
        .collect();

    let fact_deliveries: Vec<FactDelivery> = deliveries
        .iter()
        .map(|d| FactDelivery {
            match_id: d.match_id.0,
            innings: d.innings,
            over: d.over,
            ball: d.ball,
            batter_id: d.batter_id.0,
            bowler_id: d.bowler_id.0,
            runs_scored: d.runs_scored,
            extras: d.extras,
            wicket_kind: d.wicket.as_ref().map(|w| w.kind.as_str()).unwrap_or(""),
            player_out: d
                .wicket
                .as_ref()
                .map(|w| w.player_out.0.to_string())
                .unwrap_or_default(),
        })
        .collect();

    // fact_player_innings: per-batter aggregates within each innings
    let mut innings_tallies: BTreeMap<(i64, i64, i64), (i64, i64, bool)> = BTreeMap::new();
    for d in &deliveries {
        let key = (d.match_id.0, d.innings, d.batter_id.0);
        let entry = innings_tallies.entry(key).or_default();
        entry.0 += d.runs_scored;
        entry.1 += 1;
        if let Some(w) = &d.wicket {
            let out_key = (d.match_id.0, d.innings, w.player_out.0);
            innings_tallies.entry(out_key).or_default().2 = true;
        }
    }
    let fact_player_innings: Vec<FactPlayerInnings> = innings_tallies
        .iter()
        .map(|(&(match_id, innings, player_id), &(runs, balls, dismissed))| FactPlayerInnings {
            match_id,
            innings,
            player_id,
            runs,
            balls_faced: balls,
            dismissed,
        })
        .collect();

    let tables = vec![
        ("dim_teams.csv".to_string(), write_table(&dir, "dim_teams.csv", &dim_teams)?),
        ("dim_players.csv".to_string(), write_table(&dir, "dim_players.csv", &dim_players)?),
        ("dim_venues.csv".to_string(), write_table(&dir, "dim_venues.csv", &dim_venues)?),
        ("fact_matches.csv".to_string(), write_table(&dir, "fact_matches.csv", &fact_matches)?),
        (
            "fact_deliveries.csv".to_string(),
            write_table(&dir, "fact_deliveries.csv", &fact_deliveries)?,
        ),
        (
            "fact_player_innings.csv".to_string(),
            write_table(&dir, "fact_player_innings.csv", &fact_player_innings)?,
        ),
    ];
    for (name, rows) in &tables {
        info!("exported {} ({} rows)", name, rows);
    }

    Ok(ExportSummary {
        tables,
        export_dir: dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TossDecision, VenueId, Wicket};
    use chrono::NaiveDate;

    fn make_match(id: i64) -> MatchRow {
        MatchRow {
            match_id: MatchId(id),
            team1: "IND".to_string(),
            team2: "AUS".to_string(),
            venue_id: VenueId(1),
            toss_winner: "IND".to_string(),
            toss_decision: TossDecision::Bat,
            winner: Some("IND".to_string()),
            margin: Some("5 runs".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        }
    }

    fn make_venue(id: i64) -> VenueRow {
        VenueRow {
            venue_id: VenueId(id),
            name: "Eden Gardens".to_string(),
            city: "Kolkata".to_string(),
            country: "India".to_string(),
        }
    }

    fn make_delivery(batter: i64, bowler: i64) -> CleanDelivery {
        CleanDelivery {
            match_id: MatchId(1),
            innings: 1,
            over: 0,
            ball: 1,
            batter_id: PlayerId(batter),
            bowler_id: PlayerId(bowler),
            runs_scored: 4,
            extras: 0,
            wicket: None,
        }
    }

    fn make_player(id: i64) -> PlayerRow {
        PlayerRow {
            player_id: PlayerId(id),
            name: format!("Player {}", id),
            role: crate::PlayerRole::Batter,
            team_history: vec![],
        }
    }

    #[test]
    fn test_integrity_passes_on_consistent_data() {
        let result = check_integrity(
            &[make_match(1)],
            &[make_player(10), make_player(20)],
            &[make_venue(1)],
            &[make_delivery(10, 20)],
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_dangling_batter_rejected() {
        let err = check_integrity(
            &[make_match(1)],
            &[make_player(20)],
            &[make_venue(1)],
            &[make_delivery(10, 20)],
        )
        .unwrap_err();
        assert!(matches!(err, CricError::ReferentialIntegrity(_)));
    }

    #[test]
    fn test_dangling_player_out_rejected() {
        let mut d = make_delivery(10, 20);
        d.wicket = Some(Wicket {
            kind: "caught".to_string(),
            player_out: PlayerId(99),
        });
        let err = check_integrity(
            &[make_match(1)],
            &[make_player(10), make_player(20)],
            &[make_venue(1)],
            &[d],
        )
        .unwrap_err();
        assert!(matches!(err, CricError::ReferentialIntegrity(_)));
    }

    #[test]
    fn test_foreign_toss_winner_rejected() {
        let mut m = make_match(1);
        m.toss_winner = "ENG".to_string();
        let err = check_integrity(&[m], &[], &[make_venue(1)], &[]).unwrap_err();
        assert!(matches!(err, CricError::ReferentialIntegrity(_)));
    }

    #[test]
    fn test_dangling_venue_rejected() {
        let err = check_integrity(&[make_match(1)], &[], &[make_venue(2)], &[]).unwrap_err();
        assert!(matches!(err, CricError::ReferentialIntegrity(_)));
    }

    #[test]
    fn test_delivery_without_match_rejected() {
        let err = check_integrity(
            &[],
            &[make_player(10), make_player(20)],
            &[make_venue(1)],
            &[make_delivery(10, 20)],
        )
        .unwrap_err();
        assert!(matches!(err, CricError::ReferentialIntegrity(_)));
    }
}
