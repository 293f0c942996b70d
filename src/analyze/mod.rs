//! Descriptive analytics (EDA)
//!
//! Read-only aggregate views over the clean tables. Every view is a pure
//! function of its inputs, so callers may cache results; empty inputs are an
//! error rather than an empty answer, because "no data" must never be
//! mistaken for a real statistic.

use crate::{
    CleanDelivery, CricError, MatchId, MatchRow, PlayerId, PlayerRow, Result, TossDecision,
    VenueId, VenueRow,
};
use serde::Serialize;
use std::collections::HashMap;

/// One row of the top-scorers view
#[derive(Debug, Clone, Serialize)]
pub struct TopScorer {
    pub player_id: PlayerId,
    pub name: String,
    pub total_runs: i64,
    pub balls_faced: i64,
}

/// One row of the top-wicket-takers view
#[derive(Debug, Clone, Serialize)]
pub struct WicketTaker {
    pub player_id: PlayerId,
    pub name: String,
    pub wickets: i64,
}

/// One row of the venue-averages view
#[derive(Debug, Clone, Serialize)]
pub struct VenueAverage {
    pub venue_id: VenueId,
    pub name: String,
    pub innings_count: usize,
    pub avg_innings_total: f64,
}

/// One row of the toss-impact cross-tab
#[derive(Debug, Clone, Serialize)]
pub struct TossImpact {
    pub decision: TossDecision,
    pub matches: usize,
    pub toss_winner_won: usize,
    pub win_rate: f64,
}

fn player_names(players: &[PlayerRow]) -> HashMap<PlayerId, &str> {
    players
        .iter()
        .map(|p| (p.player_id, p.name.as_str()))
        .collect()
}

/// Top `n` run scorers across all matches
pub fn top_scorers(
    deliveries: &[CleanDelivery],
    players: &[PlayerRow],
    n: usize,
) -> Result<Vec<TopScorer>> {
    if deliveries.is_empty() {
        return Err(CricError::EmptyInput("no deliveries to aggregate".into()));
    }
    let names = player_names(players);
    let mut totals: HashMap<PlayerId, (i64, i64)> = HashMap::new();
    for d in deliveries {
        let entry = totals.entry(d.batter_id).or_default();
        entry.0 += d.runs_scored;
        entry.1 += 1;
    }
    let mut rows: Vec<TopScorer> = totals
        .into_iter()
        .map(|(player_id, (total_runs, balls_faced))| TopScorer {
            player_id,
            name: names.get(&player_id).unwrap_or(&"(unknown)").to_string(),
            total_runs,
            balls_faced,
        })
        .collect();
    rows.sort_by(|a, b| b.total_runs.cmp(&a.total_runs).then(a.player_id.cmp(&b.player_id)));
    rows.truncate(n);
    Ok(rows)
}

/// Top `n` wicket takers. Run outs are not credited to the bowler.
pub fn top_wicket_takers(
    deliveries: &[CleanDelivery],
    players: &[PlayerRow],
    n: usize,
) -> Result<Vec<WicketTaker>> {
    let names = player_names(players);
    let mut totals: HashMap<PlayerId, i64> = HashMap::new();
    for d in deliveries {
        if let Some(w) = &d.wicket {
            if w.kind != "run out" {
                *totals.entry(d.bowler_id).or_default() += 1;
            }
        }
    }
    if totals.is_empty() {
        return Err(CricError::EmptyInput("no wickets in input".into()));
    }
    let mut rows: Vec<WicketTaker> = totals
        .into_iter()
        .map(|(player_id, wickets)| WicketTaker {
            player_id,
            name: names.get(&player_id).unwrap_or(&"(unknown)").to_string(),
            wickets,
        })
        .collect();
    rows.sort_by(|a, b| b.wickets.cmp(&a.wickets).then(a.player_id.cmp(&b.player_id)));
    rows.truncate(n);
    Ok(rows)
}

/// Mean innings total at each venue
pub fn venue_averages(
    matches: &[MatchRow],
    deliveries: &[CleanDelivery],
    venues: &[VenueRow],
) -> Result<Vec<VenueAverage>> {
    if matches.is_empty() || deliveries.is_empty() {
        return Err(CricError::EmptyInput("no matches or deliveries".into()));
    }
    let venue_of: HashMap<MatchId, VenueId> =
        matches.iter().map(|m| (m.match_id, m.venue_id)).collect();
    let venue_names: HashMap<VenueId, &str> =
        venues.iter().map(|v| (v.venue_id, v.name.as_str())).collect();

    let mut innings_totals: HashMap<(MatchId, i64), i64> = HashMap::new();
    for d in deliveries {
        *innings_totals.entry((d.match_id, d.innings)).or_default() += d.total_runs();
    }

    let mut per_venue: HashMap<VenueId, (i64, usize)> = HashMap::new();
    for ((match_id, _innings), total) in innings_totals {
        if let Some(&venue_id) = venue_of.get(&match_id) {
            let entry = per_venue.entry(venue_id).or_default();
            entry.0 += total;
            entry.1 += 1;
        }
    }
    if per_venue.is_empty() {
        return Err(CricError::EmptyInput(
            "no deliveries joined to a known match".into(),
        ));
    }

    let mut rows: Vec<VenueAverage> = per_venue
        .into_iter()
        .map(|(venue_id, (sum, count))| VenueAverage {
            venue_id,
            name: venue_names.get(&venue_id).unwrap_or(&"(unknown)").to_string(),
            innings_count: count,
            avg_innings_total: sum as f64 / count as f64,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.avg_innings_total
            .partial_cmp(&a.avg_innings_total)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(rows)
}

/// Win rate of the toss winner, split by what they elected to do
pub fn toss_impact(matches: &[MatchRow]) -> Result<Vec<TossImpact>> {
    let decided: Vec<&MatchRow> = matches.iter().filter(|m| m.winner.is_some()).collect();
    if decided.is_empty() {
        return Err(CricError::EmptyInput("no decided matches".into()));
    }

    let mut rows = Vec::new();
    for decision in [TossDecision::Bat, TossDecision::Field] {
        let subset: Vec<&&MatchRow> = decided
            .iter()
            .filter(|m| m.toss_decision == decision)
            .collect();
        if subset.is_empty() {
            continue;
        }
        let won = subset
            .iter()
            .filter(|m| m.toss_winner_won() == Some(true))
            .count();
        rows.push(TossImpact {
            decision,
            matches: subset.len(),
            toss_winner_won: won,
            win_rate: won as f64 / subset.len() as f64,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PlayerRole, Wicket};
    use chrono::NaiveDate;

    fn make_delivery(match_id: i64, batter: i64, bowler: i64, runs: i64) -> CleanDelivery {
        CleanDelivery {
            match_id: MatchId(match_id),
            innings: 1,
            over: 0,
            ball: 1,
            batter_id: PlayerId(batter),
            bowler_id: PlayerId(bowler),
            runs_scored: runs,
            extras: 0,
            wicket: None,
        }
    }

    fn make_player(id: i64, name: &str) -> PlayerRow {
        PlayerRow {
            player_id: PlayerId(id),
            name: name.to_string(),
            role: PlayerRole::Batter,
            team_history: vec![],
        }
    }

    fn make_match(id: i64, decision: TossDecision, toss_winner_wins: bool) -> MatchRow {
        MatchRow {
            match_id: MatchId(id),
            team1: "IND".to_string(),
            team2: "AUS".to_string(),
            venue_id: VenueId(1),
            toss_winner: "IND".to_string(),
            toss_decision: decision,
            winner: Some(if toss_winner_wins { "IND" } else { "AUS" }.to_string()),
            margin: None,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        }
    }

    #[test]
    fn test_top_scorers_ordering() {
        let deliveries = vec![
            make_delivery(1, 1, 9, 10),
            make_delivery(1, 2, 9, 40),
            make_delivery(1, 1, 9, 20),
        ];
        let players = vec![make_player(1, "A"), make_player(2, "B")];
        let rows = top_scorers(&deliveries, &players, 10).unwrap();
        assert_eq!(rows[0].player_id, PlayerId(2));
        assert_eq!(rows[0].total_runs, 40);
        assert_eq!(rows[1].total_runs, 30);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(matches!(
            top_scorers(&[], &[], 5),
            Err(CricError::EmptyInput(_))
        ));
        assert!(matches!(toss_impact(&[]), Err(CricError::EmptyInput(_))));
    }

    #[test]
    fn test_run_out_not_credited_to_bowler() {
        let mut caught = make_delivery(1, 1, 7, 0);
        caught.wicket = Some(Wicket {
            kind: "caught".to_string(),
            player_out: PlayerId(1),
        });
        let mut run_out = make_delivery(1, 2, 7, 1);
        run_out.ball = 2;
        run_out.wicket = Some(Wicket {
            kind: "run out".to_string(),
            player_out: PlayerId(2),
        });
        let rows = top_wicket_takers(&[caught, run_out], &[make_player(7, "B")], 5).unwrap();
        assert_eq!(rows[0].wickets, 1);
    }

    #[test]
    fn test_toss_impact_cross_tab() {
        let matches = vec![
            make_match(1, TossDecision::Bat, true),
            make_match(2, TossDecision::Bat, false),
            make_match(3, TossDecision::Field, true),
            make_match(4, TossDecision::Field, true),
        ];
        let rows = toss_impact(&matches).unwrap();
        let bat = rows.iter().find(|r| r.decision == TossDecision::Bat).unwrap();
        let field = rows.iter().find(|r| r.decision == TossDecision::Field).unwrap();
        assert!((bat.win_rate - 0.5).abs() < 1e-9);
        assert!((field.win_rate - 1.0).abs() < 1e-9);
    }
}
