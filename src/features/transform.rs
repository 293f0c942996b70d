//! As-of feature transformer
//!
//! Walks clean matches in date order, emitting feature rows for both teams
//! and every batter in each match from state accumulated strictly before
//! that match, then folding the match in. Removing future matches from the
//! input can therefore never change an earlier row.

use crate::data::Store;
use crate::features::{EntityRef, FeatureRow, Rolling};
use crate::{CleanDelivery, Config, MatchId, MatchRow, PlayerId, Result};
use std::collections::{BTreeSet, HashMap};

/// Per-match batting totals for one entity
#[derive(Debug, Default, Clone, Copy)]
struct MatchTally {
    runs: i64,
    balls: i64,
    dismissals: i64,
}

/// Compute and persist the feature table; returns rows written
pub fn transform(store: &Store, config: &Config) -> Result<usize> {
    let matches = store.read_clean_matches()?;
    let deliveries = store.read_clean_deliveries()?;
    let rows = build_features(&matches, &deliveries, config);
    store.write_features(&rows)?;
    log::info!("Transformed {} matches into {} feature rows", matches.len(), rows.len());
    Ok(rows.len())
}

/// Pure core of the transformer, separated for testing
pub fn build_features(
    matches: &[MatchRow],
    deliveries: &[CleanDelivery],
    config: &Config,
) -> Vec<FeatureRow> {
    let mut out = Vec::new();
    walk(matches, deliveries, config, &mut |row| out.push(row));
    out
}

/// Rolling state after folding in every match, keyed by entity.
/// This is what a prediction about a hypothetical next match reads from.
pub fn current_states(
    matches: &[MatchRow],
    deliveries: &[CleanDelivery],
    config: &Config,
) -> (HashMap<String, Rolling>, HashMap<PlayerId, Rolling>) {
    walk(matches, deliveries, config, &mut |_| {})
}

fn walk(
    matches: &[MatchRow],
    deliveries: &[CleanDelivery],
    config: &Config,
    on_row: &mut dyn FnMut(FeatureRow),
) -> (HashMap<String, Rolling>, HashMap<PlayerId, Rolling>) {
    let cfg = &config.features;

    let mut by_match: HashMap<MatchId, Vec<&CleanDelivery>> = HashMap::new();
    for d in deliveries {
        by_match.entry(d.match_id).or_default().push(d);
    }

    let mut matches: Vec<&MatchRow> = matches.iter().collect();
    matches.sort_by_key(|m| (m.date, m.match_id));

    let mut teams: HashMap<String, Rolling> = HashMap::new();
    let mut players: HashMap<PlayerId, Rolling> = HashMap::new();

    for m in matches {
        let balls = by_match.get(&m.match_id).map(Vec::as_slice).unwrap_or(&[]);

        // Attribute each delivery to the batting side
        let mut team_tallies: HashMap<&str, MatchTally> = HashMap::new();
        let mut player_tallies: HashMap<PlayerId, MatchTally> = HashMap::new();
        let mut player_team: HashMap<PlayerId, String> = HashMap::new();
        for d in balls {
            let batting = m.batting_team(d.innings).to_string();

            let side = if batting == m.team1 {
                m.team1.as_str()
            } else {
                m.team2.as_str()
            };
            let t = team_tallies.entry(side).or_default();
            t.runs += d.runs_scored;
            t.balls += 1;

            let p = player_tallies.entry(d.batter_id).or_default();
            p.runs += d.runs_scored;
            p.balls += 1;
            player_team.entry(d.batter_id).or_insert(batting);

            if let Some(w) = &d.wicket {
                if let Some(t) = team_tallies.get_mut(side) {
                    t.dismissals += 1;
                }
                player_tallies.entry(w.player_out).or_default().dismissals += 1;
            }
        }

        // Emit as-of rows before folding the match in
        for team in [&m.team1, &m.team2] {
            let state = teams.entry(team.clone()).or_default();
            on_row(feature_row(EntityRef::Team(team.clone()), m, state, config));
        }
        // BTreeSet gives a stable emission order
        let batters: BTreeSet<PlayerId> = player_tallies.keys().copied().collect();
        for id in &batters {
            let state = players.entry(*id).or_default();
            on_row(feature_row(EntityRef::Player(*id), m, state, config));
        }

        // Fold match N in for the next iteration
        for team in [&m.team1, &m.team2] {
            let tally = team_tallies.get(&team[..]).copied().unwrap_or_default();
            let won = m.winner.as_deref().map(|w| w == *team);
            if let Some(state) = teams.get_mut(team) {
                state.update(cfg, tally.runs, tally.balls, tally.dismissals, won);
            }
        }
        for id in &batters {
            let tally = player_tallies[id];
            let won = match (m.winner.as_deref(), player_team.get(id)) {
                (Some(w), Some(team)) => Some(w == team),
                _ => None,
            };
            if let Some(state) = players.get_mut(id) {
                state.update(cfg, tally.runs, tally.balls, tally.dismissals, won);
            }
        }
    }

    (teams, players)
}

fn feature_row(entity: EntityRef, m: &MatchRow, state: &Rolling, config: &Config) -> FeatureRow {
    let cfg = &config.features;
    FeatureRow {
        entity,
        match_id: m.match_id,
        date: m.date,
        strike_rate: state.strike_rate(),
        batting_average: state.batting_average(),
        win_ratio: state.win_ratio(),
        form_index: state.form_index(cfg),
        momentum_score: state.momentum_score(cfg),
        has_history: state.has_history(),
    }
}
