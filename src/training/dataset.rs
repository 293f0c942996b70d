//! Training dataset assembly
//!
//! Joins the feature table back to clean matches and deliveries to produce
//! (feature vector, target) examples for each model kind, and splits them
//! chronologically. Cold-start rows are excluded from training: a model fed
//! all-zero features for an unknown entity would only learn noise.

use crate::data::Store;
use crate::features::{EntityRef, FeatureRow};
use crate::model::ModelKind;
use crate::{CleanDelivery, MatchId, MatchRow, PlayerId, Result, TossDecision, VenueId};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Overs in a limited-overs innings
pub const INNINGS_OVERS: f64 = 20.0;

/// One training or validation example
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub match_id: MatchId,
    pub date: NaiveDate,
    pub features: Vec<f64>,
    pub target: f64,
}

/// All examples for one model kind, sorted chronologically
#[derive(Debug, Clone)]
pub struct Dataset {
    pub kind: ModelKind,
    pub schema: Vec<String>,
    pub examples: Vec<Example>,
}

impl Dataset {
    /// Distinct match dates covered by the examples, ascending
    fn distinct_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.examples.iter().map(|e| e.date).collect();
        dates.sort();
        dates.dedup();
        dates
    }

    /// Chronological split: the earliest (1 - validation_fraction) of match
    /// dates train, the rest validate. Returns the cutoff date; validation
    /// examples are strictly after it.
    pub fn split_cutoff(&self, validation_fraction: f64) -> Option<NaiveDate> {
        let dates = self.distinct_dates();
        if dates.is_empty() {
            return None;
        }
        let train_dates = (((dates.len() as f64) * (1.0 - validation_fraction)).floor() as usize)
            .clamp(1, dates.len());
        Some(dates[train_dates - 1])
    }

    pub fn train_slice(&self, cutoff: NaiveDate) -> Vec<&Example> {
        self.examples.iter().filter(|e| e.date <= cutoff).collect()
    }

    pub fn validation_slice(&self, cutoff: NaiveDate) -> Vec<&Example> {
        self.examples.iter().filter(|e| e.date > cutoff).collect()
    }
}

/// Feature rows indexed for joining
pub struct FeatureIndex {
    teams: HashMap<(String, MatchId), FeatureRow>,
    players: HashMap<(PlayerId, MatchId), FeatureRow>,
}

impl FeatureIndex {
    pub fn new(rows: Vec<FeatureRow>) -> Self {
        let mut teams = HashMap::new();
        let mut players = HashMap::new();
        for row in rows {
            match &row.entity {
                EntityRef::Team(code) => {
                    teams.insert((code.clone(), row.match_id), row);
                }
                EntityRef::Player(id) => {
                    players.insert((*id, row.match_id), row);
                }
            }
        }
        FeatureIndex { teams, players }
    }

    pub fn team(&self, code: &str, match_id: MatchId) -> Option<&FeatureRow> {
        self.teams.get(&(code.to_string(), match_id))
    }

    pub fn player(&self, id: PlayerId, match_id: MatchId) -> Option<&FeatureRow> {
        self.players.get(&(id, match_id))
    }
}

/// Ordered feature names for a model kind; inference must assemble vectors
/// in exactly this order
pub fn schema_for(kind: ModelKind) -> Vec<String> {
    let names: &[&str] = match kind {
        ModelKind::Win => &[
            "team1_win_ratio",
            "team1_form_index",
            "team1_momentum",
            "team2_win_ratio",
            "team2_form_index",
            "team2_momentum",
            "toss_won_by_team1",
            "elected_bat",
        ],
        ModelKind::InningsScore => &[
            "bat_win_ratio",
            "bat_form_index",
            "bat_momentum",
            "venue_avg_total",
            "innings",
            "overs_remaining",
        ],
        ModelKind::PlayerPerformance => &[
            "strike_rate",
            "batting_average",
            "form_index",
            "momentum_score",
        ],
    };
    names.iter().map(|s| s.to_string()).collect()
}

/// Win-model feature vector for one match, if both sides have history
pub fn win_features(index: &FeatureIndex, m: &MatchRow) -> Option<Vec<f64>> {
    let t1 = index.team(&m.team1, m.match_id)?;
    let t2 = index.team(&m.team2, m.match_id)?;
    if !t1.has_history || !t2.has_history {
        return None;
    }
    Some(vec![
        t1.win_ratio,
        t1.form_index,
        t1.momentum_score,
        t2.win_ratio,
        t2.form_index,
        t2.momentum_score,
        if m.toss_winner == m.team1 { 1.0 } else { 0.0 },
        if m.toss_decision == TossDecision::Bat { 1.0 } else { 0.0 },
    ])
}

/// Build the example set for one model kind from persisted stage outputs
pub fn build_dataset(store: &Store, kind: ModelKind) -> Result<Dataset> {
    let matches = store.read_clean_matches()?;
    let deliveries = store.read_clean_deliveries()?;
    let index = FeatureIndex::new(store.read_features()?);

    let mut matches: Vec<&MatchRow> = matches.iter().collect();
    matches.sort_by_key(|m| (m.date, m.match_id));

    let mut by_match: HashMap<MatchId, Vec<&CleanDelivery>> = HashMap::new();
    for d in &deliveries {
        by_match.entry(d.match_id).or_default().push(d);
    }

    let mut examples = Vec::new();
    // Running mean innings total per venue, accumulated as-of
    let mut venue_sums: HashMap<VenueId, (f64, usize)> = HashMap::new();

    for m in &matches {
        let balls = by_match.get(&m.match_id).map(Vec::as_slice).unwrap_or(&[]);
        let mut innings_totals: HashMap<i64, i64> = HashMap::new();
        let mut batter_runs: HashMap<PlayerId, i64> = HashMap::new();
        for d in balls {
            *innings_totals.entry(d.innings).or_default() += d.total_runs();
            *batter_runs.entry(d.batter_id).or_default() += d.runs_scored;
        }

        match kind {
            ModelKind::Win => {
                if let (Some(target), Some(features)) = (
                    m.team1_won().map(|w| if w { 1.0 } else { 0.0 }),
                    win_features(&index, m),
                ) {
                    examples.push(Example {
                        match_id: m.match_id,
                        date: m.date,
                        features,
                        target,
                    });
                }
            }
            ModelKind::InningsScore => {
                let venue_avg = venue_sums
                    .get(&m.venue_id)
                    .map(|(sum, n)| sum / *n as f64)
                    .unwrap_or(0.0);
                let mut innings: Vec<i64> = innings_totals.keys().copied().collect();
                innings.sort();
                for i in innings {
                    let batting = m.batting_team(i);
                    let Some(row) = index.team(batting, m.match_id) else {
                        continue;
                    };
                    if !row.has_history {
                        continue;
                    }
                    examples.push(Example {
                        match_id: m.match_id,
                        date: m.date,
                        features: vec![
                            row.win_ratio,
                            row.form_index,
                            row.momentum_score,
                            venue_avg,
                            i as f64,
                            INNINGS_OVERS,
                        ],
                        target: innings_totals[&i] as f64,
                    });
                }
            }
            ModelKind::PlayerPerformance => {
                let mut batters: Vec<PlayerId> = batter_runs.keys().copied().collect();
                batters.sort();
                for id in batters {
                    let Some(row) = index.player(id, m.match_id) else {
                        continue;
                    };
                    if !row.has_history {
                        continue;
                    }
                    examples.push(Example {
                        match_id: m.match_id,
                        date: m.date,
                        features: vec![
                            row.strike_rate,
                            row.batting_average,
                            row.form_index,
                            row.momentum_score,
                        ],
                        target: batter_runs[&id] as f64,
                    });
                }
            }
        }

        // Fold this match's innings totals into the venue history
        for (_, total) in innings_totals {
            let entry = venue_sums.entry(m.venue_id).or_insert((0.0, 0));
            entry.0 += total as f64;
            entry.1 += 1;
        }
    }

    Ok(Dataset {
        kind,
        schema: schema_for(kind),
        examples,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_example(day: u32) -> Example {
        Example {
            match_id: MatchId(day as i64),
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            features: vec![0.0],
            target: 0.0,
        }
    }

    fn dataset(days: impl Iterator<Item = u32>) -> Dataset {
        Dataset {
            kind: ModelKind::Win,
            schema: vec!["x".to_string()],
            examples: days.map(make_example).collect(),
        }
    }

    #[test]
    fn test_split_is_chronological() {
        let ds = dataset(1..=10);
        let cutoff = ds.split_cutoff(0.2).unwrap();
        assert_eq!(cutoff, NaiveDate::from_ymd_opt(2024, 3, 8).unwrap());
        assert_eq!(ds.train_slice(cutoff).len(), 8);
        assert_eq!(ds.validation_slice(cutoff).len(), 2);
        // every validation example is later than every training example
        for t in ds.train_slice(cutoff) {
            for v in ds.validation_slice(cutoff) {
                assert!(t.date < v.date);
            }
        }
    }

    #[test]
    fn test_split_empty_dataset() {
        let ds = dataset(1..=0);
        assert!(ds.split_cutoff(0.2).is_none());
    }

    #[test]
    fn test_tiny_dataset_trains_everything() {
        let ds = dataset(1..=1);
        let cutoff = ds.split_cutoff(0.2).unwrap();
        assert_eq!(ds.train_slice(cutoff).len(), 1);
        assert!(ds.validation_slice(cutoff).is_empty());
    }
}
