//! Prediction against saved model artifacts
//!
//! Assembles feature vectors from the current rolling state of each entity,
//! validates them against the artifact's stored schema, and scores them.

use crate::clean::canonical_team;
use crate::data::Store;
use crate::features::{current_states, Rolling};
use crate::model::{ModelArtifact, ModelKind};
use crate::training::dataset::{schema_for, INNINGS_OVERS};
use crate::{Config, CricError, PlayerId, Result, TossDecision, VenueId};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct WinPrediction {
    pub team1: String,
    pub team2: String,
    pub team1_win_probability: f64,
    pub predicted_winner: String,
}

#[derive(Debug, Clone)]
pub struct ScorePrediction {
    pub batting_team: String,
    pub venue: String,
    pub innings: i64,
    pub predicted_runs: f64,
}

#[derive(Debug, Clone)]
pub struct PlayerPrediction {
    pub player_id: PlayerId,
    pub name: String,
    pub predicted_runs: f64,
}

/// Scores hypothetical future matches from accumulated history
pub struct Predictor<'a> {
    store: &'a Store,
    config: &'a Config,
}

impl<'a> Predictor<'a> {
    pub fn new(store: &'a Store, config: &'a Config) -> Self {
        Predictor { store, config }
    }

    fn load(&self, kind: ModelKind) -> Result<ModelArtifact> {
        let artifact = ModelArtifact::load(Path::new(&self.config.data.models_dir), kind)?;
        artifact.check_schema(&schema_for(kind))?;
        Ok(artifact)
    }

    fn states(&self) -> Result<(HashMap<String, Rolling>, HashMap<PlayerId, Rolling>)> {
        let matches = self.store.read_clean_matches()?;
        let deliveries = self.store.read_clean_deliveries()?;
        Ok(current_states(&matches, &deliveries, self.config))
    }

    fn team_state<'s>(
        &self,
        teams: &'s HashMap<String, Rolling>,
        raw: &str,
    ) -> Result<(String, &'s Rolling)> {
        let code = canonical_team(raw).into_name();
        let state = teams
            .get(&code)
            .ok_or_else(|| CricError::NotFound(format!("team '{}' has no match history", raw)))?;
        Ok((code, state))
    }

    /// Probability that `team1` beats `team2` given the toss result
    pub fn predict_win(
        &self,
        team1: &str,
        team2: &str,
        toss_winner: &str,
        toss_decision: TossDecision,
    ) -> Result<WinPrediction> {
        let artifact = self.load(ModelKind::Win)?;
        let (teams, _) = self.states()?;
        let (code1, state1) = self.team_state(&teams, team1)?;
        let (code2, state2) = self.team_state(&teams, team2)?;
        let toss_code = canonical_team(toss_winner).into_name();
        if toss_code != code1 && toss_code != code2 {
            return Err(CricError::Validation(format!(
                "toss winner '{}' is not one of the two teams",
                toss_winner
            )));
        }

        let cfg = &self.config.features;
        let features = vec![
            state1.win_ratio(),
            state1.form_index(cfg),
            state1.momentum_score(cfg),
            state2.win_ratio(),
            state2.form_index(cfg),
            state2.momentum_score(cfg),
            if toss_code == code1 { 1.0 } else { 0.0 },
            if toss_decision == TossDecision::Bat { 1.0 } else { 0.0 },
        ];
        let p = artifact.model.predict(&artifact.standardizer.apply(&features));
        Ok(WinPrediction {
            predicted_winner: if p >= 0.5 { code1.clone() } else { code2.clone() },
            team1: code1,
            team2: code2,
            team1_win_probability: p,
        })
    }

    /// Expected innings total for a team batting at a venue
    pub fn predict_innings_score(
        &self,
        batting_team: &str,
        venue: &str,
        innings: i64,
    ) -> Result<ScorePrediction> {
        if !(1..=2).contains(&innings) {
            return Err(CricError::Validation(format!(
                "innings must be 1 or 2, got {}",
                innings
            )));
        }
        let artifact = self.load(ModelKind::InningsScore)?;
        let (teams, _) = self.states()?;
        let (code, state) = self.team_state(&teams, batting_team)?;
        let venue_row = self.find_venue(venue)?;
        let venue_avg = self.venue_average_total(venue_row.venue_id)?;

        let cfg = &self.config.features;
        let features = vec![
            state.win_ratio(),
            state.form_index(cfg),
            state.momentum_score(cfg),
            venue_avg,
            innings as f64,
            INNINGS_OVERS,
        ];
        let runs = artifact
            .model
            .predict(&artifact.standardizer.apply(&features))
            .max(0.0);
        Ok(ScorePrediction {
            batting_team: code,
            venue: venue_row.name,
            innings,
            predicted_runs: runs,
        })
    }

    /// Expected runs for a batter in their next match
    pub fn predict_player_performance(&self, player_name: &str) -> Result<PlayerPrediction> {
        let artifact = self.load(ModelKind::PlayerPerformance)?;
        let player = self
            .store
            .read_clean_players()?
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(player_name))
            .ok_or_else(|| CricError::NotFound(format!("player '{}' not found", player_name)))?;
        let (_, players) = self.states()?;
        let state = players.get(&player.player_id).ok_or_else(|| {
            CricError::NotFound(format!("player '{}' has no batting history", player.name))
        })?;

        let cfg = &self.config.features;
        let features = vec![
            state.strike_rate(),
            state.batting_average(),
            state.form_index(cfg),
            state.momentum_score(cfg),
        ];
        let runs = artifact
            .model
            .predict(&artifact.standardizer.apply(&features))
            .max(0.0);
        Ok(PlayerPrediction {
            player_id: player.player_id,
            name: player.name,
            predicted_runs: runs,
        })
    }

    fn find_venue(&self, name: &str) -> Result<crate::VenueRow> {
        self.store
            .read_venues()?
            .into_iter()
            .find(|v| v.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| CricError::NotFound(format!("venue '{}' not found", name)))
    }

    /// Mean innings total seen at one venue, 0.0 with no history
    fn venue_average_total(&self, venue_id: VenueId) -> Result<f64> {
        let matches = self.store.read_clean_matches()?;
        let deliveries = self.store.read_clean_deliveries()?;
        let mut totals: HashMap<(crate::MatchId, i64), i64> = HashMap::new();
        for m in matches.iter().filter(|m| m.venue_id == venue_id) {
            for d in deliveries.iter().filter(|d| d.match_id == m.match_id) {
                *totals.entry((d.match_id, d.innings)).or_default() += d.total_runs();
            }
        }
        if totals.is_empty() {
            return Ok(0.0);
        }
        let sum: i64 = totals.values().sum();
        Ok(sum as f64 / totals.len() as f64)
    }
}
