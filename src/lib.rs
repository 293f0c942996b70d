//! Cricket analytics pipeline
//!
//! A sequential batch pipeline that turns raw match / player / delivery
//! records into rolling features, trained predictive models, and star-schema
//! export tables. Stages communicate only through the record store, so each
//! stage can be re-run independently as long as its upstream output exists.

pub mod analyze;
pub mod clean;
pub mod data;
pub mod export;
pub mod features;
pub mod model;
pub mod predict;
pub mod training;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unique identifier for a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchId(pub i64);

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Match({})", self.0)
    }
}

/// Unique identifier for a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub i64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player({})", self.0)
    }
}

/// Unique identifier for a venue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VenueId(pub i64);

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Venue({})", self.0)
    }
}

/// What the toss winner elected to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TossDecision {
    Bat,
    Field,
}

impl TossDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            TossDecision::Bat => "bat",
            TossDecision::Field => "field",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bat" => Some(TossDecision::Bat),
            "field" | "bowl" => Some(TossDecision::Field),
            _ => None,
        }
    }
}

impl fmt::Display for TossDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Playing role of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerRole {
    Batter,
    Bowler,
    AllRounder,
}

impl PlayerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerRole::Batter => "batter",
            PlayerRole::Bowler => "bowler",
            PlayerRole::AllRounder => "all-rounder",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "batter" | "batsman" => Some(PlayerRole::Batter),
            "bowler" => Some(PlayerRole::Bowler),
            "all-rounder" | "allrounder" => Some(PlayerRole::AllRounder),
            _ => None,
        }
    }
}

impl fmt::Display for PlayerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry in a player's team history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStint {
    pub team: String,
    pub from: NaiveDate,
    pub to: Option<NaiveDate>,
}

/// A match record as ingested (and, after cleaning, with canonical names)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRow {
    pub match_id: MatchId,
    pub team1: String,
    pub team2: String,
    pub venue_id: VenueId,
    pub toss_winner: String,
    pub toss_decision: TossDecision,
    /// None = no result / tie
    pub winner: Option<String>,
    pub margin: Option<String>,
    pub date: NaiveDate,
}

impl MatchRow {
    /// True if team1 won; None when the match had no result
    pub fn team1_won(&self) -> Option<bool> {
        self.winner.as_deref().map(|w| w == self.team1)
    }

    /// True if the toss winner also won the match
    pub fn toss_winner_won(&self) -> Option<bool> {
        self.winner.as_deref().map(|w| w == self.toss_winner)
    }

    /// The team batting in the given innings, from toss winner and decision
    pub fn batting_team(&self, innings: i64) -> &str {
        let toss_winner_bats_first = self.toss_decision == TossDecision::Bat;
        let first = if toss_winner_bats_first {
            &self.toss_winner
        } else if self.toss_winner == self.team1 {
            &self.team2
        } else {
            &self.team1
        };
        if innings % 2 == 1 {
            first
        } else if *first == self.team1 {
            &self.team2
        } else {
            &self.team1
        }
    }
}

/// A player record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRow {
    pub player_id: PlayerId,
    pub name: String,
    pub role: PlayerRole,
    pub team_history: Vec<TeamStint>,
}

/// A wicket falling on a delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wicket {
    pub kind: String,
    pub player_out: PlayerId,
}

/// A ball event as ingested; numeric run fields may be missing in raw feeds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRow {
    pub match_id: MatchId,
    pub innings: i64,
    pub over: i64,
    pub ball: i64,
    pub batter_id: PlayerId,
    pub bowler_id: PlayerId,
    pub runs_scored: Option<i64>,
    pub extras: Option<i64>,
    pub wicket: Option<Wicket>,
}

/// A validated ball event produced by the cleaner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanDelivery {
    pub match_id: MatchId,
    pub innings: i64,
    pub over: i64,
    pub ball: i64,
    pub batter_id: PlayerId,
    pub bowler_id: PlayerId,
    pub runs_scored: i64,
    pub extras: i64,
    pub wicket: Option<Wicket>,
}

impl CleanDelivery {
    pub fn total_runs(&self) -> i64 {
        self.runs_scored + self.extras
    }
}

/// A venue record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueRow {
    pub venue_id: VenueId,
    pub name: String,
    pub city: String,
    pub country: String,
}

/// Pipeline-wide errors
#[derive(Debug, Error)]
pub enum CricError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Insufficient data: have {have} matches, need {need}")]
    InsufficientData { have: usize, need: usize },

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("No validation data for {model} - training data barely cleared the minimum")]
    NoValidationData { model: String },

    #[error("Feature schema mismatch: model expects {expected:?}, got {got:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        got: Vec<String>,
    },

    #[error("Referential integrity violation: {0}")]
    ReferentialIntegrity(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Export error: {0}")]
    Export(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, CricError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub cleaning: CleaningConfig,
    pub features: FeatureConfig,
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub models_dir: String,
    pub export_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Minimum fraction of rows that must survive cleaning
    pub min_survival_fraction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Matches in the form-index EWMA window
    pub form_window: usize,
    /// Per-match weight decay for the form index
    pub form_decay: f64,
    /// Short window for the momentum score
    pub momentum_short: usize,
    /// Long window for the momentum score
    pub momentum_long: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Minimum distinct matches required before training is attempted
    pub min_matches: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    /// Fraction of most-recent matches held out for validation
    pub validation_fraction: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: DataConfig {
                database_path: "data/cricket.db".to_string(),
                models_dir: "models".to_string(),
                export_dir: "data/analytics".to_string(),
            },
            cleaning: CleaningConfig {
                min_survival_fraction: 0.5,
            },
            features: FeatureConfig {
                form_window: 5,
                form_decay: 0.5,
                momentum_short: 3,
                momentum_long: 10,
            },
            training: TrainingConfig {
                min_matches: 20,
                epochs: 400,
                learning_rate: 0.05,
                validation_fraction: 0.2,
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CricError::Config(format!("Failed to read config file {}: {}", path, e)))?;
        toml::from_str(&content)
            .map_err(|e| CricError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CricError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
