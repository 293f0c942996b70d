//! Feature engineering
//!
//! Rolling per-entity aggregates and the as-of transformer that turns clean
//! tables into leak-free feature rows.

pub mod rolling;
pub mod transform;

pub use rolling::Rolling;
pub use transform::{build_features, current_states, transform};

use crate::{MatchId, PlayerId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The entity a feature row describes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    Player(PlayerId),
    Team(String),
}

impl EntityRef {
    /// (kind, key) pair used as the storage primary key
    pub fn storage_key(&self) -> (&'static str, String) {
        match self {
            EntityRef::Player(id) => ("player", id.0.to_string()),
            EntityRef::Team(code) => ("team", code.clone()),
        }
    }

    /// None when the stored pair does not name a valid entity
    pub fn from_storage_key(kind: &str, key: &str) -> Option<Self> {
        match kind {
            "player" => key.parse().ok().map(|id| EntityRef::Player(PlayerId(id))),
            "team" => Some(EntityRef::Team(key.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Player(id) => write!(f, "{}", id),
            EntityRef::Team(code) => write!(f, "Team({})", code),
        }
    }
}

/// Derived features for one entity at one match, computed strictly from
/// matches before it (as-of semantics; no look-ahead)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub entity: EntityRef,
    pub match_id: MatchId,
    pub date: NaiveDate,
    pub strike_rate: f64,
    pub batting_average: f64,
    pub win_ratio: f64,
    pub form_index: f64,
    pub momentum_score: f64,
    /// False = cold start: the entity had no prior matches and all features
    /// above are exactly 0.0
    pub has_history: bool,
}
