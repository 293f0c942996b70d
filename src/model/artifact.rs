//! Serialized model artifacts
//!
//! A trained model is stored as one JSON file carrying its parameters, the
//! exact ordered feature schema it expects at inference time, and the
//! chronological split it was trained on. Replacement is atomic: a new
//! artifact is written to a temp file and renamed over the old one, so a
//! reader never observes a half-written model.

use crate::model::linear::{LinearModel, Standardizer};
use crate::{CricError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// The three independently trained models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Win,
    InningsScore,
    PlayerPerformance,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [
        ModelKind::Win,
        ModelKind::InningsScore,
        ModelKind::PlayerPerformance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Win => "win",
            ModelKind::InningsScore => "innings_score",
            ModelKind::PlayerPerformance => "player_performance",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "win" => Some(ModelKind::Win),
            "innings_score" | "innings-score" | "score" => Some(ModelKind::InningsScore),
            "player_performance" | "player-performance" | "player" => {
                Some(ModelKind::PlayerPerformance)
            }
            _ => None,
        }
    }

    /// True for the classifier, false for the regressors
    pub fn is_classifier(&self) -> bool {
        matches!(self, ModelKind::Win)
    }

    fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }

    pub fn artifact_path(&self, models_dir: &Path) -> PathBuf {
        models_dir.join(self.file_name())
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fitted model plus everything inference needs to reproduce its inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub kind: ModelKind,
    /// Ordered feature names the model expects; inference must match exactly
    pub feature_schema: Vec<String>,
    pub standardizer: Standardizer,
    pub model: LinearModel,
    /// Matches strictly after this date form the validation split
    pub split_cutoff: NaiveDate,
    pub train_rows: usize,
    pub validation_rows: usize,
    pub trained_at: String,
}

impl ModelArtifact {
    /// Fail unless the incoming schema matches the trained schema exactly
    /// (same names, same order)
    pub fn check_schema(&self, schema: &[String]) -> Result<()> {
        if self.feature_schema == schema {
            Ok(())
        } else {
            Err(CricError::SchemaMismatch {
                expected: self.feature_schema.clone(),
                got: schema.to_vec(),
            })
        }
    }

    /// Write to `<models_dir>/<kind>.json` via temp-file-then-rename
    pub fn save_atomic(&self, models_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(models_dir)?;
        let path = self.kind.artifact_path(models_dir);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CricError::Serialize(e.to_string()))?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        Ok(path)
    }

    /// Load the current artifact for a model kind
    pub fn load(models_dir: &Path, kind: ModelKind) -> Result<Self> {
        let path = kind.artifact_path(models_dir);
        let json = std::fs::read_to_string(&path).map_err(|_| {
            CricError::NotFound(format!(
                "model '{}' not trained yet ({})",
                kind,
                path.display()
            ))
        })?;
        serde_json::from_str(&json).map_err(|e| CricError::Serialize(e.to_string()))
    }
}
