//! Held-out evaluation of saved model artifacts
//!
//! Rebuilds the dataset from the current store, replays the chronological
//! split recorded in the artifact, and scores only examples after the cutoff.

use crate::data::Store;
use crate::model::{ModelArtifact, ModelKind};
use crate::training::dataset::build_dataset;
use crate::training::metrics::{ClassificationMetrics, RegressionMetrics};
use crate::{Config, CricError, Result};
use chrono::NaiveDate;
use log::info;
use std::path::Path;

pub const DEFAULT_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone)]
pub enum EvaluationReport {
    Classification {
        kind: ModelKind,
        split_cutoff: NaiveDate,
        threshold: f64,
        metrics: ClassificationMetrics,
    },
    Regression {
        kind: ModelKind,
        split_cutoff: NaiveDate,
        metrics: RegressionMetrics,
    },
}

/// Score a trained model on its held-out validation window.
///
/// `threshold` only applies to classifiers; `None` means 0.5.
pub fn evaluate(
    store: &Store,
    kind: ModelKind,
    config: &Config,
    threshold: Option<f64>,
) -> Result<EvaluationReport> {
    let artifact = ModelArtifact::load(Path::new(&config.data.models_dir), kind)?;
    let dataset = build_dataset(store, kind)?;
    artifact.check_schema(&dataset.schema)?;

    let validation = dataset.validation_slice(artifact.split_cutoff);
    if validation.is_empty() {
        return Err(CricError::NoValidationData {
            model: kind.to_string(),
        });
    }

    let preds: Vec<f64> = validation
        .iter()
        .map(|e| {
            let standardized = artifact.standardizer.apply(&e.features);
            let raw = artifact.model.predict(&standardized);
            // Negative score predictions are meaningless for runs
            if kind.is_classifier() {
                raw
            } else {
                raw.max(0.0)
            }
        })
        .collect();
    let actuals: Vec<f64> = validation.iter().map(|e| e.target).collect();
    info!(
        "evaluating {} on {} validation examples after {}",
        kind,
        validation.len(),
        artifact.split_cutoff
    );

    if kind.is_classifier() {
        let threshold = threshold.unwrap_or(DEFAULT_THRESHOLD);
        Ok(EvaluationReport::Classification {
            kind,
            split_cutoff: artifact.split_cutoff,
            threshold,
            metrics: ClassificationMetrics::compute(&preds, &actuals, threshold),
        })
    } else {
        Ok(EvaluationReport::Regression {
            kind,
            split_cutoff: artifact.split_cutoff,
            metrics: RegressionMetrics::compute(&preds, &actuals),
        })
    }
}
