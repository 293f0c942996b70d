//! Model fitting against the persisted feature store

use crate::data::Store;
use crate::model::{fit_logistic, fit_regression, FitOptions, ModelArtifact, ModelKind, Standardizer};
use crate::training::dataset::build_dataset;
use crate::{Config, CricError, Result};
use log::{debug, info};
use std::path::Path;

/// Outcome of one training run
#[derive(Debug)]
pub struct TrainedModel {
    pub artifact: ModelArtifact,
    pub artifact_path: std::path::PathBuf,
    pub final_loss: f64,
}

/// Train one model kind from the current feature table and atomically
/// replace its artifact on disk
pub fn train(store: &Store, kind: ModelKind, config: &Config) -> Result<TrainedModel> {
    let match_count = store.read_clean_matches()?.len();
    let need = config.training.min_matches;
    if match_count < need {
        return Err(CricError::InsufficientData {
            have: match_count,
            need,
        });
    }

    let dataset = build_dataset(store, kind)?;
    if dataset.examples.is_empty() {
        return Err(CricError::EmptyInput(format!(
            "no usable training examples for model '{}'",
            kind
        )));
    }

    let cutoff = dataset
        .split_cutoff(config.training.validation_fraction)
        .ok_or_else(|| CricError::EmptyInput(format!("no dated examples for '{}'", kind)))?;
    let train = dataset.train_slice(cutoff);
    let validation = dataset.validation_slice(cutoff);
    info!(
        "training {}: {} train / {} validation examples, cutoff {}",
        kind,
        train.len(),
        validation.len(),
        cutoff
    );

    let raw_rows: Vec<Vec<f64>> = train.iter().map(|e| e.features.clone()).collect();
    let targets: Vec<f64> = train.iter().map(|e| e.target).collect();

    // Standardization statistics come from the training split only
    let standardizer = Standardizer::fit(&raw_rows);
    let rows: Vec<Vec<f64>> = raw_rows.iter().map(|r| standardizer.apply(r)).collect();

    let options = FitOptions {
        epochs: config.training.epochs,
        learning_rate: config.training.learning_rate,
        seed: 7,
    };
    let mut final_loss = 0.0;
    let log_every = (options.epochs / 10).max(1);
    // progress percentage is monotonic so a poller can detect stalls
    let mut on_epoch = |epoch: usize, loss: f64| {
        final_loss = loss;
        if epoch % log_every == 0 || epoch + 1 == options.epochs {
            let pct = (epoch + 1) * 100 / options.epochs;
            debug!("{} {:>3}% (epoch {:>4}): loss {:.5}", kind, pct, epoch, loss);
        }
    };
    let model = if kind.is_classifier() {
        fit_logistic(&rows, &targets, options, &mut on_epoch)
    } else {
        fit_regression(&rows, &targets, options, &mut on_epoch)
    };

    let artifact = ModelArtifact {
        kind,
        feature_schema: dataset.schema.clone(),
        standardizer,
        model,
        split_cutoff: cutoff,
        train_rows: train.len(),
        validation_rows: validation.len(),
        trained_at: chrono::Utc::now().to_rfc3339(),
    };
    let artifact_path = artifact.save_atomic(Path::new(&config.data.models_dir))?;
    info!(
        "trained {} (final loss {:.5}) -> {}",
        kind,
        final_loss,
        artifact_path.display()
    );

    Ok(TrainedModel {
        artifact,
        artifact_path,
        final_loss,
    })
}

/// Train all model kinds in order; fails on the first error
pub fn train_all(store: &Store, config: &Config) -> Result<Vec<TrainedModel>> {
    ModelKind::ALL
        .iter()
        .map(|&kind| train(store, kind, config))
        .collect()
}
