//! Linear models fitted by full-batch gradient descent
//!
//! A logistic classifier for win probability and a least-squares regressor
//! for the score models. Inputs are z-scored with statistics computed from
//! the training split only.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Standard logistic sigmoid
pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Per-feature z-score parameters, fitted on the training split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

impl Standardizer {
    /// Fit means and stds from training rows
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let dims = rows.first().map(|r| r.len()).unwrap_or(0);
        let n = rows.len().max(1) as f64;
        let mut means = vec![0.0; dims];
        for row in rows {
            for (m, x) in means.iter_mut().zip(row) {
                *m += x / n;
            }
        }
        let mut stds = vec![0.0; dims];
        for row in rows {
            for ((s, x), m) in stds.iter_mut().zip(row).zip(&means) {
                *s += (x - m).powi(2) / n;
            }
        }
        for s in &mut stds {
            *s = s.sqrt();
            if *s < 1e-9 {
                *s = 1.0; // constant column: leave it centered but unscaled
            }
        }
        Standardizer { means, stds }
    }

    pub fn apply(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }
}

/// A fitted linear predictor: `w . x + b`, optionally squashed by a sigmoid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: Vec<f64>,
    pub bias: f64,
    /// True = logistic output in [0, 1]; false = raw regression output
    pub logistic: bool,
}

impl LinearModel {
    /// Raw linear response for a standardized input
    fn response(&self, x: &[f64]) -> f64 {
        self.weights.iter().zip(x).map(|(w, x)| w * x).sum::<f64>() + self.bias
    }

    /// Model output for a standardized input
    pub fn predict(&self, x: &[f64]) -> f64 {
        let z = self.response(x);
        if self.logistic {
            sigmoid(z)
        } else {
            z
        }
    }
}

/// Options for one gradient-descent fit
#[derive(Debug, Clone, Copy)]
pub struct FitOptions {
    pub epochs: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

/// Fit a logistic classifier with binary cross-entropy loss.
///
/// `targets` must be 0.0/1.0. `on_epoch` is invoked once per epoch with the
/// epoch index and current loss, so callers can log progress.
pub fn fit_logistic(
    rows: &[Vec<f64>],
    targets: &[f64],
    options: FitOptions,
    mut on_epoch: impl FnMut(usize, f64),
) -> LinearModel {
    fit(rows, targets, options, true, &mut on_epoch)
}

/// Fit a least-squares regressor with MSE loss.
pub fn fit_regression(
    rows: &[Vec<f64>],
    targets: &[f64],
    options: FitOptions,
    mut on_epoch: impl FnMut(usize, f64),
) -> LinearModel {
    fit(rows, targets, options, false, &mut on_epoch)
}

fn fit(
    rows: &[Vec<f64>],
    targets: &[f64],
    options: FitOptions,
    logistic: bool,
    on_epoch: &mut impl FnMut(usize, f64),
) -> LinearModel {
    let dims = rows.first().map(|r| r.len()).unwrap_or(0);
    let n = rows.len().max(1) as f64;

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut model = LinearModel {
        weights: (0..dims).map(|_| rng.gen_range(-0.01..0.01)).collect(),
        bias: 0.0,
        logistic,
    };

    for epoch in 0..options.epochs {
        let mut grad_w = vec![0.0; dims];
        let mut grad_b = 0.0;
        let mut loss = 0.0;

        for (row, &y) in rows.iter().zip(targets) {
            let pred = model.predict(row);
            // For both BCE-with-sigmoid and MSE the error term is (pred - y)
            let err = pred - y;
            for (g, x) in grad_w.iter_mut().zip(row) {
                *g += err * x / n;
            }
            grad_b += err / n;

            loss += if logistic {
                let p = pred.clamp(1e-7, 1.0 - 1e-7);
                -(y * p.ln() + (1.0 - y) * (1.0 - p).ln()) / n
            } else {
                err * err / n
            };
        }

        for (w, g) in model.weights.iter_mut().zip(&grad_w) {
            *w -= options.learning_rate * g;
        }
        model.bias -= options.learning_rate * grad_b;

        on_epoch(epoch, loss);
    }

    model
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> FitOptions {
        FitOptions {
            epochs: 2000,
            learning_rate: 0.5,
            seed: 42,
        }
    }

    #[test]
    fn test_sigmoid_bounds() {
        assert!(sigmoid(-50.0) < 1e-6);
        assert!(sigmoid(50.0) > 1.0 - 1e-6);
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_standardizer_centers_and_scales() {
        let rows = vec![vec![0.0, 10.0], vec![2.0, 10.0], vec![4.0, 10.0]];
        let std = Standardizer::fit(&rows);
        let z = std.apply(&[2.0, 10.0]);
        assert!(z[0].abs() < 1e-9);
        // constant column stays centered, unscaled
        assert!(z[1].abs() < 1e-9);
    }

    #[test]
    fn test_logistic_learns_separable_data() {
        // y = 1 iff x > 0
        let rows: Vec<Vec<f64>> = (-10..=10).map(|i| vec![i as f64 / 10.0]).collect();
        let targets: Vec<f64> = (-10..=10).map(|i| if i > 0 { 1.0 } else { 0.0 }).collect();
        let model = fit_logistic(&rows, &targets, options(), |_, _| {});
        assert!(model.predict(&[0.9]) > 0.8);
        assert!(model.predict(&[-0.9]) < 0.2);
    }

    #[test]
    fn test_regression_recovers_line() {
        // y = 3x + 1
        let rows: Vec<Vec<f64>> = (0..50).map(|i| vec![i as f64 / 50.0]).collect();
        let targets: Vec<f64> = rows.iter().map(|r| 3.0 * r[0] + 1.0).collect();
        let model = fit_regression(&rows, &targets, options(), |_, _| {});
        assert!((model.predict(&[0.5]) - 2.5).abs() < 0.05);
    }

    #[test]
    fn test_loss_decreases() {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = (0..20).map(|i| if i >= 10 { 1.0 } else { 0.0 }).collect();
        let mut losses = Vec::new();
        fit_logistic(
            &rows,
            &targets,
            FitOptions {
                epochs: 50,
                learning_rate: 0.01,
                seed: 1,
            },
            |_, loss| losses.push(loss),
        );
        assert!(losses.last().unwrap() < losses.first().unwrap());
    }
}
