//! Validation metrics for trained models

use serde::{Deserialize, Serialize};

const CALIBRATION_BUCKETS: usize = 10;

/// One calibration bucket: predictions in [lo, hi) against observed outcomes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationBucket {
    pub lo: f64,
    pub hi: f64,
    pub count: usize,
    pub mean_predicted: f64,
    pub observed_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub samples: usize,
    pub calibration: Vec<CalibrationBucket>,
}

impl ClassificationMetrics {
    /// Compute from predicted probabilities and 0/1 labels. Precision and
    /// recall are 0.0 when their denominator is empty.
    pub fn compute(probs: &[f64], labels: &[f64], threshold: f64) -> Self {
        let mut tp = 0usize;
        let mut fp = 0usize;
        let mut tn = 0usize;
        let mut fn_ = 0usize;
        for (&p, &y) in probs.iter().zip(labels) {
            let predicted = p >= threshold;
            let actual = y >= 0.5;
            match (predicted, actual) {
                (true, true) => tp += 1,
                (true, false) => fp += 1,
                (false, false) => tn += 1,
                (false, true) => fn_ += 1,
            }
        }
        let samples = probs.len();
        let accuracy = if samples == 0 {
            0.0
        } else {
            (tp + tn) as f64 / samples as f64
        };
        let precision = if tp + fp == 0 {
            0.0
        } else {
            tp as f64 / (tp + fp) as f64
        };
        let recall = if tp + fn_ == 0 {
            0.0
        } else {
            tp as f64 / (tp + fn_) as f64
        };
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        ClassificationMetrics {
            accuracy,
            precision,
            recall,
            f1,
            samples,
            calibration: calibration_curve(probs, labels),
        }
    }
}

/// Equal-width probability buckets; empty buckets are included with count 0
fn calibration_curve(probs: &[f64], labels: &[f64]) -> Vec<CalibrationBucket> {
    let width = 1.0 / CALIBRATION_BUCKETS as f64;
    let mut sums = vec![(0usize, 0.0f64, 0.0f64); CALIBRATION_BUCKETS];
    for (&p, &y) in probs.iter().zip(labels) {
        let idx = ((p / width) as usize).min(CALIBRATION_BUCKETS - 1);
        let slot = &mut sums[idx];
        slot.0 += 1;
        slot.1 += p;
        slot.2 += y;
    }
    sums.into_iter()
        .enumerate()
        .map(|(i, (count, p_sum, y_sum))| {
            let n = count.max(1) as f64;
            CalibrationBucket {
                lo: i as f64 * width,
                hi: (i + 1) as f64 * width,
                count,
                mean_predicted: p_sum / n,
                observed_rate: y_sum / n,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
    pub samples: usize,
}

impl RegressionMetrics {
    pub fn compute(preds: &[f64], actuals: &[f64]) -> Self {
        let n = preds.len();
        if n == 0 {
            return RegressionMetrics {
                mae: 0.0,
                rmse: 0.0,
                r2: 0.0,
                samples: 0,
            };
        }
        let mut abs_sum = 0.0;
        let mut sq_sum = 0.0;
        for (&p, &y) in preds.iter().zip(actuals) {
            abs_sum += (p - y).abs();
            sq_sum += (p - y) * (p - y);
        }
        let mean = actuals.iter().sum::<f64>() / n as f64;
        let total_sq: f64 = actuals.iter().map(|&y| (y - mean) * (y - mean)).sum();
        let r2 = if total_sq == 0.0 {
            0.0
        } else {
            1.0 - sq_sum / total_sq
        };
        RegressionMetrics {
            mae: abs_sum / n as f64,
            rmse: (sq_sum / n as f64).sqrt(),
            r2,
            samples: n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_classifier() {
        let probs = [0.9, 0.8, 0.1, 0.2];
        let labels = [1.0, 1.0, 0.0, 0.0];
        let m = ClassificationMetrics::compute(&probs, &labels, 0.5);
        assert_eq!(m.accuracy, 1.0);
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.recall, 1.0);
        assert_eq!(m.f1, 1.0);
        assert_eq!(m.samples, 4);
    }

    #[test]
    fn test_mixed_classifier() {
        // tp=1 (0.9/1), fp=1 (0.7/0), tn=1 (0.2/0), fn=1 (0.3/1)
        let probs = [0.9, 0.7, 0.2, 0.3];
        let labels = [1.0, 0.0, 0.0, 1.0];
        let m = ClassificationMetrics::compute(&probs, &labels, 0.5);
        assert!((m.accuracy - 0.5).abs() < 1e-12);
        assert!((m.precision - 0.5).abs() < 1e-12);
        assert!((m.recall - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_all_negative_predictions() {
        let probs = [0.1, 0.2];
        let labels = [0.0, 1.0];
        let m = ClassificationMetrics::compute(&probs, &labels, 0.5);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1, 0.0);
    }

    #[test]
    fn test_calibration_buckets() {
        let probs = [0.05, 0.05, 0.95, 0.95];
        let labels = [0.0, 0.0, 1.0, 1.0];
        let m = ClassificationMetrics::compute(&probs, &labels, 0.5);
        assert_eq!(m.calibration.len(), 10);
        assert_eq!(m.calibration[0].count, 2);
        assert_eq!(m.calibration[0].observed_rate, 0.0);
        assert_eq!(m.calibration[9].count, 2);
        assert_eq!(m.calibration[9].observed_rate, 1.0);
        assert!((m.calibration[9].mean_predicted - 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_probability_one_lands_in_last_bucket() {
        let m = ClassificationMetrics::compute(&[1.0], &[1.0], 0.5);
        assert_eq!(m.calibration[9].count, 1);
    }

    #[test]
    fn test_regression_metrics() {
        let preds = [1.0, 2.0, 3.0];
        let actuals = [1.0, 2.0, 5.0];
        let m = RegressionMetrics::compute(&preds, &actuals);
        assert!((m.mae - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.rmse - (4.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(m.samples, 3);
    }

    #[test]
    fn test_regression_constant_actuals() {
        let m = RegressionMetrics::compute(&[1.0, 2.0], &[3.0, 3.0]);
        assert_eq!(m.r2, 0.0);
    }
}
