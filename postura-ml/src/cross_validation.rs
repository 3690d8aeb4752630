use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use crate::config::{ClusteringConfig, CrossValidationConfig};
use crate::error::{Result, RiskError};
use crate::partition::fit_kmeans_allow_empty;

/// Per-fold accuracy of fold-trained cluster-to-risk mappings.
#[derive(Clone, Debug, Serialize)]
pub struct CrossValidationReport {
    pub fold_accuracies: Vec<f64>,
    pub mean: f64,
    /// Population standard deviation across folds.
    pub std: f64,
}

impl CrossValidationReport {
    fn from_folds(fold_accuracies: Vec<f64>) -> Self {
        let n = fold_accuracies.len().max(1) as f64;
        let mean = fold_accuracies.iter().sum::<f64>() / n;
        let std = (fold_accuracies
            .iter()
            .map(|a| (a - mean).powi(2))
            .sum::<f64>()
            / n)
            .sqrt();
        CrossValidationReport {
            fold_accuracies,
            mean,
            std,
        }
    }
}

/// K-fold check that held-out samples land in clusters whose training-side
/// mean risk matches their own risk.
///
/// Measurement only: nothing here touches the production cluster model.
pub struct CrossValidator {
    clustering: ClusteringConfig,
    config: CrossValidationConfig,
}

impl CrossValidator {
    pub fn new(clustering: ClusteringConfig, config: CrossValidationConfig) -> Self {
        CrossValidator { clustering, config }
    }

    /// Run `folds`-fold validation with `k` clusters per fold.
    pub fn evaluate(
        &self,
        scaled: &Array2<f64>,
        risks: &[f64],
        k: usize,
        folds: usize,
    ) -> Result<CrossValidationReport> {
        let n = scaled.nrows();
        if risks.len() != n {
            return Err(RiskError::DimensionMismatch {
                expected: n,
                actual: risks.len(),
            });
        }
        if folds < 2 {
            return Err(RiskError::InsufficientData {
                required: 2,
                actual: folds,
            });
        }
        if n < folds {
            return Err(RiskError::InsufficientData {
                required: folds,
                actual: n,
            });
        }

        let mut order: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        order.shuffle(&mut rng);

        let mut accuracies = Vec::with_capacity(folds);
        let mut start = 0;
        for fold in 0..folds {
            // The first `n % folds` folds take one extra sample.
            let len = n / folds + usize::from(fold < n % folds);
            let held_out = &order[start..start + len];
            let mut train: Vec<usize> = order[..start]
                .iter()
                .chain(order[start + len..].iter())
                .copied()
                .collect();
            train.sort_unstable();
            start += len;

            if train.len() < k {
                return Err(RiskError::InsufficientData {
                    required: k,
                    actual: train.len(),
                });
            }

            // Clusters left empty by this fold map to risk 0.0.
            let x_train = scaled.select(Axis(0), &train);
            let partition = fit_kmeans_allow_empty(&x_train, k, &self.clustering)?;

            let mut sums = vec![0.0; k];
            let mut counts = vec![0usize; k];
            for (row, &cluster) in partition.assignments.iter().enumerate() {
                sums[cluster] += risks[train[row]];
                counts[cluster] += 1;
            }
            let mapping: Vec<f64> = sums
                .iter()
                .zip(&counts)
                .map(|(s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
                .collect();

            let hits = held_out
                .iter()
                .filter(|&&i| {
                    let (cluster, _) = partition.nearest(scaled.row(i));
                    (mapping[cluster] - risks[i]).abs() < self.config.tolerance
                })
                .count();
            let accuracy = hits as f64 / held_out.len() as f64;
            log::debug!("Fold {}: accuracy {:.3}", fold + 1, accuracy);
            accuracies.push(accuracy);
        }

        let report = CrossValidationReport::from_folds(accuracies);
        log::info!(
            "Cross-validation accuracy: {:.3} (+/- {:.3})",
            report.mean,
            report.std
        );
        Ok(report)
    }
}
