use std::ops::RangeInclusive;

use ndarray::Array2;
use serde::Serialize;

use crate::config::ClusteringConfig;
use crate::error::{Result, RiskError};
use crate::partition::fit_kmeans;

/// Outcome of a cluster-count search.
#[derive(Clone, Debug, Serialize)]
pub struct ClusterSelection {
    /// Chosen cluster count.
    pub k: usize,
    /// `(k, mean silhouette width)` for every candidate that clustered successfully.
    pub scores: Vec<(usize, f64)>,
}

/// Chooses the number of movement clusters by mean silhouette width.
pub struct ClusterSelector {
    config: ClusteringConfig,
}

impl ClusterSelector {
    pub fn new(config: ClusteringConfig) -> Self {
        ClusterSelector { config }
    }

    /// Default search range from the configuration.
    pub fn candidate_range(&self) -> RangeInclusive<usize> {
        self.config.min_clusters..=self.config.max_clusters
    }

    /// Try every `k` in `candidates` and return the one with the widest
    /// silhouette. Ties go to the smallest `k`.
    pub fn select(
        &self,
        scaled: &Array2<f64>,
        candidates: RangeInclusive<usize>,
    ) -> Result<ClusterSelection> {
        let (lo, hi) = (*candidates.start(), *candidates.end());
        if lo < 2 || hi < lo {
            return Err(RiskError::InvalidConfig(format!(
                "invalid cluster candidate range {lo}..={hi}"
            )));
        }
        let n = scaled.nrows();
        if n < hi + 1 {
            return Err(RiskError::InsufficientData {
                required: hi + 1,
                actual: n,
            });
        }

        let distances = pairwise_distances(scaled);
        let mut scores = Vec::with_capacity(hi - lo + 1);
        let mut best: Option<(usize, f64)> = None;

        for k in candidates {
            let partition = match fit_kmeans(scaled, k, &self.config) {
                Ok(p) => p,
                Err(e) => {
                    log::warn!("Skipping k={}: {}", k, e);
                    continue;
                }
            };
            let width = silhouette_from_distances(&distances, &partition.assignments, k);
            log::debug!("k={} silhouette={:.4}", k, width);
            scores.push((k, width));

            if best.map_or(true, |(_, w)| width > w) {
                best = Some((k, width));
            }
        }

        let (k, width) = best.ok_or_else(|| {
            RiskError::ClusteringFailed(format!("no candidate in {lo}..={hi} produced a valid clustering"))
        })?;
        log::info!("Selected {} movement clusters (silhouette {:.4})", k, width);

        Ok(ClusterSelection { k, scores })
    }
}

/// Mean silhouette width of `labels` over the rows of `x`.
pub fn silhouette_score(x: &Array2<f64>, labels: &[usize]) -> f64 {
    let k = labels.iter().max().map_or(0, |&m| m + 1);
    silhouette_from_distances(&pairwise_distances(x), labels, k)
}

/// Symmetric matrix of Euclidean distances between rows.
fn pairwise_distances(x: &Array2<f64>) -> Array2<f64> {
    let n = x.nrows();
    let mut d = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        let xi = x.row(i);
        for j in (i + 1)..n {
            let dist = xi
                .iter()
                .zip(x.row(j).iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt();
            d[[i, j]] = dist;
            d[[j, i]] = dist;
        }
    }
    d
}

/// Silhouette of each point is `(b - a) / max(a, b)`; points in singleton
/// clusters score 0.
fn silhouette_from_distances(distances: &Array2<f64>, labels: &[usize], k: usize) -> f64 {
    let n = labels.len();
    if n == 0 || k < 2 {
        return 0.0;
    }

    let mut sizes = vec![0usize; k];
    for &l in labels {
        sizes[l] += 1;
    }

    let mut sums = vec![0.0; k];
    let mut total = 0.0;
    for i in 0..n {
        sums.iter_mut().for_each(|s| *s = 0.0);
        for j in 0..n {
            if i != j {
                sums[labels[j]] += distances[[i, j]];
            }
        }

        let own = labels[i];
        if sizes[own] <= 1 {
            continue;
        }
        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);
        if !b.is_finite() {
            continue;
        }

        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }

    total / n as f64
}
