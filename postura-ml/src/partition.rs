use linfa::prelude::*;
use linfa::DatasetBase;
use linfa_clustering::KMeans;
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::ClusteringConfig;
use crate::error::{Result, RiskError};

/// A k-means partition: centroids plus one assignment per input row.
#[derive(Clone, Debug)]
pub struct Partition {
    pub centroids: Array2<f64>,
    pub assignments: Vec<usize>,
}

impl Partition {
    pub fn k(&self) -> usize {
        self.centroids.nrows()
    }

    /// Member count per cluster.
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k()];
        for &a in &self.assignments {
            sizes[a] += 1;
        }
        sizes
    }

    /// Index of the nearest centroid and the Euclidean distance to it.
    pub fn nearest(&self, point: ArrayView1<'_, f64>) -> (usize, f64) {
        nearest_centroid(&self.centroids, point)
    }
}

/// Fit k-means with `k` clusters on the rows of `x`.
///
/// Fails unless the result has exactly `k` non-empty clusters.
pub fn fit_kmeans(x: &Array2<f64>, k: usize, config: &ClusteringConfig) -> Result<Partition> {
    let partition = fit_kmeans_allow_empty(x, k, config)?;

    let empty = partition.sizes().iter().filter(|&&s| s == 0).count();
    if empty > 0 {
        return Err(RiskError::ClusteringFailed(format!(
            "k-means with k={k} left {empty} empty cluster(s)"
        )));
    }

    Ok(partition)
}

/// Like [`fit_kmeans`], but clusters without members are kept.
pub(crate) fn fit_kmeans_allow_empty(
    x: &Array2<f64>,
    k: usize,
    config: &ClusteringConfig,
) -> Result<Partition> {
    if k == 0 {
        return Err(RiskError::ClusteringFailed("cluster count must be positive".into()));
    }
    if x.nrows() < k {
        return Err(RiskError::InsufficientData {
            required: k,
            actual: x.nrows(),
        });
    }

    let rng = StdRng::seed_from_u64(config.seed);
    let dataset = DatasetBase::from(x.clone());
    let model = KMeans::params_with_rng(k, rng)
        .max_n_iterations(config.max_iterations)
        .tolerance(config.tolerance)
        .n_runs(config.n_runs)
        .fit(&dataset)
        .map_err(|e| RiskError::ClusteringFailed(format!("k-means with k={k}: {e}")))?;

    let centroids = model.centroids().to_owned();
    let assignments: Array1<usize> = model.predict(x);
    Ok(Partition {
        centroids,
        assignments: assignments.to_vec(),
    })
}

/// Index of the row of `centroids` nearest to `point`, and its distance.
pub(crate) fn nearest_centroid(centroids: &Array2<f64>, point: ArrayView1<'_, f64>) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centroids.outer_iter().enumerate() {
        let d2: f64 = c
            .iter()
            .zip(point.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        if d2 < best.1 {
            best = (i, d2);
        }
    }
    (best.0, best.1.sqrt())
}
