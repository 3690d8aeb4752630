//! Cluster-to-risk mapping.
//!
//! Each movement cluster gets an intensity from three factors of its member
//! points:
//!
//! | Factor | Definition |
//! |--------|------------|
//! | magnitude | mean absolute value over every element of the cluster |
//! | variation | population standard deviation over every element |
//! | velocity | mean absolute first difference between consecutive members, in sample order |
//!
//! Intensities are min-max normalized across clusters, then multiplied by a
//! weight built from cluster size and density. The product is the cluster's
//! risk. It is not renormalized, so risks are only comparable to each other.

use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::config::{ClusteringConfig, IntensityWeights};
use crate::error::{Result, RiskError};
use crate::partition::{fit_kmeans, nearest_centroid, Partition};

/// Per-cluster statistics computed at fit time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterProfile {
    pub size: usize,
    pub magnitude: f64,
    pub variation: f64,
    pub velocity: f64,
    pub intensity: f64,
    /// Intensity after min-max scaling across clusters, in [0, 1].
    pub normalized_intensity: f64,
    /// `1 / (1 + mean pairwise absolute deviation)`; 1.0 for singletons.
    pub density: f64,
    /// Size-times-density weight, normalized to sum 1 across clusters.
    pub weight: f64,
    pub risk: f64,
    /// Population standard deviation of the centroid's own components.
    pub centroid_std: f64,
    /// Centroid dimension over `centroid_std + ε`.
    pub centroid_density: f64,
    /// Root-mean-square distance of members to the centroid.
    pub radius: f64,
    /// Members per unit of radius.
    pub point_density: f64,
}

/// Fitted clustering state. Centroids and risk mapping are only ever
/// replaced together, as a whole `ClusterModel`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterModel {
    centroids: Array2<f64>,
    assignments: Vec<usize>,
    profiles: Vec<ClusterProfile>,
}

impl ClusterModel {
    pub fn k(&self) -> usize {
        self.profiles.len()
    }

    pub fn dim(&self) -> usize {
        self.centroids.ncols()
    }

    pub fn centroids(&self) -> &Array2<f64> {
        &self.centroids
    }

    /// Cluster index of each training sample, in input order.
    pub fn assignments(&self) -> &[usize] {
        &self.assignments
    }

    pub fn profiles(&self) -> &[ClusterProfile] {
        &self.profiles
    }

    pub fn profile(&self, cluster: usize) -> Option<&ClusterProfile> {
        self.profiles.get(cluster)
    }

    /// Risk value of every cluster, indexed by cluster id.
    pub fn cluster_risks(&self) -> Vec<f64> {
        self.profiles.iter().map(|p| p.risk).collect()
    }

    /// Risk value of every training sample (its cluster's risk).
    pub fn sample_risks(&self) -> Vec<f64> {
        self.assignments
            .iter()
            .map(|&c| self.profiles[c].risk)
            .collect()
    }

    /// Nearest cluster to an already-scaled point, with the distance to it.
    pub fn assign(&self, scaled: ArrayView1<'_, f64>) -> (usize, f64) {
        nearest_centroid(&self.centroids, scaled)
    }
}

/// Fits movement clusters and derives their risk values.
pub struct RiskModel {
    clustering: ClusteringConfig,
    weights: IntensityWeights,
    epsilon: f64,
}

impl RiskModel {
    pub fn new(clustering: ClusteringConfig, weights: IntensityWeights) -> Self {
        RiskModel {
            clustering,
            weights,
            epsilon: 1e-6,
        }
    }

    /// Guard added to the spread when computing either density.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Cluster `scaled` into `k` groups and compute every cluster's risk.
    pub fn fit(&self, scaled: &Array2<f64>, k: usize) -> Result<ClusterModel> {
        if scaled.nrows() == 0 {
            return Err(RiskError::EmptyInput("feature matrix has no rows"));
        }
        let partition = fit_kmeans(scaled, k, &self.clustering)?;
        let model = self.score_partition(scaled, partition);
        log::info!(
            "Risk model fitted: k={} risks={:?}",
            model.k(),
            model.cluster_risks()
        );
        Ok(model)
    }

    /// Turn an existing partition into a `ClusterModel`.
    pub fn score_partition(&self, scaled: &Array2<f64>, partition: Partition) -> ClusterModel {
        let n = scaled.nrows() as f64;
        let k = partition.k();

        let mut profiles: Vec<ClusterProfile> = (0..k)
            .map(|cluster| {
                let members: Vec<usize> = partition
                    .assignments
                    .iter()
                    .enumerate()
                    .filter(|(_, a)| **a == cluster)
                    .map(|(i, _)| i)
                    .collect();
                let data = scaled.select(Axis(0), &members);
                self.profile(&data, partition.centroids.row(cluster))
            })
            .collect();

        let intensities: Vec<f64> = profiles.iter().map(|p| p.intensity).collect();
        let normalized = min_max_normalize(&intensities);

        let raw_weights: Vec<f64> = profiles
            .iter()
            .map(|p| (p.size as f64 / n) * p.density)
            .collect();
        let weight_sum: f64 = raw_weights.iter().sum();

        for (i, p) in profiles.iter_mut().enumerate() {
            p.normalized_intensity = normalized[i];
            p.weight = if weight_sum > 0.0 {
                raw_weights[i] / weight_sum
            } else {
                1.0 / k as f64
            };
            p.risk = p.normalized_intensity * p.weight;
        }

        ClusterModel {
            centroids: partition.centroids,
            assignments: partition.assignments,
            profiles,
        }
    }

    /// Raw statistics of one cluster; normalization and weighting happen later.
    fn profile(&self, data: &Array2<f64>, centroid: ArrayView1<'_, f64>) -> ClusterProfile {
        let size = data.nrows();
        let magnitude = mean_abs(data);
        let variation = flat_std(data);
        let velocity = mean_abs_first_difference(data);
        let w = &self.weights;
        let intensity = w.magnitude * magnitude + w.variation * variation + w.velocity * velocity;

        let radius = if size == 0 {
            0.0
        } else {
            let sq: f64 = data
                .outer_iter()
                .map(|row| {
                    row.iter()
                        .zip(centroid.iter())
                        .map(|(a, b)| (a - b) * (a - b))
                        .sum::<f64>()
                })
                .sum();
            (sq / size as f64).sqrt()
        };

        let centroid_std = population_std(centroid.iter());

        ClusterProfile {
            size,
            magnitude,
            variation,
            velocity,
            intensity,
            normalized_intensity: 0.0,
            density: density(data),
            weight: 0.0,
            risk: 0.0,
            centroid_std,
            centroid_density: centroid.len() as f64 / (centroid_std + self.epsilon),
            radius,
            point_density: size as f64 / (radius + self.epsilon),
        }
    }
}

fn mean_abs(data: &Array2<f64>) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().map(|v| v.abs()).sum::<f64>() / data.len() as f64
}

fn flat_std(data: &Array2<f64>) -> f64 {
    population_std(data.iter())
}

fn population_std<'a, I>(values: I) -> f64
where
    I: Iterator<Item = &'a f64> + Clone,
{
    let n = values.clone().count();
    if n == 0 {
        return 0.0;
    }
    let len = n as f64;
    let mean = values.clone().sum::<f64>() / len;
    (values.map(|v| (v - mean).powi(2)).sum::<f64>() / len).sqrt()
}

/// Consecutive rows are consecutive in the original sample order.
fn mean_abs_first_difference(data: &Array2<f64>) -> f64 {
    let rows = data.nrows();
    if rows < 2 || data.ncols() == 0 {
        return 0.0;
    }
    let mut total = 0.0;
    for w in 0..rows - 1 {
        total += data
            .row(w + 1)
            .iter()
            .zip(data.row(w).iter())
            .map(|(b, a)| (b - a).abs())
            .sum::<f64>();
    }
    total / ((rows - 1) * data.ncols()) as f64
}

/// Mean of `|x[a][d] - x[b][d]|` over all ordered pairs `(a, b)` and dimensions.
fn density(data: &Array2<f64>) -> f64 {
    let rows = data.nrows();
    if rows <= 1 || data.ncols() == 0 {
        return 1.0;
    }
    let mut total = 0.0;
    for a in 0..rows {
        for b in (a + 1)..rows {
            total += data
                .row(a)
                .iter()
                .zip(data.row(b).iter())
                .map(|(x, y)| (x - y).abs())
                .sum::<f64>();
        }
    }
    // Each unordered pair counts twice; self-pairs contribute zero.
    let mean = 2.0 * total / (rows * rows * data.ncols()) as f64;
    1.0 / (1.0 + mean)
}

/// Min-max scale to [0, 1]; identical inputs all map to 0.
fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if !(range > 0.0) {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::tests::{two_blobs, two_points};
    use ndarray::array;

    fn model() -> RiskModel {
        RiskModel::new(ClusteringConfig::default(), IntensityWeights::default())
    }

    #[test]
    fn two_blobs_have_high_purity() {
        let x = two_blobs(10, 4, 10.0);
        let m = model().fit(&x, 2).unwrap();
        assert_eq!(m.k(), 2);

        let a = m.assignments();
        let first = a[0];
        let purity_a = a[..10].iter().filter(|&&c| c == first).count();
        let purity_b = a[10..].iter().filter(|&&c| c != first).count();
        assert!((purity_a + purity_b) as f64 / 20.0 > 0.9);
    }

    #[test]
    fn normalized_intensity_in_unit_range() {
        let x = two_blobs(12, 3, 6.0);
        let m = model().fit(&x, 3).unwrap();
        for p in m.profiles() {
            assert!((0.0..=1.0).contains(&p.normalized_intensity));
            assert!(p.risk.is_finite() && p.risk >= 0.0);
        }
        let weight_sum: f64 = m.profiles().iter().map(|p| p.weight).sum();
        assert!((weight_sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn sample_risk_is_cluster_risk() {
        let x = two_blobs(8, 2, 5.0);
        let m = model().fit(&x, 2).unwrap();
        let risks = m.sample_risks();
        assert_eq!(risks.len(), 16);
        for (i, &c) in m.assignments().iter().enumerate() {
            assert_eq!(risks[i], m.profiles()[c].risk);
        }
    }

    #[test]
    fn lowest_intensity_cluster_has_zero_risk() {
        let x = two_blobs(10, 2, 10.0);
        let m = model().fit(&x, 2).unwrap();
        let min_cluster = m
            .profiles()
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.intensity.partial_cmp(&b.1.intensity).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(m.profiles()[min_cluster].risk, 0.0);
    }

    #[test]
    fn hand_computed_profile() {
        // Cluster 0 = rows 0, 2; cluster 1 = rows 1, 3.
        let x = array![[0.0, 2.0], [10.0, 10.0], [2.0, 0.0], [12.0, 12.0]];
        let partition = Partition {
            centroids: array![[1.0, 1.0], [11.0, 11.0]],
            assignments: vec![0, 1, 0, 1],
        };
        let m = model().score_partition(&x, partition);
        let p0 = &m.profiles()[0];

        assert_eq!(p0.size, 2);
        assert!((p0.magnitude - 1.0).abs() < 1e-12);
        assert!((p0.variation - 1.0).abs() < 1e-12);
        // diff of [0,2] -> [2,0] is [2,-2]
        assert!((p0.velocity - 2.0).abs() < 1e-12);
        assert!((p0.intensity - (0.4 + 0.3 + 0.6)).abs() < 1e-12);
        // pairs: self 0, cross |0-2|,|2-0| = 2 → mean over 2*2*2 = 8/8 = 1
        assert!((p0.density - 0.5).abs() < 1e-12);
        assert!((p0.radius - 2f64.sqrt()).abs() < 1e-12);
        // centroid [1, 1] has no spread
        assert_eq!(p0.centroid_std, 0.0);
        assert!((p0.centroid_density - 2.0 / 1e-6).abs() < 1e-3);

        let p1 = &m.profiles()[1];
        assert!((p1.magnitude - 11.0).abs() < 1e-12);
        assert!(p1.intensity > p0.intensity);
        assert_eq!(p0.normalized_intensity, 0.0);
        assert_eq!(p1.normalized_intensity, 1.0);
        // Equal sizes and densities → equal weights.
        assert!((p1.weight - 0.5).abs() < 1e-12);
        assert!((p1.risk - 0.5).abs() < 1e-12);
    }

    #[test]
    fn singleton_cluster_density_is_one() {
        let x = array![[0.0], [0.1], [9.0]];
        let partition = Partition {
            centroids: array![[0.05], [9.0]],
            assignments: vec![0, 0, 1],
        };
        let m = model().score_partition(&x, partition);
        let single = &m.profiles()[1];
        assert_eq!(single.density, 1.0);
        assert_eq!(single.velocity, 0.0);
        assert_eq!(single.variation, 0.0);
    }

    #[test]
    fn equal_intensities_normalize_to_zero() {
        assert_eq!(min_max_normalize(&[0.3, 0.3, 0.3]), vec![0.0, 0.0, 0.0]);
        assert_eq!(min_max_normalize(&[1.0, 3.0, 2.0]), vec![0.0, 1.0, 0.5]);
    }

    #[test]
    fn more_clusters_than_distinct_points_fails() {
        let x = two_points(10);
        assert!(matches!(
            model().fit(&x, 3),
            Err(RiskError::ClusteringFailed(_))
        ));
    }

    #[test]
    fn assign_uses_nearest_centroid() {
        let x = two_blobs(10, 2, 10.0);
        let m = model().fit(&x, 2).unwrap();
        let (c, _) = m.assign(x.row(15));
        assert_eq!(c, m.assignments()[15]);
    }
}
