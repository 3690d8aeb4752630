use std::sync::Arc;

use parking_lot::RwLock;
use postura_types::{PredictionResult, RiskLevel};
use rand::Rng;

use crate::bundle::ModelBundle;
use crate::config::{BoundaryMode, ConfidenceSource, PredictionConfig};
use crate::error::{Result, RiskError};
use crate::risk_model::ClusterProfile;
use crate::thresholds::ThresholdSet;

/// Real-time scorer over a swappable [`ModelBundle`].
///
/// Readers clone the current `Arc` and score against it without holding the
/// lock, so an [`install`](Self::install) never exposes a half-updated model.
#[derive(Default)]
pub struct RealTimePredictor {
    bundle: RwLock<Option<Arc<ModelBundle>>>,
}

impl RealTimePredictor {
    pub fn new() -> Self {
        RealTimePredictor {
            bundle: RwLock::new(None),
        }
    }

    pub fn with_bundle(bundle: ModelBundle) -> Self {
        RealTimePredictor {
            bundle: RwLock::new(Some(Arc::new(bundle))),
        }
    }

    /// Replace the whole model bundle. Returns the previous one, if any.
    pub fn install(&self, bundle: ModelBundle) -> Option<Arc<ModelBundle>> {
        let previous = self.bundle.write().replace(Arc::new(bundle));
        log::info!("Installed new model bundle");
        previous
    }

    /// Snapshot of the current bundle.
    pub fn bundle(&self) -> Option<Arc<ModelBundle>> {
        self.bundle.read().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.bundle.read().is_some()
    }

    /// Score one raw (unscaled) feature vector.
    pub fn predict<R: Rng + ?Sized>(&self, features: &[f64], rng: &mut R) -> Result<PredictionResult> {
        let bundle = self.bundle().ok_or(RiskError::NotFitted)?;
        bundle.predict(features, rng)
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Confidence of assigning a point at `distance` from the centroid of `profile`.
///
/// A cluster with no training members scores 0.0.
pub fn confidence(distance: f64, profile: &ClusterProfile, config: &PredictionConfig) -> f64 {
    if profile.size == 0 {
        return 0.0;
    }
    let (spread, density) = match config.confidence_source {
        ConfidenceSource::Centroid => (profile.centroid_std, profile.centroid_density),
        ConfidenceSource::MemberRadius => (profile.radius, profile.point_density),
    };
    let normalized_distance = distance / (spread + config.epsilon);
    let distance_confidence = 1.0 / (1.0 + normalized_distance);
    let density_confidence = (density / config.density_scale).clamp(0.0, 1.0);
    let c = config.distance_weight * distance_confidence + config.density_weight * density_confidence;
    if c.is_nan() {
        0.0
    } else {
        c.clamp(0.0, 1.0)
    }
}

/// Map a risk value to a level.
///
/// Below `low` is always low and at or above `high` is always high. In
/// between, a sigmoid centred on the nearer outer boundary decides between
/// the two adjacent levels:
///
/// | Zone | Sigmoid | `u < t` | otherwise |
/// |------|---------|---------|-----------|
/// | `[low, medium)` | `σ(s·(risk − low))` | low | medium |
/// | `[medium, high)` | `σ(s·(risk − high))` | medium | high |
pub fn classify<R: Rng + ?Sized>(
    risk: f64,
    thresholds: &ThresholdSet,
    config: &PredictionConfig,
    rng: &mut R,
) -> RiskLevel {
    if risk < thresholds.low {
        return RiskLevel::Low;
    }
    if risk >= thresholds.high {
        return RiskLevel::High;
    }

    let (anchor, below, above) = if risk < thresholds.medium {
        (thresholds.low, RiskLevel::Low, RiskLevel::Medium)
    } else {
        (thresholds.high, RiskLevel::Medium, RiskLevel::High)
    };
    let transition = sigmoid(config.steepness * (risk - anchor));
    let u = match config.boundary {
        BoundaryMode::Stochastic => rng.gen::<f64>(),
        BoundaryMode::Deterministic => 0.5,
    };
    if u < transition {
        below
    } else {
        above
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClusteringConfig, IntensityWeights};
    use crate::partition::Partition;
    use crate::risk_model::RiskModel;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn thresholds() -> ThresholdSet {
        ThresholdSet::from_raw(0.3, 0.45, 0.6, 0.1)
    }

    fn profile(centroid_std: f64, centroid_density: f64) -> ClusterProfile {
        ClusterProfile {
            size: 10,
            magnitude: 0.0,
            variation: 0.0,
            velocity: 0.0,
            intensity: 0.0,
            normalized_intensity: 0.0,
            density: 1.0,
            weight: 1.0,
            risk: 0.0,
            centroid_std,
            centroid_density,
            radius: 0.0,
            point_density: 0.0,
        }
    }

    #[test]
    fn sigmoid_midpoint_and_tails() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(10.0) > 0.9999);
        assert!(sigmoid(-10.0) < 0.0001);
    }

    #[test]
    fn far_below_low_is_always_low() {
        let t = thresholds();
        let cfg = PredictionConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            assert_eq!(classify(0.0, &t, &cfg, &mut rng), RiskLevel::Low);
        }
    }

    #[test]
    fn at_or_above_high_is_always_high() {
        let t = thresholds();
        let cfg = PredictionConfig::default();
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..1000 {
            assert_eq!(classify(t.high, &t, &cfg, &mut rng), RiskLevel::High);
            assert_eq!(classify(1.0, &t, &cfg, &mut rng), RiskLevel::High);
        }
    }

    #[test]
    fn low_medium_seam_mixes_levels() {
        let t = thresholds();
        let cfg = PredictionConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        // Just above `low`: transition ≈ 0.5, so both levels appear.
        let risk = t.low + 0.01;
        let levels: Vec<_> = (0..500).map(|_| classify(risk, &t, &cfg, &mut rng)).collect();
        assert!(levels.contains(&RiskLevel::Low));
        assert!(levels.contains(&RiskLevel::Medium));
        assert!(levels.iter().all(|l| *l != RiskLevel::High));
    }

    #[test]
    fn medium_high_seam_never_low() {
        let t = thresholds();
        let cfg = PredictionConfig::default();
        let mut rng = StdRng::seed_from_u64(4);
        let risk = (t.medium + t.high) / 2.0;
        for _ in 0..500 {
            assert_ne!(classify(risk, &t, &cfg, &mut rng), RiskLevel::Low);
        }
    }

    #[test]
    fn deterministic_mode_is_repeatable() {
        let t = thresholds();
        let cfg = PredictionConfig {
            boundary: BoundaryMode::Deterministic,
            ..PredictionConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        // σ(10·(0.25 − 0.2)) ≈ 0.62 > 0.5 → low
        let first = classify(0.25, &t, &cfg, &mut rng);
        assert_eq!(first, RiskLevel::Low);
        for _ in 0..100 {
            assert_eq!(classify(0.25, &t, &cfg, &mut rng), first);
        }
        // σ(10·(0.5 − 0.7)) ≈ 0.12 < 0.5 → high
        assert_eq!(classify(0.5, &t, &cfg, &mut rng), RiskLevel::High);
    }

    #[test]
    fn confidence_at_centroid_of_dense_cluster_is_one() {
        let cfg = PredictionConfig::default();
        let c = confidence(0.0, &profile(1.0, 500.0), &cfg);
        assert!((c - 1.0).abs() < 1e-12);
    }

    #[test]
    fn confidence_drops_with_distance() {
        let cfg = PredictionConfig::default();
        let p = profile(1.0, 50.0);
        let near = confidence(0.1, &p, &cfg);
        let far = confidence(10.0, &p, &cfg);
        assert!(near > far);
        assert!((0.0..=1.0).contains(&far));
        // 0.6 / (1 + 10) + 0.4 * 0.5
        assert!((far - (0.6 / (1.0 + 10.0 / (1.0 + 1e-6)) + 0.2)).abs() < 1e-9);
    }

    #[test]
    fn confidence_zero_spread_guarded() {
        let cfg = PredictionConfig::default();
        let c = confidence(1.0, &profile(0.0, 0.0), &cfg);
        assert!(c.is_finite());
        assert!((0.0..=1.0).contains(&c));
    }

    #[test]
    fn confidence_uses_centroid_spread() {
        let scorer = RiskModel::new(ClusteringConfig::default(), IntensityWeights::default());
        // Members sit far from the centroid; only the centroid [1, 3] matters.
        let x = array![[-9.0, -7.0], [11.0, 13.0], [50.0, 50.0]];
        let partition = Partition {
            centroids: array![[1.0, 3.0], [50.0, 50.0]],
            assignments: vec![0, 0, 1],
        };
        let m = scorer.score_partition(&x, partition);
        let p = &m.profiles()[0];
        assert!((p.centroid_std - 1.0).abs() < 1e-12);

        let cfg = PredictionConfig::default();
        let c = confidence(1.0, p, &cfg);
        // std 1, density 2 / (1 + ε)
        let expected = 0.6 / (1.0 + 1.0 / (1.0 + 1e-6)) + 0.4 * (2.0 / (1.0 + 1e-6)) / 100.0;
        assert!((c - expected).abs() < 1e-12);

        let by_radius = PredictionConfig {
            confidence_source: ConfidenceSource::MemberRadius,
            ..PredictionConfig::default()
        };
        assert!(confidence(1.0, p, &by_radius) > c);
    }

    #[test]
    fn confidence_of_memberless_cluster_is_zero() {
        let cfg = PredictionConfig::default();
        let mut p = profile(1.0, 500.0);
        p.size = 0;
        assert_eq!(confidence(0.0, &p, &cfg), 0.0);
    }

    #[test]
    fn predictor_without_bundle_is_not_fitted() {
        let p = RealTimePredictor::new();
        assert!(!p.is_ready());
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            p.predict(&[0.0, 1.0], &mut rng),
            Err(RiskError::NotFitted)
        ));
    }
}
