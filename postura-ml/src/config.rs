use serde::{Deserialize, Serialize};

use crate::error::{Result, RiskError};

/// Top-level engine configuration.
///
/// Every field has a default, so an empty YAML document (or `{}`) is a valid
/// configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Reject zero-variance feature columns instead of scaling them to 0.
    pub strict_dimensions: bool,
    pub clustering: ClusteringConfig,
    pub intensity: IntensityWeights,
    pub thresholds: ThresholdConfig,
    pub prediction: PredictionConfig,
    pub cross_validation: CrossValidationConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Smallest cluster count tried by the selector.
    pub min_clusters: usize,
    /// Largest cluster count tried by the selector (inclusive).
    pub max_clusters: usize,
    /// Skip selection and use this cluster count.
    pub fixed_clusters: Option<usize>,
    /// Seed for k-means initialization.
    pub seed: u64,
    pub max_iterations: u64,
    pub tolerance: f64,
    /// Independent k-means restarts; the lowest-inertia run wins.
    pub n_runs: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        ClusteringConfig {
            min_clusters: 2,
            max_clusters: 5,
            fixed_clusters: None,
            seed: 42,
            max_iterations: 300,
            tolerance: 1e-4,
            n_runs: 10,
        }
    }
}

/// Weights of the three intensity factors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntensityWeights {
    pub magnitude: f64,
    pub variation: f64,
    pub velocity: f64,
}

impl Default for IntensityWeights {
    fn default() -> Self {
        IntensityWeights {
            magnitude: 0.4,
            variation: 0.3,
            velocity: 0.3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub low_percentile: f64,
    pub medium_percentile: f64,
    pub high_percentile: f64,
    /// Margin that widens the low and high boundaries into ambiguity zones.
    pub overlap: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        ThresholdConfig {
            low_percentile: 20.0,
            medium_percentile: 50.0,
            high_percentile: 80.0,
            overlap: 0.1,
        }
    }
}

/// How the soft boundary between adjacent risk levels is resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryMode {
    /// Draw a uniform number per call and compare it with the sigmoid.
    #[default]
    Stochastic,
    /// Compare the sigmoid with 0.5.
    Deterministic,
}

/// Which cluster spread feeds the confidence score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceSource {
    /// Spread of the centroid's own components, density `dim / (std + ε)`.
    #[default]
    Centroid,
    /// RMS member-to-centroid distance, density `size / (radius + ε)`.
    MemberRadius,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    pub distance_weight: f64,
    pub density_weight: f64,
    /// Point density at which density confidence saturates at 1.0.
    pub density_scale: f64,
    /// Sigmoid slope at the soft boundaries.
    pub steepness: f64,
    pub epsilon: f64,
    pub boundary: BoundaryMode,
    pub confidence_source: ConfidenceSource,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        PredictionConfig {
            distance_weight: 0.6,
            density_weight: 0.4,
            density_scale: 100.0,
            steepness: 10.0,
            epsilon: 1e-6,
            boundary: BoundaryMode::Stochastic,
            confidence_source: ConfidenceSource::Centroid,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossValidationConfig {
    pub enabled: bool,
    pub folds: usize,
    /// Maximum absolute risk difference counted as a hit.
    pub tolerance: f64,
    pub seed: u64,
}

impl Default for CrossValidationConfig {
    fn default() -> Self {
        CrossValidationConfig {
            enabled: true,
            folds: 5,
            tolerance: 0.1,
            seed: 42,
        }
    }
}

impl RiskConfig {
    /// Check ranges that would otherwise fail deep inside training.
    pub fn validate(&self) -> Result<()> {
        let c = &self.clustering;
        if c.min_clusters < 2 {
            return Err(invalid("clustering.min_clusters must be at least 2"));
        }
        if c.max_clusters < c.min_clusters {
            return Err(invalid(
                "clustering.max_clusters must not be below min_clusters",
            ));
        }
        if let Some(k) = c.fixed_clusters {
            if k < 2 {
                return Err(invalid("clustering.fixed_clusters must be at least 2"));
            }
        }
        if c.n_runs == 0 || c.max_iterations == 0 {
            return Err(invalid(
                "clustering.n_runs and max_iterations must be positive",
            ));
        }
        if !(c.tolerance > 0.0) {
            return Err(invalid("clustering.tolerance must be positive"));
        }

        let w = &self.intensity;
        if [w.magnitude, w.variation, w.velocity]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(invalid("intensity weights must be finite and non-negative"));
        }

        let t = &self.thresholds;
        let in_range = |p: f64| (0.0..=100.0).contains(&p);
        if !(in_range(t.low_percentile) && in_range(t.medium_percentile) && in_range(t.high_percentile))
        {
            return Err(invalid("threshold percentiles must lie in [0, 100]"));
        }
        if !(t.low_percentile <= t.medium_percentile && t.medium_percentile <= t.high_percentile) {
            return Err(invalid("threshold percentiles must be ordered low <= medium <= high"));
        }
        if !(t.overlap >= 0.0 && t.overlap <= 1.0) {
            return Err(invalid("thresholds.overlap must lie in [0, 1]"));
        }

        let p = &self.prediction;
        if !(p.epsilon > 0.0 && p.density_scale > 0.0) {
            return Err(invalid("prediction.epsilon and density_scale must be positive"));
        }
        if p.distance_weight < 0.0 || p.density_weight < 0.0 || !p.steepness.is_finite() {
            return Err(invalid("prediction weights must be non-negative and steepness finite"));
        }

        let cv = &self.cross_validation;
        if cv.enabled && cv.folds < 2 {
            return Err(invalid("cross_validation.folds must be at least 2"));
        }
        if cv.tolerance < 0.0 {
            return Err(invalid("cross_validation.tolerance must be non-negative"));
        }

        Ok(())
    }
}

fn invalid(msg: &str) -> RiskError {
    RiskError::InvalidConfig(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        RiskConfig::default().validate().unwrap();
    }

    #[test]
    fn default_constants() {
        let c = RiskConfig::default();
        assert_eq!((c.clustering.min_clusters, c.clustering.max_clusters), (2, 5));
        assert_eq!(c.thresholds.overlap, 0.1);
        assert_eq!(c.prediction.steepness, 10.0);
        assert_eq!(c.cross_validation.folds, 5);
        assert_eq!(c.prediction.boundary, BoundaryMode::Stochastic);
        assert_eq!(c.prediction.confidence_source, ConfidenceSource::Centroid);
        assert!(!c.strict_dimensions);
    }

    #[test]
    fn empty_yaml_is_default() {
        let c: RiskConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(c, RiskConfig::default());
    }

    #[test]
    fn partial_yaml_overrides_fields() {
        let yaml = "
clustering:
  max_clusters: 8
prediction:
  boundary: deterministic
  confidence_source: member_radius
";
        let c: RiskConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(c.clustering.max_clusters, 8);
        assert_eq!(c.clustering.min_clusters, 2);
        assert_eq!(c.prediction.boundary, BoundaryMode::Deterministic);
        assert_eq!(c.prediction.confidence_source, ConfidenceSource::MemberRadius);
        c.validate().unwrap();
    }

    #[test]
    fn inverted_cluster_range_rejected() {
        let mut c = RiskConfig::default();
        c.clustering.min_clusters = 4;
        c.clustering.max_clusters = 3;
        assert!(matches!(c.validate(), Err(RiskError::InvalidConfig(_))));
    }

    #[test]
    fn single_fold_rejected() {
        let mut c = RiskConfig::default();
        c.cross_validation.folds = 1;
        assert!(c.validate().is_err());
        c.cross_validation.enabled = false;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn unordered_percentiles_rejected() {
        let mut c = RiskConfig::default();
        c.thresholds.low_percentile = 60.0;
        assert!(c.validate().is_err());
    }
}
