//! Unsupervised movement-risk scoring.
//!
//! `postura-ml` learns a risk scale from unlabeled movement feature vectors
//! and scores new vectors against it in real time. No labels are needed: the
//! engine clusters the training data, characterises each cluster by how
//! intense and how tightly packed its movements are, and turns that into a
//! risk in `[0, 1]` per cluster.
//!
//! # Pipeline
//!
//! 1. **Scaling**: [`FeatureScaler`] standardises every dimension to zero
//!    mean and unit variance.
//! 2. **Cluster selection**: [`ClusterSelector`] runs K-Means for each
//!    candidate `k` (2 to 5 by default) and keeps the one with the best
//!    silhouette score.
//! 3. **Risk scoring**: [`RiskModel`] fits the final clustering and derives
//!    per-cluster intensity, density and risk.
//! 4. **Thresholds**: [`ThresholdTuner`] reads low / medium / high boundaries
//!    off the distribution of training risks.
//! 5. **Validation**: [`CrossValidator`] checks that held-out vectors land in
//!    clusters whose risk matches their own.
//! 6. **Prediction**: [`RealTimePredictor`] assigns a vector to its nearest
//!    centroid and classifies its risk with soft sigmoid boundaries.
//!
//! [`Trainer`] runs steps 1 to 5 and produces a [`ModelBundle`], which the
//! predictor swaps in atomically.
//!
//! # Usage
//!
//! ```no_run
//! use ndarray::Array2;
//! use postura_ml::{RealTimePredictor, RiskConfig, Trainer};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! # fn load_features() -> Array2<f64> { Array2::zeros((100, 106)) }
//! # fn main() -> postura_ml::Result<()> {
//! let features = load_features();
//! let report = Trainer::new(RiskConfig::default()).train(&features)?;
//!
//! let predictor = RealTimePredictor::new();
//! predictor.install(report.bundle);
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let result = predictor.predict(&vec![0.0; 106], &mut rng)?;
//! println!("{} ({:.2})", result.risk_level, result.movement_risk_score);
//! # Ok(())
//! # }
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Trainer`] | Runs the whole training flow from raw feature vectors |
//! | [`ModelBundle`] | Immutable scaler, cluster model, thresholds and prediction settings |
//! | [`RealTimePredictor`] | Thread-safe scorer over a swappable bundle |
//! | [`ClusterProfile`] | Per-cluster intensity factors, density and risk |
//! | [`ThresholdSet`] | Overlapping low / medium / high risk boundaries |
//! | [`PoseFeatureExtractor`] | 33 pose landmarks to a 106-dimensional feature vector |

mod bundle;
mod config;
mod cross_validation;
mod error;
mod evaluation;
mod features;
mod partition;
mod predictor;
mod risk_model;
mod scaler;
mod selector;
mod thresholds;

pub use bundle::{ModelBundle, Trainer, TrainingReport};
pub use config::{
    BoundaryMode, ClusteringConfig, ConfidenceSource, CrossValidationConfig, IntensityWeights, PredictionConfig,
    RiskConfig, ThresholdConfig,
};
pub use cross_validation::{CrossValidationReport, CrossValidator};
pub use error::{Result, RiskError};
pub use evaluation::{evaluate_realtime, RealtimeReport};
pub use features::{
    collect_features, joint_angle, FeatureProvider, PoseFeatureExtractor, DERIVED_FEATURES,
    FEATURE_DIM,
};
pub use partition::{fit_kmeans, Partition};
pub use predictor::{classify, confidence, sigmoid, RealTimePredictor};
pub use risk_model::{ClusterModel, ClusterProfile, RiskModel};
pub use scaler::{FeatureScaler, ScalerState};
pub use selector::{silhouette_score, ClusterSelection, ClusterSelector};
pub use thresholds::{
    percentile, ThresholdSet, ThresholdTuner, MIN_CALIBRATION_SAMPLES,
    RECOMMENDED_CALIBRATION_SAMPLES,
};

pub use postura_types::{Landmark, PredictionResult, RiskLevel};
