use ndarray::{Array2, ArrayView1};
use postura_types::PredictionResult;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{PredictionConfig, RiskConfig};
use crate::cross_validation::{CrossValidationReport, CrossValidator};
use crate::error::{Result, RiskError};
use crate::predictor::{classify, confidence};
use crate::risk_model::{ClusterModel, RiskModel};
use crate::scaler::FeatureScaler;
use crate::selector::{ClusterSelection, ClusterSelector};
use crate::thresholds::{ThresholdSet, ThresholdTuner};

/// Everything a real-time scorer needs, produced by one training pass.
///
/// Immutable once built. Retraining produces a new bundle that replaces this
/// one wholesale.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelBundle {
    scaler: FeatureScaler,
    model: ClusterModel,
    thresholds: ThresholdSet,
    prediction: PredictionConfig,
}

impl ModelBundle {
    pub fn new(
        scaler: FeatureScaler,
        model: ClusterModel,
        thresholds: ThresholdSet,
        prediction: PredictionConfig,
    ) -> Result<Self> {
        let dim = scaler.dim().ok_or(RiskError::NotFitted)?;
        if dim != model.dim() {
            return Err(RiskError::DimensionMismatch {
                expected: dim,
                actual: model.dim(),
            });
        }
        Ok(ModelBundle {
            scaler,
            model,
            thresholds,
            prediction,
        })
    }

    pub fn scaler(&self) -> &FeatureScaler {
        &self.scaler
    }

    pub fn model(&self) -> &ClusterModel {
        &self.model
    }

    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }

    pub fn prediction_config(&self) -> &PredictionConfig {
        &self.prediction
    }

    /// Same fitted state, different prediction settings.
    pub fn with_prediction_config(mut self, prediction: PredictionConfig) -> Self {
        self.prediction = prediction;
        self
    }

    /// Input dimensionality expected by [`predict`](Self::predict).
    pub fn dim(&self) -> usize {
        self.model.dim()
    }

    /// Score one raw feature vector.
    pub fn predict<R: Rng + ?Sized>(&self, features: &[f64], rng: &mut R) -> Result<PredictionResult> {
        let scaled = self.scaler.transform(ArrayView1::from(features))?;
        let (cluster_id, distance) = self.model.assign(scaled.view());
        let profile = self
            .model
            .profile(cluster_id)
            .ok_or(RiskError::NotFitted)?;

        let risk = profile.risk;
        Ok(PredictionResult {
            risk_level: classify(risk, &self.thresholds, &self.prediction, rng),
            movement_risk_score: risk,
            confidence: confidence(distance, profile, &self.prediction),
            cluster_id,
        })
    }
}

/// Result of [`Trainer::train`].
#[derive(Clone, Debug, Serialize)]
pub struct TrainingReport {
    pub bundle: ModelBundle,
    /// Absent when the cluster count was fixed by configuration.
    pub selection: Option<ClusterSelection>,
    /// Risk of every training sample, in input order.
    pub sample_risks: Vec<f64>,
    pub cross_validation: Option<CrossValidationReport>,
}

/// Runs the full training flow: scale, select k, fit risks, tune thresholds,
/// and optionally cross-validate.
pub struct Trainer {
    config: RiskConfig,
}

impl Trainer {
    pub fn new(config: RiskConfig) -> Self {
        Trainer { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn train(&self, features: &Array2<f64>) -> Result<TrainingReport> {
        self.config.validate()?;
        let cfg = &self.config;
        log::info!(
            "Training on {} samples x {} features",
            features.nrows(),
            features.ncols()
        );

        let mut scaler = FeatureScaler::new();
        if cfg.strict_dimensions {
            scaler.fit(features)?;
        } else {
            scaler.fit_lenient(features)?;
        }
        let scaled = scaler.transform_matrix(features)?;

        let (k, selection) = match cfg.clustering.fixed_clusters {
            Some(k) => {
                log::info!("Using fixed cluster count k={}", k);
                (k, None)
            }
            None => {
                let selector = ClusterSelector::new(cfg.clustering.clone());
                let selection = selector.select(&scaled, selector.candidate_range())?;
                (selection.k, Some(selection))
            }
        };

        let model = RiskModel::new(cfg.clustering.clone(), cfg.intensity.clone())
            .with_epsilon(cfg.prediction.epsilon)
            .fit(&scaled, k)?;
        let sample_risks = model.sample_risks();

        let thresholds = ThresholdTuner::new(cfg.thresholds.clone()).tune(&sample_risks)?;

        let cross_validation = if cfg.cross_validation.enabled {
            let validator =
                CrossValidator::new(cfg.clustering.clone(), cfg.cross_validation.clone());
            match validator.evaluate(&scaled, &sample_risks, k, cfg.cross_validation.folds) {
                Ok(report) => Some(report),
                Err(e) => {
                    log::warn!("Cross-validation skipped: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let bundle = ModelBundle::new(scaler, model, thresholds, cfg.prediction.clone())?;
        Ok(TrainingReport {
            bundle,
            selection,
            sample_risks,
            cross_validation,
        })
    }
}
