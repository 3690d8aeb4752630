use serde::{Deserialize, Serialize};

use crate::config::ThresholdConfig;
use crate::error::{Result, RiskError};

/// Fewest risk values for which percentiles are computed at all.
pub const MIN_CALIBRATION_SAMPLES: usize = 5;

/// Below this many risk values the percentile estimates are noisy.
pub const RECOMMENDED_CALIBRATION_SAMPLES: usize = 20;

/// Overlapping low / medium / high boundaries on the risk scale.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    /// Percentiles before the overlap was applied.
    pub low_raw: f64,
    pub median_raw: f64,
    pub high_raw: f64,
}

impl ThresholdSet {
    /// Build from raw percentiles: `medium` is the midpoint of `low_raw` and
    /// `high_raw`, and the outer boundaries move out by `overlap`.
    pub fn from_raw(low_raw: f64, median_raw: f64, high_raw: f64, overlap: f64) -> Self {
        ThresholdSet {
            low: (low_raw - overlap).max(0.0),
            medium: (low_raw + high_raw) / 2.0,
            high: (high_raw + overlap).min(1.0),
            low_raw,
            median_raw,
            high_raw,
        }
    }
}

/// Derives dynamic thresholds from the distribution of training risks.
pub struct ThresholdTuner {
    config: ThresholdConfig,
}

impl ThresholdTuner {
    pub fn new(config: ThresholdConfig) -> Self {
        ThresholdTuner { config }
    }

    pub fn tune(&self, risks: &[f64]) -> Result<ThresholdSet> {
        if risks.len() < MIN_CALIBRATION_SAMPLES {
            return Err(RiskError::InsufficientData {
                required: MIN_CALIBRATION_SAMPLES,
                actual: risks.len(),
            });
        }
        if risks.len() < RECOMMENDED_CALIBRATION_SAMPLES {
            log::warn!(
                "Tuning thresholds on {} risk values; at least {} are recommended",
                risks.len(),
                RECOMMENDED_CALIBRATION_SAMPLES
            );
        }

        let mut sorted = risks.to_vec();
        sorted.sort_by(f64::total_cmp);

        let c = &self.config;
        let set = ThresholdSet::from_raw(
            percentile(&sorted, c.low_percentile),
            percentile(&sorted, c.medium_percentile),
            percentile(&sorted, c.high_percentile),
            c.overlap,
        );
        log::info!(
            "Thresholds: low={:.4} medium={:.4} high={:.4}",
            set.low,
            set.medium,
            set.high
        );
        Ok(set)
    }
}

/// Percentile `p` (0–100) of sorted data, interpolating linearly between the
/// two nearest order statistics.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
