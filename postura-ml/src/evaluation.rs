use std::collections::BTreeMap;
use std::time::Instant;

use ndarray::Array2;
use postura_types::RiskLevel;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::error::{Result, RiskError};
use crate::predictor::RealTimePredictor;

/// Latency and output distribution of repeated single-vector predictions.
#[derive(Clone, Debug, Serialize)]
pub struct RealtimeReport {
    pub samples: usize,
    pub mean_latency_us: f64,
    pub std_latency_us: f64,
    pub level_counts: BTreeMap<RiskLevel, usize>,
    pub mean_confidence: f64,
    pub min_confidence: f64,
    pub max_confidence: f64,
}

/// Score `samples` rows drawn at random from `features` and time each call.
pub fn evaluate_realtime<R: Rng + ?Sized>(
    predictor: &RealTimePredictor,
    features: &Array2<f64>,
    samples: usize,
    rng: &mut R,
) -> Result<RealtimeReport> {
    if features.nrows() == 0 || samples == 0 {
        return Err(RiskError::EmptyInput("realtime evaluation needs rows and samples"));
    }
    if !predictor.is_ready() {
        return Err(RiskError::NotFitted);
    }

    let rows: Vec<usize> = (0..features.nrows()).collect();
    let mut latencies = Vec::with_capacity(samples);
    let mut confidences = Vec::with_capacity(samples);
    let mut level_counts: BTreeMap<RiskLevel, usize> =
        RiskLevel::ALL.iter().map(|l| (*l, 0)).collect();

    for _ in 0..samples {
        let row = *rows.choose(rng).ok_or(RiskError::EmptyInput("no rows"))?;
        let vector = features.row(row).to_vec();

        let started = Instant::now();
        let result = predictor.predict(&vector, rng)?;
        latencies.push(started.elapsed().as_secs_f64() * 1e6);

        *level_counts.entry(result.risk_level).or_insert(0) += 1;
        confidences.push(result.confidence);
    }

    let n = samples as f64;
    let mean_latency_us = latencies.iter().sum::<f64>() / n;
    let std_latency_us = (latencies
        .iter()
        .map(|l| (l - mean_latency_us).powi(2))
        .sum::<f64>()
        / n)
        .sqrt();

    let report = RealtimeReport {
        samples,
        mean_latency_us,
        std_latency_us,
        level_counts,
        mean_confidence: confidences.iter().sum::<f64>() / n,
        min_confidence: confidences.iter().copied().fold(f64::INFINITY, f64::min),
        max_confidence: confidences.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    };
    log::info!(
        "Realtime: {} predictions, mean latency {:.1}us (+/- {:.1}us), mean confidence {:.3}",
        report.samples,
        report.mean_latency_us,
        report.std_latency_us,
        report.mean_confidence
    );
    Ok(report)
}
