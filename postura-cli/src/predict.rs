use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use log::{info, warn};
use postura_ml::{BoundaryMode, ModelBundle, RealTimePredictor, RiskError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cli::PredictArgs;
use crate::io::open_input;
use crate::train::train;

pub fn run(args: PredictArgs) -> Result<()> {
    let (_, mut report) = train(&args.training)?;
    if args.deterministic {
        report.bundle = with_deterministic_boundary(report.bundle);
    }

    let predictor = RealTimePredictor::new();
    predictor.install(report.bundle);
    info!("Model ready; scoring input vectors");

    let mut rng = match args.predict_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let input = open_input(args.samples.as_deref())?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let scored = score_stream(&predictor, input, &mut out, &args.format, &mut rng)?;
    info!("Scored {} vector(s)", scored);
    Ok(())
}

fn with_deterministic_boundary(bundle: ModelBundle) -> ModelBundle {
    let mut prediction = bundle.prediction_config().clone();
    prediction.boundary = BoundaryMode::Deterministic;
    bundle.with_prediction_config(prediction)
}

/// Score each NDJSON vector from `input`, writing one result line per vector.
///
/// A vector of the wrong dimension is reported and skipped; other errors stop
/// the stream.
pub fn score_stream<R: Rng + ?Sized>(
    predictor: &RealTimePredictor,
    input: impl BufRead,
    out: &mut impl Write,
    format: &str,
    rng: &mut R,
) -> Result<usize> {
    let mut scored = 0;
    for (i, line) in input.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }
        let vector: Vec<f64> = serde_json::from_str(&line)
            .with_context(|| format!("Failed to parse vector on line {}", i + 1))?;

        let result = match predictor.predict(&vector, rng) {
            Ok(r) => r,
            Err(e @ RiskError::DimensionMismatch { .. }) => {
                warn!("Skipping line {}: {}", i + 1, e);
                continue;
            }
            Err(e) => return Err(e).context("Prediction failed"),
        };

        match format {
            "json" => writeln!(out, "{}", serde_json::to_string(&result)?)?,
            _ => writeln!(
                out,
                "{:<6} score={:.4} confidence={:.3} cluster={}",
                result.risk_level.as_str(),
                result.movement_risk_score,
                result.confidence,
                result.cluster_id
            )?,
        }
        scored += 1;
    }
    Ok(scored)
}
