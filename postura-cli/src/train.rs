use std::io::{self, Write};

use anyhow::{Context, Result};
use log::info;
use ndarray::Array2;
use postura_ml::{
    evaluate_realtime, ClusterProfile, ClusterSelection, CrossValidationReport, RealTimePredictor,
    ThresholdSet, Trainer, TrainingReport,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::cli::{EvaluateArgs, TrainArgs, TrainingArgs};
use crate::io::{load_config, load_matrix};

/// Load features and config, then run the full training flow.
pub fn train(args: &TrainingArgs) -> Result<(Array2<f64>, TrainingReport)> {
    let config = load_config(args)?;
    let features = load_matrix(&args.features)?;
    info!(
        "Loaded {} feature vectors of dimension {} from {}",
        features.nrows(),
        features.ncols(),
        args.features.display()
    );
    let report = Trainer::new(config)
        .train(&features)
        .context("Training failed")?;
    Ok((features, report))
}

/// JSON view of a training run. Per-sample risks are left out.
#[derive(Serialize)]
struct TrainSummary<'a> {
    samples: usize,
    dimensions: usize,
    k: usize,
    selection: &'a Option<ClusterSelection>,
    clusters: &'a [ClusterProfile],
    thresholds: &'a ThresholdSet,
    cross_validation: &'a Option<CrossValidationReport>,
}

pub fn run(args: TrainArgs) -> Result<()> {
    let (features, report) = train(&args.training)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.format.as_str() {
        "json" => {
            let model = report.bundle.model();
            let summary = TrainSummary {
                samples: features.nrows(),
                dimensions: features.ncols(),
                k: model.k(),
                selection: &report.selection,
                clusters: model.profiles(),
                thresholds: report.bundle.thresholds(),
                cross_validation: &report.cross_validation,
            };
            writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
        }
        _ => write_text_report(&mut out, &features, &report)?,
    }
    Ok(())
}

pub fn write_text_report(
    out: &mut impl Write,
    features: &Array2<f64>,
    report: &TrainingReport,
) -> Result<()> {
    let model = report.bundle.model();
    writeln!(
        out,
        "Trained on {} samples x {} features",
        features.nrows(),
        features.ncols()
    )?;

    if let Some(selection) = &report.selection {
        writeln!(out, "Cluster selection (silhouette):")?;
        for (k, score) in &selection.scores {
            let marker = if *k == selection.k { " *" } else { "" };
            writeln!(out, "  k={:<2} {:>8.4}{}", k, score, marker)?;
        }
    } else {
        writeln!(out, "Cluster count fixed at k={}", model.k())?;
    }

    writeln!(out, "Clusters:")?;
    writeln!(
        out,
        "  {:>3} {:>6} {:>10} {:>8} {:>8} {:>8}",
        "id", "size", "intensity", "density", "weight", "risk"
    )?;
    for (id, p) in model.profiles().iter().enumerate() {
        writeln!(
            out,
            "  {:>3} {:>6} {:>10.4} {:>8.4} {:>8.4} {:>8.4}",
            id, p.size, p.normalized_intensity, p.density, p.weight, p.risk
        )?;
    }

    let t = report.bundle.thresholds();
    writeln!(
        out,
        "Thresholds: low={:.4} medium={:.4} high={:.4}",
        t.low, t.medium, t.high
    )?;

    if let Some(cv) = &report.cross_validation {
        writeln!(
            out,
            "Cross-validation: {:.3} (+/- {:.3}) over {} folds",
            cv.mean,
            cv.std,
            cv.fold_accuracies.len()
        )?;
    }
    Ok(())
}

pub fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    let (features, report) = train(&args.training)?;
    let predictor = RealTimePredictor::with_bundle(report.bundle);
    let mut rng = match args.predict_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let eval = evaluate_realtime(&predictor, &features, args.samples, &mut rng)
        .context("Real-time evaluation failed")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.format.as_str() {
        "json" => writeln!(out, "{}", serde_json::to_string_pretty(&eval)?)?,
        _ => {
            writeln!(out, "Predictions: {}", eval.samples)?;
            writeln!(
                out,
                "Latency: {:.1}us mean, {:.1}us std",
                eval.mean_latency_us, eval.std_latency_us
            )?;
            for (level, count) in &eval.level_counts {
                let pct = 100.0 * *count as f64 / eval.samples as f64;
                writeln!(out, "  {:<6} {:>6} ({:.1}%)", level, count, pct)?;
            }
            writeln!(
                out,
                "Confidence: mean {:.3}, min {:.3}, max {:.3}",
                eval.mean_confidence, eval.min_confidence, eval.max_confidence
            )?;
        }
    }
    Ok(())
}
