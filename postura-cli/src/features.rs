use std::io::{self, Write};

use anyhow::{Context, Result};
use log::info;
use postura_ml::{collect_features, PoseFeatureExtractor};
use postura_types::Landmark;

use crate::cli::FeaturesArgs;
use crate::io::{open_input, read_frames};

pub fn run(args: FeaturesArgs) -> Result<()> {
    let frames = read_frames(open_input(args.frames.as_deref())?)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let rows = write_features(&frames, args.max_frames, &mut out)?;
    info!("Extracted {} feature row(s) from {} frame(s)", rows, frames.len());
    Ok(())
}

/// Write one NDJSON feature row per frame with a detected pose.
pub fn write_features(frames: &[Vec<Landmark>], max_frames: usize, out: &mut impl Write) -> Result<usize> {
    let mut extractor = PoseFeatureExtractor::new();
    let matrix = collect_features(&mut extractor, frames.iter().map(|f| f.as_slice()), max_frames)
        .context("Feature extraction failed")?;
    for row in matrix.outer_iter() {
        writeln!(out, "{}", serde_json::to_string(&row.to_vec())?)?;
    }
    Ok(matrix.nrows())
}
