use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use ndarray::Array2;
use postura_ml::RiskConfig;
use postura_types::Landmark;
use serde::de::DeserializeOwned;

use crate::cli::TrainingArgs;

/// Load the YAML config (or defaults) and apply command-line overrides.
pub fn load_config(args: &TrainingArgs) -> Result<RiskConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_yaml::from_str::<RiskConfig>(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => RiskConfig::default(),
    };

    if let Some(k) = args.min_k {
        config.clustering.min_clusters = k;
    }
    if let Some(k) = args.max_k {
        config.clustering.max_clusters = k;
    }
    if let Some(k) = args.clusters {
        config.clustering.fixed_clusters = Some(k);
    }
    if let Some(folds) = args.folds {
        config.cross_validation.folds = folds;
    }
    if args.no_cv {
        config.cross_validation.enabled = false;
    }
    if let Some(seed) = args.seed {
        config.clustering.seed = seed;
        config.cross_validation.seed = seed;
    }
    if args.strict {
        config.strict_dimensions = true;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Open `path`, or stdin when absent.
pub fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    match path {
        Some(p) => {
            let file =
                File::open(p).with_context(|| format!("Failed to open {}", p.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

/// Parse one JSON value per non-empty line.
pub fn read_ndjson<T: DeserializeOwned>(reader: impl BufRead) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }
        let value = serde_json::from_str(&line)
            .with_context(|| format!("Failed to parse NDJSON line {}", i + 1))?;
        out.push(value);
    }
    Ok(out)
}

/// Stack equal-length vectors into a matrix, one row per vector.
pub fn to_matrix(rows: &[Vec<f64>]) -> Result<Array2<f64>> {
    let first = rows.first().context("Feature input is empty")?;
    let dim = first.len();
    anyhow::ensure!(dim > 0, "Feature vectors are empty");

    let mut data = Vec::with_capacity(rows.len() * dim);
    for (i, row) in rows.iter().enumerate() {
        anyhow::ensure!(
            row.len() == dim,
            "Feature row {} has {} values, expected {}",
            i + 1,
            row.len(),
            dim
        );
        anyhow::ensure!(
            row.iter().all(|v| v.is_finite()),
            "Feature row {} contains a non-finite value",
            i + 1
        );
        data.extend_from_slice(row);
    }
    Ok(Array2::from_shape_vec((rows.len(), dim), data)?)
}

pub fn load_matrix(path: &Path) -> Result<Array2<f64>> {
    let rows: Vec<Vec<f64>> = read_ndjson(open_input(Some(path))?)
        .with_context(|| format!("Failed to load features from {}", path.display()))?;
    to_matrix(&rows)
}

pub fn read_frames(reader: impl BufRead) -> Result<Vec<Vec<Landmark>>> {
    read_ndjson(reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use std::path::PathBuf;

    fn training_args(features: PathBuf) -> TrainingArgs {
        TrainingArgs {
            features,
            config: None,
            min_k: None,
            max_k: None,
            clusters: None,
            folds: None,
            no_cv: false,
            seed: None,
            strict: false,
        }
    }

    #[test]
    fn read_ndjson_skips_blank_lines() {
        let input = Cursor::new("[1.0, 2.0]\n\n[3.0, 4.0]\n");
        let rows: Vec<Vec<f64>> = read_ndjson(input).unwrap();
        assert_eq!(rows, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn read_ndjson_reports_line_number() {
        let input = Cursor::new("[1.0]\nnot json\n");
        let err = read_ndjson::<Vec<f64>>(input).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn to_matrix_rejects_ragged_rows() {
        let err = to_matrix(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(err.to_string().contains("expected 2"));
        assert!(to_matrix(&[]).is_err());
    }

    #[test]
    fn load_matrix_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[0.0, 1.0, 2.0]").unwrap();
        writeln!(file, "[3.0, 4.0, 5.0]").unwrap();
        let m = load_matrix(file.path()).unwrap();
        assert_eq!(m.dim(), (2, 3));
        assert_eq!(m[[1, 2]], 5.0);
    }

    #[test]
    fn config_yaml_with_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "clustering:\n  max_clusters: 4\nthresholds:\n  overlap: 0.05").unwrap();

        let mut args = training_args(PathBuf::from("unused"));
        args.config = Some(file.path().to_path_buf());
        args.seed = Some(9);
        args.no_cv = true;
        let config = load_config(&args).unwrap();

        assert_eq!(config.clustering.max_clusters, 4);
        assert_eq!(config.clustering.min_clusters, 2);
        assert_eq!(config.thresholds.overlap, 0.05);
        assert_eq!(config.clustering.seed, 9);
        assert_eq!(config.cross_validation.seed, 9);
        assert!(!config.cross_validation.enabled);
    }

    #[test]
    fn invalid_override_rejected() {
        let mut args = training_args(PathBuf::from("unused"));
        args.min_k = Some(6);
        assert!(load_config(&args).is_err());
    }

    #[test]
    fn frames_parse_with_default_visibility() {
        let input = Cursor::new(r#"[{"x":0.1,"y":0.2,"z":0.0},{"x":0.3,"y":0.4,"z":0.1,"visibility":0.5}]"#);
        let frames = read_frames(input).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), 2);
        assert_eq!(frames[0][1].visibility, 0.5);
    }
}
