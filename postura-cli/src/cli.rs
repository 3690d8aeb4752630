use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "postura")]
#[command(about = "Unsupervised movement-risk scoring for captured body poses")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Train on a feature file and report clusters, risks and thresholds
    Train(TrainArgs),

    /// Train, then score feature vectors (stdin NDJSON -> stdout results)
    Predict(PredictArgs),

    /// Train, then time repeated real-time predictions
    Evaluate(EvaluateArgs),

    /// Convert NDJSON landmark frames into NDJSON feature rows
    Features(FeaturesArgs),
}

/// Options shared by every command that trains a model.
#[derive(Debug, Args)]
pub struct TrainingArgs {
    /// NDJSON feature file, one JSON array of numbers per line
    #[arg(long)]
    pub features: PathBuf,

    /// YAML engine configuration (defaults apply to missing fields)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Smallest cluster count to try
    #[arg(long)]
    pub min_k: Option<usize>,

    /// Largest cluster count to try
    #[arg(long)]
    pub max_k: Option<usize>,

    /// Use exactly this many clusters and skip selection
    #[arg(long, conflicts_with_all = ["min_k", "max_k"])]
    pub clusters: Option<usize>,

    /// Cross-validation fold count
    #[arg(long)]
    pub folds: Option<usize>,

    /// Skip cross-validation
    #[arg(long)]
    pub no_cv: bool,

    /// Seed for clustering and fold shuffling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Reject zero-variance feature columns instead of scaling them to 0
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Args)]
pub struct TrainArgs {
    #[command(flatten)]
    pub training: TrainingArgs,

    /// Output format: "text" (default) or "json"
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

#[derive(Debug, Args)]
pub struct PredictArgs {
    #[command(flatten)]
    pub training: TrainingArgs,

    /// NDJSON file of vectors to score (reads stdin if omitted)
    #[arg(long)]
    pub samples: Option<PathBuf>,

    /// Seed for the soft-boundary draw
    #[arg(long)]
    pub predict_seed: Option<u64>,

    /// Classify boundary zones without randomness
    #[arg(long)]
    pub deterministic: bool,

    /// Output format: "text" (default) or "json"
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

#[derive(Debug, Args)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub training: TrainingArgs,

    /// Number of timed predictions
    #[arg(short = 'n', long, default_value_t = 100)]
    pub samples: usize,

    /// Seed for row sampling and the soft-boundary draw
    #[arg(long)]
    pub predict_seed: Option<u64>,

    /// Output format: "text" (default) or "json"
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

#[derive(Debug, Args)]
pub struct FeaturesArgs {
    /// NDJSON file of frames, each a JSON array of landmarks (reads stdin if omitted)
    #[arg(long)]
    pub frames: Option<PathBuf>,

    /// Stop after this many detected frames
    #[arg(long, default_value_t = 1000)]
    pub max_frames: usize,
}
