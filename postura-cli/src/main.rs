mod cli;
mod features;
mod io;
mod predict;
mod train;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = cli::Cli::parse();

    match args.command {
        cli::Command::Train(train_args) => train::run(train_args),
        cli::Command::Predict(predict_args) => predict::run(predict_args),
        cli::Command::Evaluate(evaluate_args) => train::run_evaluate(evaluate_args),
        cli::Command::Features(features_args) => features::run(features_args),
    }
}
