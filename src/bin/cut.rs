//! Entry point for `cut`: parses arguments and runs the pipeline.

use clap::Parser;
use orb_cpu_tracker::{cli::Cli, run};
use std::process::ExitCode;

fn main() -> ExitCode {
    color_eyre::install().expect("failed to install panic/error report handler");
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();
    match run::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:?}");
            ExitCode::FAILURE
        }
    }
}
