use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use crate::config::loader::load_config;
use crate::config::types::VerifyConfig;
use crate::config::validator::validate_config;
use crate::exec::signal::SignalHandler;
use crate::pipeline::driver::Pipeline;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Screen generated code/test pairs and keep the ones whose tests pass",
    long_about = None
)]
pub struct Cli {
    /// Input JSONL file, one candidate record per line
    #[arg(long, value_name = "PATH")]
    pub input: PathBuf,
    /// Output JSONL file for accepted records (parent directories are created)
    #[arg(long, value_name = "PATH")]
    pub output: PathBuf,
    /// Per-record test timeout in seconds [default: 10]
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
    /// Concurrent sandbox workers; output order is only guaranteed with 1 [default: 1]
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,
    /// JSON configuration file; flags given on the command line win
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Python interpreter used to run pytest [default: python3]
    #[arg(long, value_name = "PATH")]
    pub python: Option<String>,
}

impl Cli {
    /// File configuration (or defaults) with command-line overrides applied
    pub fn resolve_config(&self) -> Result<VerifyConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => VerifyConfig::default(),
        };

        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(python) = &self.python {
            config.python = python.clone();
        }

        Ok(config)
    }
}

pub fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    execute(Cli::parse())
}

pub fn execute(cli: Cli) -> Result<()> {
    let config = cli.resolve_config()?;
    validate_config(&config).context("Invalid configuration")?;

    let _signals = SignalHandler::init().context("Failed to install signal handlers")?;

    info!(
        "Verifying {} -> {} (timeout {}s, {} worker(s), {} via {})",
        cli.input.display(),
        cli.output.display(),
        config.timeout_secs,
        config.workers,
        config.runner,
        config.python
    );

    let pipeline = Pipeline::from_config(&config).context("Failed to build verification pipeline")?;
    let summary = pipeline
        .process_file(&cli.input, &cli.output)
        .with_context(|| format!("Verification of {} failed", cli.input.display()))?;

    info!("Run complete: {}", summary);
    if let Some(mean) = summary.mean_execution() {
        info!("Mean sandbox execution time: {}ms", mean.as_millis());
    }
    println!(
        "[DONE] kept={} / seen={} -> {}",
        summary.kept,
        summary.seen,
        cli.output.display()
    );

    Ok(())
}
