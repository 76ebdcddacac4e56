//! CLI entry point for running the engine against a recorded tick.
//!
//! Responsibilities:
//! - Parse flags and an optional TOML run config (log level, JSON output)
//! - Initialize tracing
//! - Load one tick's [`oref::engine::EngineInputs`] from a JSON file and
//!   print the resulting `Determination` (or error) as JSON

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use eyre::WrapErr;
use serde::Deserialize;

use oref::engine::{determine, EngineInputs};

#[derive(Parser)]
#[command(name = "oref-cli", about = "Run one engine tick against recorded inputs")]
struct Cli {
    /// JSON file containing a serialized `EngineInputs`.
    inputs: PathBuf,

    /// Optional TOML run config (log level, pretty-printing).
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct RunConfig {
    #[serde(default)]
    log_level: Option<String>,
    #[serde(default)]
    pretty: bool,
}

fn main() -> eyre::Result<()> {
    let _ = color_eyre::install();

    let shutdown = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let shutdown_clone = std::sync::Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        shutdown_clone.store(true, std::sync::atomic::Ordering::SeqCst);
    }) {
        eprintln!("warning: failed to install signal handler: {e}");
    }

    let cli = Cli::parse();

    let run_config: RunConfig = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path).wrap_err_with(|| format!("read config {path:?}"))?;
            toml::from_str(&text).wrap_err_with(|| format!("parse config {path:?}"))?
        }
        None => RunConfig::default(),
    };

    let log_level = cli.log_level.or(run_config.log_level).unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_new(&log_level).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .init();

    let inputs_text = fs::read_to_string(&cli.inputs).wrap_err_with(|| format!("read inputs {:?}", cli.inputs))?;
    let inputs: EngineInputs = serde_json::from_str(&inputs_text).wrap_err_with(|| format!("parse inputs {:?}", cli.inputs))?;

    if shutdown.load(std::sync::atomic::Ordering::SeqCst) {
        return Err(eyre::eyre!("interrupted before tick ran"));
    }

    match determine(&inputs) {
        Ok(determination) => {
            let json = if run_config.pretty {
                serde_json::to_string_pretty(&determination)?
            } else {
                serde_json::to_string(&determination)?
            };
            println!("{json}");
            Ok(())
        }
        Err(e) => {
            let obj = serde_json::json!({ "error": e.to_string() });
            println!("{obj}");
            std::process::exit(1);
        }
    }
}
