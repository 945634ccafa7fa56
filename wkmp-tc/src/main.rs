//! Batch Transcoder (wkmp-tc) - Main entry point
//!
//! Converts every matching compressed audio file under the input directory to
//! a 16-bit stereo WAV file in the output directory.
//!
//! Exit status: 0 when every file converted, 2 when any file failed, 1 on a
//! run-level error (configuration, output directory, discovery).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wkmp_tc::config::{ConfigOverrides, TomlConfig};
use wkmp_tc::{BatchOrchestrator, TranscodeConfig};

/// Command-line arguments for wkmp-tc
#[derive(Parser, Debug)]
#[command(name = "wkmp-tc")]
#[command(about = "Batch audio transcoder for WKMP")]
#[command(version)]
struct Args {
    /// Directory scanned recursively for source files
    #[arg(short, long, env = "WKMP_TC_INPUT_DIR")]
    input: Option<PathBuf>,

    /// Directory receiving converted WAV files
    #[arg(short, long, env = "WKMP_TC_OUTPUT_DIR")]
    output: Option<PathBuf>,

    /// Source file extension (case-insensitive)
    #[arg(short, long, env = "WKMP_TC_EXTENSION")]
    extension: Option<String>,

    /// Maximum concurrent files (0 = one task per file)
    #[arg(short, long, env = "WKMP_TC_JOBS")]
    jobs: Option<usize>,

    /// Decoder read size in bytes
    #[arg(long)]
    block_size: Option<usize>,

    /// Keep partially written outputs after a failure
    #[arg(long)]
    keep_partial: bool,

    /// Log level when RUST_LOG is not set
    #[arg(long, env = "WKMP_TC_LOG_LEVEL")]
    log_level: Option<String>,

    /// TOML configuration file
    #[arg(short, long, env = "WKMP_TC_CONFIG")]
    config: Option<PathBuf>,

    /// Print a JSON summary to standard output when done
    #[arg(long)]
    summary_json: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let file_config =
        TomlConfig::load(args.config.as_deref()).context("Failed to load configuration file")?;
    let overrides = ConfigOverrides {
        input_dir: args.input,
        output_dir: args.output,
        extension: args.extension,
        max_concurrency: args.jobs,
        block_size: args.block_size,
        keep_partial_outputs: args.keep_partial,
        log_level: args.log_level,
    };
    let config = TranscodeConfig::resolve(overrides, file_config)
        .context("Invalid configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("wkmp_tc={}", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting WKMP batch transcoder v{}", env!("CARGO_PKG_VERSION"));
    info!("Input: {}", config.input_dir.display());
    info!("Output: {}", config.output_dir.display());

    let cancel_token = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel_token.clone()));

    let orchestrator = BatchOrchestrator::new(&config);
    let summary = orchestrator
        .run(&cancel_token)
        .await
        .context("Batch aborted before transcoding")?;

    for failure in summary.failures() {
        if let Some(e) = failure.error() {
            warn!(file = %failure.source.display(), error = %e, "Not converted");
        }
    }

    if args.summary_json {
        let json = serde_json::to_string_pretty(&summary.to_report())
            .context("Failed to serialize summary")?;
        println!("{}", json);
    }

    if summary.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(2))
    }
}

/// Cancel the batch on Ctrl+C; running files stop at their next read or write
async fn cancel_on_ctrl_c(cancel_token: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            warn!("Ctrl+C received, cancelling remaining files");
            cancel_token.cancel();
        }
        Err(e) => warn!("Failed to install Ctrl+C handler: {}", e),
    }
}
