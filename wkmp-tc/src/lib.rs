//! wkmp-tc library interface
//!
//! Batch transcoder: discovers compressed audio files under an input tree and
//! converts each one to a 16-bit stereo PCM WAV file in a flat output
//! directory, processing files concurrently with per-file failure isolation.
//!
//! Exposes public APIs for the binary and for integration testing.

pub mod audio;
pub mod config;
pub mod error;
pub mod services;
pub mod types;

pub use crate::config::TranscodeConfig;
pub use crate::error::{Error, Result};
pub use crate::services::BatchOrchestrator;
pub use crate::types::{BatchSummary, TranscodeOutcome};

use tokio_util::sync::CancellationToken;

/// Validate `config`, then run one batch with the default symphonia → WAV pipeline
pub async fn run_batch(config: &TranscodeConfig, cancel_token: &CancellationToken) -> Result<BatchSummary> {
    config.validate()?;
    BatchOrchestrator::new(config).run(cancel_token).await
}
