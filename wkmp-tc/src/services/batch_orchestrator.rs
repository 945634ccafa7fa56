//! Batch transcode orchestrator
//!
//! # Phase Progression
//! PREPARING → SCANNING → PLANNING → PROCESSING → COMPLETED
//!
//! - **PREPARING**: create the output directory once (fatal on failure)
//! - **SCANNING**: walk the input tree (fatal on failure, nothing started yet)
//! - **PLANNING**: derive destinations, reject output name collisions
//! - **PROCESSING**: bounded worker pool, one blocking task per file
//!
//! Exactly one [`TranscodeOutcome`] is produced per discovered file. Rejected
//! and aborted tasks are reported as failures, never dropped.

use crate::config::{TranscodeConfig, OUTPUT_EXTENSION};
use crate::error::{Error, Result, TranscodeError};
use crate::services::file_scanner::FileScanner;
use crate::services::file_transcoder::FileTranscoder;
use crate::types::{BatchSummary, SourceFile, TranscodeOutcome, TranscodeTask};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Tasks accepted for processing plus outcomes already decided during planning
#[derive(Debug, Default)]
pub struct BatchPlan {
    pub tasks: Vec<TranscodeTask>,
    pub rejected: Vec<TranscodeOutcome>,
}

/// Batch orchestrator service
pub struct BatchOrchestrator {
    input_dir: PathBuf,
    output_dir: PathBuf,
    scanner: FileScanner,
    transcoder: Arc<FileTranscoder>,
    max_concurrency: usize,
}

impl BatchOrchestrator {
    /// Create orchestrator with symphonia decoding and WAV output
    pub fn new(config: &TranscodeConfig) -> Self {
        Self::with_transcoder(config, FileTranscoder::new(config))
    }

    /// Create orchestrator around a preconfigured transcoder
    pub fn with_transcoder(config: &TranscodeConfig, transcoder: FileTranscoder) -> Self {
        Self {
            input_dir: config.input_dir.clone(),
            output_dir: config.output_dir.clone(),
            scanner: FileScanner::new(&config.extension),
            transcoder: Arc::new(transcoder),
            max_concurrency: config.max_concurrency,
        }
    }

    /// Execute complete batch workflow
    ///
    /// Returns `Err` only for run-level failures (output directory, discovery).
    /// Per-file failures are reported inside the summary.
    pub async fn run(&self, cancel_token: &CancellationToken) -> Result<BatchSummary> {
        let start_time = Instant::now();

        self.phase_preparing()?;
        let sources = self.phase_scanning()?;
        let plan = self.phase_planning(sources);
        let mut outcomes = plan.rejected;
        outcomes.extend(self.phase_processing(plan.tasks, cancel_token).await);

        let summary = BatchSummary {
            outcomes,
            elapsed: start_time.elapsed(),
        };

        tracing::info!(
            total = summary.total(),
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "All files have been processed"
        );

        Ok(summary)
    }

    /// Phase 0: PREPARING - create output directory before any task launches
    fn phase_preparing(&self) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| Error::OutputDir {
            path: self.output_dir.clone(),
            source: e,
        })?;

        tracing::debug!(output_dir = %self.output_dir.display(), "Output directory ready");
        Ok(())
    }

    /// Phase 1: SCANNING - complete discovery before fan-out
    fn phase_scanning(&self) -> Result<Vec<SourceFile>> {
        tracing::info!(input_dir = %self.input_dir.display(), "Scanning for source files");

        let sources = self.scanner.scan(&self.input_dir)?;

        tracing::info!(files_found = sources.len(), "File scan completed");
        Ok(sources)
    }

    /// Phase 2: PLANNING - derive destinations and reject collisions
    ///
    /// Destination names are compared case-insensitively. The first source (in
    /// discovery order) claiming a name wins; later claimants are rejected, as
    /// is any source that would be overwritten by its own output.
    pub fn phase_planning(&self, sources: Vec<SourceFile>) -> BatchPlan {
        plan_tasks(sources, &self.output_dir)
    }

    /// Phase 3: PROCESSING - bounded concurrent per-file pipeline
    ///
    /// `max_concurrency == 0` launches every task at once.
    pub async fn phase_processing(
        &self,
        tasks: Vec<TranscodeTask>,
        cancel_token: &CancellationToken,
    ) -> Vec<TranscodeOutcome> {
        let total_files = tasks.len();
        if total_files == 0 {
            return Vec::new();
        }

        let workers = match self.max_concurrency {
            0 => total_files,
            n => n.min(total_files),
        };

        tracing::info!(
            file_count = total_files,
            workers,
            "Processing files"
        );

        // Progress counter
        let files_processed = Arc::new(AtomicUsize::new(0));

        stream::iter(tasks)
            .map(|task| {
                let transcoder = self.transcoder.clone();
                let cancel_token = cancel_token.clone();
                let files_processed = files_processed.clone();

                async move {
                    tracing::info!(file = %task.source.path.display(), "Processing file");

                    let start_time = Instant::now();
                    let worker_task = task.clone();
                    let outcome = match tokio::task::spawn_blocking(move || {
                        transcoder.transcode(&worker_task, &cancel_token)
                    })
                    .await
                    {
                        Ok(outcome) => outcome,
                        Err(e) => TranscodeOutcome::failed(
                            &task,
                            TranscodeError::Aborted(e.to_string()),
                            start_time.elapsed(),
                        ),
                    };

                    log_outcome(&outcome);

                    let current = files_processed.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::debug!(
                        progress = format!("{}/{}", current, total_files),
                        "Pipeline progress update"
                    );

                    outcome
                }
            })
            .buffer_unordered(workers)
            .collect()
            .await
    }
}

/// Map sources to flat destinations in `output_dir`, rejecting duplicates.
///
/// A source whose destination is the source itself still claims its name,
/// so no later source can be written over it.
pub fn plan_tasks(sources: Vec<SourceFile>, output_dir: &Path) -> BatchPlan {
    let mut plan = BatchPlan::default();
    let mut claimed: HashMap<String, PathBuf> = HashMap::new();

    for source in sources {
        let destination = source.destination_in(output_dir, OUTPUT_EXTENSION);
        let key = destination.to_string_lossy().to_lowercase();
        let task = TranscodeTask {
            source,
            destination,
        };

        if let Some(winner) = claimed.get(&key) {
            tracing::warn!(
                file = %task.source.path.display(),
                winner = %winner.display(),
                destination = %task.destination.display(),
                "Output name collision, skipping file"
            );
            let error = TranscodeError::OutputCollision {
                winner: winner.clone(),
            };
            plan.rejected
                .push(TranscodeOutcome::failed(&task, error, Duration::ZERO));
            continue;
        }

        claimed.insert(key, task.source.path.clone());

        if task.overwrites_source() {
            tracing::warn!(
                file = %task.source.path.display(),
                "Destination is the source file, skipping file"
            );
            let error = TranscodeError::OverwritesSource {
                path: task.destination.clone(),
            };
            plan.rejected
                .push(TranscodeOutcome::failed(&task, error, Duration::ZERO));
            continue;
        }

        plan.tasks.push(task);
    }

    plan
}

fn log_outcome(outcome: &TranscodeOutcome) {
    match outcome.error() {
        None => tracing::info!(
            file = %outcome.source.display(),
            output = %outcome.destination.display(),
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "Successfully converted"
        ),
        Some(e) => tracing::error!(
            file = %outcome.source.display(),
            error = %e,
            "Error converting file"
        ),
    }
}
