//! Single-file transcode pipeline
//!
//! State progression per file:
//! OPEN → DECODING → ENCODING → CLOSED, with FAILED reachable from any
//! non-terminal state.
//!
//! - OPEN: open source for reading, create destination, write the container
//!   header
//! - DECODING: initialize decoder, read native sample rate
//! - ENCODING: pull fixed-size blocks, convert, append to container
//! - CLOSED: finalize container
//!
//! Every failure is converted into a [`TranscodeOutcome`] at this boundary;
//! nothing propagates to the batch.
//!
//! Cancellation is checked before opening, before every read and before every
//! write. Blocking work: call from a blocking-capable thread.

use crate::audio::decoder::{DecoderBackend, SymphoniaBackend};
use crate::audio::encoder::{EncoderBackend, WavBackend};
use crate::audio::frames::{FrameConverter, FrameFormat};
use crate::config::{TranscodeConfig, DEFAULT_BLOCK_SIZE};
use crate::error::{CodecError, TranscodeError};
use crate::types::{TranscodeOutcome, TranscodeReport, TranscodeTask};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Per-file transcoder, shared read-only by all workers
pub struct FileTranscoder {
    decoders: Arc<dyn DecoderBackend>,
    encoders: Arc<dyn EncoderBackend>,
    block_size: usize,
    keep_partial_outputs: bool,
}

impl FileTranscoder {
    /// Symphonia decoding into WAV containers
    pub fn new(config: &TranscodeConfig) -> Self {
        Self::with_backends(Arc::new(SymphoniaBackend), Arc::new(WavBackend))
            .with_block_size(config.block_size)
            .keep_partial_outputs(config.keep_partial_outputs)
    }

    pub fn with_backends(
        decoders: Arc<dyn DecoderBackend>,
        encoders: Arc<dyn EncoderBackend>,
    ) -> Self {
        Self {
            decoders,
            encoders,
            block_size: DEFAULT_BLOCK_SIZE,
            keep_partial_outputs: false,
        }
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    pub fn keep_partial_outputs(mut self, keep: bool) -> Self {
        self.keep_partial_outputs = keep;
        self
    }

    /// Run one task to completion. Always returns exactly one outcome.
    pub fn transcode(&self, task: &TranscodeTask, cancel: &CancellationToken) -> TranscodeOutcome {
        let start_time = Instant::now();

        match self.run(task, cancel) {
            Ok(report) => TranscodeOutcome::succeeded(task, report, start_time.elapsed()),
            Err(e) => TranscodeOutcome::failed(task, e, start_time.elapsed()),
        }
    }

    fn run(
        &self,
        task: &TranscodeTask,
        cancel: &CancellationToken,
    ) -> Result<TranscodeReport, TranscodeError> {
        if cancel.is_cancelled() {
            return Err(TranscodeError::Cancelled);
        }

        // OPEN
        let source = File::open(&task.source.path).map_err(TranscodeError::Open)?;
        if task.overwrites_source() {
            return Err(TranscodeError::OverwritesSource {
                path: task.destination.clone(),
            });
        }
        let destination = File::create(&task.destination).map_err(TranscodeError::Open)?;
        // Declared before the encoder so the file is closed before removal
        let mut output_guard = PartialOutput::new(&task.destination, self.keep_partial_outputs);

        // DECODING
        let mut decoder = match self.decoders.open(source, &task.source.path) {
            Ok(decoder) => decoder,
            Err(e) => {
                drop(destination);
                return Err(TranscodeError::DecodeInit(e));
            }
        };
        let format = FrameFormat::stereo_s16(decoder.sample_rate());

        debug!(
            file = %task.source.path.display(),
            sample_rate = format.sample_rate(),
            "Decoder ready"
        );

        // Header write belongs to opening the destination
        let mut encoder = self
            .encoders
            .create(destination, format)
            .map_err(|e| TranscodeError::Open(codec_io_error(e)))?;

        // ENCODING
        let mut converter = FrameConverter::new(format);
        let mut block = vec![0u8; self.block_size];
        let mut frames_written = 0u64;

        loop {
            if cancel.is_cancelled() {
                return Err(TranscodeError::Cancelled);
            }

            let n = match decoder.read(&mut block) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(TranscodeError::Read(e)),
            };

            if let Some(frames) = converter.push(&block[..n]) {
                if cancel.is_cancelled() {
                    return Err(TranscodeError::Cancelled);
                }
                encoder.write(&frames).map_err(TranscodeError::Write)?;
                frames_written += frames.frames() as u64;
            }
        }

        let dropped_bytes = converter.finish();
        if dropped_bytes > 0 {
            warn!(
                file = %task.source.path.display(),
                dropped_bytes,
                "Dropped incomplete trailing frame"
            );
        }

        // CLOSED
        encoder.finalize().map_err(TranscodeError::Finalize)?;
        output_guard.commit();

        Ok(TranscodeReport {
            sample_rate: format.sample_rate(),
            frames_written,
            dropped_bytes,
        })
    }
}

fn codec_io_error(err: CodecError) -> std::io::Error {
    match err {
        CodecError::Io(e) => e,
        CodecError::Wav(hound::Error::IoError(e)) => e,
        other => std::io::Error::new(ErrorKind::Other, other),
    }
}

/// Removes a destination file on drop unless committed
struct PartialOutput {
    path: PathBuf,
    keep: bool,
}

impl PartialOutput {
    fn new(path: &Path, keep: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            keep,
        }
    }

    fn commit(&mut self) {
        self.keep = true;
    }
}

impl Drop for PartialOutput {
    fn drop(&mut self) {
        if self.keep {
            return;
        }

        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(file = %self.path.display(), "Removed partial output"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                file = %self.path.display(),
                error = %e,
                "Failed to remove partial output"
            ),
        }
    }
}
