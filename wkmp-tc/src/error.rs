//! Error types for wkmp-tc
//!
//! Two layers of errors exist:
//! - Run-level [`Error`]: output directory setup, discovery, configuration.
//!   These abort the batch before any file is touched.
//! - Per-file [`TranscodeError`]: caught at the task boundary and turned into a
//!   [`crate::types::TranscodeOutcome`]. They never affect sibling tasks.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for wkmp-tc
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Output directory could not be created
    #[error("Error creating output directory {}: {}", path.display(), source)]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input tree traversal failed
    #[error("Error walking input directory: {0}")]
    Discovery(#[from] ScanError),
}

/// Convenience Result type using wkmp-tc Error
pub type Result<T> = std::result::Result<T, Error>;

/// Input tree scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Permission denied when accessing path
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Any other traversal failure
    #[error("Walk error at {path}: {message}")]
    Walk { path: PathBuf, message: String },
}

/// Errors reported by the decoder and container collaborators
#[derive(Debug, Error)]
pub enum CodecError {
    /// Stream format or codec is not supported
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Stream is structurally invalid
    #[error("Malformed stream: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WAV writer errors
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl From<symphonia::core::errors::Error> for CodecError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        use symphonia::core::errors::Error as SymphoniaError;

        match err {
            SymphoniaError::IoError(e) => CodecError::Io(e),
            SymphoniaError::Unsupported(what) => CodecError::Unsupported(what.to_string()),
            other => CodecError::Malformed(other.to_string()),
        }
    }
}

/// Per-file transcode failure
///
/// Display strings start with the failure class ("open error", "read error", ...)
/// so log lines and summaries carry the cause without extra formatting.
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// Source or destination could not be opened
    #[error("open error: {0}")]
    Open(#[source] std::io::Error),

    /// Decoder rejected the source stream
    #[error("decode-init error: {0}")]
    DecodeInit(#[source] CodecError),

    /// Decoder failed mid-stream
    #[error("read error: {0}")]
    Read(#[source] std::io::Error),

    /// Container writer rejected a block
    #[error("write error: {0}")]
    Write(#[source] CodecError),

    /// Container could not be finalized
    #[error("finalize error: {0}")]
    Finalize(#[source] CodecError),

    /// Batch cancellation observed before the file completed
    #[error("cancelled")]
    Cancelled,

    /// Another source already claimed the same destination
    #[error("output collision: destination already claimed by {}", winner.display())]
    OutputCollision { winner: PathBuf },

    /// Destination resolves to the source file itself
    #[error("destination {} is the source file", path.display())]
    OverwritesSource { path: PathBuf },

    /// Worker terminated without producing a result (panic)
    #[error("task aborted: {0}")]
    Aborted(String),
}

/// Serializable failure class for summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Open,
    DecodeInit,
    Read,
    Write,
    Finalize,
    Cancelled,
    OutputCollision,
    OverwritesSource,
    Aborted,
}

impl TranscodeError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TranscodeError::Open(_) => FailureKind::Open,
            TranscodeError::DecodeInit(_) => FailureKind::DecodeInit,
            TranscodeError::Read(_) => FailureKind::Read,
            TranscodeError::Write(_) => FailureKind::Write,
            TranscodeError::Finalize(_) => FailureKind::Finalize,
            TranscodeError::Cancelled => FailureKind::Cancelled,
            TranscodeError::OutputCollision { .. } => FailureKind::OutputCollision,
            TranscodeError::OverwritesSource { .. } => FailureKind::OverwritesSource,
            TranscodeError::Aborted(_) => FailureKind::Aborted,
        }
    }
}
