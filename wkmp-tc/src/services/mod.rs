//! Service modules for the batch transcode workflow
//!
//! - [`file_scanner`]: input tree discovery
//! - [`file_transcoder`]: one file, decode → convert → encode
//! - [`batch_orchestrator`]: fan-out, completion tracking, summary

pub mod batch_orchestrator;
pub mod file_scanner;
pub mod file_transcoder;

pub use batch_orchestrator::{plan_tasks, BatchOrchestrator, BatchPlan};
pub use file_scanner::FileScanner;
pub use file_transcoder::FileTranscoder;
