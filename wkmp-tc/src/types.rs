//! Batch data model
//!
//! Lifecycle: [`SourceFile`] (discovered) → [`TranscodeTask`] (planned, owned
//! by one worker) → [`TranscodeOutcome`] (one per source) → [`BatchSummary`].

use crate::error::{FailureKind, TranscodeError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Audio file found during discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// File name with the matched extension suffix removed
    pub base_name: String,
}

impl SourceFile {
    /// Build from a path whose file name ends with `.{extension}` (any case).
    pub fn new(path: PathBuf, extension: &str) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let base_name = strip_extension(&file_name, extension).to_string();
        Self { path, base_name }
    }

    /// Destination path: `output_dir/<base_name>.<output_extension>`
    pub fn destination_in(&self, output_dir: &Path, output_extension: &str) -> PathBuf {
        output_dir.join(format!("{}.{}", self.base_name, output_extension))
    }
}

/// Whether `file_name` ends with `.{extension}`, compared case-insensitively.
///
/// Discovery and destination naming both go through this, so a file that
/// matches always has its suffix removed.
pub fn has_extension(file_name: &str, extension: &str) -> bool {
    split_extension(file_name, extension).is_some()
}

fn strip_extension<'a>(file_name: &'a str, extension: &str) -> &'a str {
    split_extension(file_name, extension).unwrap_or(file_name)
}

fn split_extension<'a>(file_name: &'a str, extension: &str) -> Option<&'a str> {
    let suffix_len = extension.len() + 1;
    if extension.is_empty()
        || file_name.len() < suffix_len
        || !file_name.is_char_boundary(file_name.len() - suffix_len)
    {
        return None;
    }

    let (stem, suffix) = file_name.split_at(file_name.len() - suffix_len);
    let suffix = suffix.strip_prefix('.')?;
    (suffix.to_lowercase() == extension.to_lowercase()).then_some(stem)
}

/// Work unit for one source file
#[derive(Debug, Clone)]
pub struct TranscodeTask {
    pub source: SourceFile,
    pub destination: PathBuf,
}

impl TranscodeTask {
    /// Whether the destination already exists as the very file being read.
    ///
    /// Compares file identity, so `..` segments, symlinks and hard links
    /// are all seen through.
    pub fn overwrites_source(&self) -> bool {
        same_file(&self.source.path, &self.destination)
    }
}

#[cfg(unix)]
fn same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (std::fs::metadata(a), std::fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Details of a successful transcode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscodeReport {
    pub sample_rate: u32,
    pub frames_written: u64,
    /// Trailing bytes that did not form a whole frame
    pub dropped_bytes: usize,
}

/// Result of one task
#[derive(Debug)]
pub enum OutcomeStatus {
    Succeeded(TranscodeReport),
    Failed(TranscodeError),
}

/// Per-file result, produced exactly once per discovered source
#[derive(Debug)]
pub struct TranscodeOutcome {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub status: OutcomeStatus,
    pub elapsed: Duration,
}

impl TranscodeOutcome {
    pub fn succeeded(task: &TranscodeTask, report: TranscodeReport, elapsed: Duration) -> Self {
        Self {
            source: task.source.path.clone(),
            destination: task.destination.clone(),
            status: OutcomeStatus::Succeeded(report),
            elapsed,
        }
    }

    pub fn failed(task: &TranscodeTask, error: TranscodeError, elapsed: Duration) -> Self {
        Self {
            source: task.source.path.clone(),
            destination: task.destination.clone(),
            status: OutcomeStatus::Failed(error),
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Succeeded(_))
    }

    pub fn error(&self) -> Option<&TranscodeError> {
        match &self.status {
            OutcomeStatus::Failed(e) => Some(e),
            OutcomeStatus::Succeeded(_) => None,
        }
    }

    pub fn report(&self) -> Option<&TranscodeReport> {
        match &self.status {
            OutcomeStatus::Succeeded(r) => Some(r),
            OutcomeStatus::Failed(_) => None,
        }
    }
}

/// Aggregate of all outcomes for one run
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub outcomes: Vec<TranscodeOutcome>,
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// True when every discovered file converted (vacuously true for an empty tree)
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &TranscodeOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Outcome for a given source path
    pub fn outcome_for(&self, source: &Path) -> Option<&TranscodeOutcome> {
        self.outcomes.iter().find(|o| o.source == source)
    }

    pub fn to_report(&self) -> SummaryReport {
        let mut files: Vec<FileReport> = self
            .outcomes
            .iter()
            .map(|o| FileReport {
                source: o.source.clone(),
                destination: o.destination.clone(),
                success: o.is_success(),
                failure: o.error().map(|e| e.kind()),
                error: o.error().map(|e| e.to_string()),
                report: o.report().cloned(),
                elapsed_ms: o.elapsed.as_millis() as u64,
            })
            .collect();
        files.sort_by(|a, b| a.source.cmp(&b.source));

        SummaryReport {
            total: self.total(),
            succeeded: self.succeeded(),
            failed: self.failed(),
            elapsed_ms: self.elapsed.as_millis() as u64,
            files,
        }
    }
}

/// Machine-readable batch summary
#[derive(Debug, Serialize)]
pub struct SummaryReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
    pub files: Vec<FileReport>,
}

#[derive(Debug, Serialize)]
pub struct FileReport {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<TranscodeReport>,
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name_strips_extension_case_insensitive() {
        let lower = SourceFile::new(PathBuf::from("/music/song.mp3"), "mp3");
        assert_eq!(lower.base_name, "song");

        let upper = SourceFile::new(PathBuf::from("/music/LOUD.MP3"), "mp3");
        assert_eq!(upper.base_name, "LOUD");

        let dotted = SourceFile::new(PathBuf::from("/music/a.b.c.Mp3"), "mp3");
        assert_eq!(dotted.base_name, "a.b.c");
    }

    #[test]
    fn test_base_name_kept_when_extension_absent() {
        let other = SourceFile::new(PathBuf::from("/music/notes.txt"), "mp3");
        assert_eq!(other.base_name, "notes.txt");

        let multibyte = SourceFile::new(PathBuf::from("/music/é"), "mp3");
        assert_eq!(multibyte.base_name, "é");
    }

    #[test]
    fn test_matching_and_stripping_agree_for_non_ascii_extension() {
        for name in ["chanson.ÖGG", "chanson.ögg", "chanson.Ögg"] {
            assert!(has_extension(name, "ögg"), "{}", name);
            let source = SourceFile::new(PathBuf::from(format!("/music/{}", name)), "ögg");
            assert_eq!(source.base_name, "chanson");
        }

        assert!(!has_extension("chanson.ogg", "ögg"));
        assert!(!has_extension("chansonögg", "ögg"));
    }

    #[test]
    fn test_destination_is_flat_in_output_dir() {
        let source = SourceFile::new(PathBuf::from("/in/deep/nested/track.mp3"), "mp3");
        assert_eq!(
            source.destination_in(Path::new("/out"), "wav"),
            PathBuf::from("/out/track.wav")
        );
    }

    #[test]
    fn test_summary_counts_and_report() {
        let task = |name: &str| TranscodeTask {
            source: SourceFile::new(PathBuf::from(format!("/in/{}.mp3", name)), "mp3"),
            destination: PathBuf::from(format!("/out/{}.wav", name)),
        };

        let summary = BatchSummary {
            outcomes: vec![
                TranscodeOutcome::succeeded(
                    &task("b"),
                    TranscodeReport {
                        sample_rate: 44100,
                        frames_written: 10,
                        dropped_bytes: 0,
                    },
                    Duration::from_millis(5),
                ),
                TranscodeOutcome::failed(&task("a"), TranscodeError::Cancelled, Duration::ZERO),
            ],
            elapsed: Duration::from_millis(7),
        };

        assert_eq!(summary.total(), 2);
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.failed(), 1);
        assert!(!summary.is_success());
        assert!(summary.outcome_for(Path::new("/in/b.mp3")).unwrap().is_success());

        let report = summary.to_report();
        assert_eq!(report.files[0].source, PathBuf::from("/in/a.mp3"));
        assert_eq!(report.files[0].failure, Some(FailureKind::Cancelled));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["succeeded"], 1);
        assert_eq!(json["files"][1]["report"]["sample_rate"], 44100);
        assert!(json["files"][1].get("error").is_none());
    }

    #[test]
    fn test_empty_summary_is_success() {
        let summary = BatchSummary::default();
        assert_eq!(summary.total(), 0);
        assert!(summary.is_success());
    }
}
