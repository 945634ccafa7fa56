//! Transcoder configuration
//!
//! Resolution priority per setting:
//! 1. Command-line argument / environment variable (both arrive via clap)
//! 2. TOML config file
//! 3. Compiled default

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Output container extension (fixed)
pub const OUTPUT_EXTENSION: &str = "wav";

/// Default input extension
pub const DEFAULT_EXTENSION: &str = "mp3";

/// Default decode read size in bytes
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

const DEFAULT_INPUT_DIR: &str = "./data";
const DEFAULT_OUTPUT_DIR: &str = "./converted";
const DEFAULT_LOG_LEVEL: &str = "info";

/// TOML file contents; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TomlConfig {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub extension: Option<String>,
    pub max_concurrency: Option<usize>,
    pub block_size: Option<usize>,
    pub keep_partial_outputs: Option<bool>,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load the explicit file if given, else the per-user default if it exists.
    ///
    /// A missing default file is not an error.
    pub fn load(explicit: Option<&Path>) -> Result<Option<Self>> {
        if let Some(path) = explicit {
            return Self::from_file(path).map(Some);
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                tracing::debug!("Loading config file {}", path.display());
                Self::from_file(&path).map(Some)
            }
            _ => Ok(None),
        }
    }
}

/// `<config_dir>/wkmp/transcode.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wkmp").join("transcode.toml"))
}

/// Values supplied on the command line or via environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub extension: Option<String>,
    pub max_concurrency: Option<usize>,
    pub block_size: Option<usize>,
    pub keep_partial_outputs: bool,
    pub log_level: Option<String>,
}

/// Resolved batch configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeConfig {
    /// Root of the tree scanned for sources
    pub input_dir: PathBuf,
    /// Flat output directory, created before any task starts
    pub output_dir: PathBuf,
    /// Source extension without the dot, matched case-insensitively
    pub extension: String,
    /// Worker bound; 0 launches one task per file
    pub max_concurrency: usize,
    /// Bytes pulled from the decoder per read
    pub block_size: usize,
    /// Leave partially written outputs on disk after a failure
    pub keep_partial_outputs: bool,
    pub log_level: String,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            extension: DEFAULT_EXTENSION.to_string(),
            max_concurrency: default_concurrency(),
            block_size: DEFAULT_BLOCK_SIZE,
            keep_partial_outputs: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Host parallelism, falling back to 4 workers
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl TranscodeConfig {
    /// Merge overrides over file values over defaults, then validate.
    pub fn resolve(overrides: ConfigOverrides, file: Option<TomlConfig>) -> Result<Self> {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        let extension = overrides
            .extension
            .or(file.extension)
            .unwrap_or(defaults.extension);

        let config = Self {
            input_dir: overrides
                .input_dir
                .or(file.input_dir)
                .unwrap_or(defaults.input_dir),
            output_dir: overrides
                .output_dir
                .or(file.output_dir)
                .unwrap_or(defaults.output_dir),
            extension: extension.trim_start_matches('.').to_string(),
            max_concurrency: overrides
                .max_concurrency
                .or(file.max_concurrency)
                .unwrap_or(defaults.max_concurrency),
            block_size: overrides
                .block_size
                .or(file.block_size)
                .unwrap_or(defaults.block_size),
            keep_partial_outputs: overrides.keep_partial_outputs
                || file.keep_partial_outputs.unwrap_or(defaults.keep_partial_outputs),
            log_level: overrides
                .log_level
                .or(file.log_level)
                .unwrap_or(defaults.log_level),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.extension.is_empty() {
            return Err(Error::Config("extension must not be empty".to_string()));
        }

        // A block must hold at least one stereo frame and stay sample-aligned
        if self.block_size < 4 || self.block_size % 2 != 0 {
            return Err(Error::Config(format!(
                "block_size must be an even number >= 4, got {}",
                self.block_size
            )));
        }

        if resolved_dir(&self.input_dir) == resolved_dir(&self.output_dir) {
            return Err(Error::Config(format!(
                "input and output directories must differ: {} and {} are the same directory",
                self.input_dir.display(),
                self.output_dir.display()
            )));
        }

        Ok(())
    }
}

/// Absolute form of `path` with its longest existing prefix canonicalized.
///
/// The output directory may not exist yet, so the missing tail is appended
/// to the canonical form of whatever part does.
fn resolved_dir(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(canonical, |dir, name| dir.join(name));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return absolute,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_original_layout() {
        let config = TranscodeConfig::resolve(ConfigOverrides::default(), None).unwrap();
        assert_eq!(config.input_dir, PathBuf::from("./data"));
        assert_eq!(config.output_dir, PathBuf::from("./converted"));
        assert_eq!(config.extension, "mp3");
        assert_eq!(config.block_size, 1024);
        assert!(config.max_concurrency >= 1);
        assert!(!config.keep_partial_outputs);
    }

    #[test]
    fn test_overrides_beat_file_values() {
        let file = TomlConfig::from_toml_str(
            r#"
            input_dir = "/srv/in"
            output_dir = "/srv/out"
            extension = "flac"
            max_concurrency = 3
            "#,
        )
        .unwrap();

        let overrides = ConfigOverrides {
            output_dir: Some(PathBuf::from("/tmp/out")),
            max_concurrency: Some(8),
            ..Default::default()
        };

        let config = TranscodeConfig::resolve(overrides, Some(file)).unwrap();
        assert_eq!(config.input_dir, PathBuf::from("/srv/in"));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.extension, "flac");
        assert_eq!(config.max_concurrency, 8);
    }

    #[test]
    fn test_extension_leading_dot_removed() {
        let overrides = ConfigOverrides {
            extension: Some(".MP3".to_string()),
            ..Default::default()
        };
        let config = TranscodeConfig::resolve(overrides, None).unwrap();
        assert_eq!(config.extension, "MP3");
    }

    #[test]
    fn test_invalid_block_size_rejected() {
        for block_size in [0usize, 2, 1023] {
            let overrides = ConfigOverrides {
                block_size: Some(block_size),
                ..Default::default()
            };
            let result = TranscodeConfig::resolve(overrides, None);
            assert!(matches!(result, Err(Error::Config(_))), "block size {}", block_size);
        }
    }

    #[test]
    fn test_same_input_and_output_rejected() {
        let overrides = ConfigOverrides {
            input_dir: Some(PathBuf::from("/music")),
            output_dir: Some(PathBuf::from("/music")),
            ..Default::default()
        };
        assert!(TranscodeConfig::resolve(overrides, None).is_err());
    }

    #[test]
    fn test_same_directory_spelled_differently_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let music = dir.path().join("music");
        std::fs::create_dir_all(music.join("sub")).unwrap();

        for output_dir in [
            music.join("..").join("music"),
            music.join("sub").join(".."),
            music.join("."),
        ] {
            let config = TranscodeConfig {
                input_dir: music.clone(),
                output_dir: output_dir.clone(),
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(Error::Config(_))),
                "{}",
                output_dir.display()
            );
        }
    }

    #[test]
    fn test_missing_output_dir_next_to_input_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let config = TranscodeConfig {
            input_dir: dir.path().join("music"),
            output_dir: dir.path().join("music").join("..").join("converted"),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_toml_key_rejected() {
        assert!(TomlConfig::from_toml_str("bogus_key = 1").is_err());
    }
}
