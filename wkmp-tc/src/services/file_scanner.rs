//! Source file scanner
//!
//! Recursive discovery of files whose name ends with the configured extension
//! (case-insensitive). Directories are traversed, never yielded. Symbolic
//! links are neither followed nor yielded.
//!
//! Unlike a best-effort scan, any traversal error aborts discovery: the batch
//! needs the complete task set before fan-out.

use crate::error::ScanError;
use crate::types::{has_extension, SourceFile};
use std::path::Path;
use walkdir::WalkDir;

/// Source file scanner
pub struct FileScanner {
    extension: String,
}

impl FileScanner {
    /// Create a scanner matching `*.{extension}` in any letter case
    pub fn new(extension: &str) -> Self {
        Self {
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// Scan directory for matching files.
    ///
    /// Entries are visited sorted by file name so repeated runs over the same
    /// tree yield the same order.
    pub fn scan(&self, root_path: &Path) -> Result<Vec<SourceFile>, ScanError> {
        if !root_path.exists() {
            return Err(ScanError::PathNotFound(root_path.to_path_buf()));
        }

        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory(root_path.to_path_buf()));
        }

        let mut files = Vec::new();

        let walker = WalkDir::new(root_path)
            .follow_links(false)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(Self::walk_error)?;

            if entry.file_type().is_file() && self.matches(&entry.file_name().to_string_lossy()) {
                files.push(SourceFile::new(entry.into_path(), &self.extension));
            }
        }

        tracing::debug!(
            root = %root_path.display(),
            files_found = files.len(),
            "Discovery complete"
        );

        Ok(files)
    }

    /// Case-insensitive suffix match against the full file name
    pub fn matches(&self, file_name: &str) -> bool {
        has_extension(file_name, &self.extension)
    }

    fn walk_error(err: walkdir::Error) -> ScanError {
        let path = err.path().map(Path::to_path_buf).unwrap_or_default();

        if let Some(io_err) = err.io_error() {
            if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                return ScanError::PermissionDenied(path);
            }
        }

        ScanError::Walk {
            path,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_extension_match_is_case_insensitive() {
        let scanner = FileScanner::new("mp3");
        assert!(scanner.matches("song.mp3"));
        assert!(scanner.matches("SONG.MP3"));
        assert!(scanner.matches("Song.Mp3"));
        assert!(!scanner.matches("song.mp3.txt"));
        assert!(!scanner.matches("songmp3"));
        assert!(!scanner.matches("song.flac"));
    }

    #[test]
    fn test_scan_nonexistent_path() {
        let scanner = FileScanner::new("mp3");
        let result = scanner.scan(Path::new("/nonexistent/path"));
        match result.unwrap_err() {
            ScanError::PathNotFound(_) => {}
            other => panic!("Expected PathNotFound error, got {:?}", other),
        }
    }

    #[test]
    fn test_scan_file_as_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.mp3");
        fs::write(&file, b"x").unwrap();

        let scanner = FileScanner::new("mp3");
        match scanner.scan(&file).unwrap_err() {
            ScanError::NotADirectory(_) => {}
            other => panic!("Expected NotADirectory error, got {:?}", other),
        }
    }

    #[test]
    fn test_scan_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let scanner = FileScanner::new("mp3");
        assert!(scanner.scan(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_scan_recurses_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("album/disc1")).unwrap();
        fs::create_dir_all(root.join("folder.mp3")).unwrap(); // directory, not yielded
        fs::write(root.join("top.mp3"), b"").unwrap();
        fs::write(root.join("album/UPPER.MP3"), b"").unwrap();
        fs::write(root.join("album/disc1/inner.Mp3"), b"").unwrap();
        fs::write(root.join("album/cover.jpg"), b"").unwrap();
        fs::write(root.join("notes.txt"), b"").unwrap();

        let scanner = FileScanner::new("mp3");
        let mut found: Vec<String> = scanner
            .scan(root)
            .unwrap()
            .into_iter()
            .map(|f| f.base_name)
            .collect();
        found.sort();

        assert_eq!(found, vec!["UPPER", "inner", "top"]);
    }

    #[test]
    fn test_scan_order_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.mp3", "a.mp3", "b.mp3"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let scanner = FileScanner::new("mp3");
        let first = scanner.scan(dir.path()).unwrap();
        let second = scanner.scan(dir.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].base_name, "a");
    }

    #[test]
    #[cfg(unix)]
    fn test_symlinks_are_not_yielded_or_followed() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("library");
        let elsewhere = dir.path().join("elsewhere");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&elsewhere).unwrap();
        fs::write(root.join("real.mp3"), b"").unwrap();
        fs::write(elsewhere.join("outside.mp3"), b"").unwrap();
        std::os::unix::fs::symlink(root.join("real.mp3"), root.join("alias.mp3")).unwrap();
        std::os::unix::fs::symlink(&elsewhere, root.join("linked_dir")).unwrap();
        std::os::unix::fs::symlink(&root, root.join("loop")).unwrap();

        let scanner = FileScanner::new("mp3");
        let found = scanner.scan(&root).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, root.join("real.mp3"));
    }

    #[test]
    #[cfg(unix)]
    fn test_unreadable_subdirectory_aborts_scan() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let locked = root.join("b_locked");
        fs::create_dir_all(&locked).unwrap();
        fs::write(root.join("a_first.mp3"), b"").unwrap();
        fs::write(locked.join("hidden.mp3"), b"").unwrap();
        fs::write(root.join("c_last.mp3"), b"").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users read through mode 000; nothing to observe then
        let readable = fs::read_dir(&locked).is_ok();
        let result = FileScanner::new("mp3").scan(root);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        if readable {
            return;
        }

        match result {
            Err(ScanError::PermissionDenied(path)) => assert_eq!(path, locked),
            other => panic!("Expected PermissionDenied error, got {:?}", other),
        }
    }
}
