//! Utility functions for questlog.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{QuestlogError, Result};

/// Maximum state file size that will be read into memory (10 MB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Read a file into a string with size limit protection.
///
/// # Errors
///
/// Returns an error if:
/// * The file cannot be read (doesn't exist, permission denied, etc.)
/// * The file exceeds `max_size`
pub fn read_to_string_with_limit(path: &Path, max_size: u64) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| QuestlogError::storage(path, e))?;

    let size = metadata.len();
    if size > max_size {
        return Err(QuestlogError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            max: max_size,
        });
    }

    fs::read_to_string(path).map_err(|e| QuestlogError::storage(path, e))
}

/// Read a file into a string, refusing anything over [`MAX_FILE_SIZE`].
pub fn read_to_string_limited(path: &Path) -> Result<String> {
    read_to_string_with_limit(path, MAX_FILE_SIZE)
}

/// Write `contents` to `path` via a sibling temp file and rename.
///
/// The temp file is `.<name>.tmp` in the same directory, so the rename stays
/// on one filesystem.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| QuestlogError::invalid_input(format!("not a file path: {}", path.display())))?;
    let temp_path = path.with_file_name(format!(".{}.tmp", file_name));

    {
        let mut file =
            fs::File::create(&temp_path).map_err(|e| QuestlogError::storage(&temp_path, e))?;
        file.write_all(contents)
            .map_err(|e| QuestlogError::storage(&temp_path, e))?;
        file.sync_all()
            .map_err(|e| QuestlogError::storage(&temp_path, e))?;
    }

    // Atomic on POSIX
    fs::rename(&temp_path, path).map_err(|e| QuestlogError::storage(path, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_to_string_limited_success() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");
        fs::write(&path, "{}").unwrap();

        assert_eq!(read_to_string_limited(&path).unwrap(), "{}");
    }

    #[test]
    fn test_read_to_string_limited_nonexistent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.json");

        let err = read_to_string_limited(&path).unwrap_err();
        assert!(matches!(err, QuestlogError::Storage { .. }));
    }

    #[test]
    fn test_read_to_string_with_limit_at_boundary() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("boundary.txt");
        fs::write(&path, "x".repeat(100)).unwrap();

        assert!(read_to_string_with_limit(&path, 100).is_ok());

        let err = read_to_string_with_limit(&path, 99).unwrap_err();
        assert!(matches!(
            err,
            QuestlogError::FileTooLarge {
                size: 100,
                max: 99,
                ..
            }
        ));
        assert!(err.to_string().contains("max 99 bytes"));
    }

    #[test]
    fn test_atomic_write_replaces_and_cleans_up() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");

        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        assert!(!temp.path().join(".state.json.tmp").exists());
    }
}
