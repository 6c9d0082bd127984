//! Atomic output writes.
//!
//! Every file is written to a temporary file in its destination directory
//! and renamed into place, so a reader sees either the old file or the new
//! one. Files whose contents are unchanged are left alone, which keeps
//! their timestamps and avoids needless regeneration by the build tool.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::errors::EmissionError;

/// A rendered file, not yet on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    /// Relative paths are resolved against the build directory
    pub path: PathBuf,
    pub contents: String,
}

impl RenderedFile {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        RenderedFile {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

fn io_error(path: &Path, source: std::io::Error) -> EmissionError {
    EmissionError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// A temporary file readable by everyone, subject to the umask. Plain
/// `NamedTempFile`s are owner-only.
#[cfg(unix)]
fn temp_file_in(dir: &Path) -> std::io::Result<NamedTempFile> {
    use std::os::unix::fs::PermissionsExt;

    tempfile::Builder::new()
        .permissions(std::fs::Permissions::from_mode(0o644))
        .tempfile_in(dir)
}

#[cfg(not(unix))]
fn temp_file_in(dir: &Path) -> std::io::Result<NamedTempFile> {
    NamedTempFile::new_in(dir)
}

/// Write `contents` to `path` atomically. Returns `false` if the file
/// already had these contents.
pub fn write_atomic(path: &Path, contents: &str) -> Result<bool, EmissionError> {
    if let Ok(existing) = std::fs::read(path) {
        if existing == contents.as_bytes() {
            tracing::debug!("unchanged: {}", path.display());
            return Ok(false);
        }
    }

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;

    let mut tmp = temp_file_in(dir).map_err(|e| io_error(path, e))?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| io_error(path, e))?;
    tmp.as_file().sync_all().map_err(|e| io_error(path, e))?;
    tmp.persist(path).map_err(|e| io_error(path, e.error))?;

    tracing::debug!("wrote {}", path.display());
    Ok(true)
}

/// Write rendered files under `base`, in order.
///
/// Returns the paths of all files, written or unchanged.
pub fn write_all(base: &Path, files: &[RenderedFile]) -> Result<Vec<PathBuf>, EmissionError> {
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = base.join(&file.path);
        write_atomic(&path, &file.contents)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out/nested/build.ninja");
        assert!(write_atomic(&path, "rule x\n").unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "rule x\n");
    }

    #[test]
    fn test_unchanged_file_is_not_rewritten() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Makefile");
        assert!(write_atomic(&path, "all:\n").unwrap());
        assert!(!write_atomic(&path, "all:\n").unwrap());
        assert!(write_atomic(&path, "all: x\n").unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "all: x\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_written_files_are_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("build.ninja");
        write_atomic(&path, "rule x\n").unwrap();

        // A plain create gets 0666 minus the umask.
        let plain = tmp.path().join("plain");
        std::fs::write(&plain, "").unwrap();
        let umasked = std::fs::metadata(&plain).unwrap().permissions().mode() & 0o777;

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, umasked & 0o644);
    }

    #[test]
    fn test_no_temporary_files_left_behind() {
        let tmp = TempDir::new().unwrap();
        let files = vec![
            RenderedFile::new("a.txt", "a"),
            RenderedFile::new("b.txt", "b"),
        ];
        let written = write_all(tmp.path(), &files).unwrap();
        assert_eq!(written.len(), 2);

        let mut names: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }
}
