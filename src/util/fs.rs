//! Filesystem utilities.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;

/// Expand a glob pattern relative to `base`.
///
/// Returns matching files as `/`-separated paths relative to `base`,
/// sorted so that expansion is deterministic.
pub fn glob_relative(base: &Path, pattern: &str) -> Result<Vec<String>> {
    let full_pattern = base.join(pattern);
    let pattern_str = full_pattern.to_string_lossy();

    let mut results = Vec::new();
    for entry in glob(&pattern_str).with_context(|| format!("invalid glob pattern: {}", pattern))? {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    let rel = relative_path(base, &path);
                    results.push(to_slash(&rel));
                }
            }
            Err(e) => {
                tracing::warn!("glob error: {}", e);
            }
        }
    }

    results.sort();
    results.dedup();
    Ok(results)
}

/// Whether a string contains glob metacharacters.
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Make a path absolute against the current directory, resolving `.` and
/// `..` lexically. Unlike `canonicalize`, the path need not exist.
pub fn absolute_lexical(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Render a path with forward slashes.
pub fn to_slash(path: &Path) -> String {
    let mut out = String::new();
    let mut separate = false;
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => {
                out.push_str(&prefix.as_os_str().to_string_lossy().replace('\\', "/"));
            }
            Component::RootDir => out.push('/'),
            other => {
                if separate {
                    out.push('/');
                }
                out.push_str(&other.as_os_str().to_string_lossy());
                separate = true;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_glob_relative() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(src.join("main.c"), "int main() {}").unwrap();
        fs::write(src.join("nested/util.c"), "void util() {}").unwrap();
        fs::write(src.join("readme.txt"), "readme").unwrap();

        let files = glob_relative(tmp.path(), "src/**/*.c").unwrap();
        assert_eq!(files, vec!["src/main.c", "src/nested/util.c"]);
    }

    #[test]
    fn test_is_glob() {
        assert!(is_glob("src/*.c"));
        assert!(is_glob("src/file?.c"));
        assert!(!is_glob("src/main.c"));
    }

    #[test]
    fn test_absolute_lexical() {
        let p = absolute_lexical(Path::new("/a/b/../c/./d"));
        assert_eq!(p, PathBuf::from("/a/c/d"));
    }

    #[test]
    fn test_relative_path() {
        let rel = relative_path(Path::new("/a/build"), Path::new("/a/src/x.c"));
        assert_eq!(to_slash(&rel), "../src/x.c");
    }

    #[test]
    fn test_to_slash_absolute() {
        assert_eq!(to_slash(Path::new("/usr/local")), "/usr/local");
        assert_eq!(to_slash(Path::new("/usr/local/lib")), "/usr/local/lib");
        assert_eq!(to_slash(Path::new("/")), "/");
        assert_eq!(to_slash(Path::new("include/calc.h")), "include/calc.h");
    }

    #[cfg(windows)]
    #[test]
    fn test_to_slash_windows_prefix() {
        assert_eq!(to_slash(Path::new(r"C:\x\y")), "C:/x/y");
    }
}
