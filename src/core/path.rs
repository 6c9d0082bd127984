//! Root-relative file paths.
//!
//! Every file in the build graph is identified by a [`BuildPath`]: a root
//! (source tree, build tree, an install directory, or somewhere outside the
//! project) plus a normalized `/`-separated path. Two spellings of the same
//! file (`a/./b.c`, `a/x/../b.c`) compare equal, which is what makes the
//! single-producer check meaningful.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::ConfigurationError;

/// Installation directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallRoot {
    Prefix,
    Bindir,
    Libdir,
    Includedir,
}

impl InstallRoot {
    /// All install roots, in the order backends define their variables.
    pub const ALL: [InstallRoot; 4] = [
        InstallRoot::Prefix,
        InstallRoot::Bindir,
        InstallRoot::Libdir,
        InstallRoot::Includedir,
    ];

    /// Variable name used by backends for this directory.
    pub fn var_name(&self) -> &'static str {
        match self {
            InstallRoot::Prefix => "prefix",
            InstallRoot::Bindir => "bindir",
            InstallRoot::Libdir => "libdir",
            InstallRoot::Includedir => "includedir",
        }
    }
}

/// The directory a [`BuildPath`] is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Root {
    /// The project's source directory.
    Source,
    /// The build directory backends run in.
    Build,
    /// An installation directory.
    Install(InstallRoot),
    /// A path outside the project, used verbatim (package include dirs).
    External,
}

/// A normalized path relative to a [`Root`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BuildPath {
    root: Root,
    path: String,
}

impl BuildPath {
    /// Create a path, normalizing `.` and `..` components.
    pub fn new(root: Root, path: &str) -> Result<Self, ConfigurationError> {
        let normalized = BuildPath::normalize(root, path)?;
        if normalized.is_root() {
            return Err(invalid(path, "path is empty"));
        }
        Ok(normalized)
    }

    /// A directory in the source tree. Unlike [`BuildPath::source`] this
    /// accepts the source directory itself (`.`).
    pub fn source_dir(path: &str) -> Result<Self, ConfigurationError> {
        BuildPath::normalize(Root::Source, path)
    }

    fn normalize(root: Root, path: &str) -> Result<Self, ConfigurationError> {
        if path.contains(['\n', '\r', '\0']) {
            return Err(invalid(path, "paths cannot contain newlines or NUL bytes"));
        }

        if root == Root::External {
            let trimmed = path.trim_end_matches(['/', '\\']);
            if trimmed.is_empty() {
                return Err(invalid(path, "path is empty"));
            }
            return Ok(BuildPath {
                root,
                path: trimmed.to_string(),
            });
        }

        if Path::new(path).is_absolute() || path.starts_with('/') {
            return Err(invalid(
                path,
                "absolute paths are only allowed for external files",
            ));
        }

        let mut parts: Vec<&str> = Vec::new();
        for part in path.split(['/', '\\']) {
            match part {
                "" | "." => {}
                ".." => {
                    if parts.pop().is_none() {
                        return Err(invalid(path, "path escapes its root directory"));
                    }
                }
                other => parts.push(other),
            }
        }

        Ok(BuildPath {
            root,
            path: parts.join("/"),
        })
    }

    /// A path in the source directory.
    pub fn source(path: &str) -> Result<Self, ConfigurationError> {
        BuildPath::new(Root::Source, path)
    }

    /// A path in the build directory.
    pub fn build(path: &str) -> Result<Self, ConfigurationError> {
        BuildPath::new(Root::Build, path)
    }

    /// A path in an installation directory.
    pub fn install(root: InstallRoot, path: &str) -> Result<Self, ConfigurationError> {
        BuildPath::new(Root::Install(root), path)
    }

    /// A path outside the project.
    pub fn external(path: &str) -> Result<Self, ConfigurationError> {
        BuildPath::new(Root::External, path)
    }

    /// The root this path is relative to.
    pub fn root(&self) -> Root {
        self.root
    }

    /// Whether this names the root directory itself.
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// The normalized path text, without its root.
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Append a relative path.
    pub fn join(&self, rel: &str) -> Result<Self, ConfigurationError> {
        if self.is_root() {
            return BuildPath::new(self.root, rel);
        }
        BuildPath::new(self.root, &format!("{}/{}", self.path, rel))
    }

    /// The last path component.
    pub fn file_name(&self) -> &str {
        self.path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.path.as_str())
    }

    /// The containing directory, or `None` when the path sits at its root.
    pub fn parent(&self) -> Option<BuildPath> {
        let idx = self.path.rfind(['/', '\\'])?;
        Some(BuildPath {
            root: self.root,
            path: self.path[..idx].to_string(),
        })
    }

    /// Append a suffix to the file name (`foo.o` -> `foo.o.d`).
    pub fn with_suffix(&self, suffix: &str) -> BuildPath {
        BuildPath {
            root: self.root,
            path: format!("{}{}", self.path, suffix),
        }
    }

    /// Path of `self` relative to the directory `dir` under the same root.
    ///
    /// Returns `None` when the roots differ.
    pub fn relative_to(&self, dir: Option<&BuildPath>) -> Option<String> {
        match dir {
            None => Some(self.path.clone()),
            Some(dir) if dir.root == self.root => {
                let rel = pathdiff::diff_paths(Path::new(&self.path), Path::new(&dir.path))?;
                Some(crate::util::fs::to_slash(&rel))
            }
            Some(_) => None,
        }
    }

    /// Resolve to a concrete filesystem path.
    pub fn to_path(&self, srcdir: &Path, builddir: &Path, install: &dyn Fn(InstallRoot) -> PathBuf) -> PathBuf {
        match self.root {
            Root::Source => srcdir.join(&self.path),
            Root::Build => builddir.join(&self.path),
            Root::Install(root) => install(root).join(&self.path),
            Root::External => PathBuf::from(&self.path),
        }
    }
}

impl fmt::Display for BuildPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root {
            Root::Build | Root::External => f.write_str(&self.path),
            Root::Source if self.is_root() => f.write_str("{srcdir}"),
            Root::Source => write!(f, "{{srcdir}}/{}", self.path),
            Root::Install(root) => write!(f, "{{{}}}/{}", root.var_name(), self.path),
        }
    }
}

fn invalid(path: &str, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}
