//! The package query capability.
//!
//! [`PackageQuery`] is the seam between resolution and the outside world.
//! Production code runs `pkg-config`; tests substitute a fake that never
//! spawns a process.

use std::path::{Path, PathBuf};

use crate::core::package::PackageKind;
use crate::util::process::{find_pkg_config, ProcessBuilder};

/// Raw answer from a package query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutput {
    /// Words of `--cflags`
    pub cflags: Vec<String>,
    /// Words of `--libs`
    pub libs: Vec<String>,
    pub version: Option<String>,
}

/// Why a query produced no answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryFailure {
    /// The tool ran and reported the package absent
    NotFound(Option<String>),
    /// The tool could not be run
    Unavailable(String),
    /// The tool's output could not be understood
    Malformed(String),
}

/// Look up a package's flags by name.
pub trait PackageQuery: Send + Sync {
    fn query(&self, name: &str, kind: PackageKind) -> Result<QueryOutput, QueryFailure>;
}

/// Query packages with `pkg-config`.
#[derive(Debug, Clone, Default)]
pub struct PkgConfigQuery {
    /// Explicit tool path; searched for on PATH when unset
    program: Option<PathBuf>,
    /// Directories prepended to `PKG_CONFIG_PATH`
    search_path: Vec<PathBuf>,
}

impl PkgConfigQuery {
    pub fn new() -> Self {
        PkgConfigQuery::default()
    }

    /// Use a specific pkg-config binary.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Add directories searched for `.pc` files.
    pub fn with_search_path(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.search_path.extend(dirs);
        self
    }

    fn program(&self) -> Result<PathBuf, QueryFailure> {
        match &self.program {
            Some(program) => Ok(program.clone()),
            None => find_pkg_config()
                .ok_or_else(|| QueryFailure::Unavailable("pkg-config not found in PATH".to_string())),
        }
    }

    fn command(&self, program: &Path) -> Result<ProcessBuilder, QueryFailure> {
        let mut cmd = ProcessBuilder::new(program);
        if !self.search_path.is_empty() {
            let mut dirs = self.search_path.clone();
            if let Some(existing) = std::env::var_os("PKG_CONFIG_PATH") {
                dirs.extend(std::env::split_paths(&existing));
            }
            let joined = std::env::join_paths(dirs)
                .map_err(|e| QueryFailure::Unavailable(format!("invalid PKG_CONFIG_PATH: {}", e)))?;
            cmd = cmd.env("PKG_CONFIG_PATH", joined.to_string_lossy());
        }
        Ok(cmd)
    }

    /// Run pkg-config with `args` and return its stdout.
    fn run(&self, program: &Path, args: &[&str]) -> Result<String, QueryFailure> {
        let output = self
            .command(program)?
            .args(args)
            .exec()
            .map_err(|e| QueryFailure::Unavailable(format!("{:#}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(QueryFailure::NotFound(if stderr.is_empty() {
                None
            } else {
                Some(stderr)
            }));
        }

        String::from_utf8(output.stdout)
            .map_err(|_| QueryFailure::Malformed("output is not valid UTF-8".to_string()))
    }
}

/// Split pkg-config output into shell words.
pub fn split_words(output: &str) -> Result<Vec<String>, QueryFailure> {
    shlex::split(output.trim())
        .ok_or_else(|| QueryFailure::Malformed(format!("cannot split `{}` into words", output.trim())))
}

impl PackageQuery for PkgConfigQuery {
    fn query(&self, name: &str, kind: PackageKind) -> Result<QueryOutput, QueryFailure> {
        let program = self.program()?;

        let version = self.run(&program, &["--modversion", name])?;
        let cflags = self.run(&program, &["--cflags", name])?;
        let libs = if kind == PackageKind::Static {
            self.run(&program, &["--libs", "--static", name])?
        } else {
            self.run(&program, &["--libs", name])?
        };

        let version = version.trim();
        Ok(QueryOutput {
            cflags: split_words(&cflags)?,
            libs: split_words(&libs)?,
            version: (!version.is_empty()).then(|| version.to_string()),
        })
    }
}
