//! The fixed environment a description is evaluated against.
//!
//! An [`Environment`] pins the target platform, the toolchain (whose rule
//! table is selected exactly once, here), tool commands, global options and
//! directories. It is read-only input to graph construction.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::builder::toolchain::{self, GenericOption, ToolVar, Toolchain};
use crate::core::description::LibraryKind;
use crate::core::path::InstallRoot;
use crate::errors::ToolchainError;

/// Target platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Darwin,
    Windows,
    Cygwin,
}

impl Platform {
    /// The platform this binary was built for.
    pub fn host() -> Platform {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Darwin
        } else {
            Platform::Linux
        }
    }

    /// Get the platform name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Darwin => "darwin",
            Platform::Windows => "windows",
            Platform::Cygwin => "cygwin",
        }
    }

    /// Whether binaries are PE images (`.exe`/`.dll` with import libraries).
    pub fn is_windows_like(&self) -> bool {
        matches!(self, Platform::Windows | Platform::Cygwin)
    }

    /// Whether binaries are ELF objects (soname, rpath, symlinked versions).
    pub fn is_elf(&self) -> bool {
        matches!(self, Platform::Linux)
    }

    /// Whether commands run under a POSIX shell.
    pub fn has_posix_shell(&self) -> bool {
        !matches!(self, Platform::Windows)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ToolchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "darwin" | "macos" | "macosx" => Ok(Platform::Darwin),
            "windows" | "win32" | "mingw" => Ok(Platform::Windows),
            "cygwin" => Ok(Platform::Cygwin),
            _ => Err(ToolchainError::UnknownPlatform {
                name: s.to_string(),
            }),
        }
    }
}

/// The closed set of supported toolchains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolchainId {
    Gcc,
    Clang,
    Msvc,
}

impl ToolchainId {
    /// Default toolchain for a platform.
    pub fn default_for(platform: Platform) -> ToolchainId {
        match platform {
            Platform::Windows => ToolchainId::Msvc,
            Platform::Darwin => ToolchainId::Clang,
            Platform::Linux | Platform::Cygwin => ToolchainId::Gcc,
        }
    }

    /// Get the toolchain name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolchainId::Gcc => "gcc",
            ToolchainId::Clang => "clang",
            ToolchainId::Msvc => "msvc",
        }
    }
}

impl fmt::Display for ToolchainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolchainId {
    type Err = ToolchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gcc" | "mingw" => Ok(ToolchainId::Gcc),
            "clang" => Ok(ToolchainId::Clang),
            "msvc" | "cl" => Ok(ToolchainId::Msvc),
            _ => Err(ToolchainError::UnknownToolchain {
                name: s.to_string(),
            }),
        }
    }
}

/// Commands invoked by the emitted build files.
///
/// Values are emitted verbatim so wrappers such as `ccache gcc` work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCommands {
    /// C and Objective-C compiler
    pub cc: String,
    /// C++ and Objective-C++ compiler
    pub cxx: String,
    /// Static library archiver
    pub ar: String,
    /// Standalone linker (MSVC only; GCC-style toolchains link through the driver)
    pub ld: String,
}

impl ToolCommands {
    /// Conventional command names for a toolchain.
    pub fn defaults_for(id: ToolchainId) -> Self {
        let (cc, cxx, ar, ld) = match id {
            ToolchainId::Gcc => ("gcc", "g++", "ar", "gcc"),
            ToolchainId::Clang => ("clang", "clang++", "ar", "clang"),
            ToolchainId::Msvc => ("cl", "cl", "lib", "link"),
        };
        ToolCommands {
            cc: cc.to_string(),
            cxx: cxx.to_string(),
            ar: ar.to_string(),
            ld: ld.to_string(),
        }
    }

    /// Look up the command bound to a tool variable.
    pub fn get(&self, var: ToolVar) -> &str {
        match var {
            ToolVar::Cc => &self.cc,
            ToolVar::Cxx => &self.cxx,
            ToolVar::Ar => &self.ar,
            ToolVar::Ld => &self.ld,
        }
    }
}

/// Installation directories.
///
/// `bindir`, `libdir` and `includedir` are relative to `prefix` unless
/// absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallDirs {
    pub prefix: PathBuf,
    pub bindir: PathBuf,
    pub libdir: PathBuf,
    pub includedir: PathBuf,
}

impl Default for InstallDirs {
    fn default() -> Self {
        InstallDirs {
            prefix: PathBuf::from("/usr/local"),
            bindir: PathBuf::from("bin"),
            libdir: PathBuf::from("lib"),
            includedir: PathBuf::from("include"),
        }
    }
}

impl InstallDirs {
    /// The configured value for a root, as written (possibly prefix-relative).
    pub fn raw(&self, root: InstallRoot) -> &Path {
        match root {
            InstallRoot::Prefix => &self.prefix,
            InstallRoot::Bindir => &self.bindir,
            InstallRoot::Libdir => &self.libdir,
            InstallRoot::Includedir => &self.includedir,
        }
    }

    /// Fully resolved directory for a root.
    pub fn resolve(&self, root: InstallRoot) -> PathBuf {
        let raw = self.raw(root);
        if root == InstallRoot::Prefix || raw.is_absolute() {
            raw.to_path_buf()
        } else {
            self.prefix.join(raw)
        }
    }
}

/// Read-only input to graph construction.
#[derive(Debug, Clone)]
pub struct Environment {
    platform: Platform,
    toolchain: Arc<dyn Toolchain>,
    tools: ToolCommands,
    global_options: Vec<GenericOption>,
    install_dirs: InstallDirs,
    srcdir: PathBuf,
    builddir: PathBuf,
    default_library_kind: LibraryKind,
}

impl Environment {
    /// Create an environment, selecting the toolchain's rule table.
    ///
    /// Fails when the toolchain cannot target the platform.
    pub fn new(platform: Platform, toolchain_id: ToolchainId) -> Result<Self, ToolchainError> {
        let toolchain = toolchain::for_id(toolchain_id, platform)?;
        tracing::debug!("selected {} toolchain for {}", toolchain_id, platform);

        Ok(Environment {
            platform,
            toolchain,
            tools: ToolCommands::defaults_for(toolchain_id),
            global_options: Vec::new(),
            install_dirs: InstallDirs::default(),
            srcdir: PathBuf::from("."),
            builddir: PathBuf::from("build"),
            default_library_kind: LibraryKind::Static,
        })
    }

    /// Environment for the host platform and its default toolchain.
    pub fn host() -> Result<Self, ToolchainError> {
        let platform = Platform::host();
        Environment::new(platform, ToolchainId::default_for(platform))
    }

    /// Override tool commands.
    pub fn with_tools(mut self, tools: ToolCommands) -> Self {
        self.tools = tools;
        self
    }

    /// Set generic options applied to every target.
    ///
    /// Unknown options are rejected here, before any target is compiled.
    pub fn with_global_options<S: AsRef<str>>(
        mut self,
        options: impl IntoIterator<Item = S>,
    ) -> Result<Self, ToolchainError> {
        self.global_options = options
            .into_iter()
            .map(|o| o.as_ref().parse())
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    /// Set installation directories.
    pub fn with_install_dirs(mut self, dirs: InstallDirs) -> Self {
        self.install_dirs = dirs;
        self
    }

    /// Set the source directory.
    pub fn with_srcdir(mut self, srcdir: impl Into<PathBuf>) -> Self {
        self.srcdir = srcdir.into();
        self
    }

    /// Set the build directory.
    pub fn with_builddir(mut self, builddir: impl Into<PathBuf>) -> Self {
        self.builddir = builddir.into();
        self
    }

    /// Set the library kind used when a library does not specify one.
    pub fn with_default_library_kind(mut self, kind: LibraryKind) -> Self {
        self.default_library_kind = kind;
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn toolchain_id(&self) -> ToolchainId {
        self.toolchain.id()
    }

    /// The toolchain descriptor selected at construction.
    pub fn toolchain(&self) -> &dyn Toolchain {
        self.toolchain.as_ref()
    }

    pub fn tools(&self) -> &ToolCommands {
        &self.tools
    }

    pub fn global_options(&self) -> &[GenericOption] {
        &self.global_options
    }

    pub fn install_dirs(&self) -> &InstallDirs {
        &self.install_dirs
    }

    pub fn srcdir(&self) -> &Path {
        &self.srcdir
    }

    pub fn builddir(&self) -> &Path {
        &self.builddir
    }

    pub fn default_library_kind(&self) -> LibraryKind {
        self.default_library_kind
    }

    /// Key identifying this environment for package memoization.
    pub fn key(&self) -> String {
        format!("{}-{}", self.platform, self.toolchain.id())
    }

    /// Path from the build directory to the source directory.
    pub fn srcdir_from_builddir(&self) -> String {
        let srcdir = crate::util::fs::absolute_lexical(&self.srcdir);
        let builddir = crate::util::fs::absolute_lexical(&self.builddir);
        let rel = crate::util::fs::relative_path(&builddir, &srcdir);
        let rendered = crate::util::fs::to_slash(&rel);
        if rendered.is_empty() {
            ".".to_string()
        } else {
            rendered
        }
    }
}
