//! Drydock.toml manifest parsing and schema.
//!
//! The manifest is the declarative front end to the
//! [`Description`] builder. Conditional `[[<decl>.when]]` blocks are matched
//! against the environment while the description is built, so the graph
//! layer never sees a conditional.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::core::description::{Description, Executable, Library, LibraryKind, PkgConfig};
use crate::core::environment::{Environment, Platform, ToolchainId};
use crate::core::package::{PackageKind, PackageRequest};
use crate::errors::ConfigurationError;
use crate::resolver::version::parse_requirement;
use crate::util::fs::{glob_relative, is_glob};

/// Canonical manifest file name.
pub const MANIFEST_NAME: &str = "Drydock.toml";

/// `[project]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// A `[[package]]` entry.
///
/// Declaring any of `include_dirs`, `lib_dirs` or `libs` describes the
/// package manually; otherwise it is queried through pkg-config.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageSection {
    pub name: String,
    /// Semver requirement, e.g. `">=1.3"`
    #[serde(default)]
    pub version: Option<String>,
    /// Version a manually described package is known to be
    #[serde(default)]
    pub provides: Option<String>,
    #[serde(default)]
    pub kind: PackageKind,
    #[serde(default)]
    pub include_dirs: Vec<String>,
    #[serde(default)]
    pub lib_dirs: Vec<String>,
    #[serde(default)]
    pub libs: Vec<String>,
}

impl PackageSection {
    fn is_manual(&self) -> bool {
        !self.include_dirs.is_empty() || !self.lib_dirs.is_empty() || !self.libs.is_empty()
    }
}

/// A `[[header]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeaderSection {
    pub path: String,
}

/// Lists a `when` block appends to its target.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WhenSection {
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub toolchain: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub include_dirs: Vec<String>,
    #[serde(default)]
    pub libs: Vec<String>,
    /// Static libraries linked with every member; implies `libs`
    #[serde(default)]
    pub whole_archive: Vec<String>,
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub compile_options: Vec<String>,
    #[serde(default)]
    pub link_options: Vec<String>,
}

/// A `[[library]]` or `[[executable]]` entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSection {
    pub name: String,
    /// Libraries only
    #[serde(default)]
    pub kind: Option<LibraryKind>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub include_dirs: Vec<String>,
    #[serde(default)]
    pub libs: Vec<String>,
    /// Static libraries linked with every member; implies `libs`
    #[serde(default)]
    pub whole_archive: Vec<String>,
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub compile_options: Vec<String>,
    #[serde(default)]
    pub link_options: Vec<String>,
    /// Libraries only
    #[serde(default)]
    pub version: Option<String>,
    /// Libraries only
    #[serde(default)]
    pub soversion: Option<String>,
    #[serde(default)]
    pub when: Vec<WhenSection>,
}

/// A `[[pkg_config]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PkgConfigSection {
    pub name: String,
    /// Defaults to the library called `name`
    #[serde(default)]
    pub library: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default = "default_true")]
    pub install: bool,
}

fn default_true() -> bool {
    true
}

/// `[install]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallSection {
    /// Target names; headers are named by their path
    #[serde(default)]
    pub targets: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    project: ProjectSection,
    #[serde(default, rename = "package")]
    packages: Vec<PackageSection>,
    #[serde(default, rename = "header")]
    headers: Vec<HeaderSection>,
    #[serde(default, rename = "library")]
    libraries: Vec<TargetSection>,
    #[serde(default, rename = "executable")]
    executables: Vec<TargetSection>,
    #[serde(default, rename = "pkg_config")]
    pkg_configs: Vec<PkgConfigSection>,
    #[serde(default)]
    install: InstallSection,
}

/// A parsed and validated manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub project: ProjectSection,
    pub packages: Vec<PackageSection>,
    pub headers: Vec<HeaderSection>,
    pub libraries: Vec<TargetSection>,
    pub executables: Vec<TargetSection>,
    pub pkg_configs: Vec<PkgConfigSection>,
    pub install: InstallSection,
    path: PathBuf,
}

/// A `when` block's condition, parsed.
#[derive(Debug, Clone, Copy)]
struct Condition {
    platform: Option<Platform>,
    toolchain: Option<ToolchainId>,
}

impl Condition {
    fn matches(&self, env: &Environment) -> bool {
        self.platform.map_or(true, |p| p == env.platform())
            && self.toolchain.map_or(true, |t| t == env.toolchain_id())
    }
}

impl Manifest {
    /// Load a manifest from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigurationError::Manifest {
            path: path.display().to_string(),
            message: format!("failed to read manifest: {}", e),
        })?;

        Self::parse(&content, path)
    }

    /// Parse manifest content.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigurationError> {
        let error = |message: String| ConfigurationError::Manifest {
            path: path.display().to_string(),
            message,
        };

        let raw: RawManifest = toml::from_str(content)
            .map_err(|e| error(format!("failed to parse {}: {}", MANIFEST_NAME, e.message())))?;

        if raw.project.name.trim().is_empty() {
            return Err(error("project name must not be empty".into()));
        }

        for exe in &raw.executables {
            if exe.kind.is_some() || exe.version.is_some() || exe.soversion.is_some() {
                return Err(error(format!(
                    "executable `{}` cannot set `kind`, `version` or `soversion`",
                    exe.name
                )));
            }
        }

        for package in &raw.packages {
            if package.is_manual() {
                if package.version.is_some() && package.provides.is_none() {
                    return Err(error(format!(
                        "package `{}` is described manually; a `version` requirement needs `provides`",
                        package.name
                    )));
                }
            } else if package.provides.is_some() {
                return Err(error(format!(
                    "package `{}` sets `provides` but is queried through pkg-config",
                    package.name
                )));
            }
        }

        for target in raw.libraries.iter().chain(&raw.executables) {
            for when in &target.when {
                parse_condition(when).map_err(|message| {
                    error(format!("target `{}`: {}", target.name, message))
                })?;
            }
        }

        Ok(Manifest {
            project: raw.project,
            packages: raw.packages,
            headers: raw.headers,
            libraries: raw.libraries,
            executables: raw.executables,
            pkg_configs: raw.pkg_configs,
            install: raw.install,
            path: path.to_path_buf(),
        })
    }

    /// Search `start` and its ancestors for a manifest.
    pub fn find(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(MANIFEST_NAME))
            .find(|candidate| candidate.is_file())
    }

    /// Path the manifest was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the manifest; the default source directory.
    pub fn manifest_dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    pub fn name(&self) -> &str {
        &self.project.name
    }

    /// Evaluate the manifest against an environment.
    ///
    /// Declarations are added headers first, then libraries, executables
    /// and pkg-config exports, each kind in file order. Globs expand
    /// against the environment's source directory.
    pub fn to_description(&self, env: &Environment) -> Result<Description, ConfigurationError> {
        let mut desc = Description::new(&self.project.name);
        if let Some(version) = &self.project.version {
            desc = desc.with_version(version);
        }

        for package in &self.packages {
            desc.package(self.package_request(package)?);
        }

        for header in &self.headers {
            for path in self.expand(&header.path, env.srcdir())? {
                desc.header_file(path)?;
            }
        }

        for section in &self.libraries {
            let merged = self.evaluate(section, env)?;
            let mut library = Library::new(&merged.name)
                .sources(merged.sources)
                .headers(merged.headers)
                .include_dirs(merged.include_dirs)
                .libs(merged.libs)
                .whole_archive(merged.whole_archive)
                .packages(merged.packages)
                .options(merged.options)
                .compile_options(merged.compile_options)
                .link_options(merged.link_options);
            library.kind = merged.kind;
            library.version = merged.version;
            library.soversion = merged.soversion;
            desc.library(library)?;
        }

        for section in &self.executables {
            let merged = self.evaluate(section, env)?;
            desc.executable(
                Executable::new(&merged.name)
                    .sources(merged.sources)
                    .headers(merged.headers)
                    .include_dirs(merged.include_dirs)
                    .libs(merged.libs)
                    .whole_archive(merged.whole_archive)
                    .packages(merged.packages)
                    .options(merged.options)
                    .compile_options(merged.compile_options)
                    .link_options(merged.link_options),
            )?;
        }

        for section in &self.pkg_configs {
            let mut export = PkgConfig::new(&section.name).requires(section.requires.clone());
            if let Some(library) = &section.library {
                export = export.library(library.as_str());
            }
            if let Some(description) = &section.description {
                export = export.description(description);
            }
            if let Some(version) = &section.version {
                export = export.version(version);
            }
            export.install = section.install;
            desc.pkg_config(export)?;
        }

        desc.install(self.install.targets.iter().map(String::as_str));

        debug!(
            "evaluated {} for {}/{}: {} targets",
            self.path.display(),
            env.platform(),
            env.toolchain_id(),
            desc.targets().len()
        );
        Ok(desc)
    }

    fn package_request(&self, section: &PackageSection) -> Result<PackageRequest, ConfigurationError> {
        let mut request = PackageRequest::new(&section.name).kind(section.kind);
        if let Some(req) = &section.version {
            request = request.version(parse_requirement(&section.name, req)?);
        }
        if section.is_manual() {
            request = request.manual(
                section.include_dirs.clone(),
                section.lib_dirs.clone(),
                section.libs.clone(),
            );
            if let Some(provided) = &section.provides {
                request = request.provides(provided);
            }
        }
        Ok(request)
    }

    /// Apply matching `when` blocks and expand source globs.
    fn evaluate(&self, section: &TargetSection, env: &Environment) -> Result<TargetSection, ConfigurationError> {
        let mut merged = section.clone();
        merged.when.clear();

        for when in &section.when {
            let condition = parse_condition(when).map_err(|message| ConfigurationError::Manifest {
                path: self.path.display().to_string(),
                message,
            })?;
            if !condition.matches(env) {
                continue;
            }
            merged.sources.extend(when.sources.iter().cloned());
            merged.headers.extend(when.headers.iter().cloned());
            merged.include_dirs.extend(when.include_dirs.iter().cloned());
            merged.libs.extend(when.libs.iter().cloned());
            merged.whole_archive.extend(when.whole_archive.iter().cloned());
            merged.packages.extend(when.packages.iter().cloned());
            merged.options.extend(when.options.iter().cloned());
            merged.compile_options.extend(when.compile_options.iter().cloned());
            merged.link_options.extend(when.link_options.iter().cloned());
        }

        merged.sources = self.expand_all(&merged.sources, env.srcdir())?;
        merged.headers = self.expand_all(&merged.headers, env.srcdir())?;
        Ok(merged)
    }

    fn expand_all(&self, entries: &[String], srcdir: &Path) -> Result<Vec<String>, ConfigurationError> {
        let mut out = Vec::new();
        for entry in entries {
            out.extend(self.expand(entry, srcdir)?);
        }
        Ok(out)
    }

    fn expand(&self, entry: &str, srcdir: &Path) -> Result<Vec<String>, ConfigurationError> {
        if !is_glob(entry) {
            return Ok(vec![entry.to_string()]);
        }

        let matches = glob_relative(srcdir, entry).map_err(|e| ConfigurationError::Manifest {
            path: self.path.display().to_string(),
            message: format!("{:#}", e),
        })?;
        if matches.is_empty() {
            warn!("pattern `{}` matched no files in {}", entry, srcdir.display());
        }
        Ok(matches)
    }
}

fn parse_condition(when: &WhenSection) -> Result<Condition, String> {
    if when.platform.is_none() && when.toolchain.is_none() {
        return Err("`when` blocks need a `platform` or `toolchain` condition".into());
    }
    let platform = when
        .platform
        .as_deref()
        .map(str::parse::<Platform>)
        .transpose()
        .map_err(|e| e.to_string())?;
    let toolchain = when
        .toolchain
        .as_deref()
        .map(str::parse::<ToolchainId>)
        .transpose()
        .map_err(|e| e.to_string())?;
    Ok(Condition {
        platform,
        toolchain,
    })
}
