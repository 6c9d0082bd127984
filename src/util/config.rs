//! Configuration file support for Drydock.
//!
//! Drydock supports two configuration file locations:
//! - Global: `<config dir>/drydock/config.toml` - User-wide defaults
//! - Project: `.drydock/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config; command-line flags
//! take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Drydock configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generation settings
    pub generate: GenerateConfig,

    /// Toolchain selection and tool overrides
    pub toolchain: ToolchainSettings,

    /// Installation directories
    pub install: InstallConfig,

    /// Package query settings
    pub packages: PackagesConfig,
}

/// `[generate]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Backends to emit (`ninja`, `make`, `msbuild`)
    pub backends: Vec<String>,

    /// Build directory, relative to the project root
    pub builddir: Option<PathBuf>,

    /// Default kind for libraries that do not set one (`static`, `shared`)
    pub library_kind: Option<String>,

    /// Also write compile_commands.json
    pub emit_compile_commands: bool,
}

/// `[toolchain]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    /// Toolchain id (`gcc`, `clang`, `msvc`)
    pub id: Option<String>,

    /// Target platform (`linux`, `darwin`, `windows`, `cygwin`)
    pub platform: Option<String>,

    /// C compiler command (e.g., `ccache gcc`)
    pub cc: Option<String>,

    /// C++ compiler command
    pub cxx: Option<String>,

    /// Archiver command
    pub ar: Option<String>,

    /// Linker command (MSVC only)
    pub ld: Option<String>,

    /// Generic options applied to every target
    pub options: Vec<String>,
}

/// `[install]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    pub prefix: Option<PathBuf>,
    pub bindir: Option<PathBuf>,
    pub libdir: Option<PathBuf>,
    pub includedir: Option<PathBuf>,
}

/// `[packages]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagesConfig {
    /// pkg-config binary; `PKG_CONFIG` or a PATH search when unset
    pub pkg_config: Option<PathBuf>,

    /// Extra directories searched for `.pc` files
    pub search_path: Vec<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    ///
    /// Lists are replaced, not appended.
    pub fn merge(&mut self, other: Config) {
        // Generate settings
        if !other.generate.backends.is_empty() {
            self.generate.backends = other.generate.backends;
        }
        if other.generate.builddir.is_some() {
            self.generate.builddir = other.generate.builddir;
        }
        if other.generate.library_kind.is_some() {
            self.generate.library_kind = other.generate.library_kind;
        }
        if other.generate.emit_compile_commands {
            self.generate.emit_compile_commands = true;
        }

        // Toolchain settings
        let tc = other.toolchain;
        if tc.id.is_some() {
            self.toolchain.id = tc.id;
        }
        if tc.platform.is_some() {
            self.toolchain.platform = tc.platform;
        }
        if tc.cc.is_some() {
            self.toolchain.cc = tc.cc;
        }
        if tc.cxx.is_some() {
            self.toolchain.cxx = tc.cxx;
        }
        if tc.ar.is_some() {
            self.toolchain.ar = tc.ar;
        }
        if tc.ld.is_some() {
            self.toolchain.ld = tc.ld;
        }
        if !tc.options.is_empty() {
            self.toolchain.options = tc.options;
        }

        // Install settings
        let install = other.install;
        if install.prefix.is_some() {
            self.install.prefix = install.prefix;
        }
        if install.bindir.is_some() {
            self.install.bindir = install.bindir;
        }
        if install.libdir.is_some() {
            self.install.libdir = install.libdir;
        }
        if install.includedir.is_some() {
            self.install.includedir = install.includedir;
        }

        // Package settings
        if other.packages.pkg_config.is_some() {
            self.packages.pkg_config = other.packages.pkg_config;
        }
        if !other.packages.search_path.is_empty() {
            self.packages.search_path = other.packages.search_path;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.drydock/config.toml)
/// 2. Global config
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        if global_path.exists() {
            config.merge(Config::load_or_default(global_path));
        }
    }

    // Project config overrides global
    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global config path, e.g. `~/.config/drydock/config.toml`.
///
/// `DRYDOCK_CONFIG` overrides the platform location.
pub fn global_config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("DRYDOCK_CONFIG") {
        return Some(PathBuf::from(path));
    }
    directories::ProjectDirs::from("", "", "drydock")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Get the project config path (.drydock/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".drydock").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.generate.backends.is_empty());
        assert!(config.toolchain.id.is_none());
        assert!(config.packages.search_path.is_empty());
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[generate]
backends = ["ninja", "make"]
builddir = "out"
emit_compile_commands = true

[toolchain]
id = "clang"
cc = "ccache clang"
options = ["optimize=2", "debug"]

[install]
prefix = "/opt/demo"

[packages]
search_path = ["/opt/demo/lib/pkgconfig"]
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.generate.backends, vec!["ninja", "make"]);
        assert_eq!(config.generate.builddir, Some(PathBuf::from("out")));
        assert!(config.generate.emit_compile_commands);
        assert_eq!(config.toolchain.id.as_deref(), Some("clang"));
        assert_eq!(config.toolchain.cc.as_deref(), Some("ccache clang"));
        assert_eq!(config.toolchain.options, vec!["optimize=2", "debug"]);
        assert_eq!(config.install.prefix, Some(PathBuf::from("/opt/demo")));
        assert_eq!(
            config.packages.search_path,
            vec![PathBuf::from("/opt/demo/lib/pkgconfig")]
        );
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.generate.backends = vec!["make".to_string()];
        base.toolchain.ar = Some("llvm-ar".to_string());

        let mut override_cfg = Config::default();
        override_cfg.generate.backends = vec!["ninja".to_string()];

        base.merge(override_cfg);

        assert_eq!(base.generate.backends, vec!["ninja"]);
        assert_eq!(base.toolchain.ar.as_deref(), Some("llvm-ar")); // Not overridden
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = project_config_path(tmp.path());

        std::fs::write(
            &global_path,
            r#"
[toolchain]
id = "gcc"
ar = "gcc-ar"
options = ["optimize=2"]
"#,
        )
        .unwrap();

        std::fs::create_dir_all(project_path.parent().unwrap()).unwrap();
        std::fs::write(
            &project_path,
            r#"
[toolchain]
id = "clang"
options = ["optimize=3"]
"#,
        )
        .unwrap();

        let config = load_config(Some(&global_path), &project_path);

        assert_eq!(config.toolchain.id.as_deref(), Some("clang"));
        assert_eq!(config.toolchain.ar.as_deref(), Some("gcc-ar"));
        assert_eq!(config.toolchain.options, vec!["optimize=3"]);
    }

    #[test]
    fn test_broken_config_falls_back_to_default() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "[generate\n").unwrap();

        assert!(Config::load(&config_path).is_err());
        assert_eq!(Config::load_or_default(&config_path), Config::default());
    }
}
