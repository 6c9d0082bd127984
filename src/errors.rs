//! Error taxonomy for a generation run.
//!
//! Every failure aborts the run before any backend file is written. Each
//! category converts to a [`Diagnostic`] naming the offending target, file
//! or package.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::resolver::ResolutionError;
use crate::util::diagnostic::Diagnostic;

/// Malformed or contradictory declarations.
#[derive(Debug, Clone, PartialEq, Eq, Error, MietteDiagnostic)]
pub enum ConfigurationError {
    #[error("`{path}` is produced by both `{first}` and `{second}`")]
    #[diagnostic(
        code(drydock::graph::duplicate_producer),
        help("rename one of the targets or move one of the outputs")
    )]
    DuplicateProducer {
        path: String,
        first: String,
        second: String,
    },

    #[error("dependency cycle between targets: {}", .targets.join(" -> "))]
    #[diagnostic(
        code(drydock::graph::cycle),
        help("break the cycle by removing one of the dependencies")
    )]
    DependencyCycle { targets: Vec<String> },

    #[error("target `{name}` is declared more than once")]
    #[diagnostic(code(drydock::description::duplicate_target))]
    DuplicateTarget { name: String },

    #[error("`{from}` refers to unknown target `{name}`")]
    #[diagnostic(code(drydock::description::unknown_target))]
    UnknownTarget { name: String, from: String },

    #[error("`{from}` refers to unknown package `{name}`")]
    #[diagnostic(
        code(drydock::description::unknown_package),
        help("declare the package with a [[package]] entry")
    )]
    UnknownPackage { name: String, from: String },

    #[error("`{from}` cannot depend on `{name}`: {reason}")]
    #[diagnostic(code(drydock::description::invalid_dependency))]
    InvalidDependency {
        from: String,
        name: String,
        reason: String,
    },

    #[error("target `{name}` has no source files")]
    #[diagnostic(code(drydock::description::empty_sources))]
    EmptySources { name: String },

    #[error("invalid path `{path}`: {reason}")]
    #[diagnostic(code(drydock::graph::invalid_path))]
    InvalidPath { path: String, reason: String },

    #[error("invalid version requirement `{requirement}` for package `{package}`")]
    #[diagnostic(code(drydock::description::invalid_version_req))]
    InvalidVersionRequirement { package: String, requirement: String },

    #[error("{path}: {message}")]
    #[diagnostic(code(drydock::manifest::invalid))]
    Manifest { path: String, message: String },

    #[error("invalid `{field}` for package export `{export}`: {value:?}")]
    #[diagnostic(code(drydock::description::invalid_export_field))]
    InvalidExportField {
        export: String,
        field: String,
        value: String,
    },
}

impl ConfigurationError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ConfigurationError::DuplicateProducer {
                path,
                first,
                second,
            } => Diagnostic::error(format!("multiple targets produce `{}`", path))
                .with_context(format!("first produced by `{}`", first))
                .with_context(format!("also produced by `{}`", second))
                .with_suggestion("Rename one of the targets so their outputs differ"),

            ConfigurationError::DependencyCycle { targets } => {
                let mut diag = Diagnostic::error("dependency cycle detected");
                diag = diag.with_context(format!("cycle: {}", targets.join(" -> ")));
                for target in targets {
                    diag = diag.with_context(format!("involves target `{}`", target));
                }
                diag.with_suggestion("Remove one of the `libs` references that closes the cycle")
            }

            ConfigurationError::DuplicateTarget { name } => {
                Diagnostic::error(format!("target `{}` is declared more than once", name))
                    .with_suggestion("Give each library and executable a unique name")
            }

            ConfigurationError::UnknownTarget { name, from } => {
                Diagnostic::error(format!("unknown target `{}`", name))
                    .with_context(format!("referenced by `{}`", from))
                    .with_suggestion("Check the spelling or declare the target")
            }

            ConfigurationError::UnknownPackage { name, from } => {
                Diagnostic::error(format!("unknown package `{}`", name))
                    .with_context(format!("referenced by `{}`", from))
                    .with_suggestion(format!("Add a [[package]] entry named `{}`", name))
            }

            ConfigurationError::InvalidDependency { from, name, reason } => {
                Diagnostic::error(format!("`{}` cannot depend on `{}`", from, name))
                    .with_context(reason.clone())
            }

            ConfigurationError::EmptySources { name } => {
                Diagnostic::error(format!("target `{}` has no source files", name))
                    .with_suggestion("List at least one source, or check the glob pattern")
            }

            ConfigurationError::InvalidPath { path, reason } => {
                Diagnostic::error(format!("invalid path `{}`", path.escape_debug()))
                    .with_context(reason.clone())
            }

            ConfigurationError::InvalidVersionRequirement {
                package,
                requirement,
            } => Diagnostic::error(format!(
                "invalid version requirement `{}` for package `{}`",
                requirement, package
            ))
            .with_suggestion("Use a semver requirement such as `>=1.3` or `^2.0`"),

            ConfigurationError::Manifest { path, message } => {
                Diagnostic::error(message.clone()).with_location(path.clone())
            }

            ConfigurationError::InvalidExportField { export, field, value } => Diagnostic::error(
                format!("invalid `{}` for package export `{}`", field, export),
            )
            .with_context(format!("value: {}", value.escape_debug()))
            .with_suggestion("pkg-config fields must fit on a single line"),
        }
    }
}

/// The active compiler/platform pair cannot do what was asked.
#[derive(Debug, Clone, PartialEq, Eq, Error, MietteDiagnostic)]
pub enum ToolchainError {
    #[error("{toolchain} on {platform} cannot {operation}")]
    #[diagnostic(code(drydock::toolchain::unsupported_operation))]
    UnsupportedToolchainOperation {
        toolchain: String,
        platform: String,
        operation: String,
    },

    #[error("unknown option `{option}`")]
    #[diagnostic(
        code(drydock::toolchain::unknown_option),
        help("supported options: warnings-as-errors, warnings=, optimize=, debug, pic, pthread, std=, define=")
    )]
    UnknownOption { option: String },

    #[error("invalid value `{value}` for option `{option}` (expected {expected})")]
    #[diagnostic(code(drydock::toolchain::invalid_option_value))]
    InvalidOptionValue {
        option: String,
        value: String,
        expected: String,
    },

    #[error("unknown toolchain `{name}`")]
    #[diagnostic(code(drydock::toolchain::unknown), help("valid toolchains: gcc, clang, msvc"))]
    UnknownToolchain { name: String },

    #[error("unknown platform `{name}`")]
    #[diagnostic(
        code(drydock::toolchain::unknown_platform),
        help("valid platforms: linux, darwin, windows, cygwin")
    )]
    UnknownPlatform { name: String },
}

impl ToolchainError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ToolchainError::UnsupportedToolchainOperation {
                toolchain,
                platform,
                operation,
            } => Diagnostic::error(format!("unsupported toolchain operation: {}", operation))
                .with_context(format!("toolchain: {}", toolchain))
                .with_context(format!("platform: {}", platform))
                .with_suggestion("Select a different toolchain with `--toolchain`"),

            ToolchainError::UnknownOption { option } => {
                Diagnostic::error(format!("unknown option `{}`", option))
                    .with_suggestion(
                        "Use one of: warnings-as-errors, warnings=, optimize=, debug, pic, pthread, std=, define=",
                    )
                    .with_suggestion("Pass compiler-specific flags through `compile_options`")
            }

            ToolchainError::InvalidOptionValue {
                option,
                value,
                expected,
            } => Diagnostic::error(format!("invalid value `{}` for option `{}`", value, option))
                .with_context(format!("expected {}", expected)),

            ToolchainError::UnknownToolchain { name } => {
                Diagnostic::error(format!("unknown toolchain `{}`", name))
                    .with_suggestion("Use one of: gcc, clang, msvc")
            }

            ToolchainError::UnknownPlatform { name } => {
                Diagnostic::error(format!("unknown platform `{}`", name))
                    .with_suggestion("Use one of: linux, darwin, windows, cygwin")
            }
        }
    }
}

/// A backend cannot represent the graph, or its output cannot be written.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum EmissionError {
    #[error("the {backend} backend does not support {feature}")]
    #[diagnostic(
        code(drydock::backend::unsupported_feature),
        help("choose a different backend for this project")
    )]
    UnsupportedGraphFeature { backend: String, feature: String },

    #[error("failed to write `{path}`")]
    #[diagnostic(code(drydock::backend::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{backend}: {message}")]
    #[diagnostic(code(drydock::backend::render))]
    Render { backend: String, message: String },
}

impl EmissionError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            EmissionError::UnsupportedGraphFeature { backend, feature } => Diagnostic::error(
                format!("the {} backend cannot express {}", backend, feature),
            )
            .with_context("no build files were written")
            .with_suggestion("Select another backend with `--backend`"),

            EmissionError::Io { path, source } => {
                Diagnostic::error(format!("failed to write `{}`", path))
                    .with_context(source.to_string())
            }

            EmissionError::Render { backend, message } => {
                Diagnostic::error(format!("{} backend: {}", backend, message))
            }
        }
    }
}

/// Any failure of a generation run.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum GenerateError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Emission(#[from] EmissionError),
}

impl GenerateError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            GenerateError::Configuration(e) => e.to_diagnostic(),
            GenerateError::Resolution(e) => e.to_diagnostic(),
            GenerateError::Toolchain(e) => e.to_diagnostic(),
            GenerateError::Emission(e) => e.to_diagnostic(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_names_targets() {
        let err = ConfigurationError::DependencyCycle {
            targets: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "dependency cycle between targets: a -> b -> a");

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("cycle: a -> b -> a"));
        assert!(output.contains("involves target `b`"));
    }

    #[test]
    fn test_duplicate_producer_diagnostic() {
        let err = ConfigurationError::DuplicateProducer {
            path: "libfoo.a".into(),
            first: "foo".into(),
            second: "bar".into(),
        };
        let output = err.to_diagnostic().format(false);
        assert!(output.contains("libfoo.a"));
        assert!(output.contains("`foo`"));
        assert!(output.contains("`bar`"));
    }

    #[test]
    fn test_generate_error_is_transparent() {
        let err: GenerateError = ToolchainError::UnknownOption {
            option: "fast-math".into(),
        }
        .into();
        assert_eq!(err.to_string(), "unknown option `fast-math`");
    }
}
