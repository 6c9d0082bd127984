//! Package resolution errors and diagnostics.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// A package could not be resolved.
///
/// Cloneable because failures are memoized alongside successes.
#[derive(Debug, Clone, PartialEq, Eq, Error, MietteDiagnostic)]
pub enum ResolutionError {
    #[error("package `{package}` not found")]
    #[diagnostic(
        code(drydock::resolver::not_found),
        help("install the package's development files or extend PKG_CONFIG_PATH")
    )]
    PackageNotFound {
        package: String,
        /// Message reported by the query tool, if any
        detail: Option<String>,
    },

    #[error("querying package `{package}` failed: {message}")]
    #[diagnostic(code(drydock::resolver::query_failed))]
    PackageQueryError { package: String, message: String },

    #[error("package `{package}` version {found} does not satisfy `{required}`")]
    #[diagnostic(code(drydock::resolver::version_mismatch))]
    VersionMismatch {
        package: String,
        required: String,
        found: String,
    },
}

impl ResolutionError {
    /// Name of the package that failed.
    pub fn package(&self) -> &str {
        match self {
            ResolutionError::PackageNotFound { package, .. }
            | ResolutionError::PackageQueryError { package, .. }
            | ResolutionError::VersionMismatch { package, .. } => package,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolutionError::PackageNotFound { package, detail } => {
                let mut diag = Diagnostic::error(format!("could not find package `{}`", package));
                if let Some(detail) = detail {
                    diag = diag.with_context(detail.clone());
                }
                diag.with_suggestion(format!(
                    "Install the development package that provides `{}.pc`",
                    package
                ))
                .with_suggestion("Add its directory to PKG_CONFIG_PATH")
            }

            ResolutionError::PackageQueryError { package, message } => {
                Diagnostic::error(format!("failed to query package `{}`", package))
                    .with_context(message.clone())
                    .with_suggestion(suggestions::NO_PKG_CONFIG)
            }

            ResolutionError::VersionMismatch {
                package,
                required,
                found,
            } => Diagnostic::error(format!(
                "package `{}` does not satisfy version requirement `{}`",
                package, required
            ))
            .with_context(format!("found version {}", found))
            .with_suggestion(format!("Install a version of `{}` matching `{}`", package, required))
            .with_suggestion("Relax the version requirement in the description"),
        }
    }
}
