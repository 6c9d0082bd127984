//! User-facing diagnostic messages.
//!
//! Every error reported by the CLI names the offending target, file or
//! package and, where possible, suggests a fix.

use std::fmt;
use std::path::PathBuf;

/// Common suggestion messages.
pub mod suggestions {
    /// No description file in the source directory.
    pub const NO_MANIFEST: &str = "Create a Drydock.toml in the source directory";

    /// pkg-config is not installed or not on PATH.
    pub const NO_PKG_CONFIG: &str =
        "Install pkg-config, or set [packages] pkg_config in .drydock/config.toml";

    /// A backend name was not recognized.
    pub const UNKNOWN_BACKEND: &str = "Run `drydock backends` to list the available backends";
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let error_prefix = if color {
            "\x1b[1;31merror\x1b[0m"
        } else {
            "error"
        };

        output.push_str(&format!("{}: {}\n", error_prefix, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("package `ogg` not found")
            .with_context("required by `inner`")
            .with_suggestion("Install the libogg development package")
            .with_suggestion(suggestions::NO_PKG_CONFIG);

        let output = diag.format(false);
        assert!(output.contains("error: package `ogg` not found"));
        assert!(output.contains("= required by `inner`"));
        assert!(output.contains("help: consider:"));
        assert!(output.contains("1. Install the libogg"));
        assert!(output.contains("2. Install pkg-config"));
    }

    #[test]
    fn test_error_with_location() {
        let diag = Diagnostic::error("unknown field `bogus`").with_location("Drydock.toml");
        let output = diag.format(false);
        assert!(output.starts_with("error: unknown field `bogus`"));
        assert!(output.contains("--> Drydock.toml"));
        assert!(diag.format(true).contains("\x1b[1;31merror"));
    }
}
