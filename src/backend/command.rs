//! Command-line rendering shared by the backends.
//!
//! Edges carry typed flags; rules carry command templates. This module
//! picks the flags a template variable refers to and turns [`Arg`]s into
//! shell words. Each backend supplies its own path spelling and escaping.

use std::borrow::Cow;

use crate::builder::graph::Edge;
use crate::builder::toolchain::{Arg, FlagVar, Piece, Toolchain};
use crate::core::environment::Platform;
use crate::core::flags::{FlagValue, Phase};
use crate::core::path::BuildPath;
use crate::errors::EmissionError;

/// The shell that runs emitted commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Posix,
    Cmd,
}

impl Shell {
    pub fn for_platform(platform: Platform) -> Shell {
        if platform.has_posix_shell() {
            Shell::Posix
        } else {
            Shell::Cmd
        }
    }

    /// Quote one word so the shell passes it through unchanged.
    pub fn quote<'a>(&self, word: &'a str) -> Cow<'a, str> {
        match self {
            Shell::Posix => shlex::try_quote(word).unwrap_or(Cow::Borrowed(word)),
            Shell::Cmd => {
                if word.is_empty() {
                    Cow::Borrowed("\"\"")
                } else if word.contains([' ', '\t', '"', '&', '|', '<', '>', '^']) {
                    Cow::Owned(format!("\"{}\"", word.replace('"', "\\\"")))
                } else {
                    Cow::Borrowed(word)
                }
            }
        }
    }
}

/// Flags an edge binds to a rule's flag variable, in order.
///
/// Compile variables take every compile-phase flag. Link flags are split:
/// libraries go after the inputs, everything else before them.
pub fn flag_values(edge: &Edge, var: FlagVar) -> Vec<&FlagValue> {
    match var {
        FlagVar::Compile(_) => edge.flags.phase(Phase::Compile).map(|f| &f.value).collect(),
        FlagVar::Ldflags => edge
            .flags
            .phase(Phase::Link)
            .filter(|f| !f.value.is_library())
            .map(|f| &f.value)
            .collect(),
        FlagVar::Ldlibs => edge
            .flags
            .phase(Phase::Link)
            .filter(|f| f.value.is_library())
            .map(|f| &f.value)
            .collect(),
    }
}

/// Turns [`Arg`]s into text for one backend.
pub struct ArgRenderer<'a> {
    pub shell: Shell,
    /// Escapes quoted text for the build file (`$` -> `$$`)
    pub escape: fn(&str) -> String,
    /// Renders a path piece, already quoted and escaped
    pub path: &'a dyn Fn(&BuildPath) -> String,
}

impl ArgRenderer<'_> {
    /// Render one argument. Pieces are quoted separately; the shell joins
    /// adjacent words without a separator.
    pub fn arg(&self, arg: &Arg) -> String {
        arg.0
            .iter()
            .map(|piece| match piece {
                Piece::Text(text) => (self.escape)(&self.shell.quote(text)),
                Piece::Path(path) => (self.path)(path),
            })
            .collect()
    }

    /// Render flag values through the toolchain, space separated.
    pub fn flags<'f>(&self, tc: &dyn Toolchain, values: impl IntoIterator<Item = &'f FlagValue>) -> String {
        values
            .into_iter()
            .flat_map(|v| tc.render_flag(v))
            .map(|a| self.arg(&a))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Reject text a build file cannot carry.
pub fn check_text(backend: &str, text: &str) -> Result<(), EmissionError> {
    if text.contains(['\n', '\r']) {
        return Err(EmissionError::UnsupportedGraphFeature {
            backend: backend.to_string(),
            feature: format!("newlines in arguments ({:?})", text),
        });
    }
    if text.contains('\0') {
        return Err(EmissionError::UnsupportedGraphFeature {
            backend: backend.to_string(),
            feature: "NUL bytes in arguments".to_string(),
        });
    }
    Ok(())
}

/// Check every flag and variable of an edge with [`check_text`].
pub fn check_edge(backend: &str, edge: &Edge) -> Result<(), EmissionError> {
    for flag in &edge.flags {
        match &flag.value {
            FlagValue::Define { name, value } => {
                check_text(backend, name)?;
                if let Some(value) = value {
                    check_text(backend, value)?;
                }
            }
            FlagValue::Library { name } => check_text(backend, name)?,
            FlagValue::Arg { value } => check_text(backend, value)?,
            FlagValue::PathArg { prefix, .. } => check_text(backend, prefix)?,
            FlagValue::IncludeDir { .. } | FlagValue::LibDir { .. } | FlagValue::WholeArchive { .. } => {}
        }
    }
    for value in edge.vars.values() {
        check_text(backend, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::graph::Recipe;
    use crate::core::flags::{Flag, FlagOrigin};

    #[test]
    fn test_posix_quoting() {
        assert_eq!(Shell::Posix.quote("-O2"), "-O2");
        let quoted = Shell::Posix.quote("-DMSG=hello world");
        assert_eq!(shlex::split(&quoted).unwrap(), vec!["-DMSG=hello world"]);
    }

    #[test]
    fn test_cmd_quoting() {
        assert_eq!(Shell::Cmd.quote("/O2"), "/O2");
        assert_eq!(Shell::Cmd.quote("/DMSG=a b"), "\"/DMSG=a b\"");
        assert_eq!(Shell::Cmd.quote(""), "\"\"");
    }

    #[test]
    fn test_link_flags_split_libraries() {
        let origin = FlagOrigin::Global;
        let mut edge = Edge::new(0, Recipe::Rule("c_link".into()));
        edge.flags.merge([
            Flag::compile(origin.clone(), FlagValue::arg("-O2")),
            Flag::link(origin.clone(), FlagValue::arg("-pthread")),
            Flag::link(origin.clone(), FlagValue::library("m")),
            Flag::link(origin, FlagValue::arg("-s")),
        ]);

        assert_eq!(
            flag_values(&edge, FlagVar::Ldflags),
            vec![&FlagValue::arg("-pthread"), &FlagValue::arg("-s")]
        );
        assert_eq!(flag_values(&edge, FlagVar::Ldlibs), vec![&FlagValue::library("m")]);
        assert_eq!(
            flag_values(&edge, FlagVar::Compile(crate::core::language::Language::C)),
            vec![&FlagValue::arg("-O2")]
        );
    }

    #[test]
    fn test_newlines_rejected() {
        let mut edge = Edge::new(0, Recipe::Rule("c_compile".into()));
        edge.flags.push(Flag::compile(FlagOrigin::Global, FlagValue::arg("-DX=a\nb")));
        assert!(matches!(
            check_edge("ninja", &edge),
            Err(EmissionError::UnsupportedGraphFeature { .. })
        ));
    }

    #[test]
    fn test_render_arg_pieces() {
        let path = |p: &BuildPath| format!("$srcdir/{}", p.as_str());
        let renderer = ArgRenderer {
            shell: Shell::Posix,
            escape: |s: &str| s.replace('$', "$$"),
            path: &path,
        };
        let arg = Arg::prefixed("-I", &BuildPath::source("include").unwrap());
        assert_eq!(renderer.arg(&arg), "-I$srcdir/include");
        let rendered = renderer.arg(&Arg::text("-DP=$HOME"));
        assert!(rendered.contains("$$HOME"));
        assert_eq!(shlex::split(&rendered.replace("$$", "$")).unwrap(), vec!["-DP=$HOME"]);
    }
}
