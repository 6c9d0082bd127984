//! Toolchain descriptors for C-family compilers.
//!
//! A toolchain turns a requested operation (compile a language, archive,
//! link an executable or a shared library) into a [`Rule`]: a command
//! template whose placeholders the backends fill in. It also translates
//! [`GenericOption`]s and typed flags into compiler syntax and knows how the
//! platform names its outputs.
//!
//! The toolchain is chosen once, when the [`Environment`] is built:
//!
//! - `gcc` and `clang` share [`GccToolchain`], parameterized by platform
//! - `msvc` is [`MsvcToolchain`], valid only when targeting Windows
//!
//! [`Environment`]: crate::core::environment::Environment

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::core::environment::{Platform, ToolchainId};
use crate::core::flags::{FlagValue, Phase};
use crate::core::language::Language;
use crate::core::path::BuildPath;
use crate::errors::ToolchainError;

mod gcc;
mod msvc;
pub mod options;

pub use gcc::GccToolchain;
pub use msvc::MsvcToolchain;
pub use options::{GenericOption, OptLevel, Warnings};

/// A tool command variable, bound in the emitted build file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolVar {
    Cc,
    Cxx,
    Ar,
    Ld,
}

impl ToolVar {
    pub const ALL: [ToolVar; 4] = [ToolVar::Cc, ToolVar::Cxx, ToolVar::Ar, ToolVar::Ld];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolVar::Cc => "cc",
            ToolVar::Cxx => "cxx",
            ToolVar::Ar => "ar",
            ToolVar::Ld => "ld",
        }
    }
}

/// A per-edge flag variable referenced by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagVar {
    /// Compile-phase flags for one language
    Compile(Language),
    /// Link-phase options (everything except libraries)
    Ldflags,
    /// Libraries to link, placed after the inputs
    Ldlibs,
}

impl FlagVar {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagVar::Compile(lang) => lang.flags_var(),
            FlagVar::Ldflags => "ldflags",
            FlagVar::Ldlibs => "ldlibs",
        }
    }
}

/// One element of a rule's command template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Token {
    /// Fixed text written as-is
    Lit(String),
    Tool(ToolVar),
    Flags(FlagVar),
    /// All explicit inputs
    Inputs,
    /// The first output
    Output,
    /// The dependency file of the first output
    Depfile,
    /// A per-edge variable
    Var(&'static str),
    /// Tokens glued together without separators (`/Fo$out`)
    Join(Vec<Token>),
}

impl Token {
    fn lit(s: &str) -> Token {
        Token::Lit(s.to_string())
    }
}

/// How a rule reports header dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DepStyle {
    None,
    /// Makefile-syntax depfile next to the output
    Gcc,
    /// `/showIncludes` on stdout
    Msvc,
}

/// What a rule does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Compile(Language),
    Archive,
    /// Link an executable with the driver for a language
    LinkExecutable(Language),
    LinkShared(Language),
    /// Copy a file into an install directory
    Install { executable: bool },
    Symlink,
}

impl RuleKind {
    /// Stable rule name, shared by all toolchains.
    pub fn name(&self) -> String {
        match self {
            RuleKind::Compile(lang) => format!("{}_compile", lang.rule_prefix()),
            RuleKind::Archive => "archive".to_string(),
            RuleKind::LinkExecutable(lang) => format!("{}_link", lang.rule_prefix()),
            RuleKind::LinkShared(lang) => format!("{}_link_shared", lang.rule_prefix()),
            RuleKind::Install { executable: false } => "install_data".to_string(),
            RuleKind::Install { executable: true } => "install_program".to_string(),
            RuleKind::Symlink => "symlink".to_string(),
        }
    }
}

/// A command template with dependency-scanning information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub name: String,
    pub kind: RuleKind,
    pub command: Vec<Token>,
    pub deps: DepStyle,
    /// Short label shown while the rule runs (`CC`, `LINK`)
    pub label: String,
}

impl Rule {
    fn new(kind: RuleKind, label: &str, command: Vec<Token>) -> Self {
        Rule {
            name: kind.name(),
            kind,
            command,
            deps: DepStyle::None,
            label: label.to_string(),
        }
    }

    fn with_deps(mut self, deps: DepStyle) -> Self {
        self.deps = deps;
        self
    }

    /// Flag variables the command references, in order.
    pub fn flag_vars(&self) -> Vec<FlagVar> {
        fn walk(tokens: &[Token], out: &mut Vec<FlagVar>) {
            for token in tokens {
                match token {
                    Token::Flags(var) if !out.contains(var) => out.push(*var),
                    Token::Join(inner) => walk(inner, out),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.command, &mut out);
        out
    }
}

/// A piece of a command-line argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Piece {
    Text(String),
    Path(BuildPath),
}

/// One command-line argument, possibly gluing text to a path (`-Iinclude`).
///
/// Paths stay symbolic so each backend can render them relative to where
/// its build runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Arg(pub Vec<Piece>);

impl Arg {
    pub fn text(s: impl Into<String>) -> Arg {
        Arg(vec![Piece::Text(s.into())])
    }

    pub fn prefixed(prefix: impl Into<String>, path: &BuildPath) -> Arg {
        let prefix = prefix.into();
        if prefix.is_empty() {
            Arg(vec![Piece::Path(path.clone())])
        } else {
            Arg(vec![Piece::Text(prefix), Piece::Path(path.clone())])
        }
    }
}

/// File names of a shared library and its companions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedLibraryNames {
    /// The library file itself (`libfoo.so.1.2.3`, `foo.dll`)
    pub file: String,
    /// Import library written alongside a DLL
    pub import_library: Option<String>,
    /// Name recorded in the library for the runtime loader
    pub soname: Option<String>,
    /// Symlinks created next to the file, as (link name, link target)
    pub symlinks: Vec<(String, String)>,
    /// The name consumers link against
    pub link_name: String,
}

/// Rule table and flag dialect of one compiler/platform pair.
pub trait Toolchain: Send + Sync + fmt::Debug {
    fn id(&self) -> ToolchainId;

    fn platform(&self) -> Platform;

    /// The rule for an operation, or `UnsupportedToolchainOperation`.
    fn rule(&self, kind: RuleKind) -> Result<Rule, ToolchainError>;

    /// Flags for a generic option, tagged with the phase that consumes them.
    fn translate(&self, option: &GenericOption) -> Vec<(Phase, FlagValue)>;

    /// Render a typed flag as command-line arguments.
    fn render_flag(&self, flag: &FlagValue) -> Vec<Arg>;

    /// Object file name for a source path with its extension removed.
    fn object_name(&self, stem: &str) -> String;

    fn static_library_name(&self, name: &str) -> String;

    fn shared_library_names(&self, name: &str, version: Option<&str>, soversion: Option<&str>) -> SharedLibraryNames;

    fn executable_name(&self, name: &str) -> String;

    /// Compile flags required for objects that go into a shared library.
    fn shared_object_flags(&self) -> Vec<FlagValue>;

    /// Link flags a shared library needs for its own link step.
    fn shared_link_flags(
        &self,
        names: &SharedLibraryNames,
        import_library: Option<&BuildPath>,
        version: Option<&str>,
        soversion: Option<&str>,
    ) -> Vec<FlagValue>;

    /// Link flags letting an output find a shared library at run time.
    ///
    /// `rel_dir` is the library's directory relative to the output's.
    fn runtime_search_flags(&self, rel_dir: &str) -> Vec<FlagValue>;

    /// Link flags letting the linker find indirect shared dependencies.
    ///
    /// `dir` is relative to the build directory, which is where links run.
    fn link_search_flags(&self, dir: &str) -> Vec<FlagValue>;
}

/// Select the rule table for a toolchain on a platform.
pub fn for_id(id: ToolchainId, platform: Platform) -> Result<Arc<dyn Toolchain>, ToolchainError> {
    match id {
        ToolchainId::Gcc | ToolchainId::Clang => Ok(Arc::new(GccToolchain::new(id, platform))),
        ToolchainId::Msvc if platform == Platform::Windows => Ok(Arc::new(MsvcToolchain::new())),
        ToolchainId::Msvc => Err(ToolchainError::UnsupportedToolchainOperation {
            toolchain: id.to_string(),
            platform: platform.to_string(),
            operation: "target a non-Windows platform".to_string(),
        }),
    }
}

/// Rule shared by every toolchain for install steps.
fn install_rule(platform: Platform, executable: bool) -> Rule {
    let kind = RuleKind::Install { executable };
    let command = if platform.has_posix_shell() {
        let mode = if executable { "755" } else { "644" };
        vec![
            Token::lit("install"),
            Token::lit("-D"),
            Token::lit("-m"),
            Token::lit(mode),
            Token::Inputs,
            Token::Output,
        ]
    } else {
        vec![
            Token::lit("cmd"),
            Token::lit("/c"),
            Token::lit("copy"),
            Token::lit("/Y"),
            Token::Inputs,
            Token::Output,
        ]
    };
    Rule::new(kind, "INSTALL", command)
}

fn symlink_rule(toolchain: ToolchainId, platform: Platform) -> Result<Rule, ToolchainError> {
    if !platform.has_posix_shell() {
        return Err(ToolchainError::UnsupportedToolchainOperation {
            toolchain: toolchain.to_string(),
            platform: platform.to_string(),
            operation: "create symlinks".to_string(),
        });
    }
    Ok(Rule::new(
        RuleKind::Symlink,
        "SYMLINK",
        vec![Token::lit("ln"), Token::lit("-sf"), Token::Var("target"), Token::Output],
    ))
}
