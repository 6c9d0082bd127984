//! Typed flag records.
//!
//! Flags are never concatenated as strings while the graph is built. Each
//! flag records where it came from and which phase consumes it; backends
//! translate them to compiler syntax through the toolchain at emission time.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::path::BuildPath;

/// Which step consumes a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Compile,
    Link,
}

/// Where a flag came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "name")]
pub enum FlagOrigin {
    /// Environment-wide options
    Global,
    /// Added by the toolchain for the output kind (`-fPIC`, `-Wl,-soname`)
    Toolchain,
    /// Declared on the target that owns the edge
    Target(String),
    /// Resolved from an external package
    Package(String),
    /// Forwarded from a static library dependency
    Dependency(String),
}

impl fmt::Display for FlagOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagOrigin::Global => write!(f, "global"),
            FlagOrigin::Toolchain => write!(f, "toolchain"),
            FlagOrigin::Target(name) => write!(f, "target `{}`", name),
            FlagOrigin::Package(name) => write!(f, "package `{}`", name),
            FlagOrigin::Dependency(name) => write!(f, "dependency `{}`", name),
        }
    }
}

/// A single flag, independent of compiler syntax.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum FlagValue {
    /// Header search directory
    IncludeDir { path: BuildPath },
    /// Preprocessor definition
    Define { name: String, value: Option<String> },
    /// Library search directory
    LibDir { path: BuildPath },
    /// Library to link by name (`-lfoo`, `foo.lib`)
    Library { name: String },
    /// A compiler- or linker-specific argument passed through unchanged
    Arg { value: String },
    /// An argument with a path glued to a prefix (`-Wl,-rpath-link,<dir>`)
    PathArg { prefix: String, path: BuildPath },
    /// A static archive linked with every member, referenced or not
    WholeArchive { path: BuildPath },
}

impl FlagValue {
    pub fn arg(value: impl Into<String>) -> Self {
        FlagValue::Arg {
            value: value.into(),
        }
    }

    pub fn library(name: impl Into<String>) -> Self {
        FlagValue::Library { name: name.into() }
    }

    pub fn define(name: impl Into<String>, value: Option<String>) -> Self {
        FlagValue::Define {
            name: name.into(),
            value,
        }
    }

    /// Whether this flag names a library to link (as opposed to a linker option).
    pub fn is_library(&self) -> bool {
        matches!(self, FlagValue::Library { .. })
    }
}

/// A flag with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Flag {
    pub origin: FlagOrigin,
    pub phase: Phase,
    pub value: FlagValue,
}

impl Flag {
    pub fn compile(origin: FlagOrigin, value: FlagValue) -> Self {
        Flag {
            origin,
            phase: Phase::Compile,
            value,
        }
    }

    pub fn link(origin: FlagOrigin, value: FlagValue) -> Self {
        Flag {
            origin,
            phase: Phase::Link,
            value,
        }
    }
}

/// An ordered list of flags.
///
/// Order is declaration order. Duplicates are kept: flag semantics can be
/// order-sensitive and a repeated `-l` may be load-bearing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagList(Vec<Flag>);

impl FlagList {
    pub fn new() -> Self {
        FlagList(Vec::new())
    }

    pub fn push(&mut self, flag: Flag) {
        self.0.push(flag);
    }

    /// Append flags after the existing ones.
    ///
    /// This is the only way flag sources are combined.
    pub fn merge(&mut self, flags: impl IntoIterator<Item = Flag>) {
        self.0.extend(flags);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.0.iter()
    }

    /// Flags consumed by one phase, in order.
    pub fn phase(&self, phase: Phase) -> impl Iterator<Item = &Flag> {
        self.0.iter().filter(move |f| f.phase == phase)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Flag> for FlagList {
    fn from_iter<I: IntoIterator<Item = Flag>>(iter: I) -> Self {
        FlagList(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FlagList {
    type Item = &'a Flag;
    type IntoIter = std::slice::Iter<'a, Flag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
