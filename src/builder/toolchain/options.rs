//! Generic, toolchain-independent options.
//!
//! Options are parsed once, when the description is evaluated, so that an
//! unknown name fails the run instead of being dropped. Each toolchain maps
//! the parsed value to its own flags.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::ToolchainError;

/// Warning level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Warnings {
    None,
    Default,
    All,
    Extra,
}

/// Optimization level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptLevel {
    O0,
    O1,
    O2,
    O3,
    Size,
    Speed,
}

/// An option understood by every toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GenericOption {
    /// `warnings-as-errors`
    WarningsAsErrors,
    /// `warnings=<none|default|all|extra>`
    Warnings(Warnings),
    /// `optimize=<0|1|2|3|s|size|speed>`
    Optimize(OptLevel),
    /// `debug`
    Debug,
    /// `pic`
    Pic,
    /// `pthread`
    Pthread,
    /// `std=<value>`, e.g. `std=c++17`
    Std(String),
    /// `define=NAME[=VALUE]`
    Define { name: String, value: Option<String> },
}

/// Names accepted by [`GenericOption::from_str`].
pub const OPTION_NAMES: &[&str] = &[
    "warnings-as-errors",
    "warnings",
    "optimize",
    "debug",
    "pic",
    "pthread",
    "std",
    "define",
];

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

static STD_VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9+:_.-]+$").unwrap());

fn invalid(option: &str, value: &str, expected: &str) -> ToolchainError {
    ToolchainError::InvalidOptionValue {
        option: option.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

impl FromStr for GenericOption {
    type Err = ToolchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, value) = match s.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (s, None),
        };

        match (name, value) {
            ("warnings-as-errors", None) => Ok(GenericOption::WarningsAsErrors),
            ("debug", None) => Ok(GenericOption::Debug),
            ("pic", None) => Ok(GenericOption::Pic),
            ("pthread", None) => Ok(GenericOption::Pthread),
            ("warnings-as-errors" | "debug" | "pic" | "pthread", Some(v)) => {
                Err(invalid(name, v, "no value"))
            }

            ("warnings", Some(v)) => match v {
                "none" => Ok(GenericOption::Warnings(Warnings::None)),
                "default" => Ok(GenericOption::Warnings(Warnings::Default)),
                "all" => Ok(GenericOption::Warnings(Warnings::All)),
                "extra" => Ok(GenericOption::Warnings(Warnings::Extra)),
                _ => Err(invalid(name, v, "one of none, default, all, extra")),
            },

            ("optimize", Some(v)) => match v {
                "0" => Ok(GenericOption::Optimize(OptLevel::O0)),
                "1" => Ok(GenericOption::Optimize(OptLevel::O1)),
                "2" => Ok(GenericOption::Optimize(OptLevel::O2)),
                "3" => Ok(GenericOption::Optimize(OptLevel::O3)),
                "s" | "size" => Ok(GenericOption::Optimize(OptLevel::Size)),
                "speed" => Ok(GenericOption::Optimize(OptLevel::Speed)),
                _ => Err(invalid(name, v, "one of 0, 1, 2, 3, s, size, speed")),
            },

            ("std", Some(v)) if STD_VALUE.is_match(v) => Ok(GenericOption::Std(v.to_string())),
            ("std", Some(v)) => Err(invalid(name, v, "a language standard such as c11 or c++17")),

            ("define", Some(v)) => {
                let (key, val) = match v.split_once('=') {
                    Some((k, val)) => (k, Some(val.to_string())),
                    None => (v, None),
                };
                if !IDENTIFIER.is_match(key) {
                    return Err(invalid(name, v, "NAME or NAME=VALUE"));
                }
                Ok(GenericOption::Define {
                    name: key.to_string(),
                    value: val,
                })
            }

            ("warnings" | "optimize" | "std" | "define", None) => {
                Err(invalid(name, "", "a value after `=`"))
            }

            _ => Err(ToolchainError::UnknownOption {
                option: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for GenericOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenericOption::WarningsAsErrors => f.write_str("warnings-as-errors"),
            GenericOption::Warnings(w) => {
                let v = match w {
                    Warnings::None => "none",
                    Warnings::Default => "default",
                    Warnings::All => "all",
                    Warnings::Extra => "extra",
                };
                write!(f, "warnings={}", v)
            }
            GenericOption::Optimize(level) => {
                let v = match level {
                    OptLevel::O0 => "0",
                    OptLevel::O1 => "1",
                    OptLevel::O2 => "2",
                    OptLevel::O3 => "3",
                    OptLevel::Size => "size",
                    OptLevel::Speed => "speed",
                };
                write!(f, "optimize={}", v)
            }
            GenericOption::Debug => f.write_str("debug"),
            GenericOption::Pic => f.write_str("pic"),
            GenericOption::Pthread => f.write_str("pthread"),
            GenericOption::Std(v) => write!(f, "std={}", v),
            GenericOption::Define { name, value: None } => write!(f, "define={}", name),
            GenericOption::Define {
                name,
                value: Some(value),
            } => write!(f, "define={}={}", name, value),
        }
    }
}
