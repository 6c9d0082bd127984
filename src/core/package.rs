//! External packages.
//!
//! A [`PackageRequest`] is what a description asks for; a [`Package`] is
//! the immutable result of resolving it, with flags already partitioned into
//! compile-time and link-time buckets.

use semver::VersionReq;
use serde::{Deserialize, Serialize};

use crate::core::flags::{Flag, FlagOrigin, FlagValue};
use crate::core::path::BuildPath;
use crate::resolver::ResolutionError;

/// Which flavor of a package's libraries to link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    #[default]
    Any,
    Static,
    Shared,
}

impl PackageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageKind::Any => "any",
            PackageKind::Static => "static",
            PackageKind::Shared => "shared",
        }
    }
}

/// How a package is found.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "method")]
pub enum Discovery {
    /// Ask the package query tool (pkg-config).
    #[default]
    Query,
    /// Use declared directories and libraries as-is.
    Manual {
        include_dirs: Vec<String>,
        lib_dirs: Vec<String>,
        libs: Vec<String>,
        /// Version the package is known to be, checked against requirements
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
    },
}

/// A request to resolve a named package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRequest {
    pub name: String,
    pub kind: PackageKind,
    pub version: Option<VersionReq>,
    pub discovery: Discovery,
}

impl PackageRequest {
    /// Request a package through the query tool.
    pub fn new(name: impl Into<String>) -> Self {
        PackageRequest {
            name: name.into(),
            kind: PackageKind::Any,
            version: None,
            discovery: Discovery::Query,
        }
    }

    /// Request a specific library flavor.
    pub fn kind(mut self, kind: PackageKind) -> Self {
        self.kind = kind;
        self
    }

    /// Require a version.
    pub fn version(mut self, req: VersionReq) -> Self {
        self.version = Some(req);
        self
    }

    /// Describe the package manually instead of querying for it.
    pub fn manual(
        mut self,
        include_dirs: Vec<String>,
        lib_dirs: Vec<String>,
        libs: Vec<String>,
    ) -> Self {
        self.discovery = Discovery::Manual {
            include_dirs,
            lib_dirs,
            libs,
            version: None,
        };
        self
    }

    /// Declare the version of a manually described package. Queried
    /// packages report their own version, so this is ignored for them.
    pub fn provides(mut self, provided: impl Into<String>) -> Self {
        if let Discovery::Manual { version, .. } = &mut self.discovery {
            *version = Some(provided.into());
        }
        self
    }
}

/// A resolved package. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: Option<String>,
    /// Include paths, defines and other compile flags
    pub compile: Vec<FlagValue>,
    /// Library paths, libraries and other link flags
    pub link: Vec<FlagValue>,
}

impl Package {
    /// Build a package from pkg-config style `--cflags` and `--libs` words.
    pub fn from_words(
        name: &str,
        version: Option<String>,
        cflags: &[String],
        libs: &[String],
    ) -> Result<Package, ResolutionError> {
        Ok(Package {
            name: name.to_string(),
            version,
            compile: partition(name, cflags, Bucket::Compile)?,
            link: partition(name, libs, Bucket::Link)?,
        })
    }

    /// Build a package from manually declared attributes.
    pub fn manual(
        name: &str,
        version: Option<&str>,
        include_dirs: &[String],
        lib_dirs: &[String],
        libs: &[String],
    ) -> Result<Package, ResolutionError> {
        let mut compile = Vec::new();
        for dir in include_dirs {
            compile.push(FlagValue::IncludeDir {
                path: external(name, dir)?,
            });
        }

        let mut link = Vec::new();
        for dir in lib_dirs {
            link.push(FlagValue::LibDir {
                path: external(name, dir)?,
            });
        }
        link.extend(libs.iter().map(FlagValue::library));

        Ok(Package {
            name: name.to_string(),
            version: version.map(str::to_string),
            compile,
            link,
        })
    }

    /// Compile-time flags, tagged with this package as origin.
    pub fn compile_flags(&self) -> impl Iterator<Item = Flag> + '_ {
        self.compile
            .iter()
            .map(|v| Flag::compile(FlagOrigin::Package(self.name.clone()), v.clone()))
    }

    /// Link-time flags, tagged with this package as origin.
    pub fn link_flags(&self) -> impl Iterator<Item = Flag> + '_ {
        self.link
            .iter()
            .map(|v| Flag::link(FlagOrigin::Package(self.name.clone()), v.clone()))
    }
}

#[derive(Clone, Copy)]
enum Bucket {
    Compile,
    Link,
}

/// Sort words into typed flags. Unrecognized words pass through as
/// arguments, in order.
fn partition(name: &str, words: &[String], bucket: Bucket) -> Result<Vec<FlagValue>, ResolutionError> {
    let mut values = Vec::new();
    let mut iter = words.iter();

    while let Some(word) = iter.next() {
        let (flag, rest) = match word.get(..2) {
            Some(prefix) => (prefix, &word[2..]),
            None => {
                values.push(FlagValue::arg(word.clone()));
                continue;
            }
        };

        let known = match bucket {
            Bucket::Compile => matches!(flag, "-I" | "-D"),
            Bucket::Link => matches!(flag, "-L" | "-l"),
        };
        if !known {
            values.push(FlagValue::arg(word.clone()));
            continue;
        }

        // `-I dir` is as valid as `-Idir`.
        let operand = if rest.is_empty() {
            match iter.next() {
                Some(next) => next.as_str(),
                None => {
                    return Err(ResolutionError::PackageQueryError {
                        package: name.to_string(),
                        message: format!("`{}` is missing its argument", flag),
                    })
                }
            }
        } else {
            rest
        };

        values.push(match flag {
            "-I" => FlagValue::IncludeDir {
                path: external(name, operand)?,
            },
            "-L" => FlagValue::LibDir {
                path: external(name, operand)?,
            },
            "-l" => FlagValue::library(operand),
            _ => match operand.split_once('=') {
                Some((key, value)) => FlagValue::define(key, Some(value.to_string())),
                None => FlagValue::define(operand, None),
            },
        });
    }

    Ok(values)
}

fn external(name: &str, dir: &str) -> Result<BuildPath, ResolutionError> {
    BuildPath::external(dir).map_err(|e| ResolutionError::PackageQueryError {
        package: name.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_partition_pkg_config_output() {
        let pkg = Package::from_words(
            "ogg",
            Some("1.3.5".into()),
            &words("-I/usr/include/ogg -DOGG_STATIC -pthread -D FOO=1"),
            &words("-L/usr/lib -logg -Wl,--as-needed -l m"),
        )
        .unwrap();

        assert_eq!(
            pkg.compile,
            vec![
                FlagValue::IncludeDir {
                    path: BuildPath::external("/usr/include/ogg").unwrap()
                },
                FlagValue::define("OGG_STATIC", None),
                FlagValue::arg("-pthread"),
                FlagValue::define("FOO", Some("1".into())),
            ]
        );
        assert_eq!(
            pkg.link,
            vec![
                FlagValue::LibDir {
                    path: BuildPath::external("/usr/lib").unwrap()
                },
                FlagValue::library("ogg"),
                FlagValue::arg("-Wl,--as-needed"),
                FlagValue::library("m"),
            ]
        );
    }

    #[test]
    fn test_dangling_flag_is_malformed() {
        let err = Package::from_words("x", None, &words("-I"), &[]).unwrap_err();
        assert!(matches!(err, ResolutionError::PackageQueryError { .. }));
    }

    #[test]
    fn test_flags_carry_package_origin() {
        let pkg = Package::manual("z", None, &["/opt/z/include".into()], &[], &["z".into()]).unwrap();
        let compile: Vec<_> = pkg.compile_flags().collect();
        assert_eq!(compile.len(), 1);
        assert_eq!(compile[0].origin, FlagOrigin::Package("z".into()));
        let link: Vec<_> = pkg.link_flags().collect();
        assert_eq!(link[0].value, FlagValue::library("z"));
    }
}
