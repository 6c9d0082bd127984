//! The project description builder API.
//!
//! A [`Description`] is a sequence of strongly typed declarations. Each call
//! returns an opaque handle; dependencies may be given as handles or as
//! names of targets declared later. Platform conditionals are resolved by
//! the caller before a declaration is added, so nothing here branches on
//! the environment.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::package::PackageRequest;
use crate::errors::ConfigurationError;

/// Static or shared library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
    Static,
    Shared,
}

impl LibraryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LibraryKind::Static => "static",
            LibraryKind::Shared => "shared",
        }
    }
}

/// Opaque handle to a declared target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetHandle(usize);

impl TargetHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Opaque handle to a declared package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageHandle(usize);

impl PackageHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A reference to a target, by handle or by (possibly forward) name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetRef {
    Handle(TargetHandle),
    Name(String),
}

impl From<TargetHandle> for TargetRef {
    fn from(h: TargetHandle) -> Self {
        TargetRef::Handle(h)
    }
}

impl From<&str> for TargetRef {
    fn from(s: &str) -> Self {
        TargetRef::Name(s.to_string())
    }
}

impl From<String> for TargetRef {
    fn from(s: String) -> Self {
        TargetRef::Name(s)
    }
}

/// A reference to a package, by handle or by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PackageRef {
    Handle(PackageHandle),
    Name(String),
}

impl From<PackageHandle> for PackageRef {
    fn from(h: PackageHandle) -> Self {
        PackageRef::Handle(h)
    }
}

impl From<&str> for PackageRef {
    fn from(s: &str) -> Self {
        PackageRef::Name(s.to_string())
    }
}

impl From<String> for PackageRef {
    fn from(s: String) -> Self {
        PackageRef::Name(s)
    }
}

/// A library declaration.
#[derive(Debug, Clone, Default)]
pub struct Library {
    pub name: String,
    /// `None` uses the environment's default library kind
    pub kind: Option<LibraryKind>,
    pub sources: Vec<String>,
    /// Headers every compile step depends on
    pub headers: Vec<String>,
    pub include_dirs: Vec<String>,
    pub libs: Vec<TargetRef>,
    /// Static libraries from `libs` linked with every member
    pub whole_archive: Vec<TargetRef>,
    pub packages: Vec<PackageRef>,
    /// Generic, toolchain-independent options (`optimize=2`, `pic`)
    pub options: Vec<String>,
    pub compile_options: Vec<String>,
    pub link_options: Vec<String>,
    /// Full version of a shared library (`1.2.3`)
    pub version: Option<String>,
    /// ABI version embedded in the soname (`1`)
    pub soversion: Option<String>,
}

impl Library {
    pub fn new(name: impl Into<String>) -> Self {
        Library {
            name: name.into(),
            ..Library::default()
        }
    }

    pub fn kind(mut self, kind: LibraryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn sources<S: Into<String>>(mut self, sources: impl IntoIterator<Item = S>) -> Self {
        self.sources.extend(sources.into_iter().map(Into::into));
        self
    }

    pub fn headers<S: Into<String>>(mut self, headers: impl IntoIterator<Item = S>) -> Self {
        self.headers.extend(headers.into_iter().map(Into::into));
        self
    }

    pub fn include_dirs<S: Into<String>>(mut self, dirs: impl IntoIterator<Item = S>) -> Self {
        self.include_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    pub fn libs<R: Into<TargetRef>>(mut self, libs: impl IntoIterator<Item = R>) -> Self {
        self.libs.extend(libs.into_iter().map(Into::into));
        self
    }

    /// Link static libraries whole, keeping members nothing references
    /// (self-registering plugins, for instance).
    pub fn whole_archive<R: Into<TargetRef>>(mut self, libs: impl IntoIterator<Item = R>) -> Self {
        for lib in libs {
            let lib = lib.into();
            self.libs.push(lib.clone());
            self.whole_archive.push(lib);
        }
        self
    }

    pub fn packages<R: Into<PackageRef>>(mut self, packages: impl IntoIterator<Item = R>) -> Self {
        self.packages.extend(packages.into_iter().map(Into::into));
        self
    }

    pub fn options<S: Into<String>>(mut self, options: impl IntoIterator<Item = S>) -> Self {
        self.options.extend(options.into_iter().map(Into::into));
        self
    }

    pub fn compile_options<S: Into<String>>(mut self, options: impl IntoIterator<Item = S>) -> Self {
        self.compile_options.extend(options.into_iter().map(Into::into));
        self
    }

    pub fn link_options<S: Into<String>>(mut self, options: impl IntoIterator<Item = S>) -> Self {
        self.link_options.extend(options.into_iter().map(Into::into));
        self
    }

    pub fn version(mut self, version: impl Into<String>, soversion: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self.soversion = Some(soversion.into());
        self
    }
}

/// An executable declaration.
#[derive(Debug, Clone, Default)]
pub struct Executable {
    pub name: String,
    pub sources: Vec<String>,
    pub headers: Vec<String>,
    pub include_dirs: Vec<String>,
    pub libs: Vec<TargetRef>,
    /// Static libraries from `libs` linked with every member
    pub whole_archive: Vec<TargetRef>,
    pub packages: Vec<PackageRef>,
    pub options: Vec<String>,
    pub compile_options: Vec<String>,
    pub link_options: Vec<String>,
}

impl Executable {
    pub fn new(name: impl Into<String>) -> Self {
        Executable {
            name: name.into(),
            ..Executable::default()
        }
    }

    pub fn sources<S: Into<String>>(mut self, sources: impl IntoIterator<Item = S>) -> Self {
        self.sources.extend(sources.into_iter().map(Into::into));
        self
    }

    pub fn headers<S: Into<String>>(mut self, headers: impl IntoIterator<Item = S>) -> Self {
        self.headers.extend(headers.into_iter().map(Into::into));
        self
    }

    pub fn include_dirs<S: Into<String>>(mut self, dirs: impl IntoIterator<Item = S>) -> Self {
        self.include_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    pub fn libs<R: Into<TargetRef>>(mut self, libs: impl IntoIterator<Item = R>) -> Self {
        self.libs.extend(libs.into_iter().map(Into::into));
        self
    }

    /// Link static libraries whole, keeping members nothing references
    /// (self-registering plugins, for instance).
    pub fn whole_archive<R: Into<TargetRef>>(mut self, libs: impl IntoIterator<Item = R>) -> Self {
        for lib in libs {
            let lib = lib.into();
            self.libs.push(lib.clone());
            self.whole_archive.push(lib);
        }
        self
    }

    pub fn packages<R: Into<PackageRef>>(mut self, packages: impl IntoIterator<Item = R>) -> Self {
        self.packages.extend(packages.into_iter().map(Into::into));
        self
    }

    pub fn options<S: Into<String>>(mut self, options: impl IntoIterator<Item = S>) -> Self {
        self.options.extend(options.into_iter().map(Into::into));
        self
    }

    pub fn compile_options<S: Into<String>>(mut self, options: impl IntoIterator<Item = S>) -> Self {
        self.compile_options.extend(options.into_iter().map(Into::into));
        self
    }

    pub fn link_options<S: Into<String>>(mut self, options: impl IntoIterator<Item = S>) -> Self {
        self.link_options.extend(options.into_iter().map(Into::into));
        self
    }
}

/// A pkg-config descriptor export.
#[derive(Debug, Clone)]
pub struct PkgConfig {
    /// Name of the `.pc` file, without extension
    pub name: String,
    /// Library to export; defaults to the library named `name`
    pub library: Option<TargetRef>,
    pub description: Option<String>,
    pub version: Option<String>,
    /// Extra `Requires:` entries
    pub requires: Vec<String>,
    /// Install the descriptor into `libdir/pkgconfig`
    pub install: bool,
}

impl PkgConfig {
    pub fn new(name: impl Into<String>) -> Self {
        PkgConfig {
            name: name.into(),
            library: None,
            description: None,
            version: None,
            requires: Vec::new(),
            install: true,
        }
    }

    pub fn library(mut self, library: impl Into<TargetRef>) -> Self {
        self.library = Some(library.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn requires<S: Into<String>>(mut self, requires: impl IntoIterator<Item = S>) -> Self {
        self.requires.extend(requires.into_iter().map(Into::into));
        self
    }

    /// Name of the target this export declares.
    pub fn target_name(&self) -> String {
        format!("{}.pc", self.name)
    }
}

/// One declared target.
#[derive(Debug, Clone)]
pub enum TargetDecl {
    /// A single installable header, named by its path
    Header { path: String },
    Library(Library),
    Executable(Executable),
    PackageExport(PkgConfig),
}

impl TargetDecl {
    pub fn name(&self) -> String {
        match self {
            TargetDecl::Header { path } => path.clone(),
            TargetDecl::Library(lib) => lib.name.clone(),
            TargetDecl::Executable(exe) => exe.name.clone(),
            TargetDecl::PackageExport(pc) => pc.target_name(),
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            TargetDecl::Header { .. } => "header",
            TargetDecl::Library(_) => "library",
            TargetDecl::Executable(_) => "executable",
            TargetDecl::PackageExport(_) => "pkg_config",
        }
    }
}

/// Name and version of the described project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    pub version: Option<String>,
}

/// A project description: declarations in order.
#[derive(Debug, Clone)]
pub struct Description {
    project: ProjectInfo,
    packages: Vec<PackageRequest>,
    targets: Vec<TargetDecl>,
    installs: Vec<TargetRef>,
    names: HashMap<String, TargetHandle>,
}

impl Description {
    pub fn new(name: impl Into<String>) -> Self {
        Description {
            project: ProjectInfo {
                name: name.into(),
                version: None,
            },
            packages: Vec::new(),
            targets: Vec::new(),
            installs: Vec::new(),
            names: HashMap::new(),
        }
    }

    /// Set the project version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.project.version = Some(version.into());
        self
    }

    /// Declare an external package.
    pub fn package(&mut self, request: PackageRequest) -> PackageHandle {
        self.packages.push(request);
        PackageHandle(self.packages.len() - 1)
    }

    /// Declare an installable header.
    pub fn header_file(&mut self, path: impl Into<String>) -> Result<TargetHandle, ConfigurationError> {
        self.add(TargetDecl::Header { path: path.into() })
    }

    /// Declare a library.
    pub fn library(&mut self, library: Library) -> Result<TargetHandle, ConfigurationError> {
        self.add(TargetDecl::Library(library))
    }

    /// Declare an executable.
    pub fn executable(&mut self, executable: Executable) -> Result<TargetHandle, ConfigurationError> {
        self.add(TargetDecl::Executable(executable))
    }

    /// Declare a pkg-config export.
    pub fn pkg_config(&mut self, pkg_config: PkgConfig) -> Result<TargetHandle, ConfigurationError> {
        self.add(TargetDecl::PackageExport(pkg_config))
    }

    /// Mark targets for installation.
    pub fn install<R: Into<TargetRef>>(&mut self, targets: impl IntoIterator<Item = R>) {
        self.installs.extend(targets.into_iter().map(Into::into));
    }

    fn add(&mut self, decl: TargetDecl) -> Result<TargetHandle, ConfigurationError> {
        let name = decl.name();
        if self.names.contains_key(&name) {
            return Err(ConfigurationError::DuplicateTarget { name });
        }
        let handle = TargetHandle(self.targets.len());
        self.names.insert(name, handle);
        self.targets.push(decl);
        Ok(handle)
    }

    pub fn project(&self) -> &ProjectInfo {
        &self.project
    }

    pub fn targets(&self) -> &[TargetDecl] {
        &self.targets
    }

    pub fn packages(&self) -> &[PackageRequest] {
        &self.packages
    }

    pub fn installs(&self) -> &[TargetRef] {
        &self.installs
    }

    pub fn target(&self, handle: TargetHandle) -> Option<&TargetDecl> {
        self.targets.get(handle.0)
    }

    /// Resolve a target reference to a handle.
    pub fn lookup(&self, target: &TargetRef, from: &str) -> Result<TargetHandle, ConfigurationError> {
        match target {
            TargetRef::Handle(h) if h.0 < self.targets.len() => Ok(*h),
            TargetRef::Handle(h) => Err(ConfigurationError::UnknownTarget {
                name: format!("#{}", h.0),
                from: from.to_string(),
            }),
            TargetRef::Name(name) => {
                self.names
                    .get(name)
                    .copied()
                    .ok_or_else(|| ConfigurationError::UnknownTarget {
                        name: name.clone(),
                        from: from.to_string(),
                    })
            }
        }
    }

    /// Resolve a package reference to its request.
    pub fn lookup_package(&self, package: &PackageRef, from: &str) -> Result<&PackageRequest, ConfigurationError> {
        let found = match package {
            PackageRef::Handle(h) => self.packages.get(h.0),
            PackageRef::Name(name) => self.packages.iter().find(|p| &p.name == name),
        };
        found.ok_or_else(|| ConfigurationError::UnknownPackage {
            name: match package {
                PackageRef::Handle(h) => format!("#{}", h.0),
                PackageRef::Name(name) => name.clone(),
            },
            from: from.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_and_forward_names() {
        let mut desc = Description::new("demo");
        let ogg = desc.package(PackageRequest::new("ogg"));
        let hello = desc
            .library(Library::new("hello").sources(["hello.cpp"]).libs(["inner"]))
            .unwrap();
        let inner = desc
            .library(Library::new("inner").sources(["inner.cpp"]).packages([ogg]))
            .unwrap();

        assert_eq!(desc.lookup(&"inner".into(), "hello").unwrap(), inner);
        assert_eq!(desc.lookup(&hello.into(), "x").unwrap(), hello);
        assert_eq!(desc.lookup_package(&ogg.into(), "inner").unwrap().name, "ogg");
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let mut desc = Description::new("demo");
        desc.library(Library::new("a").sources(["a.c"])).unwrap();
        let err = desc.executable(Executable::new("a").sources(["main.c"])).unwrap_err();
        assert_eq!(err, ConfigurationError::DuplicateTarget { name: "a".into() });
    }

    #[test]
    fn test_unknown_references() {
        let desc = Description::new("demo");
        assert!(matches!(
            desc.lookup(&"ghost".into(), "app"),
            Err(ConfigurationError::UnknownTarget { .. })
        ));
        assert!(matches!(
            desc.lookup_package(&"ghost".into(), "app"),
            Err(ConfigurationError::UnknownPackage { .. })
        ));
    }

    #[test]
    fn test_pkg_config_target_name() {
        let mut desc = Description::new("demo");
        desc.library(Library::new("hello").sources(["hello.c"])).unwrap();
        let pc = desc.pkg_config(PkgConfig::new("hello")).unwrap();
        assert_eq!(desc.target(pc).unwrap().name(), "hello.pc");
    }
}
