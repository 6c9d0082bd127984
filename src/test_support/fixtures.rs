//! Test fixtures for common scenarios.
//!
//! Descriptions are built through the builder API; project fixtures write a
//! `Drydock.toml` and its sources to a real directory for manifest and
//! generation tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use std::sync::Arc;

use super::FakeQuery;
use crate::builder::compiler::GraphCompiler;
use crate::builder::graph::CompiledGraph;
use crate::core::description::{Description, Executable, Library, PkgConfig};
use crate::core::environment::{Environment, Platform, ToolchainId};
use crate::core::package::PackageRequest;
use crate::resolver::PackageResolver;

/// A query that knows `ogg`, with an include dir, a lib dir and a library.
pub fn ogg_query() -> FakeQuery {
    FakeQuery::new().with_package("ogg", "1.3.5", "-I/usr/include/ogg", "-L/usr/lib/ogg -logg")
}

/// `inner` links `ogg`; `hello` links `inner`. Both libraries are static
/// unless the environment says otherwise.
pub fn hello_inner() -> Description {
    let mut desc = Description::new("hello").with_version("1.0");
    let ogg = desc.package(PackageRequest::new("ogg"));
    desc.library(Library::new("inner").sources(["inner.cpp"]).packages([ogg]))
        .unwrap();
    desc.library(Library::new("hello").sources(["hello.cpp"]).libs(["inner"]))
        .unwrap();
    desc
}

/// [`hello_inner`] plus an executable `app` linking `hello`.
pub fn hello_app() -> Description {
    let mut desc = hello_inner();
    desc.executable(Executable::new("app").sources(["main.c"]).libs(["hello"]))
        .unwrap();
    desc
}

/// The full `hello` project in C, as backends see it: a public header,
/// `inner` (with the header and `ogg`), `hello` linking `inner`, `app`
/// linking `hello`, a `hello.pc` export and an install list.
pub fn hello_project() -> Description {
    let mut desc = Description::new("hello").with_version("1.0");
    let ogg = desc.package(PackageRequest::new("ogg"));
    desc.header_file("include/hello.h").unwrap();
    desc.library(
        Library::new("inner")
            .sources(["src/inner.c"])
            .headers(["include/hello.h"])
            .include_dirs(["include"])
            .packages([ogg]),
    )
    .unwrap();
    desc.library(Library::new("hello").sources(["src/hello.c"]).libs(["inner"]))
        .unwrap();
    desc.executable(Executable::new("app").sources(["src/main.c"]).libs(["hello"]))
        .unwrap();
    desc.pkg_config(PkgConfig::new("hello")).unwrap();
    desc.install(["app", "hello", "include/hello.h"]);
    desc
}

/// An environment rooted at `/proj`, building in `/proj/build`.
pub fn project_env(platform: Platform, toolchain: ToolchainId) -> Environment {
    Environment::new(platform, toolchain)
        .unwrap()
        .with_srcdir("/proj")
        .with_builddir("/proj/build")
}

/// [`project_env`] for Linux and gcc.
pub fn linux_env() -> Environment {
    project_env(Platform::Linux, ToolchainId::Gcc)
}

/// [`hello_project`] compiled for `env`, with `ogg` from [`ogg_query`].
pub fn hello_graph(env: &Environment) -> CompiledGraph {
    let resolver = PackageResolver::new(Arc::new(ogg_query()));
    GraphCompiler::new(env, &resolver)
        .compile(&hello_project())
        .unwrap()
}

/// A project directory: a manifest plus files.
#[derive(Debug, Clone)]
pub struct ProjectFixture {
    pub name: String,
    /// Drydock.toml content
    pub manifest: String,
    /// Files by path relative to the project root
    pub files: BTreeMap<PathBuf, String>,
}

impl ProjectFixture {
    pub fn new(name: impl Into<String>) -> Self {
        ProjectFixture {
            name: name.into(),
            manifest: String::new(),
            files: BTreeMap::new(),
        }
    }

    /// The `hello`/`inner`/`app` project, as a manifest.
    pub fn hello() -> Self {
        ProjectFixture::new("hello")
            .with_manifest(manifests::HELLO)
            .with_file("src/inner.cpp", "int inner() { return 1; }\n")
            .with_file("src/hello.cpp", "int inner();\nint hello() { return inner(); }\n")
            .with_file("src/main.c", "int hello(void);\nint main(void) { return hello(); }\n")
            .with_file("include/hello.h", "int hello(void);\n")
    }

    pub fn with_manifest(mut self, manifest: impl Into<String>) -> Self {
        self.manifest = manifest.into();
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Write the project under `base`, returning its root.
    pub fn write_to(&self, base: &Path) -> std::io::Result<PathBuf> {
        let root = base.join(&self.name);
        std::fs::create_dir_all(&root)?;
        std::fs::write(root.join("Drydock.toml"), &self.manifest)?;

        for (rel, content) in &self.files {
            let path = root.join(rel);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, content)?;
        }

        Ok(root)
    }
}

/// Manifest templates.
pub mod manifests {
    pub const HELLO: &str = r#"[project]
name = "hello"
version = "1.0"

[[package]]
name = "ogg"

[[header]]
path = "include/hello.h"

[[library]]
name = "inner"
sources = ["src/inner.cpp"]
packages = ["ogg"]

[[library]]
name = "hello"
sources = ["src/hello.cpp"]
include_dirs = ["include"]
libs = ["inner"]

[[executable]]
name = "app"
sources = ["src/main.c"]
libs = ["hello"]

[[pkg_config]]
name = "hello"

[install]
targets = ["app", "hello", "include/hello.h"]
"#;

    /// A single C library with the given extra TOML appended to it.
    pub fn library(name: &str, extra: &str) -> String {
        format!(
            r#"[project]
name = "{name}"

[[library]]
name = "{name}"
sources = ["src/*.c"]
{extra}"#
        )
    }
}
