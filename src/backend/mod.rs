//! Backend emitters.
//!
//! A backend serializes a [`CompiledGraph`] into the native input of a
//! build tool. Rendering is pure: every backend produces its files in
//! memory and reports unsupported graph features before anything touches
//! the disk. Only when all requested backends have rendered successfully
//! are files written, each one atomically.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::builder::graph::{CompiledGraph, EdgePhase, FileId, Recipe};
use crate::builder::toolchain::Toolchain;
use crate::core::environment::Environment;
use crate::core::path::{BuildPath, InstallRoot, Root};
use crate::errors::EmissionError;
use crate::util::fs::to_slash;

pub mod command;
pub mod compdb;
pub mod make;
pub mod msbuild;
pub mod ninja;
pub mod writer;

pub use command::Shell;
pub use writer::RenderedFile;

/// The closed set of backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BackendId {
    Ninja,
    Make,
    Msbuild,
}

impl BackendId {
    pub const ALL: [BackendId; 3] = [BackendId::Ninja, BackendId::Make, BackendId::Msbuild];

    /// Get the backend name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendId::Ninja => "ninja",
            BackendId::Make => "make",
            BackendId::Msbuild => "msbuild",
        }
    }

    /// One-line description for listings.
    pub fn description(&self) -> &'static str {
        match self {
            BackendId::Ninja => "build.ninja for the Ninja build tool",
            BackendId::Make => "Makefile for GNU make",
            BackendId::Msbuild => "Visual Studio solution and .vcxproj projects (MSVC only)",
        }
    }

    /// The emitter for this backend.
    pub fn backend(&self) -> Box<dyn Backend> {
        match self {
            BackendId::Ninja => Box::new(ninja::NinjaBackend),
            BackendId::Make => Box::new(make::MakeBackend),
            BackendId::Msbuild => Box::new(msbuild::MsbuildBackend),
        }
    }
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BackendId {
    type Err = BackendIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ninja" => Ok(BackendId::Ninja),
            "make" | "makefile" => Ok(BackendId::Make),
            "msbuild" | "vs" | "vcxproj" => Ok(BackendId::Msbuild),
            _ => Err(BackendIdParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid backend name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendIdParseError(pub String);

impl std::fmt::Display for BackendIdParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid backend '{}', valid values: ninja, make, msbuild",
            self.0
        )
    }
}

impl std::error::Error for BackendIdParseError {}

/// Read-only inputs shared by all backends.
#[derive(Debug, Clone)]
pub struct EmitContext<'a> {
    env: &'a Environment,
    srcdir: String,
    shell: Shell,
}

impl<'a> EmitContext<'a> {
    pub fn new(env: &'a Environment) -> Self {
        EmitContext {
            env,
            srcdir: env.srcdir_from_builddir(),
            shell: Shell::for_platform(env.platform()),
        }
    }

    pub fn env(&self) -> &'a Environment {
        self.env
    }

    pub fn toolchain(&self) -> &'a dyn Toolchain {
        self.env.toolchain()
    }

    /// Where the build files go, and where the build runs.
    pub fn builddir(&self) -> &'a Path {
        self.env.builddir()
    }

    /// The source directory as seen from the build directory.
    pub fn srcdir(&self) -> &str {
        &self.srcdir
    }

    pub fn shell(&self) -> Shell {
        self.shell
    }

    /// A resolved install directory, `/`-separated.
    pub fn install_dir(&self, root: InstallRoot) -> String {
        to_slash(&self.env.install_dirs().resolve(root))
    }

    /// A path as the build tool sees it from the build directory, with
    /// every root spelled out.
    pub fn concrete(&self, path: &BuildPath) -> String {
        let base = match path.root() {
            Root::Build if path.is_root() => return ".".to_string(),
            Root::Build | Root::External => return path.as_str().to_string(),
            Root::Source => self.srcdir.clone(),
            Root::Install(root) => self.install_dir(root),
        };
        if path.is_root() {
            base
        } else if base == "." {
            path.as_str().to_string()
        } else {
            format!("{}/{}", base.trim_end_matches('/'), path.as_str())
        }
    }

    /// An absolute filesystem path, for IDE integration.
    pub fn absolute(&self, path: &BuildPath) -> PathBuf {
        let srcdir = crate::util::fs::absolute_lexical(self.env.srcdir());
        let builddir = crate::util::fs::absolute_lexical(self.env.builddir());
        path.to_path(&srcdir, &builddir, &|root| self.env.install_dirs().resolve(root))
    }
}

/// A build file emitter.
pub trait Backend: Send + Sync {
    fn id(&self) -> BackendId;

    /// Render every file this backend writes, relative to the build
    /// directory. Fails with `UnsupportedGraphFeature` when the graph uses
    /// something the build tool cannot express.
    fn render(&self, graph: &CompiledGraph, ctx: &EmitContext<'_>) -> Result<Vec<RenderedFile>, EmissionError>;

    /// Render, then write the build files and the graph's generated files.
    fn emit(&self, graph: &CompiledGraph, ctx: &EmitContext<'_>) -> Result<Vec<PathBuf>, EmissionError> {
        let mut files = self.render(graph, ctx)?;
        files.extend(generated_files(graph, ctx));
        writer::write_all(ctx.builddir(), &files)
    }
}

/// Files whose contents the graph computed at generation time.
pub fn generated_files(graph: &CompiledGraph, ctx: &EmitContext<'_>) -> Vec<RenderedFile> {
    graph
        .generated()
        .map(|(file, contents)| RenderedFile::new(ctx.concrete(graph.path(file)), contents))
        .collect()
}

/// Outputs of install edges, in declaration order.
pub(crate) fn install_outputs(graph: &CompiledGraph) -> Vec<FileId> {
    graph
        .edges()
        .iter()
        .filter(|e| e.phase == EdgePhase::Install)
        .flat_map(|e| e.outputs.iter().copied())
        .collect()
}

/// Default files that some rule produces. Generated files are written at
/// generation time and never appear as build targets.
pub(crate) fn rule_defaults(graph: &CompiledGraph) -> Vec<FileId> {
    graph
        .defaults()
        .iter()
        .copied()
        .filter(|&f| {
            graph
                .producer(f)
                .is_some_and(|e| matches!(graph.edge(e).recipe, Recipe::Rule(_)))
        })
        .collect()
}

/// Fail when a build output at the top of the build directory would clash
/// with a phony target the backend defines.
pub(crate) fn check_reserved(backend: &str, graph: &CompiledGraph, reserved: &[&str]) -> Result<(), EmissionError> {
    for file in graph.files() {
        if file.path.root() == Root::Build && reserved.contains(&file.path.as_str()) {
            return Err(EmissionError::UnsupportedGraphFeature {
                backend: backend.to_string(),
                feature: format!("an output named `{}`, which is a reserved target name", file.path),
            });
        }
    }
    Ok(())
}

/// Render several backends in parallel and write their output.
///
/// Nothing is written unless every backend renders successfully.
pub fn emit_all(
    graph: &CompiledGraph,
    ctx: &EmitContext<'_>,
    backends: &[BackendId],
    compile_commands: bool,
) -> Result<Vec<PathBuf>, EmissionError> {
    let rendered = backends
        .par_iter()
        .map(|id| {
            let files = id.backend().render(graph, ctx)?;
            tracing::debug!("{} backend rendered {} files", id, files.len());
            Ok(files)
        })
        .collect::<Result<Vec<_>, EmissionError>>()?;

    let mut files: Vec<RenderedFile> = rendered.into_iter().flatten().collect();
    if compile_commands {
        files.push(compdb::render(graph, ctx)?);
    }
    files.extend(generated_files(graph, ctx));

    tracing::info!(
        "writing {} files to {}",
        files.len(),
        ctx.builddir().display()
    );
    writer::write_all(ctx.builddir(), &files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::environment::{Platform, ToolchainId};

    #[test]
    fn test_backend_id_parse() {
        assert_eq!("ninja".parse::<BackendId>().unwrap(), BackendId::Ninja);
        assert_eq!("Make".parse::<BackendId>().unwrap(), BackendId::Make);
        assert_eq!("vs".parse::<BackendId>().unwrap(), BackendId::Msbuild);
        let err = "scons".parse::<BackendId>().unwrap_err();
        assert!(err.to_string().contains("scons"));
    }

    #[test]
    fn test_concrete_paths() {
        let env = Environment::new(Platform::Linux, ToolchainId::Gcc)
            .unwrap()
            .with_srcdir("/work/proj")
            .with_builddir("/work/proj/build");
        let ctx = EmitContext::new(&env);

        assert_eq!(ctx.srcdir(), "..");
        assert_eq!(ctx.concrete(&BuildPath::source("src/a.c").unwrap()), "../src/a.c");
        assert_eq!(ctx.concrete(&BuildPath::source_dir(".").unwrap()), "..");
        assert_eq!(ctx.concrete(&BuildPath::build("app.dir/a.o").unwrap()), "app.dir/a.o");
        assert_eq!(
            ctx.concrete(&BuildPath::install(InstallRoot::Libdir, "libfoo.a").unwrap()),
            "/usr/local/lib/libfoo.a"
        );
        assert_eq!(
            ctx.absolute(&BuildPath::source("src/a.c").unwrap()),
            PathBuf::from("/work/proj/src/a.c")
        );
    }

    fn temp_env(tmp: &Path) -> Environment {
        Environment::new(Platform::Linux, ToolchainId::Gcc)
            .unwrap()
            .with_srcdir(tmp)
            .with_builddir(tmp.join("build"))
    }

    #[test]
    fn test_emit_all_writes_every_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let env = temp_env(tmp.path());
        let graph = crate::test_support::fixtures::hello_graph(&env);

        let written = emit_all(
            &graph,
            &EmitContext::new(&env),
            &[BackendId::Ninja, BackendId::Make],
            true,
        )
        .unwrap();
        assert_eq!(written.len(), 4);

        let build = tmp.path().join("build");
        assert!(build.join("build.ninja").exists());
        assert!(build.join("Makefile").exists());
        assert!(build.join("compile_commands.json").exists());
        let pc = std::fs::read_to_string(build.join("hello.pc")).unwrap();
        assert!(pc.contains("Name: hello"));
    }

    #[test]
    fn test_failed_backend_writes_nothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let env = temp_env(tmp.path());
        let graph = crate::test_support::fixtures::hello_graph(&env);

        let err = emit_all(
            &graph,
            &EmitContext::new(&env),
            &[BackendId::Ninja, BackendId::Msbuild],
            false,
        )
        .unwrap_err();
        assert!(matches!(err, EmissionError::UnsupportedGraphFeature { .. }));
        assert!(!tmp.path().join("build").exists());
    }
}
