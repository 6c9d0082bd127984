//! Implementation of `drydock generate`.
//!
//! Loads the manifest and configuration, fixes the environment, compiles
//! the build graph and hands it to the requested backends.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::backend::{self, BackendId, EmitContext};
use crate::builder::compiler::GraphCompiler;
use crate::builder::graph::CompiledGraph;
use crate::core::description::LibraryKind;
use crate::core::environment::{Environment, InstallDirs, Platform, ToolCommands, ToolchainId};
use crate::core::manifest::{Manifest, MANIFEST_NAME};
use crate::errors::GenerateError;
use crate::resolver::{PackageQuery, PackageResolver, PkgConfigQuery};
use crate::util::config::{self, Config};
use crate::util::fs::absolute_lexical;

/// Default build directory, relative to the project root.
pub const DEFAULT_BUILDDIR: &str = "build";

/// Options for generation. Unset fields fall back to the configuration
/// files, then to host defaults.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Path to Drydock.toml
    pub manifest_path: PathBuf,

    /// Backends to emit (empty = from config, else ninja)
    pub backends: Vec<BackendId>,

    /// Build directory; relative paths are taken from the project root
    pub builddir: Option<PathBuf>,

    pub platform: Option<Platform>,

    pub toolchain: Option<ToolchainId>,

    /// Installation prefix
    pub prefix: Option<PathBuf>,

    /// Kind for libraries that do not declare one
    pub library_kind: Option<LibraryKind>,

    /// Generic options appended after the configured ones
    pub options: Vec<String>,

    /// Also write compile_commands.json
    pub emit_compile_commands: bool,

    /// Skip the global config file
    pub no_global_config: bool,
}

/// A manifest evaluated against its configuration.
#[derive(Debug, Clone)]
pub struct Project {
    pub manifest: Manifest,
    pub config: Config,
    pub env: Environment,
}

/// Generation result.
#[derive(Debug)]
pub struct GenerateResult {
    pub backends: Vec<BackendId>,

    /// Every file written or left unchanged
    pub files: Vec<PathBuf>,

    pub targets: usize,

    pub edges: usize,
}

/// Find the manifest: `path` itself, a directory containing one, or the
/// nearest one above the current directory.
pub fn find_manifest(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) if path.is_dir() => {
            let candidate = path.join(MANIFEST_NAME);
            if !candidate.is_file() {
                bail!("no {} in {}", MANIFEST_NAME, path.display());
            }
            Ok(candidate)
        }
        Some(path) => Ok(path.to_path_buf()),
        None => {
            let cwd = std::env::current_dir().context("failed to get current directory")?;
            Manifest::find(&cwd).with_context(|| {
                format!(
                    "could not find {} in {} or any parent directory",
                    MANIFEST_NAME,
                    cwd.display()
                )
            })
        }
    }
}

/// Parse `static` or `shared`.
pub fn parse_library_kind(value: &str) -> Result<LibraryKind> {
    match value {
        "static" => Ok(LibraryKind::Static),
        "shared" => Ok(LibraryKind::Shared),
        other => bail!("invalid library kind `{}`, expected `static` or `shared`", other),
    }
}

/// Load the manifest and configuration and fix the environment.
pub fn configure(opts: &GenerateOptions) -> Result<Project> {
    let manifest = Manifest::load(&opts.manifest_path).map_err(GenerateError::from)?;
    let root = absolute_lexical(manifest.manifest_dir());

    let global = if opts.no_global_config {
        None
    } else {
        config::global_config_path()
    };
    let config = config::load_config(global.as_deref(), &config::project_config_path(&root));

    let platform = match (opts.platform, &config.toolchain.platform) {
        (Some(platform), _) => platform,
        (None, Some(name)) => name.parse().map_err(GenerateError::from)?,
        (None, None) => Platform::host(),
    };
    let toolchain = match (opts.toolchain, &config.toolchain.id) {
        (Some(id), _) => id,
        (None, Some(name)) => name.parse().map_err(GenerateError::from)?,
        (None, None) => ToolchainId::default_for(platform),
    };

    let mut tools = ToolCommands::defaults_for(toolchain);
    let tc = &config.toolchain;
    for (slot, value) in [
        (&mut tools.cc, &tc.cc),
        (&mut tools.cxx, &tc.cxx),
        (&mut tools.ar, &tc.ar),
        (&mut tools.ld, &tc.ld),
    ] {
        if let Some(value) = value {
            *slot = value.clone();
        }
    }

    let mut install = InstallDirs::default();
    if let Some(prefix) = opts.prefix.clone().or_else(|| config.install.prefix.clone()) {
        install.prefix = prefix;
    }
    if let Some(bindir) = &config.install.bindir {
        install.bindir = bindir.clone();
    }
    if let Some(libdir) = &config.install.libdir {
        install.libdir = libdir.clone();
    }
    if let Some(includedir) = &config.install.includedir {
        install.includedir = includedir.clone();
    }

    let library_kind = match (opts.library_kind, &config.generate.library_kind) {
        (Some(kind), _) => kind,
        (None, Some(name)) => parse_library_kind(name)?,
        (None, None) => LibraryKind::Static,
    };

    let builddir = opts
        .builddir
        .clone()
        .or_else(|| config.generate.builddir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILDDIR));
    let builddir = absolute_lexical(&root.join(builddir));

    let options = tc.options.iter().chain(&opts.options);
    let env = Environment::new(platform, toolchain)
        .map_err(GenerateError::from)?
        .with_tools(tools)
        .with_global_options(options)
        .map_err(GenerateError::from)?
        .with_install_dirs(install)
        .with_srcdir(root)
        .with_builddir(builddir)
        .with_default_library_kind(library_kind);

    tracing::debug!(
        "environment {} (srcdir {}, builddir {})",
        env.key(),
        env.srcdir().display(),
        env.builddir().display()
    );

    Ok(Project {
        manifest,
        config,
        env,
    })
}

/// The pkg-config query described by the configuration.
pub fn package_query(config: &Config) -> PkgConfigQuery {
    let mut query = PkgConfigQuery::new().with_search_path(config.packages.search_path.clone());
    if let Some(program) = &config.packages.pkg_config {
        query = query.with_program(program);
    }
    query
}

/// Evaluate the manifest and compile its build graph.
pub fn compile(project: &Project, query: Arc<dyn PackageQuery>) -> Result<CompiledGraph> {
    let desc = project
        .manifest
        .to_description(&project.env)
        .map_err(GenerateError::from)?;
    let resolver = PackageResolver::new(query);
    let graph = GraphCompiler::new(&project.env, &resolver).compile(&desc)?;
    tracing::debug!("{} packages resolved", resolver.cached());
    Ok(graph)
}

/// Backends to emit: the options, then the configuration, then ninja.
pub fn select_backends(opts: &GenerateOptions, config: &Config) -> Result<Vec<BackendId>> {
    let mut backends = if !opts.backends.is_empty() {
        opts.backends.clone()
    } else if !config.generate.backends.is_empty() {
        config
            .generate
            .backends
            .iter()
            .map(|name| name.parse::<BackendId>())
            .collect::<Result<Vec<_>, _>>()
            .context("invalid backend in configuration")?
    } else {
        vec![BackendId::Ninja]
    };
    backends.sort();
    backends.dedup();
    Ok(backends)
}

/// Generate build files for a project.
pub fn generate(opts: &GenerateOptions) -> Result<GenerateResult> {
    let project = configure(opts)?;
    let query = package_query(&project.config);
    generate_with(opts, &project, Arc::new(query))
}

/// [`generate`] with an already configured project and package query.
pub fn generate_with(
    opts: &GenerateOptions,
    project: &Project,
    query: Arc<dyn PackageQuery>,
) -> Result<GenerateResult> {
    let backends = select_backends(opts, &project.config)?;
    let graph = compile(project, query)?;

    let compile_commands = opts.emit_compile_commands || project.config.generate.emit_compile_commands;
    let ctx = EmitContext::new(&project.env);
    let files = backend::emit_all(&graph, &ctx, &backends, compile_commands)
        .map_err(GenerateError::from)?;

    tracing::info!(
        "generated {} for `{}` in {}",
        backends
            .iter()
            .map(BackendId::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        graph.project().name,
        project.env.builddir().display()
    );

    Ok(GenerateResult {
        backends,
        files,
        targets: graph.targets().len(),
        edges: graph.edges().len(),
    })
}
