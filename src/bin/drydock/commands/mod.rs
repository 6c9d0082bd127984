//! Command implementations

pub mod backends;
pub mod completions;
pub mod generate;
pub mod graph;
pub mod toolchain;

use anyhow::Result;

use crate::cli::ProjectArgs;
use drydock::ops::{self, GenerateOptions};

/// Options shared by every command that reads a project.
pub fn project_options(args: ProjectArgs) -> Result<GenerateOptions> {
    let manifest_path = ops::find_manifest(args.manifest_path.as_deref())?;
    let library_kind = args
        .library_kind
        .as_deref()
        .map(ops::parse_library_kind)
        .transpose()?;

    Ok(GenerateOptions {
        manifest_path,
        builddir: args.builddir,
        platform: args.platform,
        toolchain: args.toolchain,
        prefix: args.prefix,
        library_kind,
        options: args.options,
        no_global_config: args.no_global_config,
        ..Default::default()
    })
}
