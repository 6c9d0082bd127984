//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use drydock::backend::BackendId;
use drydock::core::{Platform, ToolchainId};

/// Drydock - generate Ninja, Make and MSBuild files from a Drydock.toml
#[derive(Parser)]
#[command(name = "drydock")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate build files for the current project
    Generate(GenerateArgs),

    /// Print the compiled build graph as JSON
    Graph(GraphArgs),

    /// Show the rules and output names of a toolchain
    Toolchain(ToolchainArgs),

    /// List the available backends
    Backends,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Where the project is and how to configure it.
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Path to Drydock.toml or its directory
    #[arg(long, value_name = "PATH")]
    pub manifest_path: Option<PathBuf>,

    /// Build directory (default: build)
    #[arg(long, env = "DRYDOCK_BUILDDIR")]
    pub builddir: Option<PathBuf>,

    /// Target platform (linux, darwin, windows, cygwin)
    #[arg(long)]
    pub platform: Option<Platform>,

    /// Toolchain (gcc, clang, msvc)
    #[arg(long)]
    pub toolchain: Option<ToolchainId>,

    /// Installation prefix
    #[arg(long)]
    pub prefix: Option<PathBuf>,

    /// Kind for libraries that do not set one
    #[arg(long, value_parser = ["static", "shared"])]
    pub library_kind: Option<String>,

    /// Generic option applied to every target (e.g. optimize=2, debug)
    #[arg(short = 'O', long = "option", value_name = "OPTION")]
    pub options: Vec<String>,

    /// Ignore the user-wide config file
    #[arg(long)]
    pub no_global_config: bool,
}

#[derive(Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Backends to emit (ninja, make, msbuild)
    #[arg(short, long = "backend", value_delimiter = ',')]
    pub backends: Vec<BackendId>,

    /// Also write compile_commands.json
    #[arg(long)]
    pub emit_compile_commands: bool,
}

#[derive(Args)]
pub struct GraphArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Write the graph to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ToolchainArgs {
    /// Target platform (default: host)
    #[arg(long)]
    pub platform: Option<Platform>,

    /// Toolchain (default: the platform's usual one)
    #[arg(long)]
    pub toolchain: Option<ToolchainId>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
