//! `drydock generate` command

use anyhow::Result;

use crate::cli::GenerateArgs;
use drydock::ops::{self, GenerateOptions};

pub fn execute(args: GenerateArgs) -> Result<()> {
    let opts = GenerateOptions {
        backends: args.backends,
        emit_compile_commands: args.emit_compile_commands,
        ..super::project_options(args.project)?
    };

    let result = ops::generate(&opts)?;

    for path in &result.files {
        println!("{}", path.display());
    }
    eprintln!(
        "    Generated {} ({} targets, {} edges)",
        result
            .backends
            .iter()
            .map(|b| b.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        result.targets,
        result.edges
    );

    Ok(())
}
