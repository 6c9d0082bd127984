//! `drydock graph` command
//!
//! Compiles the project and prints the graph without emitting anything.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::GraphArgs;
use drydock::ops;

pub fn execute(args: GraphArgs) -> Result<()> {
    let opts = super::project_options(args.project)?;
    let project = ops::configure(&opts)?;
    let query = ops::package_query(&project.config);
    let graph = ops::compile(&project, Arc::new(query))?;

    let json = serde_json::to_string_pretty(&graph.describe())
        .context("failed to serialize build graph")?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, json + "\n")
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("    Wrote {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
