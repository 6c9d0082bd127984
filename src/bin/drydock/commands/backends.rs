//! `drydock backends` command

use anyhow::Result;

use drydock::backend::BackendId;

pub fn execute() -> Result<()> {
    println!("Backends:");
    println!();

    for id in BackendId::ALL {
        println!("  {:<8} {}", id.as_str(), id.description());
    }

    Ok(())
}
