use anyhow::{Context, Result};

use super::{runtime, MemoryFile};
use crate::output::{format::format_stats, OutputFormat};

pub fn run(store: &MemoryFile, format: OutputFormat) -> Result<()> {
    let memory = store.open()?;
    let rt = runtime()?;
    let stats = rt
        .block_on(memory.stats())
        .context("Failed to read memory stats")?;
    println!("{}", format_stats(&stats, format)?);
    Ok(())
}
