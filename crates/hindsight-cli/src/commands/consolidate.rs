use anyhow::Result;

use super::{runtime, MemoryFile};
use crate::output::{format::format_consolidation, OutputFormat};

pub fn run(store: &MemoryFile, format: OutputFormat) -> Result<()> {
    let memory = store.open()?;
    let rt = runtime()?;
    let report = rt.block_on(async {
        let report = memory.consolidate().await;
        store.save(&memory).await?;
        anyhow::Ok(report)
    })?;
    println!("{}", format_consolidation(&report, format)?);
    Ok(())
}
