use anyhow::Result;

use super::{runtime, MemoryFile};

pub fn run(store: &MemoryFile) -> Result<()> {
    let memory = store.open()?;
    let snapshot = store.path().to_path_buf();

    let rt = runtime()?;
    rt.block_on(async {
        hindsight_mcp::run_stdio(memory, Some(snapshot))
            .await
            .map_err(|e| anyhow::anyhow!("MCP server error: {e}"))
    })
}
