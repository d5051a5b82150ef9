pub mod check_loop;
pub mod consolidate;
pub mod learn;
pub mod mcp;
pub mod query;
pub mod stats;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;

use hindsight_sdk::{AgentMemory, MemoryConfig};

#[derive(Subcommand)]
pub enum Commands {
    /// Learn from finished trajectory files (native JSON or SWE-agent .traj)
    Learn(learn::LearnArgs),
    /// Recall memories relevant to an agent state
    Query(query::QueryArgs),
    /// Check a recorded state history for loops
    CheckLoop(check_loop::CheckLoopArgs),
    /// Run all consolidation passes now
    Consolidate,
    /// Show counts over the stored memory
    Stats,
    /// Serve the memory over MCP on stdio
    Mcp,
}

/// The snapshot file every command reads and the mutating ones write back.
pub struct MemoryFile {
    path: PathBuf,
    config: Option<PathBuf>,
}

impl MemoryFile {
    pub fn new(path: PathBuf, config: Option<PathBuf>) -> Self {
        Self { path, config }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> Result<MemoryConfig> {
        match &self.config {
            Some(path) => MemoryConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display())),
            None => Ok(MemoryConfig::default()),
        }
    }

    pub fn open(&self) -> Result<AgentMemory> {
        AgentMemory::open(&self.path, self.config()?)
            .with_context(|| format!("Failed to open memory {}", self.path.display()))
    }

    pub async fn save(&self, memory: &AgentMemory) -> Result<()> {
        memory
            .save(&self.path)
            .await
            .with_context(|| format!("Failed to save memory {}", self.path.display()))
    }
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to create async runtime")
}
