use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use hindsight_sdk::State;

use super::{runtime, MemoryFile};
use crate::output::{format::format_loop_check, OutputFormat};

#[derive(Args)]
pub struct CheckLoopArgs {
    /// JSON file holding an array of agent states, oldest first
    pub states: PathBuf,
}

pub fn run(args: &CheckLoopArgs, store: &MemoryFile, format: OutputFormat) -> Result<()> {
    let raw = std::fs::read_to_string(&args.states)
        .with_context(|| format!("Failed to read {}", args.states.display()))?;
    let history: Vec<State> = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid state history in {}", args.states.display()))?;

    let memory = store.open()?;
    let rt = runtime()?;
    let check = rt.block_on(memory.check_loop(&history));
    println!("{}", format_loop_check(&check, format)?);
    Ok(())
}
