use anyhow::{Context, Result};
use clap::Args;

use hindsight_sdk::{Phase, State};

use super::{runtime, MemoryFile};
use crate::output::{format::format_recall, OutputFormat};

#[derive(Args)]
pub struct QueryArgs {
    /// What the agent is working on
    #[arg(long)]
    pub task: String,

    /// Error text from the last step
    #[arg(long)]
    pub error: Option<String>,

    /// Current phase (understanding, locating, fixing, testing)
    #[arg(long, default_value = "understanding")]
    pub phase: String,

    /// Label of the last action
    #[arg(long)]
    pub action: Option<String>,

    /// Short repository description
    #[arg(long)]
    pub repo: Option<String>,
}

impl QueryArgs {
    fn state(&self) -> Result<State> {
        let phase: Phase = self.phase.parse().context("Invalid --phase")?;
        let mut state = State::with_phase(self.task.clone(), phase);
        if let Some(error) = &self.error {
            state = state.error(error.clone());
        }
        if let Some(action) = &self.action {
            state = state.action(action.clone());
        }
        if let Some(repo) = &self.repo {
            state = state.repo_summary(repo.clone());
        }
        Ok(state)
    }
}

pub fn run(args: &QueryArgs, store: &MemoryFile, format: OutputFormat) -> Result<()> {
    let mut state = args.state()?;
    let memory = store.open()?;
    let rt = runtime()?;
    let recall = rt.block_on(memory.query(&mut state));
    println!("{}", format_recall(&recall, format)?);
    Ok(())
}
