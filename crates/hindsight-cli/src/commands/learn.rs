use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::debug;

use hindsight_sdk::{import_path, ConsolidationStatus, LearnReport};

use super::{runtime, MemoryFile};
use crate::output::{format::format_consolidation, to_json, OutputFormat};

#[derive(Args)]
pub struct LearnArgs {
    /// Trajectory files; the format is detected from each file
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Serialize)]
struct Learned {
    instance_id: String,
    #[serde(flatten)]
    report: LearnReport,
}

pub fn run(args: &LearnArgs, store: &MemoryFile, format: OutputFormat) -> Result<()> {
    let mut trajectories = Vec::new();
    for path in &args.files {
        let imported =
            import_path(path).with_context(|| format!("Failed to import {}", path.display()))?;
        debug!("Read {} trajectory(ies) from {}", imported.len(), path.display());
        trajectories.extend(imported);
    }

    let mut memory = store.open()?;
    let rt = runtime()?;
    let learned = rt.block_on(async {
        let mut learned = Vec::new();
        for raw in &trajectories {
            let report = memory
                .learn(raw)
                .await
                .with_context(|| format!("Failed to learn {}", raw.instance_id))?;
            learned.push(Learned {
                instance_id: raw.instance_id.clone(),
                report,
            });
        }
        store.save(&memory).await?;
        anyhow::Ok(learned)
    })?;

    match format {
        OutputFormat::Json => println!("{}", to_json(&learned)?),
        OutputFormat::Text | OutputFormat::Markdown => {
            for entry in &learned {
                let w = &entry.report.write;
                if w.duplicate {
                    println!("Skipped {} (already learned)", entry.instance_id);
                    continue;
                }
                println!(
                    "Learned {}: {} fragment(s), {} loop(s), {} error pattern(s), {} similarity link(s)",
                    entry.instance_id, w.fragments, w.loops_labeled, w.error_patterns, w.similarity_links
                );
                if w.skipped_writes > 0 {
                    println!("  {} write(s) skipped", w.skipped_writes);
                }
                match &entry.report.consolidation {
                    ConsolidationStatus::Completed(report) => {
                        println!("{}", format_consolidation(report, format)?)
                    }
                    ConsolidationStatus::Skipped { reason } => {
                        println!("  Consolidation skipped: {reason}")
                    }
                    ConsolidationStatus::NotDue => {}
                }
            }
        }
    }
    Ok(())
}
