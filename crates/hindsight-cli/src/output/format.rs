use anyhow::Result;

use hindsight_sdk::{ConsolidationReport, LoopCheck, MemoryStats, Recall};

use super::{to_json, OutputFormat};

pub fn format_recall(recall: &Recall, fmt: OutputFormat) -> Result<String> {
    match fmt {
        OutputFormat::Json => to_json(recall),
        OutputFormat::Text => {
            let mut out = recall.render();
            if !recall.degraded.is_empty() {
                out.push_str(&format!("\n(partial results: {} unavailable)", degraded(recall)));
            }
            Ok(out)
        }
        OutputFormat::Markdown => Ok(format_recall_markdown(recall)),
    }
}

fn degraded(recall: &Recall) -> String {
    recall
        .degraded
        .iter()
        .map(|d| d.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_recall_markdown(recall: &Recall) -> String {
    if recall.is_empty() {
        return "_No relevant memories._".to_string();
    }
    let mut out = String::new();
    if !recall.warnings.is_empty() {
        out.push_str("## Warnings\n\n");
        for w in &recall.warnings {
            out.push_str(&format!("- {w}\n"));
        }
        out.push('\n');
    }
    if !recall.methodologies.is_empty() {
        out.push_str("## Strategies\n\n| Confidence | Situation | Strategy |\n|---|---|---|\n");
        for m in &recall.methodologies {
            out.push_str(&format!(
                "| {:.2} | {} | {} |\n",
                m.confidence, m.situation, m.strategy
            ));
        }
        out.push('\n');
    }
    if !recall.fragments.is_empty() {
        out.push_str("## Past experience\n\n");
        for f in &recall.fragments {
            out.push_str(&format!("- **{}** {}\n", f.outcome.as_str(), f.description));
        }
        out.push('\n');
    }
    if !recall.degraded.is_empty() {
        out.push_str(&format!("_Partial results: {} unavailable._\n", degraded(recall)));
    }
    out.trim_end().to_string()
}

pub fn format_loop_check(check: &LoopCheck, fmt: OutputFormat) -> Result<String> {
    match fmt {
        OutputFormat::Json => to_json(check),
        OutputFormat::Text => Ok(check.render()),
        OutputFormat::Markdown => {
            let Some(info) = &check.info else {
                return Ok("_No loop detected._".to_string());
            };
            let mut out = format!(
                "## Loop detected\n\n{} (pattern of {} step(s), repeated {} times from step {})\n",
                info.description,
                info.pattern_length(),
                info.repeat_count,
                info.start_index
            );
            if !check.escape_suggestions.is_empty() {
                out.push_str("\n## Try instead\n\n");
                for m in &check.escape_suggestions {
                    out.push_str(&format!("- **{:.2}** {}\n", m.confidence, m.strategy));
                }
            }
            Ok(out.trim_end().to_string())
        }
    }
}

pub fn format_consolidation(report: &ConsolidationReport, fmt: OutputFormat) -> Result<String> {
    let rows = [
        ("Methodologies created", report.methodologies_created),
        ("Fragments abstracted", report.fragments_abstracted),
        ("Fragments merged", report.fragments_merged),
        ("Edges refreshed", report.edges_refreshed),
        ("Patterns refreshed", report.patterns_refreshed),
        ("Nodes cleaned", report.nodes_cleaned),
        ("Skipped", report.skipped),
    ];
    let failed: Vec<&str> = report.failed_passes.iter().map(|p| p.as_str()).collect();
    match fmt {
        OutputFormat::Json => to_json(report),
        OutputFormat::Text => {
            let mut out = String::from("Consolidation\n=============\n");
            for (label, value) in rows {
                out.push_str(&format!("{:<23}{value}\n", format!("{label}:")));
            }
            if !failed.is_empty() {
                out.push_str(&format!("Failed passes:         {}\n", failed.join(", ")));
            }
            Ok(out.trim_end().to_string())
        }
        OutputFormat::Markdown => {
            let mut out = String::from("## Consolidation\n\n| | |\n|---|---|\n");
            for (label, value) in rows {
                out.push_str(&format!("| {label} | {value} |\n"));
            }
            if !failed.is_empty() {
                out.push_str(&format!("\nFailed passes: {}\n", failed.join(", ")));
            }
            Ok(out.trim_end().to_string())
        }
    }
}

pub fn format_stats(stats: &MemoryStats, fmt: OutputFormat) -> Result<String> {
    let rows = [
        ("Trajectories", stats.total_trajectories),
        ("Fragments", stats.total_fragments),
        ("Methodologies", stats.total_methodologies),
        ("Error patterns", stats.total_error_patterns),
    ];
    match fmt {
        OutputFormat::Json => to_json(stats),
        OutputFormat::Text => {
            let mut out = String::from("Hindsight Memory\n================\n");
            for (label, value) in rows {
                out.push_str(&format!("{:<16}{value}\n", format!("{label}:")));
            }
            if !stats.error_frequency.is_empty() {
                out.push_str("\nBy Error Category:\n");
                for (category, frequency) in &stats.error_frequency {
                    out.push_str(&format!("  {category}: {frequency}\n"));
                }
            }
            Ok(out.trim_end().to_string())
        }
        OutputFormat::Markdown => {
            let mut out = String::from("## Hindsight Memory\n\n| | |\n|---|---|\n");
            for (label, value) in rows {
                out.push_str(&format!("| {label} | {value} |\n"));
            }
            if !stats.error_frequency.is_empty() {
                out.push_str("\n| Error category | Frequency |\n|---|---|\n");
                for (category, frequency) in &stats.error_frequency {
                    out.push_str(&format!("| {category} | {frequency} |\n"));
                }
            }
            Ok(out.trim_end().to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hindsight_sdk::Pass;

    #[test]
    fn test_empty_recall_renders() {
        let recall = Recall::default();
        assert_eq!(format_recall(&recall, OutputFormat::Text).unwrap(), "No relevant memories.");
        assert_eq!(
            format_recall(&recall, OutputFormat::Markdown).unwrap(),
            "_No relevant memories._"
        );
        let json = format_recall(&recall, OutputFormat::Json).unwrap();
        assert!(json.contains("\"methodologies\": []"));
    }

    #[test]
    fn test_consolidation_lists_failed_passes() {
        let report = ConsolidationReport {
            methodologies_created: 2,
            failed_passes: vec![Pass::Merge],
            ..Default::default()
        };
        let text = format_consolidation(&report, OutputFormat::Text).unwrap();
        assert!(text.contains("Methodologies created: 2"));
        assert!(text.contains("Failed passes:         merge"));
    }

    #[test]
    fn test_stats_lists_categories() {
        let mut stats = MemoryStats {
            total_trajectories: 3,
            ..Default::default()
        };
        stats.error_frequency.insert("TypeError".into(), 4);
        let text = format_stats(&stats, OutputFormat::Text).unwrap();
        assert!(text.contains("Trajectories:   3"));
        assert!(text.contains("  TypeError: 4"));
        let md = format_stats(&stats, OutputFormat::Markdown).unwrap();
        assert!(md.contains("| TypeError | 4 |"));
    }
}
