use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{NodeId, NodeLabel};

/// Broad category of the task a trajectory worked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    BugFix,
    Feature,
    Refactor,
}

impl TaskCategory {
    /// Infer the category from keywords in a problem statement.
    /// Anything unrecognized is treated as a bug fix.
    pub fn infer(problem_statement: &str) -> Self {
        let lower = problem_statement.to_lowercase();
        let has_any = |words: &[&str]| words.iter().any(|w| lower.contains(w));

        if has_any(&["fix", "bug", "error", "issue", "crash"]) {
            Self::BugFix
        } else if has_any(&["add", "feature", "implement", "create", "new"]) {
            Self::Feature
        } else if has_any(&["refactor", "clean", "improve", "optimize"]) {
            Self::Refactor
        } else {
            Self::BugFix
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BugFix => "bug_fix",
            Self::Feature => "feature",
            Self::Refactor => "refactor",
        }
    }
}

/// One finished agent run, written once at episode end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trajectory {
    pub id: NodeId,
    pub instance_id: String,
    pub repo: String,
    pub task_category: TaskCategory,
    pub success: bool,
    pub total_steps: usize,
    pub summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub problem_statement: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
    /// SHA-256 of the imported source file (for deduplication).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_hash: Option<String>,
}

impl Trajectory {
    pub fn new(
        instance_id: impl Into<String>,
        repo: impl Into<String>,
        success: bool,
        total_steps: usize,
    ) -> Self {
        Self {
            id: NodeId::new(NodeLabel::Trajectory),
            instance_id: instance_id.into(),
            repo: repo.into(),
            task_category: TaskCategory::BugFix,
            success,
            total_steps,
            summary: String::new(),
            problem_statement: String::new(),
            embedding: Vec::new(),
            created_at: Utc::now(),
            source_hash: None,
        }
    }
}
