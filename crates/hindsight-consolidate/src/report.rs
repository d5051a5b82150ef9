use std::fmt;

use serde::Serialize;

/// The four consolidation passes, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    Abstraction,
    Merge,
    Statistics,
    Cleanup,
}

impl Pass {
    pub const ORDER: [Pass; 4] = [Self::Abstraction, Self::Merge, Self::Statistics, Self::Cleanup];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Abstraction => "abstraction",
            Self::Merge => "merge",
            Self::Statistics => "statistics",
            Self::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Report from one consolidation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConsolidationReport {
    pub methodologies_created: usize,
    /// Fragments linked into a new or existing methodology.
    pub fragments_abstracted: usize,
    pub fragments_merged: usize,
    pub edges_refreshed: usize,
    pub patterns_refreshed: usize,
    pub nodes_cleaned: usize,
    /// Items skipped because of a consistency problem (e.g. a missing merge target).
    pub skipped: usize,
    /// Passes that aborted with an error. Later passes still ran.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_passes: Vec<Pass>,
}

impl ConsolidationReport {
    /// Whether the run changed anything in the store.
    pub fn changed(&self) -> bool {
        self.methodologies_created
            + self.fragments_abstracted
            + self.fragments_merged
            + self.edges_refreshed
            + self.patterns_refreshed
            + self.nodes_cleaned
            > 0
    }
}
