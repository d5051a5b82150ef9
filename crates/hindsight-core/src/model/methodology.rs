use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{NodeId, NodeLabel};

/// `successes / (successes + failures)`, or 0 when nothing has been recorded.
pub fn success_rate(successes: u64, failures: u64) -> f64 {
    let total = successes + failures;
    if total == 0 {
        0.0
    } else {
        successes as f64 / total as f64
    }
}

/// An abstracted, reusable strategy derived from successful fragments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Methodology {
    pub id: NodeId,
    pub situation: String,
    pub strategy: String,
    pub confidence: f64,
    pub success_count: u64,
    pub failure_count: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub source_fragments: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_category: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Methodology {
    pub fn new(situation: impl Into<String>, strategy: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(NodeLabel::Methodology),
            situation: situation.into(),
            strategy: strategy.into(),
            confidence: 0.0,
            success_count: 0,
            failure_count: 0,
            embedding: Vec::new(),
            source_fragments: Vec::new(),
            error_category: None,
            created_at: Utc::now(),
        }
    }

    /// Seed confidence before any outcome has been recorded.
    pub fn with_prior(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Record one application of this methodology and recompute confidence.
    pub fn record_outcome(&mut self, success: bool) {
        if success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        self.confidence = success_rate(self.success_count, self.failure_count);
    }

    /// Add a fragment to the provenance list, ignoring duplicates.
    pub fn add_source(&mut self, fragment: &NodeId) -> bool {
        if self.source_fragments.contains(fragment) {
            return false;
        }
        self.source_fragments.push(fragment.clone());
        true
    }
}
