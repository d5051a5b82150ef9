use serde::{Deserialize, Serialize};

use super::id::NodeId;
use super::methodology::success_rate;

/// Stable identifier of a relation in the graph's edge table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationId(pub u64);

impl std::fmt::Display for RelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rel#{}", self.0)
    }
}

/// Type of relation between memory nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Trajectory -> Fragment, ordered.
    HasFragment,
    /// Fragment -> ErrorPattern.
    Caused,
    /// ErrorPattern -> Methodology, carries a success rate.
    ResolvedBy,
    /// Fragment -> Methodology (provenance).
    DerivedInto,
    /// Fragment -> Fragment, carries a similarity score.
    SimilarTo,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HasFragment => "has_fragment",
            Self::Caused => "caused",
            Self::ResolvedBy => "resolved_by",
            Self::DerivedInto => "derived_into",
            Self::SimilarTo => "similar_to",
        }
    }
}

/// A directed edge in the memory graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relation {
    pub id: RelationId,
    pub from: NodeId,
    pub to: NodeId,
    pub kind: RelationKind,
    /// Position of a fragment within its trajectory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    #[serde(default)]
    pub successes: u64,
    #[serde(default)]
    pub failures: u64,
    #[serde(default)]
    pub success_rate: f64,
}

impl Relation {
    /// Build an unsaved relation. The store assigns the id on insert.
    pub fn new(from: NodeId, to: NodeId, kind: RelationKind) -> Self {
        Self {
            id: RelationId(0),
            from,
            to,
            kind,
            order: None,
            similarity: None,
            successes: 0,
            failures: 0,
            success_rate: 0.0,
        }
    }

    pub fn with_order(mut self, order: usize) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_similarity(mut self, similarity: f64) -> Self {
        self.similarity = Some(similarity);
        self
    }

    pub fn record_outcome(&mut self, success: bool) {
        if success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
    }

    /// Recompute the stored success rate from the counters.
    /// Returns true if the value changed.
    pub fn refresh_success_rate(&mut self) -> bool {
        let rate = success_rate(self.successes, self.failures);
        let changed = (rate - self.success_rate).abs() > f64::EPSILON;
        self.success_rate = rate;
        changed
    }

    /// Whether the relation touches the given node on either side.
    pub fn touches(&self, id: &NodeId) -> bool {
        &self.from == id || &self.to == id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_success_rate() {
        let mut r = Relation::new("err_1".into(), "meth_1".into(), RelationKind::ResolvedBy);
        assert!(!r.refresh_success_rate());
        r.record_outcome(true);
        r.record_outcome(false);
        r.record_outcome(true);
        r.record_outcome(true);
        assert!(r.refresh_success_rate());
        assert_eq!(r.success_rate, 0.75);
        assert!(!r.refresh_success_rate());
    }
}
