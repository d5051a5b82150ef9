use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use hindsight_core::model::{Fragment, Methodology, NodeId};

/// One of the four independent retrieval sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Error,
    Task,
    State,
    Semantic,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [Self::Error, Self::Task, Self::State, Self::Semantic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Task => "task",
            Self::State => "state",
            Self::Semantic => "semantic",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ranked bundle returned for one query.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Recall {
    pub methodologies: Vec<Methodology>,
    pub fragments: Vec<Fragment>,
    pub warnings: Vec<String>,
    /// Dimensions that failed or timed out. The rest of the recall is still valid.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<Dimension>,
}

impl Recall {
    pub fn is_empty(&self) -> bool {
        self.methodologies.is_empty() && self.fragments.is_empty() && self.warnings.is_empty()
    }

    /// Plain-text rendering suitable for an agent prompt.
    pub fn render(&self) -> String {
        if self.is_empty() {
            return "No relevant memories.".to_string();
        }
        let mut out = String::new();
        if !self.warnings.is_empty() {
            out.push_str("Warnings:\n");
            for w in &self.warnings {
                out.push_str(&format!("- {w}\n"));
            }
        }
        if !self.methodologies.is_empty() {
            out.push_str("Strategies:\n");
            for m in &self.methodologies {
                out.push_str(&format!(
                    "- [{:.2}] {}: {}\n",
                    m.confidence, m.situation, m.strategy
                ));
            }
        }
        if !self.fragments.is_empty() {
            out.push_str("Past experience:\n");
            for f in &self.fragments {
                out.push_str(&format!("- ({}) {}\n", f.outcome.as_str(), f.description));
            }
        }
        out.trim_end().to_string()
    }
}

/// Deduplicate by identity keeping the first occurrence, then rank by
/// confidence (stable, so ties keep first-seen order) and truncate.
pub fn fuse_methodologies<I>(sources: I, top_k: usize) -> Vec<Methodology>
where
    I: IntoIterator<Item = Vec<Methodology>>,
{
    let mut fused = dedupe(sources, |m| &m.id);
    fused.sort_by(by_confidence);
    fused.truncate(top_k);
    fused
}

/// Deduplicate by identity keeping the first occurrence, then rank by
/// outcome and recency and truncate.
pub fn fuse_fragments<I>(sources: I, top_k: usize) -> Vec<Fragment>
where
    I: IntoIterator<Item = Vec<Fragment>>,
{
    let mut fused = dedupe(sources, |f| &f.id);
    fused.sort_by(|a, b| {
        b.outcome
            .rank()
            .cmp(&a.outcome.rank())
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    fused.truncate(top_k);
    fused
}

pub(crate) fn by_confidence(a: &Methodology, b: &Methodology) -> Ordering {
    b.confidence.total_cmp(&a.confidence)
}

fn dedupe<T, I, F>(sources: I, key: F) -> Vec<T>
where
    I: IntoIterator<Item = Vec<T>>,
    F: Fn(&T) -> &NodeId,
{
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut out = Vec::new();
    for item in sources.into_iter().flatten() {
        if seen.insert(key(&item).clone()) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hindsight_core::model::{FragmentKind, StepRange};

    fn meth(conf: f64) -> Methodology {
        Methodology::new("when encountering X", "do y").with_prior(conf)
    }

    #[test]
    fn test_methodology_fusion_dedupes_and_ranks() {
        let a = meth(0.4);
        let b = meth(0.9);
        let c = meth(0.4);
        let fused = fuse_methodologies(
            vec![vec![a.clone(), b.clone()], vec![b.clone(), c.clone()]],
            5,
        );
        let ids: Vec<&NodeId> = fused.iter().map(|m| &m.id).collect();
        // b first by confidence; a before c since a was seen first.
        assert_eq!(ids, vec![&b.id, &a.id, &c.id]);

        assert_eq!(fuse_methodologies(vec![vec![a, b, c]], 2).len(), 2);
    }

    #[test]
    fn test_fragment_fusion_prefers_outcome_then_recency() {
        let range = StepRange::new(0, 1).unwrap();
        let explore = Fragment::new(range, FragmentKind::Exploration, vec![]);
        let mut old_fix = Fragment::new(range, FragmentKind::SuccessfulFix, vec![]);
        old_fix.created_at -= chrono::Duration::hours(1);
        let new_fix = Fragment::new(range, FragmentKind::SuccessfulFix, vec![]);
        let recovered = Fragment::new(range, FragmentKind::ErrorRecovery, vec![]);

        let fused = fuse_fragments(
            vec![
                vec![explore.clone(), old_fix.clone()],
                vec![recovered.clone(), new_fix.clone(), explore.clone()],
            ],
            10,
        );
        let ids: Vec<&NodeId> = fused.iter().map(|f| &f.id).collect();
        assert_eq!(ids, vec![&new_fix.id, &old_fix.id, &recovered.id, &explore.id]);
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(Recall::default().render(), "No relevant memories.");
    }

    #[test]
    fn test_render_sections() {
        let recall = Recall {
            methodologies: vec![meth(0.5)],
            warnings: vec!["TypeError: check types".into()],
            ..Default::default()
        };
        let text = recall.render();
        assert!(text.starts_with("Warnings:\n- TypeError: check types"));
        assert!(text.contains("- [0.50] when encountering X: do y"));
        assert!(!text.contains("Past experience"));
    }
}
