use tracing::{debug, warn};

use hindsight_core::model::{ErrorPattern, MemoryNode, NodeLabel, RelationKind};

use crate::consolidator::Consolidator;
use crate::error::ConsolidateError;
use crate::report::ConsolidationReport;

impl Consolidator {
    /// Recompute resolved_by success rates from their counters and set each
    /// ErrorPattern's frequency to the number of fragments causing it.
    pub(crate) async fn statistics_pass(
        &self,
        report: &mut ConsolidationReport,
    ) -> Result<(), ConsolidateError> {
        let edges = self
            .call("list resolved_by", self.store.relations(RelationKind::ResolvedBy))
            .await?;
        for mut edge in edges {
            if !edge.refresh_success_rate() {
                continue;
            }
            let id = edge.id;
            match self.call("update resolved_by", self.store.update_relation(edge)).await {
                Ok(_) => report.edges_refreshed += 1,
                Err(e) => {
                    warn!("Skipping resolved_by {id}: {e}");
                    report.skipped += 1;
                }
            }
        }

        let patterns = self
            .call(
                "list error patterns",
                self.store.find_nodes(NodeLabel::ErrorPattern, &|_| true),
            )
            .await?;
        for pattern in patterns.into_iter().filter_map(MemoryNode::into_error_pattern) {
            let category = pattern.category.clone();
            match self.refresh_frequency(pattern).await {
                Ok(true) => report.patterns_refreshed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("Skipping {category} pattern: {e}");
                    report.skipped += 1;
                }
            }
        }
        Ok(())
    }

    async fn refresh_frequency(&self, mut pattern: ErrorPattern) -> Result<bool, ConsolidateError> {
        let causes = self
            .call(
                "count causes",
                self.store.relations_to(&pattern.id, Some(RelationKind::Caused)),
            )
            .await?
            .len() as u64;
        if causes == pattern.frequency {
            return Ok(false);
        }
        debug!(
            "Refreshing {} frequency {} -> {causes}",
            pattern.category, pattern.frequency
        );
        pattern.frequency = causes;
        self.call("update error pattern", self.store.update_node(pattern.into()))
            .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use hindsight_core::model::{FragmentKind, Methodology, Relation};
    use hindsight_core::storage::{GraphStore, InMemoryGraphStore};

    use super::*;
    use crate::consolidator::tests::{consolidator, seed_run};

    #[tokio::test]
    async fn test_edges_and_patterns_refresh_once() {
        let store = InMemoryGraphStore::new();
        seed_run(
            &store,
            &[
                (FragmentKind::FailedAttempt, Some("ImportError"), &["edit"]),
                (FragmentKind::ErrorRecovery, Some("ImportError"), &["pip"]),
            ],
        )
        .await;
        let mut pattern = store.find_error_pattern("ImportError").await.unwrap().unwrap();
        pattern.frequency = 7;
        store.update_node(pattern.clone().into()).await.unwrap();

        let meth = store
            .insert_node(Methodology::new("when encountering ImportError", "pip install").into())
            .await
            .unwrap();
        let mut edge = Relation::new(pattern.id.clone(), meth, RelationKind::ResolvedBy);
        edge.record_outcome(true);
        edge.record_outcome(true);
        edge.record_outcome(false);
        store.insert_relation(edge).await.unwrap();

        let c = consolidator(&store);
        let mut report = ConsolidationReport::default();
        c.statistics_pass(&mut report).await.unwrap();
        assert_eq!(report.edges_refreshed, 1);
        assert_eq!(report.patterns_refreshed, 1);

        let edge = &store.relations(RelationKind::ResolvedBy).await.unwrap()[0];
        assert!((edge.success_rate - 2.0 / 3.0).abs() < 1e-9);
        let pattern = store.find_error_pattern("ImportError").await.unwrap().unwrap();
        assert_eq!(pattern.frequency, 2);

        let mut again = ConsolidationReport::default();
        c.statistics_pass(&mut again).await.unwrap();
        assert_eq!(again, ConsolidationReport::default());
    }

    #[tokio::test]
    async fn test_unreferenced_pattern_drops_to_zero() {
        let store = InMemoryGraphStore::new();
        let mut p = ErrorPattern::new("OSError");
        p.frequency = 3;
        store.insert_node(p.into()).await.unwrap();

        let mut report = ConsolidationReport::default();
        consolidator(&store).statistics_pass(&mut report).await.unwrap();
        assert_eq!(report.patterns_refreshed, 1);
        let p = store.find_error_pattern("OSError").await.unwrap().unwrap();
        assert_eq!(p.frequency, 0);
    }
}
