use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use hindsight_core::error::CoreError;
use hindsight_core::providers::{EmbeddingProvider, StrategyGenerator, TemplateGenerator};
use hindsight_core::storage::GraphStore;
use hindsight_core::MemoryConfig;

use crate::error::ConsolidateError;
use crate::report::{ConsolidationReport, Pass};

/// Periodic batch job over the memory graph.
///
/// Holds no state of its own between runs: the result of `consolidate` is a
/// function of the store contents, so it can run inline after `learn` or be
/// handed to a background worker.
pub struct Consolidator {
    pub(crate) store: Arc<dyn GraphStore>,
    pub(crate) embedder: Arc<dyn EmbeddingProvider>,
    pub(crate) generator: Option<Arc<dyn StrategyGenerator>>,
    pub(crate) template: TemplateGenerator,
    pub(crate) config: MemoryConfig,
}

impl Consolidator {
    pub fn new(
        store: Arc<dyn GraphStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: MemoryConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            generator: None,
            template: TemplateGenerator,
            config,
        }
    }

    /// Use a natural-language generation service for strategy text. Without
    /// one, or when it fails, strategies come from the template.
    pub fn with_generator(mut self, generator: Arc<dyn StrategyGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Run all four passes in order.
    pub async fn consolidate(&self) -> ConsolidationReport {
        let mut report = ConsolidationReport::default();

        for pass in Pass::ORDER {
            let result = match pass {
                Pass::Abstraction => self.abstraction_pass(&mut report).await,
                Pass::Merge => self.merge_pass(&mut report).await,
                Pass::Statistics => self.statistics_pass(&mut report).await,
                Pass::Cleanup => self.cleanup_pass(&mut report).await,
            };
            if let Err(e) = result {
                warn!("Consolidation pass {pass} failed, continuing: {e}");
                report.failed_passes.push(pass);
            }
        }

        info!(
            "Consolidation done: {} methodologies created, {} fragments merged, {} edges and {} patterns refreshed, {} nodes cleaned, {} skipped",
            report.methodologies_created,
            report.fragments_merged,
            report.edges_refreshed,
            report.patterns_refreshed,
            report.nodes_cleaned,
            report.skipped
        );
        report
    }

    /// Await a store call under the configured budget.
    pub(crate) async fn call<T, F>(&self, operation: &'static str, fut: F) -> Result<T, ConsolidateError>
    where
        F: Future<Output = Result<T, CoreError>>,
    {
        match tokio::time::timeout(self.config.store_timeout(), fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ConsolidateError::Timeout(operation)),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;
    use hindsight_core::model::{
        ErrorPattern, Fragment, FragmentKind, MemoryNode, Methodology, NodeId, NodeLabel, Relation,
        RelationId, RelationKind, StepRange, Trajectory,
    };
    use hindsight_core::providers::HashingEmbedder;
    use hindsight_core::storage::{InMemoryGraphStore, NodeFilter};

    pub(crate) fn consolidator(store: &InMemoryGraphStore) -> Consolidator {
        Consolidator::new(
            Arc::new(store.clone()),
            Arc::new(HashingEmbedder::new(32)),
            MemoryConfig::default(),
        )
    }

    /// Store a trajectory owning one fragment per `(kind, category, actions)`.
    pub(crate) async fn seed_run(
        store: &InMemoryGraphStore,
        fragments: &[(FragmentKind, Option<&str>, &[&str])],
    ) -> Vec<NodeId> {
        let traj = Trajectory::new("i", "org/repo", true, fragments.len());
        let traj_id = store.insert_node(traj.into()).await.unwrap();
        let mut ids = Vec::new();
        for (i, (kind, category, actions)) in fragments.iter().enumerate() {
            let mut f = Fragment::new(
                StepRange::new(i, i).unwrap(),
                *kind,
                actions.iter().map(|a| a.to_string()).collect(),
            );
            f.description = format!("{}: {}", kind.title(), actions.join(", "));
            f.error_category = category.map(str::to_string);
            let id = store.insert_node(f.into()).await.unwrap();
            store
                .insert_relation(
                    Relation::new(traj_id.clone(), id.clone(), RelationKind::HasFragment).with_order(i),
                )
                .await
                .unwrap();
            if let Some(category) = category {
                let pattern = match store.find_error_pattern(category).await.unwrap() {
                    Some(p) => p.id,
                    None => store
                        .insert_node(ErrorPattern::new(*category).into())
                        .await
                        .unwrap(),
                };
                store
                    .merge_relation(Relation::new(id.clone(), pattern, RelationKind::Caused))
                    .await
                    .unwrap();
            }
            ids.push(id);
        }
        ids
    }

    pub(crate) async fn methodologies(store: &InMemoryGraphStore) -> Vec<Methodology> {
        store
            .find_nodes(NodeLabel::Methodology, &|_| true)
            .await
            .unwrap()
            .into_iter()
            .filter_map(MemoryNode::into_methodology)
            .collect()
    }

    /// Store whose first call to `fail_on` returns an error; everything else
    /// goes to the wrapped in-memory store.
    pub(crate) struct FlakyStore {
        inner: InMemoryGraphStore,
        fail_on: &'static str,
        tripped: AtomicBool,
    }

    impl FlakyStore {
        pub(crate) fn new(inner: &InMemoryGraphStore, fail_on: &'static str) -> Self {
            Self {
                inner: inner.clone(),
                fail_on,
                tripped: AtomicBool::new(false),
            }
        }

        fn check(&self, op: &'static str) -> Result<(), CoreError> {
            if op == self.fail_on && !self.tripped.swap(true, Ordering::SeqCst) {
                return Err(CoreError::Store(format!("{op} unavailable")));
            }
            Ok(())
        }

        pub(crate) fn consolidator(self) -> Consolidator {
            Consolidator::new(
                Arc::new(self),
                Arc::new(HashingEmbedder::new(32)),
                MemoryConfig::default(),
            )
        }
    }

    #[async_trait]
    impl GraphStore for FlakyStore {
        async fn insert_node(&self, node: MemoryNode) -> Result<NodeId, CoreError> {
            self.check("insert_node")?;
            self.inner.insert_node(node).await
        }

        async fn update_node(&self, node: MemoryNode) -> Result<(), CoreError> {
            self.check("update_node")?;
            self.inner.update_node(node).await
        }

        async fn get_node(&self, id: &NodeId) -> Result<Option<MemoryNode>, CoreError> {
            self.inner.get_node(id).await
        }

        async fn find_nodes(
            &self,
            label: NodeLabel,
            filter: NodeFilter<'_>,
        ) -> Result<Vec<MemoryNode>, CoreError> {
            self.inner.find_nodes(label, filter).await
        }

        async fn count(&self, label: NodeLabel) -> Result<usize, CoreError> {
            self.inner.count(label).await
        }

        async fn insert_relation(&self, relation: Relation) -> Result<RelationId, CoreError> {
            self.inner.insert_relation(relation).await
        }

        async fn merge_relation(&self, relation: Relation) -> Result<RelationId, CoreError> {
            self.check("merge_relation")?;
            self.inner.merge_relation(relation).await
        }

        async fn update_relation(&self, relation: Relation) -> Result<(), CoreError> {
            self.check("update_relation")?;
            self.inner.update_relation(relation).await
        }

        async fn relations(&self, kind: RelationKind) -> Result<Vec<Relation>, CoreError> {
            self.inner.relations(kind).await
        }

        async fn relations_from(
            &self,
            id: &NodeId,
            kind: Option<RelationKind>,
        ) -> Result<Vec<Relation>, CoreError> {
            self.inner.relations_from(id, kind).await
        }

        async fn relations_to(
            &self,
            id: &NodeId,
            kind: Option<RelationKind>,
        ) -> Result<Vec<Relation>, CoreError> {
            self.inner.relations_to(id, kind).await
        }

        async fn neighbors(
            &self,
            id: &NodeId,
            kind: RelationKind,
            max_hops: usize,
        ) -> Result<Vec<MemoryNode>, CoreError> {
            self.inner.neighbors(id, kind, max_hops).await
        }

        async fn redirect_relations(&self, from: &NodeId, to: &NodeId) -> Result<usize, CoreError> {
            self.check("redirect_relations")?;
            self.inner.redirect_relations(from, to).await
        }

        async fn delete_node(&self, id: &NodeId) -> Result<bool, CoreError> {
            self.check("delete_node")?;
            self.inner.delete_node(id).await
        }

        async fn delete_nodes_where(
            &self,
            label: NodeLabel,
            filter: NodeFilter<'_>,
        ) -> Result<Vec<NodeId>, CoreError> {
            self.inner.delete_nodes_where(label, filter).await
        }
    }

    #[tokio::test]
    async fn test_full_run_is_idempotent() {
        let store = InMemoryGraphStore::new();
        let a = seed_run(
            &store,
            &[
                (FragmentKind::Exploration, None, &["open", "search"]),
                (FragmentKind::ErrorRecovery, Some("TypeError"), &["run", "edit"]),
            ],
        )
        .await;
        let b = seed_run(
            &store,
            &[(FragmentKind::ErrorRecovery, Some("TypeError"), &["python", "open", "pytest"])],
        )
        .await;
        // A stray pattern nothing points at.
        store.insert_node(ErrorPattern::new("KeyError").into()).await.unwrap();

        let c = consolidator(&store);
        let first = c.consolidate().await;
        assert_eq!(first.methodologies_created, 1);
        assert_eq!(first.fragments_abstracted, 2);
        assert_eq!(first.nodes_cleaned, 1);
        assert!(first.failed_passes.is_empty());

        let meths = methodologies(&store).await;
        assert_eq!(meths.len(), 1);
        assert_eq!(meths[0].source_fragments, vec![a[1].clone(), b[0].clone()]);

        let second = c.consolidate().await;
        assert_eq!(second.methodologies_created, 0);
        assert_eq!(second.nodes_cleaned, 0);
        assert!(!second.changed());
        assert_eq!(methodologies(&store).await.len(), 1);
    }
}
