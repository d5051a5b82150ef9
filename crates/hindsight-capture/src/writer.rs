use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use hindsight_core::loops::LoopDetector;
use hindsight_core::model::{
    ErrorPattern, Fragment, MemoryNode, NodeId, NodeLabel, Relation, RelationKind, TaskCategory,
    Trajectory,
};
use hindsight_core::providers::{cosine_similarity, guarded, EmbeddingProvider};
use hindsight_core::storage::GraphStore;
use hindsight_core::MemoryConfig;

use crate::error::CaptureError;
use crate::labeling::label_loops;
use crate::patterns::{categories_in, extract_error_patterns, PatternCandidate};
use crate::segment::Segmenter;
use crate::summary::summarize;
use crate::trajectory::RawTrajectory;

const PROBLEM_EXCERPT_CHARS: usize = 500;

/// What a single trajectory write produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WriteReport {
    pub trajectory_id: Option<NodeId>,
    pub fragments: usize,
    pub loops_labeled: usize,
    pub error_patterns: usize,
    pub similarity_links: usize,
    /// Individual node or relation writes that failed and were skipped.
    pub skipped_writes: usize,
    /// The trajectory's source was already ingested; nothing was written.
    pub duplicate: bool,
}

/// Ingests finished trajectories: segments them, extracts error patterns,
/// embeds the results and writes everything to the graph store.
pub struct MemoryWriter {
    store: Arc<dyn GraphStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: MemoryConfig,
    segmenter: Segmenter,
    detector: LoopDetector,
}

impl MemoryWriter {
    pub fn new(
        store: Arc<dyn GraphStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: MemoryConfig,
    ) -> Self {
        Self {
            segmenter: Segmenter::new(config.description_actions),
            detector: LoopDetector::from_config(&config),
            store,
            embedder,
            config,
        }
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    /// Write one trajectory. Fails only on malformed input or when the
    /// trajectory record itself cannot be stored; everything after that is
    /// best-effort and counted in `skipped_writes`.
    pub async fn write_trajectory(&self, raw: &RawTrajectory) -> Result<WriteReport, CaptureError> {
        raw.validate()?;

        if let Some(existing) = self.find_duplicate(raw).await {
            info!(
                "Skipping {}: source already ingested as {existing}",
                raw.instance_id
            );
            return Ok(WriteReport {
                trajectory_id: Some(existing),
                duplicate: true,
                ..Default::default()
            });
        }

        let mut trajectory = Trajectory::new(
            raw.instance_id.clone(),
            raw.repo.clone(),
            raw.success,
            raw.total_steps(),
        );
        trajectory.task_category = TaskCategory::infer(&raw.problem_statement);
        trajectory.summary = summarize(raw, self.config.description_actions);
        trajectory.problem_statement = raw
            .problem_statement
            .chars()
            .take(PROBLEM_EXCERPT_CHARS)
            .collect();
        trajectory.source_hash = raw.source_hash.clone();

        let mut fragments = self.segmenter.segment(&raw.steps, raw.success);
        let loops_labeled = label_loops(
            &mut fragments,
            &raw.steps,
            &self.detector,
            &self.segmenter,
        );
        let candidates = extract_error_patterns(&raw.steps, self.config.pattern_keywords);

        self.embed(&mut trajectory, &mut fragments).await;

        // Snapshot of fragments stored before this trajectory, for similarity links.
        let existing = self.embedded_fragments().await;

        let trajectory_id = trajectory.id.clone();
        let stored = guarded(
            "store trajectory",
            self.config.store_timeout(),
            self.store.insert_node(trajectory.into()),
        )
        .await;
        if stored.is_none() {
            return Err(CaptureError::Store(format!(
                "failed to store trajectory {}",
                raw.instance_id
            )));
        }

        let mut report = WriteReport {
            trajectory_id: Some(trajectory_id.clone()),
            loops_labeled,
            ..Default::default()
        };

        let mut stored_fragments = Vec::with_capacity(fragments.len());
        for (order, fragment) in fragments.into_iter().enumerate() {
            let frag_id = fragment.id.clone();
            let inserted = guarded(
                "store fragment",
                self.config.store_timeout(),
                self.store.insert_node(fragment.clone().into()),
            )
            .await;
            if inserted.is_none() {
                report.skipped_writes += 1;
                continue;
            }
            let linked = self
                .relate(
                    Relation::new(trajectory_id.clone(), frag_id, RelationKind::HasFragment)
                        .with_order(order),
                )
                .await;
            if !linked {
                report.skipped_writes += 1;
            }
            stored_fragments.push(fragment);
        }
        report.fragments = stored_fragments.len();

        let pattern_ids = self.upsert_patterns(&candidates, &raw.repo, &mut report).await;
        report.error_patterns = pattern_ids.len();

        for fragment in &stored_fragments {
            for category in categories_in(&raw.steps, fragment.step_range) {
                let Some(pattern_id) = pattern_ids.get(&category) else {
                    continue;
                };
                let rel = Relation::new(fragment.id.clone(), pattern_id.clone(), RelationKind::Caused);
                if !self.merge(rel).await {
                    report.skipped_writes += 1;
                }
            }
        }

        for fragment in &stored_fragments {
            if fragment.embedding.is_empty() {
                continue;
            }
            for other in &existing {
                if other.kind != fragment.kind {
                    continue;
                }
                let similarity = cosine_similarity(&fragment.embedding, &other.embedding);
                if similarity < self.config.similarity_link_threshold {
                    continue;
                }
                let rel = Relation::new(fragment.id.clone(), other.id.clone(), RelationKind::SimilarTo)
                    .with_similarity(similarity);
                if self.relate(rel).await {
                    report.similarity_links += 1;
                } else {
                    report.skipped_writes += 1;
                }
            }
        }

        info!(
            "Wrote trajectory {trajectory_id} ({}) with {} fragments, {} error patterns",
            raw.instance_id, report.fragments, report.error_patterns
        );
        Ok(report)
    }

    async fn find_duplicate(&self, raw: &RawTrajectory) -> Option<NodeId> {
        let hash = raw.source_hash.as_deref()?;
        let found = guarded(
            "find duplicate trajectory",
            self.config.store_timeout(),
            self.store.find_nodes(NodeLabel::Trajectory, &|n| {
                n.as_trajectory()
                    .is_some_and(|t| t.source_hash.as_deref() == Some(hash))
            }),
        )
        .await?;
        found.first().map(|n| n.id().clone())
    }

    /// Embed the trajectory summary and fragment texts in one batch. On any
    /// provider failure the embeddings stay empty.
    async fn embed(&self, trajectory: &mut Trajectory, fragments: &mut [Fragment]) {
        let mut texts = Vec::with_capacity(fragments.len() + 1);
        texts.push(trajectory.summary.clone());
        texts.extend(fragments.iter().map(fragment_text));

        let Some(vectors) = guarded(
            "embed trajectory",
            self.config.embed_timeout(),
            self.embedder.embed_batch(&texts),
        )
        .await
        else {
            return;
        };
        if vectors.len() != texts.len() {
            warn!(
                "Embedding provider returned {} vectors for {} texts, ignoring",
                vectors.len(),
                texts.len()
            );
            return;
        }

        let mut vectors = vectors.into_iter();
        if let Some(v) = vectors.next() {
            trajectory.embedding = v;
        }
        for (fragment, v) in fragments.iter_mut().zip(vectors) {
            fragment.embedding = v;
        }
    }

    async fn embedded_fragments(&self) -> Vec<Fragment> {
        guarded(
            "load fragments",
            self.config.store_timeout(),
            self.store.find_nodes(NodeLabel::Fragment, &|n| {
                n.as_fragment().is_some_and(|f| !f.embedding.is_empty())
            }),
        )
        .await
        .unwrap_or_default()
        .into_iter()
        .filter_map(MemoryNode::into_fragment)
        .collect()
    }

    /// Merge candidates into stored ErrorPatterns by category.
    async fn upsert_patterns(
        &self,
        candidates: &[PatternCandidate],
        repo: &str,
        report: &mut WriteReport,
    ) -> HashMap<String, NodeId> {
        let mut ids = HashMap::new();
        for candidate in candidates {
            let existing = guarded(
                "find error pattern",
                self.config.store_timeout(),
                self.store.find_error_pattern(&candidate.category),
            )
            .await;
            let Some(existing) = existing else {
                report.skipped_writes += 1;
                continue;
            };

            let (mut pattern, is_new) = match existing {
                Some(p) => (p, false),
                None => {
                    let mut p = ErrorPattern::new(candidate.category.clone());
                    p.context = repo.to_string();
                    (p, true)
                }
            };
            pattern.absorb(
                candidate.keywords.iter().cloned(),
                candidate.occurrences,
                self.config.pattern_keywords,
            );
            let id = pattern.id.clone();
            let node = MemoryNode::from(pattern);
            let written = if is_new {
                guarded(
                    "create error pattern",
                    self.config.store_timeout(),
                    self.store.insert_node(node),
                )
                .await
                .map(|_| ())
            } else {
                guarded(
                    "update error pattern",
                    self.config.store_timeout(),
                    self.store.update_node(node),
                )
                .await
            };
            match written {
                Some(()) => {
                    debug!("Recorded error pattern {} ({id})", candidate.category);
                    ids.insert(candidate.category.clone(), id);
                }
                None => report.skipped_writes += 1,
            }
        }
        ids
    }

    async fn relate(&self, relation: Relation) -> bool {
        guarded(
            "store relation",
            self.config.store_timeout(),
            self.store.insert_relation(relation),
        )
        .await
        .is_some()
    }

    async fn merge(&self, relation: Relation) -> bool {
        guarded(
            "merge relation",
            self.config.store_timeout(),
            self.store.merge_relation(relation),
        )
        .await
        .is_some()
    }
}

/// Text embedded for a fragment: its description plus its error category.
pub fn fragment_text(fragment: &Fragment) -> String {
    match &fragment.error_category {
        Some(category) => format!("{} ({category})", fragment.description),
        None => fragment.description.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hindsight_core::model::FragmentKind;
    use hindsight_core::providers::HashingEmbedder;
    use hindsight_core::storage::InMemoryGraphStore;
    use hindsight_core::CoreError;

    struct DownEmbedder;

    #[async_trait]
    impl EmbeddingProvider for DownEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, CoreError> {
            Err(CoreError::Provider("embedding service unavailable".into()))
        }

        fn dimension(&self) -> usize {
            8
        }
    }

    fn writer(store: &InMemoryGraphStore) -> MemoryWriter {
        MemoryWriter::new(
            Arc::new(store.clone()),
            Arc::new(HashingEmbedder::new(64)),
            MemoryConfig::default(),
        )
    }

    fn type_error_run(id: &str) -> RawTrajectory {
        RawTrajectory::new(id, "org/calc", true)
            .problem("Fix crash when adding None")
            .step("open", "opened calc.py")
            .step("search", "2 matches")
            .step("edit", "edited")
            .step("run", "TypeError: unsupported operand type(s) for +: 'int' and 'NoneType'")
            .step("edit", "edited")
            .step("submit", "submitted")
    }

    #[tokio::test]
    async fn test_write_creates_graph() {
        let store = InMemoryGraphStore::new();
        let report = writer(&store)
            .write_trajectory(&type_error_run("calc-1"))
            .await
            .unwrap();

        assert_eq!(report.fragments, 3);
        assert_eq!(report.error_patterns, 1);
        assert_eq!(report.skipped_writes, 0);
        assert!(!report.duplicate);

        let traj_id = report.trajectory_id.unwrap();
        let traj = store.get_node(&traj_id).await.unwrap().unwrap();
        let traj = traj.as_trajectory().unwrap();
        assert_eq!(traj.task_category, TaskCategory::BugFix);
        assert_eq!(traj.total_steps, 6);
        assert!(traj.summary.starts_with("Trajectory succeeded after 6 steps."));
        assert_eq!(traj.embedding.len(), 64);

        let owned = store.relations_from(&traj_id, Some(RelationKind::HasFragment)).await.unwrap();
        let orders: Vec<Option<usize>> = owned.iter().map(|r| r.order).collect();
        assert_eq!(orders, vec![Some(0), Some(1), Some(2)]);

        let pattern = store.find_error_pattern("TypeError").await.unwrap().unwrap();
        assert_eq!(pattern.frequency, 1);
        assert_eq!(pattern.context, "org/calc");
        let caused = store.relations_to(&pattern.id, Some(RelationKind::Caused)).await.unwrap();
        assert_eq!(caused.len(), 1);
        let cause = store.get_node(&caused[0].from).await.unwrap().unwrap();
        assert_eq!(cause.as_fragment().unwrap().kind, FragmentKind::ErrorRecovery);
    }

    #[tokio::test]
    async fn test_second_write_merges_pattern_and_links_similar() {
        let store = InMemoryGraphStore::new();
        let w = writer(&store);
        w.write_trajectory(&type_error_run("calc-1")).await.unwrap();
        let report = w.write_trajectory(&type_error_run("calc-2")).await.unwrap();

        let pattern = store.find_error_pattern("TypeError").await.unwrap().unwrap();
        assert_eq!(pattern.frequency, 2);
        assert_eq!(store.count(NodeLabel::ErrorPattern).await.unwrap(), 1);

        // Identical fragment texts embed identically, so each new fragment
        // links to its twin from the first run.
        assert_eq!(report.similarity_links, 3);
        let links = store.relations(RelationKind::SimilarTo).await.unwrap();
        assert!(links.iter().all(|r| r.similarity.unwrap_or(0.0) > 0.99));
    }

    #[tokio::test]
    async fn test_duplicate_source_is_skipped() {
        let store = InMemoryGraphStore::new();
        let w = writer(&store);
        let mut raw = type_error_run("calc-1");
        raw.source_hash = Some("abc123".into());

        let first = w.write_trajectory(&raw).await.unwrap();
        let second = w.write_trajectory(&raw).await.unwrap();
        assert!(second.duplicate);
        assert_eq!(second.trajectory_id, first.trajectory_id);
        assert_eq!(store.count(NodeLabel::Trajectory).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_embedding_outage_degrades_to_empty_embeddings() {
        let store = InMemoryGraphStore::new();
        let w = MemoryWriter::new(
            Arc::new(store.clone()),
            Arc::new(DownEmbedder),
            MemoryConfig::default(),
        );
        let report = w.write_trajectory(&type_error_run("calc-1")).await.unwrap();
        assert_eq!(report.fragments, 3);
        assert_eq!(report.similarity_links, 0);

        let traj = store
            .get_node(report.trajectory_id.as_ref().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(traj.embedding().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_input_fails_fast() {
        let store = InMemoryGraphStore::new();
        let raw = RawTrajectory::new("", "org/repo", true);
        assert!(matches!(
            writer(&store).write_trajectory(&raw).await,
            Err(CaptureError::InvalidTrajectory(_))
        ));
        assert_eq!(store.count(NodeLabel::Trajectory).await.unwrap(), 0);
    }
}
