use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use hindsight_core::model::{
    Fragment, MemoryNode, Methodology, NodeId, NodeLabel, RelationKind, State,
};
use hindsight_core::providers::{cosine_similarity, guarded, EmbeddingProvider};
use hindsight_core::signals;
use hindsight_core::storage::GraphStore;
use hindsight_core::MemoryConfig;

use crate::error::QueryError;
use crate::recall::{by_confidence, fuse_fragments, fuse_methodologies, Dimension, Recall};
use crate::warnings::{category_hint, frequency_note};

/// What a single dimension contributed.
#[derive(Debug, Default)]
struct Hits {
    methodologies: Vec<Methodology>,
    fragments: Vec<Fragment>,
    /// Stored frequency of the queried error category, when one was found.
    pattern_frequency: Option<u64>,
}

/// Answers "what do I know that helps here?" for a running agent.
///
/// Four dimensions run concurrently, each under its own time budget. A
/// dimension that fails or times out is reported in [`Recall::degraded`]
/// and contributes nothing; the others are unaffected.
pub struct Retriever {
    store: Arc<dyn GraphStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: MemoryConfig,
}

impl Retriever {
    pub fn new(
        store: Arc<dyn GraphStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: MemoryConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Retrieve ranked methodologies, fragments and warnings for `state`.
    ///
    /// The state's embedding is computed on first use and cached on the state.
    pub async fn retrieve(&self, state: &mut State) -> Recall {
        let store_budget = self.config.store_timeout();
        let semantic_budget = self.config.embed_timeout() + store_budget;

        let (error, task, phase, semantic) = {
            let state: &State = state;
            tokio::join!(
                run(Dimension::Error, store_budget, self.error_dimension(state)),
                run(Dimension::Task, store_budget, self.task_dimension(state)),
                run(Dimension::State, store_budget, self.state_dimension(state)),
                run(Dimension::Semantic, semantic_budget, self.semantic_dimension(state)),
            )
        };

        let mut degraded = Vec::new();
        let semantic = match semantic {
            Some((hits, embedding)) => {
                if state.embedding.is_empty() && !embedding.is_empty() {
                    state.embedding = embedding;
                }
                Some(hits)
            }
            None => None,
        };
        let results = [
            (Dimension::Error, error),
            (Dimension::Task, task),
            (Dimension::State, phase),
            (Dimension::Semantic, semantic),
        ];

        let mut methodology_sources = Vec::new();
        let mut fragment_sources = Vec::new();
        let mut pattern_frequency = None;
        for (dimension, result) in results {
            let Some(hits) = result else {
                degraded.push(dimension);
                continue;
            };
            pattern_frequency = pattern_frequency.or(hits.pattern_frequency);
            methodology_sources.push(hits.methodologies);
            fragment_sources.push(hits.fragments);
        }

        let recall = Recall {
            methodologies: fuse_methodologies(methodology_sources, self.config.top_k),
            fragments: fuse_fragments(fragment_sources, self.config.top_k),
            warnings: warnings_for(state, pattern_frequency),
            degraded,
        };
        debug!(
            "Recall: {} methodologies, {} fragments, {} warnings, degraded {:?}",
            recall.methodologies.len(),
            recall.fragments.len(),
            recall.warnings.len(),
            recall.degraded
        );
        recall
    }

    /// Methodologies that got agents out of `category` before: those derived
    /// from fragments of that category plus those resolving its ErrorPattern,
    /// ranked by confidence. Empty on any store failure.
    pub async fn escape_suggestions(&self, category: &str, limit: usize) -> Vec<Methodology> {
        guarded(
            "escape suggestions",
            self.config.store_timeout(),
            self.escape_candidates(category),
        )
        .await
        .map(|sources| fuse_methodologies(sources, limit))
        .unwrap_or_default()
    }

    async fn escape_candidates(&self, category: &str) -> Result<Vec<Vec<Methodology>>, QueryError> {
        let fragments = self
            .store
            .find_nodes(NodeLabel::Fragment, &|n| {
                n.as_fragment()
                    .is_some_and(|f| f.error_category.as_deref() == Some(category))
            })
            .await?;

        let mut derived = Vec::new();
        for fragment in &fragments {
            let found = self
                .store
                .neighbors(fragment.id(), RelationKind::DerivedInto, 1)
                .await?;
            derived.extend(found.into_iter().filter_map(MemoryNode::into_methodology));
        }
        derived.sort_by(by_confidence);

        let resolving = self.resolving(category).await?;
        Ok(vec![derived, resolving])
    }

    /// Methodologies linked to the ErrorPattern of `category` via resolved_by.
    async fn resolving(&self, category: &str) -> Result<Vec<Methodology>, QueryError> {
        let Some(pattern) = self.store.find_error_pattern(category).await? else {
            return Ok(Vec::new());
        };
        let mut out: Vec<Methodology> = self
            .store
            .neighbors(&pattern.id, RelationKind::ResolvedBy, 1)
            .await?
            .into_iter()
            .filter_map(MemoryNode::into_methodology)
            .collect();
        out.sort_by(by_confidence);
        Ok(out)
    }

    async fn error_dimension(&self, state: &State) -> Result<Hits, QueryError> {
        if !state.has_error() {
            return Ok(Hits::default());
        }
        let limit = self.config.dimension_limit;

        let Some(category) = signals::error_category(&state.current_error) else {
            // Unclassified error text: fall back to any error-handling strategy.
            let mut methodologies = self
                .methodologies_where(|m| m.situation.to_lowercase().contains("error"))
                .await?;
            methodologies.sort_by(by_confidence);
            methodologies.truncate(limit);
            return Ok(Hits {
                methodologies,
                ..Default::default()
            });
        };

        let pattern_frequency = self
            .store
            .find_error_pattern(&category)
            .await?
            .map(|p| p.frequency);
        let mut methodologies = self.resolving(&category).await?;
        methodologies.truncate(limit);
        Ok(Hits {
            methodologies,
            pattern_frequency,
            ..Default::default()
        })
    }

    /// Fragments from successful trajectories, best outcome first. Text
    /// overlap with the task only breaks ties; it never excludes a fragment.
    async fn task_dimension(&self, state: &State) -> Result<Hits, QueryError> {
        let successful = self
            .store
            .find_nodes(NodeLabel::Trajectory, &|n| {
                n.as_trajectory().is_some_and(|t| t.success)
            })
            .await?;
        if successful.is_empty() {
            return Ok(Hits::default());
        }

        let query_terms: HashSet<String> = signals::keywords(
            &format!("{} {}", state.task_description, state.repo_summary),
            usize::MAX,
        )
        .into_iter()
        .collect();
        let relevance: HashMap<NodeId, usize> = successful
            .iter()
            .filter_map(MemoryNode::as_trajectory)
            .map(|t| {
                let text = format!("{} {} {}", t.repo, t.problem_statement, t.summary);
                let overlap = signals::keywords(&text, usize::MAX)
                    .iter()
                    .filter(|k| query_terms.contains(*k))
                    .count();
                (t.id.clone(), overlap)
            })
            .collect();

        let mut owner: HashMap<NodeId, usize> = HashMap::new();
        for rel in self.store.relations(RelationKind::HasFragment).await? {
            if let Some(score) = relevance.get(&rel.from) {
                let entry = owner.entry(rel.to).or_default();
                *entry = (*entry).max(*score);
            }
        }

        let mut fragments: Vec<Fragment> = self
            .store
            .find_nodes(NodeLabel::Fragment, &|n| owner.contains_key(n.id()))
            .await?
            .into_iter()
            .filter_map(MemoryNode::into_fragment)
            .collect();
        fragments.sort_by(|a, b| {
            let score = |f: &Fragment| owner.get(&f.id).copied().unwrap_or(0);
            b.outcome
                .rank()
                .cmp(&a.outcome.rank())
                .then_with(|| score(b).cmp(&score(a)))
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        fragments.truncate(self.config.dimension_limit);
        Ok(Hits {
            fragments,
            ..Default::default()
        })
    }

    async fn state_dimension(&self, state: &State) -> Result<Hits, QueryError> {
        let phase = state.phase.as_str();
        let mut methodologies = self
            .methodologies_where(|m| m.situation.to_lowercase().contains(phase))
            .await?;
        methodologies.sort_by(by_confidence);
        methodologies.truncate(self.config.dimension_limit);
        Ok(Hits {
            methodologies,
            ..Default::default()
        })
    }

    /// Returns the hits together with the state embedding used.
    async fn semantic_dimension(&self, state: &State) -> Result<(Hits, Vec<f32>), QueryError> {
        let query = if state.embedding.is_empty() {
            self.embedder
                .embed(&state.situation())
                .await
                .map_err(|e| QueryError::Embedding(e.to_string()))?
        } else {
            state.embedding.clone()
        };
        if query.is_empty() {
            return Ok((Hits::default(), query));
        }
        let limit = self.config.dimension_limit;

        let fragments = ranked_by_similarity(
            &query,
            self.store
                .find_nodes(NodeLabel::Fragment, &|n| !n.embedding().is_empty())
                .await?,
            limit,
        )
        .into_iter()
        .filter_map(MemoryNode::into_fragment)
        .collect();
        let methodologies = ranked_by_similarity(
            &query,
            self.store
                .find_nodes(NodeLabel::Methodology, &|n| !n.embedding().is_empty())
                .await?,
            limit,
        )
        .into_iter()
        .filter_map(MemoryNode::into_methodology)
        .collect();

        Ok((
            Hits {
                methodologies,
                fragments,
                pattern_frequency: None,
            },
            query,
        ))
    }

    async fn methodologies_where<F>(&self, predicate: F) -> Result<Vec<Methodology>, QueryError>
    where
        F: Fn(&Methodology) -> bool + Send + Sync,
    {
        Ok(self
            .store
            .find_nodes(NodeLabel::Methodology, &|n| {
                n.as_methodology().is_some_and(&predicate)
            })
            .await?
            .into_iter()
            .filter_map(MemoryNode::into_methodology)
            .collect())
    }
}

async fn run<T, F>(dimension: Dimension, budget: std::time::Duration, fut: F) -> Option<T>
where
    F: Future<Output = Result<T, QueryError>>,
{
    guarded(dimension.as_str(), budget, fut).await
}

fn ranked_by_similarity(query: &[f32], nodes: Vec<MemoryNode>, limit: usize) -> Vec<MemoryNode> {
    let mut scored: Vec<(f64, MemoryNode)> = nodes
        .into_iter()
        .map(|n| (cosine_similarity(query, n.embedding()), n))
        .filter(|(score, _)| *score > 0.0)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.truncate(limit);
    scored.into_iter().map(|(_, n)| n).collect()
}

fn warnings_for(state: &State, pattern_frequency: Option<u64>) -> Vec<String> {
    if !state.has_error() {
        return Vec::new();
    }
    let Some(category) = signals::error_category(&state.current_error) else {
        return Vec::new();
    };
    let mut warnings = vec![category_hint(&category)];
    if let Some(note) = pattern_frequency.and_then(|f| frequency_note(&category, f)) {
        warnings.push(note);
    }
    warnings
}
