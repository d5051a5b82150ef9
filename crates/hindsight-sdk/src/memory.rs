use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use hindsight_capture::{MemoryWriter, RawTrajectory, WriteReport};
use hindsight_consolidate::{ConsolidationReport, Consolidator, Pass};
use hindsight_core::loops::{LoopDetector, LoopInfo};
use hindsight_core::model::{MemoryNode, Methodology, NodeId, NodeLabel, RelationKind, State};
use hindsight_core::providers::{EmbeddingProvider, HashingEmbedder, StrategyGenerator};
use hindsight_core::storage::{snapshot, GraphSnapshot, GraphStore, InMemoryGraphStore};
use hindsight_core::MemoryConfig;
use hindsight_query::{Recall, Retriever};

use crate::error::MemoryError;
use crate::schedule::ConsolidationSchedule;

/// What happened to consolidation during a `learn` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConsolidationStatus {
    NotDue,
    Completed(ConsolidationReport),
    Skipped { reason: String },
}

/// Outcome of learning one trajectory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearnReport {
    pub write: WriteReport,
    pub consolidation: ConsolidationStatus,
}

/// Loop verdict for a window of recent states.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoopCheck {
    pub stuck: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<LoopInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub escape_suggestions: Vec<Methodology>,
}

impl LoopCheck {
    pub fn render(&self) -> String {
        let Some(info) = &self.info else {
            return "No loop detected.".to_string();
        };
        let mut out = format!("Loop detected: {}", info.description);
        if !self.escape_suggestions.is_empty() {
            out.push_str("\nTry instead:");
            for m in &self.escape_suggestions {
                out.push_str(&format!("\n- [{:.2}] {}", m.confidence, m.strategy));
            }
        }
        out
    }
}

/// Counts over the stored memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemoryStats {
    pub total_trajectories: usize,
    pub total_fragments: usize,
    pub total_methodologies: usize,
    pub total_error_patterns: usize,
    /// Error category to stored frequency.
    pub error_frequency: BTreeMap<String, u64>,
    pub learned_since_start: u64,
}

/// On-disk form: the graph plus the consolidation counter.
#[derive(Debug, Serialize, Deserialize)]
struct MemorySnapshot {
    schedule: ConsolidationSchedule,
    graph: GraphSnapshot,
}

/// Long-term memory for a coding agent.
///
/// `learn` is called once per finished episode, `query` and `check_loop`
/// as often as once per step. Neither `query` nor `check_loop` fails for
/// backend reasons; they degrade to empty results instead.
pub struct AgentMemory {
    store: InMemoryGraphStore,
    writer: MemoryWriter,
    retriever: Retriever,
    consolidator: Consolidator,
    detector: LoopDetector,
    schedule: ConsolidationSchedule,
    config: MemoryConfig,
}

impl AgentMemory {
    /// Empty memory with the deterministic offline embedder.
    pub fn new(config: MemoryConfig) -> Self {
        let embedder = Arc::new(HashingEmbedder::new(config.embedding_dim));
        Self::with_parts(InMemoryGraphStore::new(), embedder, config)
    }

    pub fn with_parts(
        store: InMemoryGraphStore,
        embedder: Arc<dyn EmbeddingProvider>,
        config: MemoryConfig,
    ) -> Self {
        let shared: Arc<dyn GraphStore> = Arc::new(store.clone());
        Self {
            writer: MemoryWriter::new(shared.clone(), embedder.clone(), config.clone()),
            retriever: Retriever::new(shared.clone(), embedder.clone(), config.clone()),
            consolidator: Consolidator::new(shared, embedder, config.clone()),
            detector: LoopDetector::from_config(&config),
            schedule: ConsolidationSchedule::new(config.consolidate_every),
            store,
            config,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn StrategyGenerator>) -> Self {
        self.consolidator = self.consolidator.with_generator(generator);
        self
    }

    /// Replace the consolidation counter (e.g. to resume or to test the trigger).
    pub fn with_schedule(mut self, schedule: ConsolidationSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn schedule(&self) -> ConsolidationSchedule {
        self.schedule
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn store(&self) -> &InMemoryGraphStore {
        &self.store
    }

    /// Ingest a finished trajectory, consolidating when the schedule says so.
    ///
    /// Fails only on malformed input or when the trajectory record itself
    /// cannot be stored.
    pub async fn learn(&mut self, raw: &RawTrajectory) -> Result<LearnReport, MemoryError> {
        let write = self.writer.write_trajectory(raw).await?;
        if write.duplicate {
            return Ok(LearnReport {
                write,
                consolidation: ConsolidationStatus::Skipped {
                    reason: "trajectory already learned".into(),
                },
            });
        }

        let consolidation = if self.schedule.record() {
            let report = self.consolidator.consolidate().await;
            if report.failed_passes.len() == Pass::ORDER.len() {
                ConsolidationStatus::Skipped {
                    reason: "every consolidation pass failed".into(),
                }
            } else {
                ConsolidationStatus::Completed(report)
            }
        } else {
            ConsolidationStatus::NotDue
        };
        Ok(LearnReport {
            write,
            consolidation,
        })
    }

    /// Ranked recall for the agent's current state.
    pub async fn query(&self, state: &mut State) -> Recall {
        self.retriever.retrieve(state).await
    }

    /// Whether the recent history shows the agent stuck, with escape
    /// suggestions for the loop's error category.
    pub async fn check_loop(&self, history: &[State]) -> LoopCheck {
        let Some(info) = self.detector.detect(history) else {
            return LoopCheck::default();
        };
        let escape_suggestions = match info.error_category() {
            Some(category) => {
                self.retriever
                    .escape_suggestions(category, self.config.escape_suggestions)
                    .await
            }
            None => Vec::new(),
        };
        warn!("Agent appears stuck: {}", info.description);
        LoopCheck {
            stuck: true,
            info: Some(info),
            escape_suggestions,
        }
    }

    /// Record that a methodology was applied and whether it worked. Updates
    /// the methodology's counters and every resolved_by edge into it.
    pub async fn record_outcome(&self, methodology: &NodeId, success: bool) -> Result<(), MemoryError> {
        let mut m = self
            .store
            .get_node(methodology)
            .await?
            .and_then(MemoryNode::into_methodology)
            .ok_or_else(|| MemoryError::UnknownMethodology(methodology.to_string()))?;
        m.record_outcome(success);
        self.store.update_node(m.into()).await?;

        for mut edge in self
            .store
            .relations_to(methodology, Some(RelationKind::ResolvedBy))
            .await?
        {
            edge.record_outcome(success);
            edge.refresh_success_rate();
            self.store.update_relation(edge).await?;
        }
        Ok(())
    }

    /// Run consolidation now, outside the schedule.
    pub async fn consolidate(&self) -> ConsolidationReport {
        self.consolidator.consolidate().await
    }

    pub async fn stats(&self) -> Result<MemoryStats, MemoryError> {
        let error_frequency = self
            .store
            .find_nodes(NodeLabel::ErrorPattern, &|_| true)
            .await?
            .into_iter()
            .filter_map(MemoryNode::into_error_pattern)
            .map(|p| (p.category, p.frequency))
            .collect();
        Ok(MemoryStats {
            total_trajectories: self.store.count(NodeLabel::Trajectory).await?,
            total_fragments: self.store.count(NodeLabel::Fragment).await?,
            total_methodologies: self.store.count(NodeLabel::Methodology).await?,
            total_error_patterns: self.store.count(NodeLabel::ErrorPattern).await?,
            error_frequency,
            learned_since_start: self.schedule.learned,
        })
    }

    /// Load memory from a snapshot file, or start empty if it does not exist.
    /// The schedule interval always comes from `config`.
    pub fn open(path: &Path, config: MemoryConfig) -> Result<Self, MemoryError> {
        config.validate()?;
        let Some(saved) = snapshot::load_json::<MemorySnapshot>(path)? else {
            info!("No memory at {}, starting empty", path.display());
            return Ok(Self::new(config));
        };
        let schedule = ConsolidationSchedule {
            every: config.consolidate_every.max(1),
            learned: saved.schedule.learned,
        };
        let store = InMemoryGraphStore::from_snapshot(saved.graph);
        let embedder = Arc::new(HashingEmbedder::new(config.embedding_dim));
        Ok(Self::with_parts(store, embedder, config).with_schedule(schedule))
    }

    pub async fn save(&self, path: &Path) -> Result<(), MemoryError> {
        let saved = MemorySnapshot {
            schedule: self.schedule,
            graph: self.store.snapshot().await,
        };
        snapshot::save_json(path, &saved)?;
        info!("Saved memory to {}", path.display());
        Ok(())
    }
}
