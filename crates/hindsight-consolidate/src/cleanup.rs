use std::collections::HashSet;

use tracing::{debug, warn};

use hindsight_core::model::{MemoryNode, NodeId, NodeLabel, RelationKind};

use crate::consolidator::Consolidator;
use crate::error::ConsolidateError;
use crate::report::ConsolidationReport;

const ALL_RELATIONS: [RelationKind; 5] = [
    RelationKind::HasFragment,
    RelationKind::Caused,
    RelationKind::ResolvedBy,
    RelationKind::DerivedInto,
    RelationKind::SimilarTo,
];

/// Labels eligible for orphan removal. Trajectories are never deleted.
const PRUNABLE: [NodeLabel; 3] = [NodeLabel::Fragment, NodeLabel::ErrorPattern, NodeLabel::Methodology];

impl Consolidator {
    /// Drop low-value methodologies, then every non-trajectory node left
    /// without relations. Methodologies go first so that anything they
    /// orphan is swept in the same run.
    pub(crate) async fn cleanup_pass(
        &self,
        report: &mut ConsolidationReport,
    ) -> Result<(), ConsolidateError> {
        let min_confidence = self.config.cleanup_min_confidence;
        let min_sources = self.config.cleanup_min_sources;
        let weak = self
            .call(
                "prune methodologies",
                self.store.delete_nodes_where(NodeLabel::Methodology, &|n| {
                    n.as_methodology().is_some_and(|m| {
                        m.confidence < min_confidence && m.source_fragments.len() < min_sources
                    })
                }),
            )
            .await?;
        if !weak.is_empty() {
            debug!("Pruned {} low-confidence methodologies", weak.len());
        }
        report.nodes_cleaned += weak.len();

        let mut linked: HashSet<NodeId> = HashSet::new();
        for kind in ALL_RELATIONS {
            for relation in self.call("list relations", self.store.relations(kind)).await? {
                linked.insert(relation.from);
                linked.insert(relation.to);
            }
        }

        for label in PRUNABLE {
            let orphans: Vec<MemoryNode> = self
                .call(
                    "find orphans",
                    self.store.find_nodes(label, &|n| !linked.contains(n.id())),
                )
                .await?;
            for orphan in orphans {
                match self.remove_orphan(orphan.id()).await {
                    Ok(true) => report.nodes_cleaned += 1,
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Skipping orphan {}: {e}", orphan.id());
                        report.skipped += 1;
                    }
                }
            }
        }
        Ok(())
    }

    async fn remove_orphan(&self, id: &NodeId) -> Result<bool, ConsolidateError> {
        // Re-check per node; a writer may have linked it meanwhile.
        if self.call("check relations", self.store.has_relations(id)).await? {
            return Ok(false);
        }
        let removed = self.call("delete orphan", self.store.delete_node(id)).await?;
        if removed {
            debug!("Removed orphan {id}");
        }
        Ok(removed)
    }
}
