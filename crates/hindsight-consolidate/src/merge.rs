use std::cmp::Ordering;

use tracing::{debug, warn};

use hindsight_core::model::{Fragment, MemoryNode, NodeId, NodeLabel, Relation, RelationKind};

use crate::consolidator::Consolidator;
use crate::error::ConsolidateError;
use crate::report::ConsolidationReport;

impl Consolidator {
    /// Collapse fragment pairs whose similar_to relation exceeds the merge
    /// threshold. Repeats until no qualifying pair is left, since redirecting
    /// a duplicate's links can surface new pairs on the survivor.
    pub(crate) async fn merge_pass(
        &self,
        report: &mut ConsolidationReport,
    ) -> Result<(), ConsolidateError> {
        let mut attempted: Vec<(NodeId, NodeId)> = Vec::new();
        loop {
            let pairs: Vec<Relation> = self
                .call("list similar_to", self.store.relations(RelationKind::SimilarTo))
                .await?
                .into_iter()
                .filter(|r| r.similarity.unwrap_or(0.0) > self.config.merge_threshold)
                .filter(|r| !attempted.contains(&(r.from.clone(), r.to.clone())))
                .collect();
            if pairs.is_empty() {
                return Ok(());
            }

            for relation in pairs {
                attempted.push((relation.from.clone(), relation.to.clone()));
                match self.merge_pair(&relation).await {
                    Ok(true) => report.fragments_merged += 1,
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Skipping merge of {}: {e}", relation.id);
                        report.skipped += 1;
                    }
                }
            }
        }
    }

    /// Merge the two endpoints of one similar_to relation. Returns false when
    /// there is nothing to merge: the relation is gone, or both fragments
    /// already back the same methodology and must stay separate sources.
    async fn merge_pair(&self, relation: &Relation) -> Result<bool, ConsolidateError> {
        // An earlier merge in this round may have consumed the relation.
        let still_linked = self
            .call(
                "check similar_to",
                self.store.relations_from(&relation.from, Some(RelationKind::SimilarTo)),
            )
            .await?
            .iter()
            .any(|r| r.id == relation.id && r.from == relation.from && r.to == relation.to);
        if !still_linked {
            return Ok(false);
        }

        let a = self.fragment(&relation.from).await?;
        let b = self.fragment(&relation.to).await?;
        let (a, b) = match (a, b) {
            (Some(a), Some(b)) => (a, b),
            (None, _) => return Err(ConsolidateError::MissingNode(relation.from.clone())),
            (_, None) => return Err(ConsolidateError::MissingNode(relation.to.clone())),
        };

        let shared = self
            .call(
                "find shared methodology",
                self.store.find_nodes(NodeLabel::Methodology, &|n| {
                    n.as_methodology().is_some_and(|m| {
                        m.source_fragments.contains(&a.id) && m.source_fragments.contains(&b.id)
                    })
                }),
            )
            .await?;
        if !shared.is_empty() {
            debug!("Keeping {} and {}: both back {}", a.id, b.id, shared[0].id());
            return Ok(false);
        }

        let (keep, duplicate) = match survivor(&a, &b) {
            Ordering::Less => (b, a),
            _ => (a, b),
        };
        self.merge_into(keep, &duplicate).await?;
        Ok(true)
    }

    async fn fragment(&self, id: &NodeId) -> Result<Option<Fragment>, ConsolidateError> {
        Ok(self
            .call("load fragment", self.store.get_node(id))
            .await?
            .and_then(MemoryNode::into_fragment))
    }

    /// Redirect-then-delete. Provenance and the abstracted flag move to `keep`.
    async fn merge_into(&self, mut keep: Fragment, duplicate: &Fragment) -> Result<(), ConsolidateError> {
        if duplicate.abstracted && !keep.abstracted {
            keep.abstracted = true;
            self.call("flag survivor", self.store.update_node(keep.clone().into()))
                .await?;
        }

        let citing = self
            .call(
                "find citing methodologies",
                self.store.find_nodes(NodeLabel::Methodology, &|n| {
                    n.as_methodology()
                        .is_some_and(|m| m.source_fragments.contains(&duplicate.id))
                }),
            )
            .await?;
        for mut methodology in citing.into_iter().filter_map(MemoryNode::into_methodology) {
            methodology.source_fragments.retain(|id| id != &duplicate.id);
            methodology.add_source(&keep.id);
            self.call("rewrite provenance", self.store.update_node(methodology.into()))
                .await?;
        }

        let moved = self
            .call("redirect relations", self.store.redirect_relations(&duplicate.id, &keep.id))
            .await?;
        self.call("delete duplicate", self.store.delete_node(&duplicate.id))
            .await?;
        debug!("Merged {} into {} ({moved} relations moved)", duplicate.id, keep.id);
        Ok(())
    }
}

/// `Greater` when `a` should survive: richer wins, then older.
fn survivor(a: &Fragment, b: &Fragment) -> Ordering {
    a.richness()
        .cmp(&b.richness())
        .then_with(|| b.created_at.cmp(&a.created_at))
}
