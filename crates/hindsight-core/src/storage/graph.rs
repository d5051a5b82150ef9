use async_trait::async_trait;

use crate::error::CoreError;
use crate::model::{
    ErrorPattern, MemoryNode, NodeId, NodeLabel, Relation, RelationId, RelationKind,
};

/// Predicate applied to candidate nodes during lookups and bulk deletes.
pub type NodeFilter<'a> = &'a (dyn Fn(&MemoryNode) -> bool + Send + Sync);

/// Node/relation storage for the memory graph.
///
/// Implementations keep nodes and relations in separate tables keyed by stable
/// identifiers. Every mutation is a single scoped operation so that readers
/// running concurrently with consolidation see either the old or the new
/// state of one record, never a half-applied batch.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Insert a new node. Fails if a node with the same ID exists.
    async fn insert_node(&self, node: MemoryNode) -> Result<NodeId, CoreError>;

    /// Replace an existing node in place.
    async fn update_node(&self, node: MemoryNode) -> Result<(), CoreError>;

    async fn get_node(&self, id: &NodeId) -> Result<Option<MemoryNode>, CoreError>;

    /// All nodes of a label accepted by the filter, in insertion order.
    async fn find_nodes(
        &self,
        label: NodeLabel,
        filter: NodeFilter<'_>,
    ) -> Result<Vec<MemoryNode>, CoreError>;

    async fn count(&self, label: NodeLabel) -> Result<usize, CoreError>;

    /// Insert a relation. Both endpoints must exist.
    async fn insert_relation(&self, relation: Relation) -> Result<RelationId, CoreError>;

    /// Insert a relation unless one with the same endpoints and kind exists,
    /// in which case the existing ID is returned.
    async fn merge_relation(&self, relation: Relation) -> Result<RelationId, CoreError>;

    async fn update_relation(&self, relation: Relation) -> Result<(), CoreError>;

    async fn relations(&self, kind: RelationKind) -> Result<Vec<Relation>, CoreError>;

    async fn relations_from(
        &self,
        id: &NodeId,
        kind: Option<RelationKind>,
    ) -> Result<Vec<Relation>, CoreError>;

    async fn relations_to(
        &self,
        id: &NodeId,
        kind: Option<RelationKind>,
    ) -> Result<Vec<Relation>, CoreError>;

    /// Nodes reachable from `id` over outgoing relations of `kind`,
    /// breadth-first, up to `max_hops` hops. The start node is excluded.
    async fn neighbors(
        &self,
        id: &NodeId,
        kind: RelationKind,
        max_hops: usize,
    ) -> Result<Vec<MemoryNode>, CoreError>;

    /// Point every relation touching `from` at `to` instead. Relations that
    /// would become self-loops or duplicates are dropped. Returns the number
    /// of relations rewritten.
    async fn redirect_relations(&self, from: &NodeId, to: &NodeId) -> Result<usize, CoreError>;

    /// Delete a node and every relation touching it. Returns false if absent.
    async fn delete_node(&self, id: &NodeId) -> Result<bool, CoreError>;

    /// Delete every node of a label accepted by the filter, detaching relations.
    async fn delete_nodes_where(
        &self,
        label: NodeLabel,
        filter: NodeFilter<'_>,
    ) -> Result<Vec<NodeId>, CoreError>;

    /// Lookup by the `category` property of an ErrorPattern.
    async fn find_error_pattern(&self, category: &str) -> Result<Option<ErrorPattern>, CoreError> {
        let nodes = self
            .find_nodes(NodeLabel::ErrorPattern, &|n| {
                n.as_error_pattern().is_some_and(|e| e.category == category)
            })
            .await?;
        Ok(nodes.into_iter().find_map(MemoryNode::into_error_pattern))
    }

    async fn has_relations(&self, id: &NodeId) -> Result<bool, CoreError> {
        Ok(!self.relations_from(id, None).await?.is_empty()
            || !self.relations_to(id, None).await?.is_empty())
    }
}
