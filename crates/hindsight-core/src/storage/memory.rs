use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::graph::{GraphStore, NodeFilter};
use crate::error::CoreError;
use crate::model::{MemoryNode, NodeId, NodeLabel, Relation, RelationId, RelationKind};

/// Serializable form of the whole graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<MemoryNode>,
    pub relations: Vec<Relation>,
    #[serde(default)]
    pub next_relation_id: u64,
}

#[derive(Debug, Default)]
struct Tables {
    nodes: BTreeMap<u64, MemoryNode>,
    index: HashMap<NodeId, u64>,
    relations: BTreeMap<RelationId, Relation>,
    next_node_seq: u64,
    next_relation_id: u64,
}

impl Tables {
    fn node(&self, id: &NodeId) -> Option<&MemoryNode> {
        self.index.get(id).and_then(|seq| self.nodes.get(seq))
    }

    fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    fn find_relation(&self, from: &NodeId, to: &NodeId, kind: RelationKind) -> Option<RelationId> {
        self.relations
            .values()
            .find(|r| r.kind == kind && &r.from == from && &r.to == to)
            .map(|r| r.id)
    }

    fn push_relation(&mut self, mut relation: Relation) -> RelationId {
        self.next_relation_id += 1;
        relation.id = RelationId(self.next_relation_id);
        let id = relation.id;
        self.relations.insert(id, relation);
        id
    }

    fn remove_node(&mut self, id: &NodeId) -> bool {
        let Some(seq) = self.index.remove(id) else {
            return false;
        };
        self.nodes.remove(&seq);
        self.relations.retain(|_, r| !r.touches(id));
        true
    }
}

/// In-process graph store: insertion-ordered arena tables behind an async RwLock.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGraphStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a snapshot. Relations whose endpoints are missing
    /// are dropped.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        let mut tables = Tables::default();
        for node in snapshot.nodes {
            tables.next_node_seq += 1;
            tables.index.insert(node.id().clone(), tables.next_node_seq);
            tables.nodes.insert(tables.next_node_seq, node);
        }
        let mut max_id = snapshot.next_relation_id;
        for relation in snapshot.relations {
            if !tables.contains(&relation.from) || !tables.contains(&relation.to) {
                tracing::warn!("Skipping dangling relation {}", relation.id);
                continue;
            }
            max_id = max_id.max(relation.id.0);
            tables.relations.insert(relation.id, relation);
        }
        tables.next_relation_id = max_id;
        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    pub async fn snapshot(&self) -> GraphSnapshot {
        let tables = self.tables.read().await;
        GraphSnapshot {
            nodes: tables.nodes.values().cloned().collect(),
            relations: tables.relations.values().cloned().collect(),
            next_relation_id: tables.next_relation_id,
        }
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn insert_node(&self, node: MemoryNode) -> Result<NodeId, CoreError> {
        let mut tables = self.tables.write().await;
        let id = node.id().clone();
        if tables.contains(&id) {
            return Err(CoreError::Store(format!("node {id} already exists")));
        }
        tables.next_node_seq += 1;
        let seq = tables.next_node_seq;
        tables.index.insert(id.clone(), seq);
        tables.nodes.insert(seq, node);
        Ok(id)
    }

    async fn update_node(&self, node: MemoryNode) -> Result<(), CoreError> {
        let mut tables = self.tables.write().await;
        let Some(seq) = tables.index.get(node.id()).copied() else {
            return Err(CoreError::NotFound {
                id: node.id().to_string(),
            });
        };
        tables.nodes.insert(seq, node);
        Ok(())
    }

    async fn get_node(&self, id: &NodeId) -> Result<Option<MemoryNode>, CoreError> {
        Ok(self.tables.read().await.node(id).cloned())
    }

    async fn find_nodes(
        &self,
        label: NodeLabel,
        filter: NodeFilter<'_>,
    ) -> Result<Vec<MemoryNode>, CoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .nodes
            .values()
            .filter(|n| n.label() == label && filter(n))
            .cloned()
            .collect())
    }

    async fn count(&self, label: NodeLabel) -> Result<usize, CoreError> {
        let tables = self.tables.read().await;
        Ok(tables.nodes.values().filter(|n| n.label() == label).count())
    }

    async fn insert_relation(&self, relation: Relation) -> Result<RelationId, CoreError> {
        let mut tables = self.tables.write().await;
        for end in [&relation.from, &relation.to] {
            if !tables.contains(end) {
                return Err(CoreError::NotFound {
                    id: end.to_string(),
                });
            }
        }
        Ok(tables.push_relation(relation))
    }

    async fn merge_relation(&self, relation: Relation) -> Result<RelationId, CoreError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.find_relation(&relation.from, &relation.to, relation.kind) {
            return Ok(existing);
        }
        for end in [&relation.from, &relation.to] {
            if !tables.contains(end) {
                return Err(CoreError::NotFound {
                    id: end.to_string(),
                });
            }
        }
        Ok(tables.push_relation(relation))
    }

    async fn update_relation(&self, relation: Relation) -> Result<(), CoreError> {
        let mut tables = self.tables.write().await;
        match tables.relations.get_mut(&relation.id) {
            Some(slot) => {
                *slot = relation;
                Ok(())
            }
            None => Err(CoreError::RelationNotFound { id: relation.id.0 }),
        }
    }

    async fn relations(&self, kind: RelationKind) -> Result<Vec<Relation>, CoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .relations
            .values()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect())
    }

    async fn relations_from(
        &self,
        id: &NodeId,
        kind: Option<RelationKind>,
    ) -> Result<Vec<Relation>, CoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .relations
            .values()
            .filter(|r| &r.from == id && kind.map_or(true, |k| r.kind == k))
            .cloned()
            .collect())
    }

    async fn relations_to(
        &self,
        id: &NodeId,
        kind: Option<RelationKind>,
    ) -> Result<Vec<Relation>, CoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .relations
            .values()
            .filter(|r| &r.to == id && kind.map_or(true, |k| r.kind == k))
            .cloned()
            .collect())
    }

    async fn neighbors(
        &self,
        id: &NodeId,
        kind: RelationKind,
        max_hops: usize,
    ) -> Result<Vec<MemoryNode>, CoreError> {
        let tables = self.tables.read().await;
        let mut visited: HashSet<&NodeId> = HashSet::from([id]);
        let mut queue: VecDeque<(&NodeId, usize)> = VecDeque::from([(id, 0)]);
        let mut found = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_hops {
                continue;
            }
            for r in tables.relations.values() {
                if r.kind != kind || &r.from != current {
                    continue;
                }
                if visited.insert(&r.to) {
                    if let Some(node) = tables.node(&r.to) {
                        found.push(node.clone());
                    }
                    queue.push_back((&r.to, depth + 1));
                }
            }
        }
        Ok(found)
    }

    async fn redirect_relations(&self, from: &NodeId, to: &NodeId) -> Result<usize, CoreError> {
        let mut tables = self.tables.write().await;
        if !tables.contains(to) {
            return Err(CoreError::NotFound { id: to.to_string() });
        }

        let affected: Vec<RelationId> = tables
            .relations
            .values()
            .filter(|r| r.touches(from))
            .map(|r| r.id)
            .collect();

        let mut rewritten = 0;
        for rel_id in affected {
            let Some(mut relation) = tables.relations.remove(&rel_id) else {
                continue;
            };
            if &relation.from == from {
                relation.from = to.clone();
            }
            if &relation.to == from {
                relation.to = to.clone();
            }
            if relation.from == relation.to {
                continue;
            }
            match tables.find_relation(&relation.from, &relation.to, relation.kind) {
                Some(existing) => {
                    // Fold outcome counters into the surviving relation.
                    if let Some(kept) = tables.relations.get_mut(&existing) {
                        kept.successes += relation.successes;
                        kept.failures += relation.failures;
                    }
                }
                None => {
                    tables.relations.insert(rel_id, relation);
                    rewritten += 1;
                }
            }
        }
        Ok(rewritten)
    }

    async fn delete_node(&self, id: &NodeId) -> Result<bool, CoreError> {
        Ok(self.tables.write().await.remove_node(id))
    }

    async fn delete_nodes_where(
        &self,
        label: NodeLabel,
        filter: NodeFilter<'_>,
    ) -> Result<Vec<NodeId>, CoreError> {
        let mut tables = self.tables.write().await;
        let doomed: Vec<NodeId> = tables
            .nodes
            .values()
            .filter(|n| n.label() == label && filter(n))
            .map(|n| n.id().clone())
            .collect();
        for id in &doomed {
            tables.remove_node(id);
        }
        Ok(doomed)
    }
}
