//! In-memory graph store with typed, deduplicated edges.

use social_types::{
    EdgeMutation, EdgeType, GraphDirection, GraphEdge, GraphNode, GraphStore, GraphStoreError,
    NodeLabel, NodeRef,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

type NodeMap = HashMap<NodeRef, GraphNode>;
type EdgeIndex = HashMap<NodeRef, HashSet<GraphEdge>>;

/// In-memory implementation of GraphStore.
///
/// Locks are always acquired in the order nodes, out_index, in_index, and every mutating call
/// holds all the write locks it needs for its whole duration, so callers never observe half a
/// write.
pub struct InMemoryGraphStore {
    /// (label, key) -> node.
    nodes: Arc<RwLock<NodeMap>>,
    /// from node -> edges starting there.
    out_index: Arc<RwLock<EdgeIndex>>,
    /// to node -> edges ending there.
    in_index: Arc<RwLock<EdgeIndex>>,
    closed: AtomicBool,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self {
            nodes: Arc::new(RwLock::new(HashMap::new())),
            out_index: Arc::new(RwLock::new(HashMap::new())),
            in_index: Arc::new(RwLock::new(HashMap::new())),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<(), GraphStoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(GraphStoreError::Closed);
        }
        Ok(())
    }

    /// Every added edge must connect existing nodes (or the node being inserted alongside).
    fn check_endpoints(
        nodes: &NodeMap,
        mutations: &[EdgeMutation],
        pending: Option<&NodeRef>,
    ) -> Result<(), GraphStoreError> {
        for m in mutations {
            let EdgeMutation::Add(edge) = m else { continue };
            for end in [&edge.from, &edge.to] {
                if !nodes.contains_key(end) && pending != Some(end) {
                    return Err(GraphStoreError::NodeNotFound(end.clone()));
                }
            }
        }
        Ok(())
    }

    fn add_edge_to_index(index: &mut EdgeIndex, node: &NodeRef, edge: &GraphEdge) {
        index.entry(node.clone()).or_default().insert(edge.clone());
    }

    fn remove_edge_from_index(index: &mut EdgeIndex, node: &NodeRef, edge: &GraphEdge) {
        if let Some(set) = index.get_mut(node) {
            set.remove(edge);
            if set.is_empty() {
                index.remove(node);
            }
        }
    }

    fn apply_mutations(
        mutations: &[EdgeMutation],
        out_index: &mut EdgeIndex,
        in_index: &mut EdgeIndex,
    ) {
        for m in mutations {
            match m {
                EdgeMutation::Add(edge) => {
                    Self::add_edge_to_index(out_index, &edge.from, edge);
                    Self::add_edge_to_index(in_index, &edge.to, edge);
                }
                EdgeMutation::Remove(edge) => {
                    Self::remove_edge_from_index(out_index, &edge.from, edge);
                    Self::remove_edge_from_index(in_index, &edge.to, edge);
                }
            }
        }
    }
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn insert_node(
        &self,
        node: &GraphNode,
        edges: &[EdgeMutation],
    ) -> Result<(), GraphStoreError> {
        self.ensure_open()?;
        let node_ref = node.node_ref();
        let mut nodes = self.nodes.write().await;
        let mut out_guard = self.out_index.write().await;
        let mut in_guard = self.in_index.write().await;

        if nodes.contains_key(&node_ref) {
            return Err(GraphStoreError::Conflict(node_ref));
        }
        Self::check_endpoints(&nodes, edges, Some(&node_ref))?;

        nodes.insert(node_ref, node.clone());
        Self::apply_mutations(edges, &mut out_guard, &mut in_guard);
        Ok(())
    }

    async fn get_node(
        &self,
        label: NodeLabel,
        key: &str,
    ) -> Result<Option<GraphNode>, GraphStoreError> {
        self.ensure_open()?;
        let guard = self.nodes.read().await;
        Ok(guard.get(&NodeRef::new(label, key)).cloned())
    }

    async fn list_nodes(&self, label: NodeLabel) -> Result<Vec<GraphNode>, GraphStoreError> {
        self.ensure_open()?;
        let guard = self.nodes.read().await;
        let mut result: Vec<GraphNode> = guard
            .values()
            .filter(|n| n.label == label)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(result)
    }

    async fn save_node(
        &self,
        node: &GraphNode,
        edges: &[EdgeMutation],
    ) -> Result<(), GraphStoreError> {
        self.ensure_open()?;
        let node_ref = node.node_ref();
        let mut nodes = self.nodes.write().await;
        let mut out_guard = self.out_index.write().await;
        let mut in_guard = self.in_index.write().await;

        if !nodes.contains_key(&node_ref) {
            return Err(GraphStoreError::NodeNotFound(node_ref));
        }
        Self::check_endpoints(&nodes, edges, None)?;

        nodes.insert(node_ref, node.clone());
        Self::apply_mutations(edges, &mut out_guard, &mut in_guard);
        Ok(())
    }

    async fn apply_edges(&self, mutations: &[EdgeMutation]) -> Result<(), GraphStoreError> {
        self.ensure_open()?;
        if mutations.is_empty() {
            return Ok(());
        }
        let nodes = self.nodes.read().await;
        let mut out_guard = self.out_index.write().await;
        let mut in_guard = self.in_index.write().await;

        Self::check_endpoints(&nodes, mutations, None)?;
        Self::apply_mutations(mutations, &mut out_guard, &mut in_guard);
        Ok(())
    }

    async fn has_edge(&self, edge: &GraphEdge) -> Result<bool, GraphStoreError> {
        self.ensure_open()?;
        let out_guard = self.out_index.read().await;
        Ok(out_guard
            .get(&edge.from)
            .is_some_and(|set| set.contains(edge)))
    }

    async fn neighbors(
        &self,
        node: &NodeRef,
        relation: EdgeType,
        direction: GraphDirection,
        label: NodeLabel,
    ) -> Result<Vec<GraphNode>, GraphStoreError> {
        self.ensure_open()?;
        let node_guard = self.nodes.read().await;
        if !node_guard.contains_key(node) {
            return Err(GraphStoreError::NodeNotFound(node.clone()));
        }

        let index = match direction {
            GraphDirection::Outbound => self.out_index.read().await,
            GraphDirection::Inbound => self.in_index.read().await,
        };
        let Some(edges) = index.get(node) else {
            return Ok(Vec::new());
        };

        let mut result = Vec::new();
        for edge in edges {
            if edge.relation != relation {
                continue;
            }
            let other = match direction {
                GraphDirection::Outbound => &edge.to,
                GraphDirection::Inbound => &edge.from,
            };
            if other.label != label {
                continue;
            }
            if let Some(n) = node_guard.get(other) {
                result.push(n.clone());
            }
        }
        // Keep traversal deterministic across hash-map ordering.
        result.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(result)
    }

    async fn delete_nodes(&self, refs: &[NodeRef]) -> Result<usize, GraphStoreError> {
        self.ensure_open()?;
        let mut nodes = self.nodes.write().await;
        let mut out_guard = self.out_index.write().await;
        let mut in_guard = self.in_index.write().await;

        let mut deleted = 0usize;
        for node_ref in refs {
            if nodes.remove(node_ref).is_none() {
                continue;
            }
            deleted += 1;
            for edge in out_guard.remove(node_ref).unwrap_or_default() {
                Self::remove_edge_from_index(&mut in_guard, &edge.to, &edge);
            }
            for edge in in_guard.remove(node_ref).unwrap_or_default() {
                Self::remove_edge_from_index(&mut out_guard, &edge.from, &edge);
            }
        }
        Ok(deleted)
    }

    async fn close(&self) -> Result<(), GraphStoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn node(label: NodeLabel, key: &str) -> GraphNode {
        let mut properties = HashMap::new();
        properties.insert(
            label.key_property().to_string(),
            serde_json::Value::String(key.to_string()),
        );
        GraphNode {
            label,
            key: key.to_string(),
            properties,
        }
    }

    fn edge(relation: EdgeType, from: &GraphNode, to: &GraphNode) -> GraphEdge {
        GraphEdge {
            relation,
            from: from.node_ref(),
            to: to.node_ref(),
        }
    }

    #[tokio::test]
    async fn add_edge_is_idempotent_and_remove_absent_is_noop() {
        let store = InMemoryGraphStore::new();
        let u = node(NodeLabel::User, "u1");
        let p = node(NodeLabel::Post, "p1");
        store.insert_node(&u, &[]).await.unwrap();
        store.insert_node(&p, &[]).await.unwrap();

        let likes = edge(EdgeType::Likes, &u, &p);
        store
            .apply_edges(&[EdgeMutation::Add(likes.clone())])
            .await
            .unwrap();
        store
            .apply_edges(&[EdgeMutation::Add(likes.clone())])
            .await
            .unwrap();
        assert!(store.has_edge(&likes).await.unwrap());
        let liked = store
            .neighbors(
                &u.node_ref(),
                EdgeType::Likes,
                GraphDirection::Outbound,
                NodeLabel::Post,
            )
            .await
            .unwrap();
        assert_eq!(liked.len(), 1);

        store
            .apply_edges(&[EdgeMutation::Remove(likes.clone())])
            .await
            .unwrap();
        store
            .apply_edges(&[EdgeMutation::Remove(likes.clone())])
            .await
            .unwrap();
        assert!(!store.has_edge(&likes).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_key_is_a_conflict() {
        let store = InMemoryGraphStore::new();
        let u = node(NodeLabel::User, "u1");
        store.insert_node(&u, &[]).await.unwrap();
        let err = store.insert_node(&u, &[]).await.unwrap_err();
        assert!(matches!(err, GraphStoreError::Conflict(_)));

        // Same key under another label is a different node.
        store
            .insert_node(&node(NodeLabel::Post, "u1"), &[])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn batch_with_missing_endpoint_applies_nothing() {
        let store = InMemoryGraphStore::new();
        let a = node(NodeLabel::User, "a");
        let b = node(NodeLabel::User, "b");
        let ghost = node(NodeLabel::User, "ghost");
        store.insert_node(&a, &[]).await.unwrap();
        store.insert_node(&b, &[]).await.unwrap();

        let ab = edge(EdgeType::FriendsWith, &a, &b);
        let err = store
            .apply_edges(&[
                EdgeMutation::Add(ab.clone()),
                EdgeMutation::Add(edge(EdgeType::FriendsWith, &a, &ghost)),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, GraphStoreError::NodeNotFound(_)));
        assert!(!store.has_edge(&ab).await.unwrap());
    }

    #[tokio::test]
    async fn insert_with_edges_links_new_node() {
        let store = InMemoryGraphStore::new();
        let u = node(NodeLabel::User, "u1");
        let p = node(NodeLabel::Post, "p1");
        let c = node(NodeLabel::Comment, "c1");
        store.insert_node(&u, &[]).await.unwrap();
        store.insert_node(&p, &[]).await.unwrap();
        store
            .insert_node(
                &c,
                &[
                    EdgeMutation::Add(edge(EdgeType::Created, &u, &c)),
                    EdgeMutation::Add(edge(EdgeType::HasComment, &p, &c)),
                ],
            )
            .await
            .unwrap();

        let parents = store
            .neighbors(
                &c.node_ref(),
                EdgeType::HasComment,
                GraphDirection::Inbound,
                NodeLabel::Post,
            )
            .await
            .unwrap();
        assert_eq!(parents, vec![p.clone()]);
        // LIKES and CREATED share a source but never mix.
        let liked = store
            .neighbors(
                &u.node_ref(),
                EdgeType::Likes,
                GraphDirection::Outbound,
                NodeLabel::Comment,
            )
            .await
            .unwrap();
        assert!(liked.is_empty());
    }

    #[tokio::test]
    async fn delete_detaches_incident_edges() {
        let store = InMemoryGraphStore::new();
        let a = node(NodeLabel::User, "a");
        let b = node(NodeLabel::User, "b");
        store.insert_node(&a, &[]).await.unwrap();
        store.insert_node(&b, &[]).await.unwrap();
        let ab = edge(EdgeType::FriendsWith, &a, &b);
        let ba = edge(EdgeType::FriendsWith, &b, &a);
        store
            .apply_edges(&[EdgeMutation::Add(ab.clone()), EdgeMutation::Add(ba.clone())])
            .await
            .unwrap();

        let deleted = store
            .delete_nodes(&[a.node_ref(), NodeRef::new(NodeLabel::User, "missing")])
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(store.get_node(NodeLabel::User, "a").await.unwrap().is_none());
        assert!(!store.has_edge(&ab).await.unwrap());
        assert!(!store.has_edge(&ba).await.unwrap());
        let friends = store
            .neighbors(
                &b.node_ref(),
                EdgeType::FriendsWith,
                GraphDirection::Outbound,
                NodeLabel::User,
            )
            .await
            .unwrap();
        assert!(friends.is_empty());
    }

    #[tokio::test]
    async fn closed_store_rejects_calls() {
        let store = InMemoryGraphStore::new();
        store.close().await.unwrap();
        let err = store.list_nodes(NodeLabel::User).await.unwrap_err();
        assert!(matches!(err, GraphStoreError::Closed));
    }
}
