//! Graph store trait and error types.

use crate::{EdgeMutation, EdgeType, GraphDirection, GraphEdge, GraphNode, NodeLabel, NodeRef};
use async_trait::async_trait;

/// Graph store abstraction: exact-key lookup, property writes, edge mutation and
/// one-hop traversal over a labelled property graph.
///
/// Every mutating call is applied as one unit: either all of it is visible afterwards or none
/// of it is.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Insert a new node together with its initial edges.
    /// Fails with `Conflict` if a node with the same label and key already exists.
    async fn insert_node(
        &self,
        node: &GraphNode,
        edges: &[EdgeMutation],
    ) -> Result<(), GraphStoreError>;

    /// Get one node by label and primary key.
    async fn get_node(
        &self,
        label: NodeLabel,
        key: &str,
    ) -> Result<Option<GraphNode>, GraphStoreError>;

    /// All nodes carrying the label.
    async fn list_nodes(&self, label: NodeLabel) -> Result<Vec<GraphNode>, GraphStoreError>;

    /// Replace the properties of an existing node and apply pending edge changes.
    /// Fails with `NodeNotFound` if the node does not exist.
    async fn save_node(
        &self,
        node: &GraphNode,
        edges: &[EdgeMutation],
    ) -> Result<(), GraphStoreError>;

    /// Apply a batch of edge mutations. Adding an existing edge and removing an absent edge are
    /// no-ops; an added edge with a missing endpoint fails the whole batch with `NodeNotFound`.
    async fn apply_edges(&self, mutations: &[EdgeMutation]) -> Result<(), GraphStoreError>;

    async fn has_edge(&self, edge: &GraphEdge) -> Result<bool, GraphStoreError>;

    /// Nodes one hop away from `node` over `relation` edges in `direction`, restricted to
    /// `label`. Order is unspecified.
    async fn neighbors(
        &self,
        node: &NodeRef,
        relation: EdgeType,
        direction: GraphDirection,
        label: NodeLabel,
    ) -> Result<Vec<GraphNode>, GraphStoreError>;

    /// Delete nodes and every edge incident to them. Returns the number of nodes removed;
    /// absent nodes are skipped.
    async fn delete_nodes(&self, nodes: &[NodeRef]) -> Result<usize, GraphStoreError>;

    /// End the store lifecycle. Later calls fail with `Closed`.
    async fn close(&self) -> Result<(), GraphStoreError> {
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GraphStoreError {
    #[error("node already exists: {0}")]
    Conflict(NodeRef),
    #[error("node not found: {0}")]
    NodeNotFound(NodeRef),
    #[error("graph store is closed")]
    Closed,
    #[error("invalid node data: {0}")]
    Decode(String),
    #[error("graph store error: {0}")]
    Other(String),
}

/// Failure of a domain service operation.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),
    /// A required request field is absent.
    #[error("{0} property is missing")]
    MissingField(&'static str),
    /// Both entities exist but the expected edge between them does not.
    #[error("{0}")]
    RelationNotFound(String),
    #[error(transparent)]
    Store(#[from] GraphStoreError),
}
