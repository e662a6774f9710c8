//! Typed entity repository over a graph store.

use social_types::{EdgeMutation, Entity, GraphStore, GraphStoreError, NodeRef};
use std::sync::Arc;

/// Typed find/list/save/delete of entities. Domain code works with `User`, `Post`, `Comment`
/// and never sees labels, keys or property bags.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn GraphStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Exact-match lookup on the entity's primary key.
    pub async fn find<E: Entity>(&self, key: &str) -> Result<Option<E>, GraphStoreError> {
        match self.store.get_node(E::LABEL, key).await? {
            Some(node) => E::from_node(&node).map(Some),
            None => Ok(None),
        }
    }

    /// Every entity of the type; empty store yields an empty list.
    pub async fn list<E: Entity>(&self) -> Result<Vec<E>, GraphStoreError> {
        self.store
            .list_nodes(E::LABEL)
            .await?
            .iter()
            .map(E::from_node)
            .collect()
    }

    /// Insert a new entity together with the edges that must exist from the start
    /// (authorship, containment).
    pub async fn insert<E: Entity>(
        &self,
        entity: &E,
        edges: &[EdgeMutation],
    ) -> Result<(), GraphStoreError> {
        let node = entity.to_node()?;
        self.store.insert_node(&node, edges).await
    }

    /// Persist property changes plus pending relationship changes as one unit.
    pub async fn save<E: Entity>(
        &self,
        entity: &E,
        edges: &[EdgeMutation],
    ) -> Result<(), GraphStoreError> {
        let node = entity.to_node()?;
        self.store.save_node(&node, edges).await
    }

    /// Remove the entity and all edges incident to it. Returns false if it was already gone.
    pub async fn delete<E: Entity>(&self, entity: &E) -> Result<bool, GraphStoreError> {
        Ok(self.store.delete_nodes(&[entity.node_ref()]).await? > 0)
    }

    /// Remove several nodes as one unit, in the given order.
    pub async fn delete_all(&self, nodes: &[NodeRef]) -> Result<usize, GraphStoreError> {
        self.store.delete_nodes(nodes).await
    }
}
