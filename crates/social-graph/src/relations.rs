//! Typed edge operations: add/remove/query directed relations between entities, plus the
//! two-edge command used for symmetric relations.

use social_types::{
    Comment, EdgeMutation, EdgeType, Entity, GraphDirection, GraphEdge, GraphStore,
    GraphStoreError, Post, User,
};
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

/// A relationship type bound to its source and target entity types.
pub struct Relation<F, T> {
    edge: EdgeType,
    _marker: PhantomData<fn() -> (F, T)>,
}

impl<F, T> Clone for Relation<F, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F, T> Copy for Relation<F, T> {}

impl<F, T> Relation<F, T> {
    pub const fn new(edge: EdgeType) -> Self {
        Self {
            edge,
            _marker: PhantomData,
        }
    }

    pub fn edge_type(&self) -> EdgeType {
        self.edge
    }
}

impl<F: Entity, T: Entity> Relation<F, T> {
    pub fn edge(&self, from: &F, to: &T) -> GraphEdge {
        GraphEdge {
            relation: self.edge,
            from: from.node_ref(),
            to: to.node_ref(),
        }
    }

    pub fn link(&self, from: &F, to: &T) -> EdgeMutation {
        EdgeMutation::Add(self.edge(from, to))
    }

    pub fn unlink(&self, from: &F, to: &T) -> EdgeMutation {
        EdgeMutation::Remove(self.edge(from, to))
    }
}

/// Symmetric: every edge A->B is paired with B->A.
pub const FRIENDS_WITH: Relation<User, User> = Relation::new(EdgeType::FriendsWith);
pub const LIKES_POST: Relation<User, Post> = Relation::new(EdgeType::Likes);
pub const LIKES_COMMENT: Relation<User, Comment> = Relation::new(EdgeType::Likes);
/// Authorship, set once when the post is created.
pub const CREATED_POST: Relation<User, Post> = Relation::new(EdgeType::Created);
pub const CREATED_COMMENT: Relation<User, Comment> = Relation::new(EdgeType::Created);
/// Containment; a post's comments are deleted with it.
pub const HAS_COMMENT: Relation<Post, Comment> = Relation::new(EdgeType::HasComment);

/// Both directions of a symmetric relation, written as a single batch.
///
/// The batch goes through `GraphStore::apply_edges`, which both bundled stores apply in one
/// transaction. A store without that guarantee could fail between the two writes and leave
/// the pair one-directional; no compensation is attempted here, the error is returned as is.
#[derive(Debug, Clone)]
pub struct SymmetricCommand {
    mutations: [EdgeMutation; 2],
}

impl SymmetricCommand {
    pub fn link<E: Entity>(relation: Relation<E, E>, a: &E, b: &E) -> Self {
        Self {
            mutations: [relation.link(a, b), relation.link(b, a)],
        }
    }

    pub fn unlink<E: Entity>(relation: Relation<E, E>, a: &E, b: &E) -> Self {
        Self {
            mutations: [relation.unlink(a, b), relation.unlink(b, a)],
        }
    }

    pub fn mutations(&self) -> &[EdgeMutation] {
        &self.mutations
    }
}

/// Edge operations over a shared store. Traversals are recomputed on every call.
#[derive(Clone)]
pub struct RelationOps {
    store: Arc<dyn GraphStore>,
}

impl RelationOps {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Insert the edge if absent.
    pub async fn add_edge<F: Entity, T: Entity>(
        &self,
        relation: Relation<F, T>,
        from: &F,
        to: &T,
    ) -> Result<(), GraphStoreError> {
        self.store.apply_edges(&[relation.link(from, to)]).await
    }

    /// Delete the edge if present.
    pub async fn remove_edge<F: Entity, T: Entity>(
        &self,
        relation: Relation<F, T>,
        from: &F,
        to: &T,
    ) -> Result<(), GraphStoreError> {
        self.store.apply_edges(&[relation.unlink(from, to)]).await
    }

    pub async fn has_edge<F: Entity, T: Entity>(
        &self,
        relation: Relation<F, T>,
        from: &F,
        to: &T,
    ) -> Result<bool, GraphStoreError> {
        self.store.has_edge(&relation.edge(from, to)).await
    }

    /// Targets of `relation` edges starting at `from`.
    pub async fn neighbors<F: Entity, T: Entity>(
        &self,
        relation: Relation<F, T>,
        from: &F,
    ) -> Result<Vec<T>, GraphStoreError> {
        self.store
            .neighbors(
                &from.node_ref(),
                relation.edge_type(),
                GraphDirection::Outbound,
                T::LABEL,
            )
            .await?
            .iter()
            .map(T::from_node)
            .collect()
    }

    /// Sources of `relation` edges ending at `to`.
    pub async fn sources<F: Entity, T: Entity>(
        &self,
        relation: Relation<F, T>,
        to: &T,
    ) -> Result<Vec<F>, GraphStoreError> {
        self.store
            .neighbors(
                &to.node_ref(),
                relation.edge_type(),
                GraphDirection::Inbound,
                F::LABEL,
            )
            .await?
            .iter()
            .map(F::from_node)
            .collect()
    }

    pub async fn execute(&self, command: &SymmetricCommand) -> Result<(), GraphStoreError> {
        self.store.apply_edges(command.mutations()).await
    }

    /// Keys reachable in one hop from both `a` and `b`. The result is a set; its order is
    /// arbitrary.
    pub async fn mutual_neighbors<E: Entity>(
        &self,
        relation: Relation<E, E>,
        a: &E,
        b: &E,
    ) -> Result<Vec<String>, GraphStoreError> {
        let of_a: HashSet<String> = self
            .neighbors(relation, a)
            .await?
            .iter()
            .map(|e| e.key().to_string())
            .collect();
        let of_b: HashSet<String> = self
            .neighbors(relation, b)
            .await?
            .iter()
            .map(|e| e.key().to_string())
            .collect();
        Ok(of_a.intersection(&of_b).cloned().collect())
    }
}
