//! Graph store implementations plus the typed data-access layer built on them:
//! entity repository and relation operations.

mod memory;
mod relations;
mod repository;

#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::InMemoryGraphStore;
pub use relations::{
    Relation, RelationOps, SymmetricCommand, CREATED_COMMENT, CREATED_POST, FRIENDS_WITH,
    HAS_COMMENT, LIKES_COMMENT, LIKES_POST,
};
pub use repository::Repository;
pub use social_types::{
    EdgeMutation, EdgeType, GraphDirection, GraphEdge, GraphNode, GraphStore, GraphStoreError,
    NodeLabel, NodeRef,
};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteGraphStore;
