//! SQLite-backed graph store implementation.

use async_trait::async_trait;
use social_types::{
    EdgeMutation, EdgeType, GraphDirection, GraphEdge, GraphNode, GraphStore, GraphStoreError,
    NodeLabel, NodeRef, Properties,
};
use std::path::Path;

/// SQLite-backed graph store for persistence.
///
/// Each mutating call runs in its own transaction. Edges reference nodes through composite
/// foreign keys with `ON DELETE CASCADE`, so deleting a node detaches it.
pub struct SqliteGraphStore {
    conn: std::sync::Mutex<Option<rusqlite::Connection>>,
}

fn sql_err(e: rusqlite::Error) -> GraphStoreError {
    GraphStoreError::Other(e.to_string())
}

impl SqliteGraphStore {
    /// Open (or create) a store at the given path. `":memory:"` gives a private in-memory
    /// database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GraphStoreError> {
        let conn = rusqlite::Connection::open(path).map_err(sql_err)?;

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS nodes (
                label TEXT NOT NULL,
                key TEXT NOT NULL,
                properties TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (label, key)
            );

            CREATE TABLE IF NOT EXISTS edges (
                relation TEXT NOT NULL,
                from_label TEXT NOT NULL,
                from_key TEXT NOT NULL,
                to_label TEXT NOT NULL,
                to_key TEXT NOT NULL,
                PRIMARY KEY (relation, from_label, from_key, to_label, to_key),
                FOREIGN KEY (from_label, from_key) REFERENCES nodes(label, key) ON DELETE CASCADE,
                FOREIGN KEY (to_label, to_key) REFERENCES nodes(label, key) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_edges_to ON edges(to_label, to_key, relation);
            "#,
        )
        .map_err(sql_err)?;

        Ok(Self {
            conn: std::sync::Mutex::new(Some(conn)),
        })
    }

    fn with_conn<T, F>(&self, f: F) -> Result<T, GraphStoreError>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T, GraphStoreError>,
    {
        let guard = self
            .conn
            .lock()
            .map_err(|e| GraphStoreError::Other(format!("failed to acquire lock: {}", e)))?;
        let conn = guard.as_ref().ok_or(GraphStoreError::Closed)?;
        f(conn)
    }
}

fn node_exists(conn: &rusqlite::Connection, node: &NodeRef) -> Result<bool, GraphStoreError> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM nodes WHERE label = ?1 AND key = ?2)",
        rusqlite::params![node.label.as_str(), node.key],
        |row| row.get::<_, bool>(0),
    )
    .map_err(sql_err)
}

fn encode_properties(properties: &Properties) -> Result<String, GraphStoreError> {
    serde_json::to_string(properties).map_err(|e| GraphStoreError::Decode(e.to_string()))
}

fn decode_node(
    label: String,
    key: String,
    properties: String,
) -> Result<GraphNode, GraphStoreError> {
    let label = NodeLabel::parse(&label)
        .ok_or_else(|| GraphStoreError::Decode(format!("unknown node label: {}", label)))?;
    let properties: Properties = serde_json::from_str(&properties)
        .map_err(|e| GraphStoreError::Decode(format!("{}({}): {}", label, key, e)))?;
    Ok(GraphNode {
        label,
        key,
        properties,
    })
}

fn apply_mutations(
    conn: &rusqlite::Connection,
    mutations: &[EdgeMutation],
    pending: Option<&NodeRef>,
) -> Result<(), GraphStoreError> {
    for m in mutations {
        match m {
            EdgeMutation::Add(edge) => {
                for end in [&edge.from, &edge.to] {
                    if pending != Some(end) && !node_exists(conn, end)? {
                        return Err(GraphStoreError::NodeNotFound(end.clone()));
                    }
                }
                conn.execute(
                    "INSERT OR IGNORE INTO edges (relation, from_label, from_key, to_label, to_key) VALUES (?1, ?2, ?3, ?4, ?5)",
                    edge_params(edge),
                )
                .map_err(sql_err)?;
            }
            EdgeMutation::Remove(edge) => {
                conn.execute(
                    "DELETE FROM edges WHERE relation = ?1 AND from_label = ?2 AND from_key = ?3 AND to_label = ?4 AND to_key = ?5",
                    edge_params(edge),
                )
                .map_err(sql_err)?;
            }
        }
    }
    Ok(())
}

/// Primary-key columns of an edge row, in table order.
fn edge_params(edge: &GraphEdge) -> rusqlite::ParamsFromIter<[&str; 5]> {
    rusqlite::params_from_iter([
        edge.relation.as_str(),
        edge.from.label.as_str(),
        edge.from.key.as_str(),
        edge.to.label.as_str(),
        edge.to.key.as_str(),
    ])
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn insert_node(
        &self,
        node: &GraphNode,
        edges: &[EdgeMutation],
    ) -> Result<(), GraphStoreError> {
        let properties = encode_properties(&node.properties)?;
        let now = chrono::Utc::now().to_rfc3339();
        let node_ref = node.node_ref();

        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction().map_err(sql_err)?;
            if node_exists(&tx, &node_ref)? {
                return Err(GraphStoreError::Conflict(node_ref.clone()));
            }
            tx.execute(
                "INSERT INTO nodes (label, key, properties, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![node.label.as_str(), node.key, properties, now, now],
            )
            .map_err(sql_err)?;
            apply_mutations(&tx, edges, Some(&node_ref))?;
            tx.commit().map_err(sql_err)
        })
    }

    async fn get_node(
        &self,
        label: NodeLabel,
        key: &str,
    ) -> Result<Option<GraphNode>, GraphStoreError> {
        self.with_conn(|conn| {
            let result = conn.query_row(
                "SELECT label, key, properties FROM nodes WHERE label = ?1 AND key = ?2",
                rusqlite::params![label.as_str(), key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            );
            match result {
                Ok((label, key, properties)) => decode_node(label, key, properties).map(Some),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(sql_err(e)),
            }
        })
    }

    async fn list_nodes(&self, label: NodeLabel) -> Result<Vec<GraphNode>, GraphStoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT label, key, properties FROM nodes WHERE label = ?1 ORDER BY key")
                .map_err(sql_err)?;
            let rows = stmt
                .query_map([label.as_str()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })
                .map_err(sql_err)?;

            let mut nodes = Vec::new();
            for row in rows {
                let (label, key, properties) = row.map_err(sql_err)?;
                nodes.push(decode_node(label, key, properties)?);
            }
            Ok(nodes)
        })
    }

    async fn save_node(
        &self,
        node: &GraphNode,
        edges: &[EdgeMutation],
    ) -> Result<(), GraphStoreError> {
        let properties = encode_properties(&node.properties)?;
        let now = chrono::Utc::now().to_rfc3339();

        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction().map_err(sql_err)?;
            let updated = tx
                .execute(
                    "UPDATE nodes SET properties = ?3, updated_at = ?4 WHERE label = ?1 AND key = ?2",
                    rusqlite::params![node.label.as_str(), node.key, properties, now],
                )
                .map_err(sql_err)?;
            if updated == 0 {
                return Err(GraphStoreError::NodeNotFound(node.node_ref()));
            }
            apply_mutations(&tx, edges, None)?;
            tx.commit().map_err(sql_err)
        })
    }

    async fn apply_edges(&self, mutations: &[EdgeMutation]) -> Result<(), GraphStoreError> {
        if mutations.is_empty() {
            return Ok(());
        }
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction().map_err(sql_err)?;
            apply_mutations(&tx, mutations, None)?;
            tx.commit().map_err(sql_err)
        })
    }

    async fn has_edge(&self, edge: &GraphEdge) -> Result<bool, GraphStoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM edges WHERE relation = ?1 AND from_label = ?2 AND from_key = ?3 AND to_label = ?4 AND to_key = ?5)",
                edge_params(edge),
                |row| row.get::<_, bool>(0),
            )
            .map_err(sql_err)
        })
    }

    async fn neighbors(
        &self,
        node: &NodeRef,
        relation: EdgeType,
        direction: GraphDirection,
        label: NodeLabel,
    ) -> Result<Vec<GraphNode>, GraphStoreError> {
        let sql = match direction {
            GraphDirection::Outbound => {
                "SELECT n.label, n.key, n.properties
                 FROM edges e JOIN nodes n ON n.label = e.to_label AND n.key = e.to_key
                 WHERE e.relation = ?1 AND e.from_label = ?2 AND e.from_key = ?3 AND e.to_label = ?4
                 ORDER BY n.key"
            }
            GraphDirection::Inbound => {
                "SELECT n.label, n.key, n.properties
                 FROM edges e JOIN nodes n ON n.label = e.from_label AND n.key = e.from_key
                 WHERE e.relation = ?1 AND e.to_label = ?2 AND e.to_key = ?3 AND e.from_label = ?4
                 ORDER BY n.key"
            }
        };

        self.with_conn(|conn| {
            if !node_exists(conn, node)? {
                return Err(GraphStoreError::NodeNotFound(node.clone()));
            }
            let mut stmt = conn.prepare(sql).map_err(sql_err)?;
            let rows = stmt
                .query_map(
                    rusqlite::params![
                        relation.as_str(),
                        node.label.as_str(),
                        node.key,
                        label.as_str()
                    ],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    },
                )
                .map_err(sql_err)?;

            let mut nodes = Vec::new();
            for row in rows {
                let (label, key, properties) = row.map_err(sql_err)?;
                nodes.push(decode_node(label, key, properties)?);
            }
            Ok(nodes)
        })
    }

    async fn delete_nodes(&self, nodes: &[NodeRef]) -> Result<usize, GraphStoreError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction().map_err(sql_err)?;
            let mut deleted = 0usize;
            for node in nodes {
                deleted += tx
                    .execute(
                        "DELETE FROM nodes WHERE label = ?1 AND key = ?2",
                        rusqlite::params![node.label.as_str(), node.key],
                    )
                    .map_err(sql_err)?;
            }
            tx.commit().map_err(sql_err)?;
            Ok(deleted)
        })
    }

    async fn close(&self) -> Result<(), GraphStoreError> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| GraphStoreError::Other(format!("failed to acquire lock: {}", e)))?;
        match guard.take() {
            Some(conn) => conn.close().map_err(|(_, e)| sql_err(e)),
            None => Ok(()),
        }
    }
}
