//! Property-graph model: node labels, edge types, nodes, edges, and the typed entities
//! stored as nodes.

use crate::GraphStoreError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

/// Property bag of a node.
pub type Properties = HashMap<String, serde_json::Value>;

/// Node label. Each label has one primary key property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeLabel {
    User,
    Post,
    Comment,
}

impl NodeLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeLabel::User => "User",
            NodeLabel::Post => "Post",
            NodeLabel::Comment => "Comment",
        }
    }

    /// Name of the primary key property for nodes of this label.
    pub fn key_property(self) -> &'static str {
        match self {
            NodeLabel::User => "user_id",
            NodeLabel::Post => "post_id",
            NodeLabel::Comment => "comment_id",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "User" => Some(NodeLabel::User),
            "Post" => Some(NodeLabel::Post),
            "Comment" => Some(NodeLabel::Comment),
            _ => None,
        }
    }
}

impl std::fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship type. `LIKES` and `CREATED` connect a User to either a Post or a Comment;
/// the target label disambiguates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeType {
    #[serde(rename = "FRIENDS_WITH")]
    FriendsWith,
    #[serde(rename = "LIKES")]
    Likes,
    #[serde(rename = "CREATED")]
    Created,
    #[serde(rename = "HAS_COMMENT")]
    HasComment,
}

impl EdgeType {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeType::FriendsWith => "FRIENDS_WITH",
            EdgeType::Likes => "LIKES",
            EdgeType::Created => "CREATED",
            EdgeType::HasComment => "HAS_COMMENT",
        }
    }
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Traversal direction relative to the starting node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphDirection {
    /// Follow edges that start at the node.
    Outbound,
    /// Follow edges that end at the node.
    Inbound,
}

/// Reference to a node by label and primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeRef {
    pub label: NodeLabel,
    pub key: String,
}

impl NodeRef {
    pub fn new(label: NodeLabel, key: impl Into<String>) -> Self {
        Self {
            label,
            key: key.into(),
        }
    }
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.label, self.key)
    }
}

/// A stored node: label, primary key, and property bag (which also carries the key property).
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub label: NodeLabel,
    pub key: String,
    pub properties: Properties,
}

impl GraphNode {
    pub fn node_ref(&self) -> NodeRef {
        NodeRef::new(self.label, self.key.clone())
    }
}

/// A directed, typed edge. Two edges are the same edge iff relation and both endpoints match,
/// so a store can never hold parallel edges of one type between the same ordered pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphEdge {
    pub relation: EdgeType,
    pub from: NodeRef,
    pub to: NodeRef,
}

/// Pending relationship change, applied by the store together with the node write it
/// accompanies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeMutation {
    Add(GraphEdge),
    Remove(GraphEdge),
}

/// A typed entity persisted as a graph node.
///
/// The serde representation of the entity is its property bag; the key property is part of it.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    const LABEL: NodeLabel;

    /// Primary key value.
    fn key(&self) -> &str;

    fn node_ref(&self) -> NodeRef {
        NodeRef::new(Self::LABEL, self.key())
    }

    fn to_node(&self) -> Result<GraphNode, GraphStoreError> {
        let value =
            serde_json::to_value(self).map_err(|e| GraphStoreError::Decode(e.to_string()))?;
        let serde_json::Value::Object(map) = value else {
            return Err(GraphStoreError::Decode(format!(
                "{} does not serialize to a property map",
                Self::LABEL
            )));
        };
        Ok(GraphNode {
            label: Self::LABEL,
            key: self.key().to_string(),
            properties: map.into_iter().collect(),
        })
    }

    fn from_node(node: &GraphNode) -> Result<Self, GraphStoreError> {
        if node.label != Self::LABEL {
            return Err(GraphStoreError::Decode(format!(
                "expected {} node, got {}",
                Self::LABEL,
                node.node_ref()
            )));
        }
        let map: serde_json::Map<String, serde_json::Value> = node
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|e| GraphStoreError::Decode(format!("{}: {}", node.node_ref(), e)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub email: String,
    /// Seconds since the Unix epoch, set once at insert time.
    pub created_at: f64,
}

impl Entity for User {
    const LABEL: NodeLabel = NodeLabel::User;

    fn key(&self) -> &str {
        &self.user_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Post {
    pub post_id: String,
    pub title: String,
    pub content: String,
    pub created_at: f64,
}

impl Entity for Post {
    const LABEL: NodeLabel = NodeLabel::Post;

    fn key(&self) -> &str {
        &self.post_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    pub comment_id: String,
    pub content: String,
    pub created_at: f64,
}

impl Entity for Comment {
    const LABEL: NodeLabel = NodeLabel::Comment;

    fn key(&self) -> &str {
        &self.comment_id
    }
}
