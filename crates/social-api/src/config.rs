//! Server configuration read from the environment.

use social_graph::InMemoryGraphStore;
use social_types::{GraphStore, GraphStoreError};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

pub const LISTEN_VAR: &str = "SOCIAL_LISTEN";
pub const GRAPH_DB_VAR: &str = "SOCIAL_GRAPH_DB";
pub const DEFAULT_LISTEN: &str = "0.0.0.0:5000";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid SOCIAL_LISTEN value {value:?}: {source}")]
    InvalidListen {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("SOCIAL_GRAPH_DB is set to {0:?} but this build has no sqlite support")]
    SqliteUnavailable(PathBuf),
}

/// Where the graph lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphBackend {
    InMemory,
    Sqlite(PathBuf),
}

impl GraphBackend {
    pub fn open(&self) -> Result<Arc<dyn GraphStore>, GraphStoreError> {
        match self {
            GraphBackend::InMemory => Ok(Arc::new(InMemoryGraphStore::new())),
            #[cfg(feature = "sqlite")]
            GraphBackend::Sqlite(path) => {
                Ok(Arc::new(social_graph::SqliteGraphStore::open(path)?))
            }
            #[cfg(not(feature = "sqlite"))]
            GraphBackend::Sqlite(path) => Err(GraphStoreError::Other(format!(
                "sqlite backend not compiled in: {}",
                path.display()
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub listen: SocketAddr,
    pub backend: GraphBackend,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let raw_listen = var(LISTEN_VAR).unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen = raw_listen
            .trim()
            .parse()
            .map_err(|source| ConfigError::InvalidListen {
                value: raw_listen.clone(),
                source,
            })?;

        let backend = match var(GRAPH_DB_VAR) {
            None => GraphBackend::InMemory,
            Some(path) => sqlite_backend(PathBuf::from(path))?,
        };

        Ok(Self { listen, backend })
    }
}

#[cfg(feature = "sqlite")]
fn sqlite_backend(path: PathBuf) -> Result<GraphBackend, ConfigError> {
    Ok(GraphBackend::Sqlite(path))
}

#[cfg(not(feature = "sqlite"))]
fn sqlite_backend(path: PathBuf) -> Result<GraphBackend, ConfigError> {
    Err(ConfigError::SqliteUnavailable(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_to_in_memory_on_port_5000() {
        let config = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.listen, DEFAULT_LISTEN.parse::<SocketAddr>().unwrap());
        assert_eq!(config.backend, GraphBackend::InMemory);
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config =
            ApiConfig::from_lookup(lookup(&[(LISTEN_VAR, " "), (GRAPH_DB_VAR, "")])).unwrap();
        assert_eq!(config.listen.port(), 5000);
        assert_eq!(config.backend, GraphBackend::InMemory);
    }

    #[test]
    fn custom_listen_address() {
        let config = ApiConfig::from_lookup(lookup(&[(LISTEN_VAR, "127.0.0.1:8080")])).unwrap();
        assert_eq!(config.listen, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn invalid_listen_is_rejected() {
        let err = ApiConfig::from_lookup(lookup(&[(LISTEN_VAR, "not-an-addr")])).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidListen { ref value, .. } if value == "not-an-addr")
        );
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn graph_db_selects_sqlite() {
        let config =
            ApiConfig::from_lookup(lookup(&[(GRAPH_DB_VAR, "/tmp/social.db")])).unwrap();
        assert_eq!(
            config.backend,
            GraphBackend::Sqlite(PathBuf::from("/tmp/social.db"))
        );
    }

    #[cfg(not(feature = "sqlite"))]
    #[test]
    fn graph_db_without_sqlite_support_is_an_error() {
        let err =
            ApiConfig::from_lookup(lookup(&[(GRAPH_DB_VAR, "/tmp/social.db")])).unwrap_err();
        assert!(matches!(err, ConfigError::SqliteUnavailable(_)));
    }

    #[tokio::test]
    async fn in_memory_backend_opens_and_closes() {
        let store = GraphBackend::InMemory.open().unwrap();
        assert!(store
            .list_nodes(social_types::NodeLabel::User)
            .await
            .unwrap()
            .is_empty());
        store.close().await.unwrap();
    }
}
