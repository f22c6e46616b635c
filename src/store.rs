//! Node Store
//!
//! Local JSON file holding the most recently assembled relay node list.
//! Index-based operations (delete, detail) address nodes by position in
//! this file, so it must be refreshed with `list` before they are valid.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::types::RelayNode;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("node store {path} could not be read (run `list` first): {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("node store {path} is malformed: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write node store {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Flat file cache of the assembled relay node list
pub struct NodeStore {
    path: PathBuf,
}

impl NodeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the store with the given node list, pretty-printed
    pub fn save(&self, nodes: &[RelayNode]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(nodes).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, json).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;
        debug!(count = nodes.len(), path = %self.path.display(), "saved node store");
        Ok(())
    }

    /// Read the stored node list back, failing if missing or malformed
    pub fn load(&self) -> Result<Vec<RelayNode>, StoreError> {
        let json = fs::read_to_string(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str) -> RelayNode {
        RelayNode {
            name: name.to_string(),
            srv_id: Some(format!("{name}-srv")),
            metrics_srv_id: Some(format!("{name}-metrics")),
            a_record_id: Some(format!("{name}-a")),
            cname_id: Some(format!("{name}-cname")),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = NodeStore::new(dir.path().join("nodes.json"));

        let nodes = vec![node("r-na-1.testnet"), node("r-eu-2.testnet")];
        store.save(&nodes).unwrap();

        assert_eq!(store.load().unwrap(), nodes);
    }

    #[test]
    fn save_overwrites_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = NodeStore::new(dir.path().join("nodes.json"));

        store.save(&[node("r-na-1.testnet"), node("r-na-2.testnet")]).unwrap();
        store.save(&[node("r-sa-1.testnet")]).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "r-sa-1.testnet");
    }

    #[test]
    fn load_missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = NodeStore::new(dir.path().join("absent.json"));

        assert!(matches!(store.load(), Err(StoreError::Read { .. })));
    }

    #[test]
    fn load_malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.json");
        std::fs::write(&path, "not json at all").unwrap();

        let store = NodeStore::new(path);
        assert!(matches!(store.load(), Err(StoreError::Parse { .. })));
    }
}
