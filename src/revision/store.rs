use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;
use tracing::debug;

use super::types::RevisionVersion;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    /// The write was based on a head that is no longer current, or reused an id.
    #[error("Conflicting write: {0}")]
    Conflict(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Persistence for revision versions.
///
/// Implementations own durability and I/O; the chain service only relies on
/// this contract. Versions are never updated or removed once inserted.
pub trait RevisionStore: Send + Sync {
    /// Insert a new version. Must fail with `Conflict` if the id exists, or
    /// if `version` is not one past the chain's current head.
    fn insert_version(&self, version: RevisionVersion) -> Result<(), StoreError>;

    fn get_version(&self, id: &str) -> Result<RevisionVersion, StoreError>;

    /// All versions of a chain, ascending by version. `NotFound` when the
    /// chain has none.
    fn versions_for_chain(&self, chain_id: &str) -> Result<Vec<RevisionVersion>, StoreError>;

    /// Chain ids in creation order.
    fn chain_ids(&self) -> Result<Vec<String>, StoreError>;
}

#[derive(Debug, Default)]
struct Inner {
    versions: HashMap<String, RevisionVersion>,
    /// chain id -> version ids, ascending.
    chains: HashMap<String, Vec<String>>,
    chain_order: Vec<String>,
}

/// Process-local store, mainly for tests and single-process embedding.
#[derive(Debug, Default)]
pub struct InMemoryRevisionStore {
    inner: RwLock<Inner>,
}

impl InMemoryRevisionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("revision store lock poisoned".to_string())
}

impl RevisionStore for InMemoryRevisionStore {
    fn insert_version(&self, version: RevisionVersion) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(poisoned)?;

        if inner.versions.contains_key(&version.id) {
            return Err(StoreError::Conflict(format!(
                "version id {} already exists",
                version.id
            )));
        }

        let head_len = inner.chains.get(&version.chain_id).map_or(0, Vec::len);
        if version.version as usize != head_len + 1 {
            return Err(StoreError::Conflict(format!(
                "chain {} is at version {}, cannot insert version {}",
                version.chain_id, head_len, version.version
            )));
        }

        if head_len == 0 {
            inner.chain_order.push(version.chain_id.clone());
        }
        inner
            .chains
            .entry(version.chain_id.clone())
            .or_default()
            .push(version.id.clone());
        debug!(
            "Stored version {} (v{}) of chain {}",
            version.id, version.version, version.chain_id
        );
        inner.versions.insert(version.id.clone(), version);
        Ok(())
    }

    fn get_version(&self, id: &str) -> Result<RevisionVersion, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        inner
            .versions
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Version {}", id)))
    }

    fn versions_for_chain(&self, chain_id: &str) -> Result<Vec<RevisionVersion>, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        let ids = inner
            .chains
            .get(chain_id)
            .ok_or_else(|| StoreError::NotFound(format!("Chain {}", chain_id)))?;
        ids.iter()
            .map(|id| {
                inner
                    .versions
                    .get(id)
                    .cloned()
                    .ok_or_else(|| StoreError::Backend(format!("index references missing version {}", id)))
            })
            .collect()
    }

    fn chain_ids(&self) -> Result<Vec<String>, StoreError> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.chain_order.clone())
    }
}
