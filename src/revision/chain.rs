use std::collections::HashSet;
use std::sync::Mutex;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use super::store::{RevisionStore, StoreError};
use super::types::{RevisionChain, RevisionVersion, VersionDraft};
use crate::error::RefineError;

/// Upper bound on lineage walks, far beyond any real chain.
const MAX_LINEAGE_DEPTH: usize = 10_000;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RevisionError {
    #[error("Invalid version data: {0}")]
    Invalid(String),

    /// Stored versions violate the chain invariants.
    #[error("Corrupt revision data: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<RevisionError> for RefineError {
    fn from(err: RevisionError) -> Self {
        match err {
            RevisionError::Invalid(msg) => RefineError::Validation(msg),
            RevisionError::Store(StoreError::NotFound(what)) => {
                RefineError::Validation(format!("{} not found", what))
            }
            other => RefineError::Execution(other.to_string()),
        }
    }
}

/// Append-only version history over an injected store.
///
/// Appends are serialized within one instance so two writers never claim
/// the same version number; the store's conflict check covers writers in
/// other processes.
pub struct RevisionChains<S: RevisionStore> {
    store: S,
    append_lock: Mutex<()>,
}

impl<S: RevisionStore> RevisionChains<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            append_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Start a chain; the draft becomes version 1 with no predecessor.
    pub fn create_chain(&self, draft: VersionDraft) -> Result<RevisionChain, RevisionError> {
        validate_draft(&draft)?;
        let chain_id = Uuid::new_v4().to_string();
        let root = build_version(&chain_id, 1, None, draft);

        self.store.insert_version(root.clone())?;
        info!("Created revision chain {} (root {})", chain_id, root.id);

        Ok(RevisionChain {
            chain_id,
            root_record: root.clone(),
            current_record: root.clone(),
            versions: vec![root],
        })
    }

    /// Add a version after the chain's current head.
    pub fn append_version(
        &self,
        chain_id: &str,
        draft: VersionDraft,
    ) -> Result<RevisionChain, RevisionError> {
        validate_draft(&draft)?;
        let _guard = self
            .append_lock
            .lock()
            .map_err(|_| StoreError::Backend("append lock poisoned".to_string()))?;

        let mut chain = self.get_chain(chain_id)?;
        let head = &chain.current_record;
        let next = build_version(chain_id, head.version + 1, Some(head.id.clone()), draft);

        self.store.insert_version(next.clone())?;
        info!(
            "Appended version {} (v{}) to chain {}",
            next.id, next.version, chain_id
        );

        chain.current_record = next.clone();
        chain.versions.push(next);
        Ok(chain)
    }

    /// Load a chain and check its numbering and linkage.
    pub fn get_chain(&self, chain_id: &str) -> Result<RevisionChain, RevisionError> {
        let versions = self.store.versions_for_chain(chain_id)?;
        check_chain(chain_id, &versions)?;

        let (Some(root), Some(current)) = (versions.first(), versions.last()) else {
            return Err(StoreError::NotFound(format!("Chain {}", chain_id)).into());
        };

        Ok(RevisionChain {
            chain_id: chain_id.to_string(),
            root_record: root.clone(),
            current_record: current.clone(),
            versions,
        })
    }

    /// Versions from the root up to and including `version_id`, following
    /// `previous_id` links.
    pub fn get_version_lineage(&self, version_id: &str) -> Result<Vec<RevisionVersion>, RevisionError> {
        let mut lineage = vec![self.store.get_version(version_id)?];
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(version_id.to_string());

        while let Some(previous_id) = lineage.last().and_then(|v| v.previous_id.clone()) {
            if !visited.insert(previous_id.clone()) {
                return Err(RevisionError::Corrupt(format!(
                    "cycle detected at version {}",
                    previous_id
                )));
            }
            if lineage.len() >= MAX_LINEAGE_DEPTH {
                return Err(RevisionError::Corrupt(format!(
                    "lineage of {} exceeds maximum depth of {}",
                    version_id, MAX_LINEAGE_DEPTH
                )));
            }
            lineage.push(self.store.get_version(&previous_id)?);
        }

        lineage.reverse();
        debug!("Lineage of {} has {} versions", version_id, lineage.len());
        Ok(lineage)
    }

    pub fn list_chain_ids(&self) -> Result<Vec<String>, RevisionError> {
        Ok(self.store.chain_ids()?)
    }
}

fn validate_draft(draft: &VersionDraft) -> Result<(), RevisionError> {
    if draft.model_key.trim().is_empty() {
        return Err(RevisionError::Invalid("model key must not be empty".to_string()));
    }
    if draft.optimized_prompt.trim().is_empty() {
        return Err(RevisionError::Invalid(
            "optimized prompt must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn build_version(
    chain_id: &str,
    version: u32,
    previous_id: Option<String>,
    draft: VersionDraft,
) -> RevisionVersion {
    RevisionVersion {
        id: Uuid::new_v4().to_string(),
        chain_id: chain_id.to_string(),
        version,
        previous_id,
        original_prompt: draft.original_prompt,
        optimized_prompt: draft.optimized_prompt,
        timestamp: draft.timestamp.unwrap_or_else(Utc::now),
        model_key: draft.model_key,
        template_id: draft.template_id,
        iteration_note: draft.iteration_note,
    }
}

/// Versions are numbered 1..=n and each links to the one before it.
fn check_chain(chain_id: &str, versions: &[RevisionVersion]) -> Result<(), RevisionError> {
    for (i, v) in versions.iter().enumerate() {
        let expected = i as u32 + 1;
        if v.version != expected {
            return Err(RevisionError::Corrupt(format!(
                "chain {} has version {} at position {}",
                chain_id, v.version, expected
            )));
        }
        let expected_previous = if i == 0 { None } else { Some(&versions[i - 1].id) };
        if v.previous_id.as_ref() != expected_previous {
            return Err(RevisionError::Corrupt(format!(
                "version {} of chain {} does not link to its predecessor",
                v.id, chain_id
            )));
        }
    }
    Ok(())
}
