use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{RefineError, Stage, StageError};
use crate::patch::{apply_batch, PatchOperation, PatchReport};
use crate::revision::{RevisionChain, RevisionChains, RevisionStore, VersionDraft};

/// Result of applying a patch plan to a chain's current prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationOutcome {
    /// The chain after the iteration; unchanged when nothing applied.
    pub chain: RevisionChain,
    /// One report per operation, in the order given.
    pub reports: Vec<PatchReport>,
    /// Whether a new version was appended.
    pub recorded: bool,
}

/// Applies model-proposed edits to the head of a revision chain.
pub struct IterationService<S: RevisionStore> {
    chains: Arc<RevisionChains<S>>,
}

impl<S: RevisionStore> Clone for IterationService<S> {
    fn clone(&self) -> Self {
        Self {
            chains: Arc::clone(&self.chains),
        }
    }
}

impl<S: RevisionStore> IterationService<S> {
    pub fn new(chains: Arc<RevisionChains<S>>) -> Self {
        Self { chains }
    }

    pub fn chains(&self) -> &RevisionChains<S> {
        &self.chains
    }

    /// Apply `operations` in the given order to the chain's current prompt.
    ///
    /// Anchors are looked up in the text as it stands after the previous
    /// operations, so the caller is responsible for an order that keeps them
    /// valid (see [`crate::patch::order_by_descending_position`]). A new
    /// version is appended when at least one operation applied; the model
    /// key and template of the current head carry over.
    pub fn apply_patch_plan(
        &self,
        chain_id: &str,
        operations: &[PatchOperation],
        note: Option<&str>,
    ) -> Result<IterationOutcome, StageError> {
        let chain = self
            .chains
            .get_chain(chain_id)
            .map_err(|e| StageError::new(Stage::Validate, RefineError::from(e)))?;

        let outcome = apply_batch(chain.current_prompt(), operations);
        let applied = outcome.applied_count();
        if applied < outcome.reports.len() {
            warn!(
                "Patch plan for chain {}: {}/{} operations applied",
                chain_id,
                applied,
                outcome.reports.len()
            );
        }

        if applied == 0 {
            return Ok(IterationOutcome {
                chain,
                reports: outcome.reports,
                recorded: false,
            });
        }

        let head = &chain.current_record;
        let mut draft = VersionDraft::new(
            head.original_prompt.clone(),
            outcome.text,
            head.model_key.clone(),
            head.template_id.clone(),
        );
        if let Some(note) = note {
            draft = draft.with_note(note);
        }

        let chain = self
            .chains
            .append_version(chain_id, draft)
            .map_err(|e| StageError::new(Stage::Record, RefineError::from(e)))?;
        info!(
            "Chain {} advanced to version {} ({} edits)",
            chain_id, chain.current_record.version, applied
        );

        Ok(IterationOutcome {
            chain,
            reports: outcome.reports,
            recorded: true,
        })
    }
}
