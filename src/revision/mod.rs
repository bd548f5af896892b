//! Append-only version history for a piece of text.

mod chain;
mod store;
mod types;

pub use chain::{RevisionChains, RevisionError};
pub use store::{InMemoryRevisionStore, RevisionStore, StoreError};
pub use types::{RevisionChain, RevisionVersion, VersionDraft};
