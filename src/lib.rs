pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod logging;
pub mod normalize;
pub mod patch;
pub mod revision;
pub mod service;

pub use config::{default_config, load_config, NormalizerConfig};
pub use error::{ErrorKind, RefineError, Stage, StageError};
pub use normalize::{
    Diagnostic, DiagnosticCode, EvaluationResult, EvaluationType, ExtractedVariable,
    GeneratedVariableValue, Normalized, Normalizer,
};
pub use patch::{apply_batch, apply_operation, PatchApplyResult, PatchOperation, PatchStatus};
pub use revision::{InMemoryRevisionStore, RevisionChain, RevisionChains, RevisionStore, RevisionVersion};
