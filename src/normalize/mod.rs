//! Schema normalizers: typed records from extracted value trees.
//!
//! Each normalizer validates the fields it reads before using them and
//! returns the typed result together with the reconciliation diagnostics
//! it produced.

mod diagnostics;
pub mod evaluation;
pub mod extraction;
mod fields;
pub mod generation;
pub mod heuristic;

pub use diagnostics::{Diagnostic, DiagnosticCode};
pub use evaluation::{
    normalize_evaluation, DimensionScore, EvaluationMetadata, EvaluationResult, EvaluationScore,
    EvaluationType,
};
pub use extraction::{normalize_extraction, ExtractedVariable, VariableExtractionResult, VariablePosition};
pub use generation::{
    normalize_generation, validate_requested_names, GeneratedVariableValue, VariableValueResult,
};

use crate::config::{HeuristicPatterns, NormalizerConfig};
use crate::error::RefineError;

/// A normalized result and what was corrected on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
    /// True when the value came from the text heuristic instead of a
    /// structured candidate.
    pub degraded: bool,
}

/// Config-bound entry point for the three normalizers.
///
/// Holds no mutable state; share one across threads freely.
#[derive(Debug, Clone)]
pub struct Normalizer {
    config: NormalizerConfig,
    patterns: HeuristicPatterns,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Result<Self, RefineError> {
        let patterns = HeuristicPatterns::compile(&config)?;
        Ok(Self { config, patterns })
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    pub fn evaluation(
        &self,
        raw: &str,
        evaluation_type: EvaluationType,
    ) -> Result<Normalized<EvaluationResult>, RefineError> {
        normalize_evaluation(raw, evaluation_type, &self.patterns)
    }

    pub fn variable_extraction(
        &self,
        raw: &str,
        existing_names: &[String],
    ) -> Result<Normalized<VariableExtractionResult>, RefineError> {
        normalize_extraction(raw, existing_names)
    }

    pub fn variable_values(
        &self,
        raw: &str,
        requested: &[String],
    ) -> Result<Normalized<VariableValueResult>, RefineError> {
        normalize_generation(raw, requested, &self.config.missing_value_reason)
    }
}
