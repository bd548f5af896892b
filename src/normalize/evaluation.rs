use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::diagnostics::{DiagnosticCode, DiagnosticLog};
use super::fields::{index, optional_str, string_list, FieldCtx};
use super::heuristic::{find_score, infer_preference};
use super::Normalized;
use crate::config::HeuristicPatterns;
use crate::error::RefineError;
use crate::extract::extract_value;
use crate::patch::PatchOperation;

/// Key whose presence marks a value as an evaluation.
pub const EVALUATION_DISCRIMINATOR: &str = "score";

const SCORE_MIN: f64 = 0.0;
const SCORE_MAX: f64 = 100.0;

/// What was evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationType {
    Original,
    Optimized,
    /// Original and optimized side by side; sets `is_optimized_better`.
    Compare,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub key: String,
    pub label: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationScore {
    pub overall: f64,
    /// Never empty.
    pub dimensions: Vec<DimensionScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationMetadata {
    pub timestamp: DateTime<Utc>,
    pub model_key: String,
    /// Byte length of the raw reply the result was read from.
    pub input_length: usize,
    /// True when the score came from the text heuristic.
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    #[serde(rename = "type")]
    pub evaluation_type: EvaluationType,
    pub score: EvaluationScore,
    pub issues: Vec<String>,
    pub improvements: Vec<String>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_optimized_better: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EvaluationMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patch_plan: Vec<PatchOperation>,
}

impl EvaluationResult {
    pub fn with_metadata(mut self, metadata: EvaluationMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Interpret a raw evaluation reply.
///
/// A structured candidate is validated strictly: once one is found, a
/// missing or mistyped score field is a `Parse` error and the heuristic is
/// not consulted. Only when no candidate exists at all does the regex
/// heuristic run, producing a single `overall` dimension.
pub fn normalize_evaluation(
    raw: &str,
    evaluation_type: EvaluationType,
    patterns: &HeuristicPatterns,
) -> Result<Normalized<EvaluationResult>, RefineError> {
    let input_len = raw.len();

    if let Some(extracted) = extract_value(raw, EVALUATION_DISCRIMINATOR) {
        debug!(
            "Evaluation candidate found at {:?} stage (array unwrap: {})",
            extracted.stage, extracted.unwrapped_array
        );
        let ctx = FieldCtx::new(input_len);
        let mut log = DiagnosticLog::default();
        let value = from_structured(&extracted.value, evaluation_type, &ctx, &mut log)?;
        return Ok(Normalized {
            value,
            diagnostics: log.into_vec(),
            degraded: false,
        });
    }

    match find_score(raw, patterns) {
        Some(score) => {
            warn!(
                "No structured evaluation in {} bytes; using heuristic score {}",
                input_len, score
            );
            Ok(Normalized {
                value: from_heuristic(raw, score, evaluation_type, patterns),
                diagnostics: Vec::new(),
                degraded: true,
            })
        }
        None => Err(RefineError::parse(
            "No evaluation score found in model output",
            input_len,
        )),
    }
}

fn from_structured(
    value: &Value,
    evaluation_type: EvaluationType,
    ctx: &FieldCtx,
    log: &mut DiagnosticLog,
) -> Result<EvaluationResult, RefineError> {
    let root = ctx.object(value, "")?;
    let score = ctx.object_field(root, "score", "")?;
    let overall = clamp_score(ctx.number(score, "overall", "score")?);

    let raw_dimensions = ctx.array(score, "dimensions", "score")?;
    if raw_dimensions.is_empty() {
        return Err(ctx.invalid("score.dimensions", "non-empty array"));
    }

    let mut dimensions = Vec::with_capacity(raw_dimensions.len());
    for (i, item) in raw_dimensions.iter().enumerate() {
        let path = index("score.dimensions", i);
        let dim = ctx.object(item, &path)?;
        dimensions.push(DimensionScore {
            key: ctx.string(dim, "key", &path)?.to_string(),
            label: ctx.string(dim, "label", &path)?.to_string(),
            score: clamp_score(ctx.number(dim, "score", &path)?),
        });
    }

    let is_optimized_better = match evaluation_type {
        EvaluationType::Compare => root.get("isOptimizedBetter").and_then(parse_preference),
        _ => None,
    };

    Ok(EvaluationResult {
        evaluation_type,
        score: EvaluationScore {
            overall,
            dimensions,
        },
        issues: string_list(root, "issues"),
        improvements: string_list(root, "improvements"),
        summary: optional_str(root, "summary").unwrap_or("").to_string(),
        is_optimized_better,
        metadata: None,
        patch_plan: decode_patch_plan(root, log),
    })
}

fn from_heuristic(
    raw: &str,
    score: u8,
    evaluation_type: EvaluationType,
    patterns: &HeuristicPatterns,
) -> EvaluationResult {
    let score = f64::from(score);
    let is_optimized_better = match evaluation_type {
        EvaluationType::Compare => infer_preference(raw, patterns),
        _ => None,
    };

    EvaluationResult {
        evaluation_type,
        score: EvaluationScore {
            overall: score,
            dimensions: vec![DimensionScore {
                key: "overall".to_string(),
                label: "Overall".to_string(),
                score,
            }],
        },
        issues: Vec::new(),
        improvements: Vec::new(),
        summary: raw.trim().to_string(),
        is_optimized_better,
        metadata: None,
        patch_plan: Vec::new(),
    }
}

fn clamp_score(score: f64) -> f64 {
    score.clamp(SCORE_MIN, SCORE_MAX)
}

/// Boolean, or one of "true"/"yes"/"false"/"no" in any case. Anything
/// else is left unset.
fn parse_preference(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Edits are optional; undecodable entries are dropped with a diagnostic.
fn decode_patch_plan(root: &Map<String, Value>, log: &mut DiagnosticLog) -> Vec<PatchOperation> {
    let items = match root.get("patchPlan") {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => {
            log.push(
                DiagnosticCode::InvalidPatchOperation,
                "patchPlan",
                "patchPlan is not an array; ignored",
            );
            return Vec::new();
        }
    };

    let mut plan = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match PatchOperation::from_value(item) {
            Ok(op) => plan.push(op),
            Err(e) => log.push(DiagnosticCode::InvalidPatchOperation, index("patchPlan", i), e),
        }
    }
    plan
}
