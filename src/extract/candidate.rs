//! Staged extraction of a structured candidate from raw model text.

use serde_json::Value;
use tracing::debug;

use super::fence::{extract_fenced, strip_think_blocks};
use super::repair::repair_json;

/// Upper bound on bracketed slices tried before giving up.
const MAX_SLICE_ATTEMPTS: usize = 16;

/// Which degradation stage produced the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractStage {
    /// The candidate parsed as-is.
    Strict,
    /// The candidate parsed after the repair pass.
    Repaired,
    /// Only the bracketed slice of the candidate parsed (after repair).
    Sliced,
}

/// A structurally matching value pulled out of model output.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub value: Value,
    pub stage: ExtractStage,
    /// True when the root was an array and an element was selected from it.
    pub unwrapped_array: bool,
}

/// Pull a JSON object out of raw model output.
///
/// `discriminator` is the key that identifies the expected shape (for
/// example `score` for evaluations). Stages, first success wins:
///
/// 1. fenced ```` ```json ```` block, otherwise the whole text
/// 2. strict parse, then repaired parse, then repaired parse of each
///    top-level bracketed slice in turn (prose like `[v2]` before the
///    object is stepped over)
/// 3. an array root is scanned for the first object carrying `discriminator`
///
/// Returns `None` when every stage fails; the caller decides what to do next.
pub fn extract_value(raw: &str, discriminator: &str) -> Option<Extracted> {
    let cleaned = strip_think_blocks(raw);
    let candidate = match extract_fenced(&cleaned) {
        Some(body) => {
            debug!("Using fenced block ({} bytes) as candidate", body.len());
            body
        }
        None => cleaned.trim(),
    };

    if candidate.is_empty() {
        debug!("Empty candidate; nothing to extract");
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        if let Some(found) = select(value, discriminator, ExtractStage::Strict) {
            return Some(found);
        }
    }

    let repaired = repair_json(candidate);
    if repaired != candidate {
        match serde_json::from_str::<Value>(&repaired) {
            Ok(value) => {
                if let Some(found) = select(value, discriminator, ExtractStage::Repaired) {
                    debug!("Candidate parsed after repair");
                    return Some(found);
                }
            }
            Err(e) => debug!("Repaired candidate still invalid: {}", e),
        }
    }

    let mut from = 0;
    for _ in 0..MAX_SLICE_ATTEMPTS {
        let Some((start, slice)) = bracketed_slice(candidate, from) else {
            break;
        };
        from = start + slice.len();
        if slice.len() == candidate.len() {
            continue;
        }
        let repaired = repair_json(slice);
        match serde_json::from_str::<Value>(&repaired) {
            Ok(value) => {
                if let Some(found) = select(value, discriminator, ExtractStage::Sliced) {
                    debug!("Candidate parsed from bracketed slice at byte {}", start);
                    return Some(found);
                }
            }
            Err(e) => debug!("Bracketed slice at byte {} invalid after repair: {}", start, e),
        }
    }

    debug!(
        "No structured candidate with key '{}' in {} bytes of output",
        discriminator,
        raw.len()
    );
    None
}

/// Pick the value that structurally matches the expected shape.
fn select(value: Value, discriminator: &str, stage: ExtractStage) -> Option<Extracted> {
    match value {
        Value::Array(items) => {
            let found = items
                .into_iter()
                .find(|item| item.get(discriminator).is_some())?;
            debug!("Selected array element carrying '{}'", discriminator);
            Some(Extracted {
                value: found,
                stage,
                unwrapped_array: true,
            })
        }
        value if value.is_object() && value.get(discriminator).is_some() => Some(Extracted {
            value,
            stage,
            unwrapped_array: false,
        }),
        _ => None,
    }
}

/// The region from the first `{` or `[` at or after `from` to its matching
/// closer, with its start offset.
///
/// If the closer never arrives (truncated output) the slice runs to the end.
fn bracketed_slice(text: &str, from: usize) -> Option<(usize, &str)> {
    let start = from + text[from..].find(['{', '['])?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some((start, &text[start..start + offset + c.len_utf8()]));
                }
            }
            _ => {}
        }
    }

    Some((start, &text[start..]))
}
