//! Anchor-based text substitution.
//!
//! `apply_operation` is a pure function: it never fails, never mutates its
//! input, and reports why an operation was skipped.
//!
//! # Batches
//!
//! Every call re-scans the *current* text for its anchor. Offsets are not
//! carried across operations, so when several operations target the same
//! text the caller owns the order: each anchor must still exist (with the
//! intended occurrence number) after the earlier edits. Applying in
//! descending order of original position, see
//! [`order_by_descending_position`], or keeping anchors disjoint satisfies
//! this.

use tracing::debug;

use super::types::{BatchOutcome, PatchApplyResult, PatchOperation, PatchReport, PatchStatus};

pub const MISSING_OLD_TEXT: &str = "Missing oldText";

/// Apply one operation to `text`.
///
/// Locates the Nth non-overlapping occurrence of `old_text` (N defaults to
/// 1) and splices `new_text` in its place.
pub fn apply_operation(text: &str, operation: &PatchOperation) -> PatchApplyResult {
    let old = operation.old_text.as_str();
    if old.is_empty() {
        return skipped(text, operation, MISSING_OLD_TEXT.to_string());
    }

    let count = text.matches(old).count();
    if count == 0 {
        return skipped(text, operation, "oldText not found in text".to_string());
    }

    let wanted = operation.target_occurrence();
    if wanted > count {
        return skipped(
            text,
            operation,
            format!(
                "Requested occurrence {} but oldText was found {} time(s)",
                wanted, count
            ),
        );
    }

    let Some(idx) = nth_start(text, old, wanted) else {
        return skipped(text, operation, "oldText not found in text".to_string());
    };

    let mut out = String::with_capacity(text.len() - old.len() + operation.new_text.len());
    out.push_str(&text[..idx]);
    out.push_str(&operation.new_text);
    out.push_str(&text[idx + old.len()..]);

    debug!(
        "Applied {:?} at byte {} (occurrence {} of {})",
        operation.op, idx, wanted, count
    );

    PatchApplyResult {
        ok: true,
        text: out,
        report: PatchReport {
            op: operation.op,
            status: PatchStatus::Applied,
            reason: None,
        },
    }
}

/// Apply operations one after another, in the order given.
///
/// A skipped operation never blocks later ones; every operation gets a
/// report, in input order.
pub fn apply_batch(text: &str, operations: &[PatchOperation]) -> BatchOutcome {
    let mut current = text.to_string();
    let mut reports = Vec::with_capacity(operations.len());

    for operation in operations {
        let result = apply_operation(&current, operation);
        if result.ok {
            current = result.text;
        }
        reports.push(result.report);
    }

    let outcome = BatchOutcome {
        text: current,
        reports,
    };
    debug!(
        "Batch finished: {}/{} operations applied",
        outcome.applied_count(),
        outcome.reports.len()
    );
    outcome
}

/// Reorder operations by where their target occurrence starts in `text`,
/// last position first.
///
/// Applying in this order keeps earlier anchors in place as long as the
/// anchors do not overlap. Operations whose anchor cannot be located keep
/// their relative order and go last; they will be skipped when applied.
/// This only reorders, it does not change what any operation does.
pub fn order_by_descending_position(
    text: &str,
    operations: &[PatchOperation],
) -> Vec<PatchOperation> {
    let mut located: Vec<(usize, usize, &PatchOperation)> = Vec::new();
    let mut unlocated: Vec<&PatchOperation> = Vec::new();

    for (index, operation) in operations.iter().enumerate() {
        let position = if operation.old_text.is_empty() {
            None
        } else {
            nth_start(text, &operation.old_text, operation.target_occurrence())
        };
        match position {
            Some(pos) => located.push((pos, index, operation)),
            None => unlocated.push(operation),
        }
    }

    // Stable on ties: equal positions keep input order.
    located.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    located
        .into_iter()
        .map(|(_, _, op)| op.clone())
        .chain(unlocated.into_iter().cloned())
        .collect()
}

/// Byte index of the Nth (1-based) non-overlapping occurrence.
fn nth_start(text: &str, needle: &str, n: usize) -> Option<usize> {
    text.match_indices(needle).nth(n - 1).map(|(idx, _)| idx)
}

fn skipped(text: &str, operation: &PatchOperation, reason: String) -> PatchApplyResult {
    debug!("Skipped {:?}: {}", operation.op, reason);
    PatchApplyResult {
        ok: false,
        text: text.to_string(),
        report: PatchReport {
            op: operation.op,
            status: PatchStatus::Skipped,
            reason: Some(reason),
        },
    }
}
