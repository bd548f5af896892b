//! Applying model-proposed edits to prompt text.
//!
//! Independent of the rest of the crate: operations come from anywhere
//! (usually an evaluation's patch plan) and are applied to a plain string.

mod engine;
mod types;

pub use engine::{apply_batch, apply_operation, order_by_descending_position, MISSING_OLD_TEXT};
pub use types::*;
