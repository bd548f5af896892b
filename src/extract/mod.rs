//! Pulling structured values out of free-form model output.
//!
//! Nothing here knows about evaluation scores or variables; the
//! normalizers in `crate::normalize` give the value tree its meaning.

mod candidate;
pub mod fence;
pub mod repair;

pub use candidate::{extract_value, ExtractStage, Extracted};
pub use fence::{extract_fenced, strip_think_blocks};
pub use repair::repair_json;
