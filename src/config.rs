//! TOML configuration for the schema normalizers.
//!
//! Provides two loading methods:
//! - `default_config()` - Loads the configuration compiled into the binary
//! - `load_config(path)` - Loads a custom configuration from a file path

use std::path::Path;

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RefineError;

/// Default configuration embedded at compile time from `config/normalizer.toml`.
const DEFAULT_CONFIG: &str = include_str!("../config/normalizer.toml");

fn default_snippet_chars() -> usize {
    200
}

fn default_missing_value_reason() -> String {
    "(model did not generate a value for this variable)".to_string()
}

/// Tunables for result interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Ordered regexes for the heuristic score fallback; one capture group each.
    pub score_patterns: Vec<String>,
    /// Phrases meaning "the optimized prompt is better" (matched case-insensitively).
    pub optimized_better_keywords: Vec<String>,
    /// Phrases meaning "the original prompt is better".
    pub original_better_keywords: Vec<String>,
    /// Reason attached to backfilled variable values.
    #[serde(default = "default_missing_value_reason")]
    pub missing_value_reason: String,
    /// Maximum characters of raw model output quoted in diagnostics.
    #[serde(default = "default_snippet_chars")]
    pub diagnostic_snippet_chars: usize,
}

/// Load normalizer configuration from a TOML file.
///
/// # Example
/// ```ignore
/// let config = load_config(Path::new("/etc/promptloom/normalizer.toml"))?;
/// ```
pub fn load_config(path: &Path) -> Result<NormalizerConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: NormalizerConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Get the default configuration embedded in the binary.
///
/// # Panics
/// Panics if the embedded TOML is invalid (a build-time bug, covered by tests).
pub fn default_config() -> NormalizerConfig {
    toml::from_str(DEFAULT_CONFIG).expect("embedded normalizer.toml must be valid TOML")
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        default_config()
    }
}

/// Compiled form of the heuristic settings in a [`NormalizerConfig`].
#[derive(Debug, Clone)]
pub struct HeuristicPatterns {
    pub score_patterns: Vec<Regex>,
    pub optimized_better_keywords: Vec<String>,
    pub original_better_keywords: Vec<String>,
}

impl HeuristicPatterns {
    /// Compile the score regexes once; keywords are lowercased for matching.
    pub fn compile(config: &NormalizerConfig) -> Result<Self, RefineError> {
        let mut score_patterns = Vec::with_capacity(config.score_patterns.len());
        for pattern in &config.score_patterns {
            let re = Regex::new(pattern).map_err(|e| {
                RefineError::Validation(format!("Invalid score pattern '{}': {}", pattern, e))
            })?;
            if re.captures_len() < 2 {
                return Err(RefineError::Validation(format!(
                    "Score pattern '{}' has no capture group",
                    pattern
                )));
            }
            score_patterns.push(re);
        }

        Ok(Self {
            score_patterns,
            optimized_better_keywords: lowercase_all(&config.optimized_better_keywords),
            original_better_keywords: lowercase_all(&config.original_better_keywords),
        })
    }
}

fn lowercase_all(words: &[String]) -> Vec<String> {
    words
        .iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}
