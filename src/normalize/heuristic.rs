//! Last-resort interpretation of evaluation replies that carry no usable
//! structure: a score found by regex, a preference found by keyword.

use tracing::debug;

use crate::config::HeuristicPatterns;

/// First 0..=100 integer captured by the score patterns, tried in order.
///
/// Within one pattern, matches are tried left to right. Each capture is
/// widened to the whole number it sits in, so "2024分", "85.5 分" and
/// "Score: 1000" are skipped rather than read as 24, 5 or 100.
pub fn find_score(text: &str, patterns: &HeuristicPatterns) -> Option<u8> {
    for (i, re) in patterns.score_patterns.iter().enumerate() {
        for caps in re.captures_iter(text) {
            let Some(m) = caps.get(1) else { continue };
            let number = whole_number(text, m.start(), m.end());
            match number.parse::<u32>() {
                Ok(n) if n <= 100 => {
                    debug!("Heuristic score {} from pattern #{}", n, i);
                    return Some(n as u8);
                }
                _ => debug!("Skipping non-score number '{}' from pattern #{}", number, i),
            }
        }
    }
    None
}

/// The full numeric token (digits with an optional decimal part) containing
/// `text[start..end]`.
fn whole_number(text: &str, start: usize, end: usize) -> &str {
    let bytes = text.as_bytes();
    let is_digit = |i: usize| bytes.get(i).is_some_and(u8::is_ascii_digit);

    let mut start = start;
    while start > 0
        && (is_digit(start - 1) || (bytes[start - 1] == b'.' && start >= 2 && is_digit(start - 2)))
    {
        start -= 1;
    }

    let mut end = end;
    while end < bytes.len() && (is_digit(end) || (bytes[end] == b'.' && is_digit(end + 1))) {
        end += 1;
    }

    &text[start..end]
}

/// Which prompt the reply prefers, if exactly one side's keywords appear.
///
/// Returns `None` when neither or both sides match.
pub fn infer_preference(text: &str, patterns: &HeuristicPatterns) -> Option<bool> {
    let lower = text.to_lowercase();
    let optimized = patterns
        .optimized_better_keywords
        .iter()
        .any(|k| lower.contains(k.as_str()));
    let original = patterns
        .original_better_keywords
        .iter()
        .any(|k| lower.contains(k.as_str()));

    match (optimized, original) {
        (true, false) => Some(true),
        (false, true) => Some(false),
        _ => None,
    }
}
