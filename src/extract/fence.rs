//! Locating the JSON-bearing region of a raw model reply.

use std::borrow::Cow;

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";
const FENCE: &str = "```";

/// Remove closed `<think>...</think>` reasoning blocks.
///
/// An unclosed `<think>` is left untouched: the answer may still follow it.
pub fn strip_think_blocks(text: &str) -> Cow<'_, str> {
    if !text.contains(THINK_OPEN) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(THINK_OPEN) {
        let after_open = &rest[start + THINK_OPEN.len()..];
        match after_open.find(THINK_CLOSE) {
            Some(end) => {
                out.push_str(&rest[..start]);
                rest = &after_open[end + THINK_CLOSE.len()..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Return the body of the first ```` ```json ```` fenced block, if any.
///
/// The language tag is matched case-insensitively. When no tagged fence
/// exists, an untagged fence whose body starts with `{` or `[` is used.
/// A fence missing its closing marker (truncated output) yields everything
/// after the opening line.
pub fn extract_fenced(text: &str) -> Option<&str> {
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let lowered = text.to_ascii_lowercase();

    if let Some(pos) = lowered.find("```json") {
        let body_start = pos + "```json".len();
        return Some(fence_body(text, body_start));
    }

    let mut search_from = 0;
    while let Some(rel) = lowered[search_from..].find(FENCE) {
        let open = search_from + rel;
        let after_ticks = open + FENCE.len();
        let line_end = text[after_ticks..]
            .find('\n')
            .map(|i| after_ticks + i)
            .unwrap_or(text.len());
        let tag = text[after_ticks..line_end].trim();
        if tag.is_empty() {
            let body = fence_body(text, line_end);
            if body.starts_with('{') || body.starts_with('[') {
                return Some(body);
            }
        }
        // Skip past this fence's closing marker before looking again.
        search_from = match text[line_end..].find(FENCE) {
            Some(close) => line_end + close + FENCE.len(),
            None => return None,
        };
    }

    None
}

fn fence_body(text: &str, body_start: usize) -> &str {
    let rest = &text[body_start..];
    let body = match rest.find(FENCE) {
        Some(end) => &rest[..end],
        None => rest,
    };
    body.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_fence() {
        let text = "Here you go:\n```json\n{\"a\": 1}\n```\nThanks";
        assert_eq!(extract_fenced(text), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_extract_json_fence_uppercase_tag() {
        let text = "```JSON\n[1, 2]\n```";
        assert_eq!(extract_fenced(text), Some("[1, 2]"));
    }

    #[test]
    fn test_extract_unterminated_fence() {
        let text = "```json\n{\"a\": [1, 2";
        assert_eq!(extract_fenced(text), Some("{\"a\": [1, 2"));
    }

    #[test]
    fn test_untagged_fence_with_object() {
        let text = "```\n{\"b\": true}\n```";
        assert_eq!(extract_fenced(text), Some("{\"b\": true}"));
    }

    #[test]
    fn test_untagged_fence_with_prose_is_skipped() {
        let text = "```\nnot json\n```\nthen\n```\n{\"c\": 3}\n```";
        assert_eq!(extract_fenced(text), Some("{\"c\": 3}"));
    }

    #[test]
    fn test_other_language_fence_is_ignored() {
        let text = "```python\nprint(1)\n```";
        assert_eq!(extract_fenced(text), None);
    }

    #[test]
    fn test_no_fence() {
        assert_eq!(extract_fenced("{\"a\": 1}"), None);
    }

    #[test]
    fn test_strip_think_blocks() {
        let text = "<think>ponder {\"x\":1}</think>{\"a\": 1}";
        assert_eq!(strip_think_blocks(text), "{\"a\": 1}");
    }

    #[test]
    fn test_unclosed_think_is_kept() {
        let text = "<think>still thinking";
        assert_eq!(strip_think_blocks(text), text);
    }

    #[test]
    fn test_fence_after_multibyte_text() {
        let text = "评估结果如下：\n```json\n{\"score\": 1}\n```";
        assert_eq!(extract_fenced(text), Some("{\"score\": 1}"));
    }
}
