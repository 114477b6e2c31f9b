//! Bounded context assembly from ranked passages.

use super::Passage;

/// Concatenates passages in rank order until the character budget is reached.
///
/// The first passage that would overflow the budget stops assembly; passages are never split.
/// Separators are not counted against the budget.
pub fn build_context(passages: &[Passage], max_chars: usize) -> String {
    let mut segments: Vec<String> = Vec::new();
    let mut total = 0usize;
    for passage in passages {
        let segment = format!(
            "[Nguồn: {}, Trang: {}]\n{}",
            passage.source,
            passage.page.as_deref().unwrap_or("?"),
            passage.content.trim()
        );
        let len = segment.chars().count();
        if total + len > max_chars {
            break;
        }
        total += len;
        segments.push(segment);
    }
    segments.join("\n\n")
}
