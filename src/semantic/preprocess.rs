//! Item-tag preprocessing for embedding input.
//!
//! Joins a box's item tags into one text, the same text the query is
//! compared against. A hash of that text is stored with the embedding so
//! edits that don't change the tags skip re-embedding.

/// Maximum embedding input length (characters, not tokens)
const MAX_TEXT_LENGTH: usize = 512;

/// Ellipsis suffix when the text is truncated
const TRUNCATION_SUFFIX: &str = "...";

/// Join item tags into embedding input.
///
/// Returns `None` when no non-empty tags remain after trimming; callers
/// must not hand empty text to the embedder.
pub fn items_text(items: &[String]) -> Option<String> {
    let tags: Vec<&str> = items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .collect();

    if tags.is_empty() {
        return None;
    }

    Some(truncate_text(&tags.join(", ")))
}

// Limit and cut both count chars, so multi-byte text is neither split
// mid-sequence nor truncated early.
fn truncate_text(text: &str) -> String {
    if text.chars().count() <= MAX_TEXT_LENGTH {
        return text.to_string();
    }

    let max_chars = MAX_TEXT_LENGTH - TRUNCATION_SUFFIX.len();
    let truncated: String = text.chars().take(max_chars).collect();

    format!("{}{}", truncated, TRUNCATION_SUFFIX)
}

/// Hash of the item tags for change detection.
pub fn items_hash(items: &[String]) -> u64 {
    use std::hash::{Hash, Hasher};

    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for item in items {
        item.trim().hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_items_return_none() {
        assert!(items_text(&[]).is_none());
        assert!(items_text(&tags(&["", "   ", "\t\n"])).is_none());
    }

    #[test]
    fn test_joins_with_separator() {
        let result = items_text(&tags(&["Winter coat", "boots", "scarf"]));
        assert_eq!(result, Some("Winter coat, boots, scarf".to_string()));
    }

    #[test]
    fn test_trims_and_drops_empty_tags() {
        let result = items_text(&tags(&["  Winter coat  ", "", "boots "]));
        assert_eq!(result, Some("Winter coat, boots".to_string()));
    }

    #[test]
    fn test_truncation() {
        let long = vec!["x".repeat(600)];
        let result = items_text(&long).unwrap();

        assert!(result.len() <= MAX_TEXT_LENGTH);
        assert!(result.ends_with(TRUNCATION_SUFFIX));
    }

    #[test]
    fn test_multibyte_text_within_char_limit_is_untouched() {
        // 400 chars but 800 bytes; char-counted, so no truncation
        let text = "é".repeat(400);
        let result = items_text(&[text.clone()]).unwrap();
        assert_eq!(result, text);
    }

    #[test]
    fn test_multibyte_truncation_counts_chars() {
        let long = vec!["é".repeat(600)];
        let result = items_text(&long).unwrap();

        assert_eq!(result.chars().count(), MAX_TEXT_LENGTH);
        assert!(result.ends_with(TRUNCATION_SUFFIX));
    }

    #[test]
    fn test_hash_consistency() {
        let a = tags(&["coat", "boots"]);
        assert_eq!(items_hash(&a), items_hash(&a));
    }

    #[test]
    fn test_hash_ignores_surrounding_whitespace() {
        assert_eq!(
            items_hash(&tags(&["  coat ", "boots"])),
            items_hash(&tags(&["coat", "boots"]))
        );
    }

    #[test]
    fn test_hash_changes_with_content() {
        assert_ne!(
            items_hash(&tags(&["coat", "boots"])),
            items_hash(&tags(&["coat", "skis"]))
        );
    }
}
