//! Placeholder scanning for `{{key}}` tokens
//!
//! Configuration values may embed `{{key}}` references to another instance's
//! output. This module owns the token syntax; the graph builder uses it to
//! discover dependencies and the context uses it to substitute values.

use regex::Regex;
use std::sync::LazyLock;

pub(crate) static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").unwrap());

/// Extract the referenced keys from a template string, in order of first
/// appearance, without duplicates.
pub fn placeholder_keys(template: &str) -> Vec<String> {
    let mut keys = Vec::new();
    for cap in PLACEHOLDER_REGEX.captures_iter(template) {
        let key = cap.get(1).unwrap().as_str().to_string();
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

/// True if the value contains at least one `{{key}}` token.
pub fn contains_placeholder(value: &str) -> bool {
    PLACEHOLDER_REGEX.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_single_key() {
        assert_eq!(
            placeholder_keys("Echo: {{message_text}}"),
            vec!["message_text"]
        );
    }

    #[test]
    fn test_extract_multiple_keys() {
        assert_eq!(
            placeholder_keys("{{greeting}} {{name}}, from {{channel}}"),
            vec!["greeting", "name", "channel"]
        );
    }

    #[test]
    fn test_duplicate_keys_deduplicated() {
        assert_eq!(placeholder_keys("{{a}} and {{a}} and {{b}}"), vec!["a", "b"]);
    }

    #[test]
    fn test_whitespace_trimmed() {
        assert_eq!(placeholder_keys("{{ padded_key }}"), vec!["padded_key"]);
    }

    #[test]
    fn test_no_placeholders() {
        assert!(placeholder_keys("plain literal").is_empty());
        assert!(!contains_placeholder("plain literal"));
    }

    #[test]
    fn test_contains_placeholder() {
        assert!(contains_placeholder("prefix {{key}} suffix"));
        assert!(!contains_placeholder("{unclosed} {{"));
    }
}
