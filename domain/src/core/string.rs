//! String utilities for the domain layer.

/// Truncate a string to a maximum length with ellipsis (UTF-8 safe)
///
/// Uses byte length for max_len but ensures truncation occurs at valid
/// UTF-8 character boundaries.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let target = max_len.saturating_sub(3);
        let mut end = target.min(s.len());
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

/// Lowercased alphanumeric words of at least `min_len` bytes.
///
/// Used for keyword overlap between a self-posed question and gathered data.
pub fn keywords(s: &str, min_len: usize) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= min_len)
        .map(|w| w.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
    }

    #[test]
    fn test_truncate_multibyte() {
        // "é" is 2 bytes: target=3 falls inside the second "é", back off to 2
        assert_eq!(truncate("éééé", 6), "é...");
        assert_eq!(truncate("éé", 10), "éé");
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            keywords("Is BTC funding rate elevated?", 4),
            vec!["funding", "rate", "elevated"]
        );
    }
}
