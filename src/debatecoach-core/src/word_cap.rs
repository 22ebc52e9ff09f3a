//! Word-cap validation and truncation.

use serde::Serialize;

/// Result of checking a text against a word limit.
///
/// Going over the limit is a normal outcome here, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordCapCheck {
    pub success: bool,
    pub word_count: usize,
    pub limit: usize,
    /// How many words over the limit the text is.
    pub violations: usize,
    pub message: String,
}

/// Count whitespace-delimited, non-empty tokens.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Check `text` against `limit`.
pub fn check_word_cap(text: &str, limit: usize) -> WordCapCheck {
    let word_count = count_words(text);
    let violations = word_count.saturating_sub(limit);

    let message = if violations == 0 {
        format!("{} of {} words used.", word_count, limit)
    } else {
        format!(
            "Response exceeds the {}-word limit ({} words). Please remove at least {} words.",
            limit, word_count, violations
        )
    };

    WordCapCheck {
        success: violations == 0,
        word_count,
        limit,
        violations,
        message,
    }
}

/// Trim `text` to at most `limit` words.
///
/// Prefers cutting at a sentence end that falls within the last 20% of the
/// truncated window; otherwise cuts hard and marks the cut with `...`.
pub fn truncate_to_word_limit(text: &str, limit: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= limit {
        return words.join(" ");
    }
    if limit == 0 {
        return String::new();
    }

    let window = words[..limit].join(" ");
    let threshold = window.len() * 4 / 5;

    let mut boundary = None;
    let mut chars = window.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let at_word_end = chars.peek().is_none_or(|(_, next)| next.is_whitespace());
        if at_word_end && idx >= threshold {
            boundary = Some(idx + c.len_utf8());
        }
    }

    match boundary {
        Some(end) => window[..end].to_string(),
        None => format!("{}...", window),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_count_words_ignores_extra_whitespace() {
        assert_eq!(count_words("  one\ttwo \n three  "), 3);
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words("   "), 0);
    }

    #[test]
    fn test_check_within_limit() {
        let check = check_word_cap(&words(50), 180);
        assert!(check.success);
        assert_eq!(check.word_count, 50);
        assert_eq!(check.violations, 0);
    }

    #[test]
    fn test_check_over_limit_reports_counts() {
        let check = check_word_cap(&words(300), 180);
        assert!(!check.success);
        assert_eq!(check.violations, 120);
        assert!(check.message.contains("180"));
        assert!(check.message.contains("300"));
    }

    #[test]
    fn test_violations_match_overflow() {
        for (n, limit) in [(0, 0), (5, 5), (6, 5), (10, 1), (3, 100)] {
            let check = check_word_cap(&words(n), limit);
            assert_eq!(check.violations, n.saturating_sub(limit));
            assert_eq!(check.success, n <= limit);
        }
    }

    #[test]
    fn test_truncate_noop_within_limit() {
        assert_eq!(truncate_to_word_limit("Short  and\nsweet.", 10), "Short and sweet.");
    }

    #[test]
    fn test_truncate_prefers_late_sentence_boundary() {
        let text = "Uniforms reduce peer pressure over clothing. They also save families money. Critics disagree strongly about this";
        let out = truncate_to_word_limit(text, 12);
        assert_eq!(
            out,
            "Uniforms reduce peer pressure over clothing. They also save families money."
        );
    }

    #[test]
    fn test_truncate_ignores_early_boundary() {
        let text = "Yes. this sentence keeps going without any stop for quite a while longer than allowed";
        let out = truncate_to_word_limit(text, 8);
        assert!(out.ends_with("..."));
        assert!(out.starts_with("Yes. this"));
        assert_eq!(count_words(&out), 8);
    }

    #[test]
    fn test_truncate_never_exceeds_limit() {
        let text = "A point. Another point! A question? ".repeat(40);
        for limit in [0, 1, 2, 7, 33, 100] {
            let out = truncate_to_word_limit(&text, limit);
            assert!(count_words(&out) <= limit, "limit {} produced {}", limit, out);
        }
    }

    #[test]
    fn test_truncate_skips_decimal_points() {
        let text = "Scores rose by 3.5 points across every district in the study";
        let out = truncate_to_word_limit(text, 4);
        assert_eq!(out, "Scores rose by 3.5...");
    }
}
