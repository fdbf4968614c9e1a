//! Small text helpers shared across crates.

/// Truncate text to a maximum character count, adding ellipsis if needed.
///
/// Uses Unicode-aware character counting and trims surrounding whitespace.
///
/// # Examples
///
/// ```
/// use logan_core::truncate;
///
/// assert_eq!(truncate("hello world", 8), "hello...");
/// assert_eq!(truncate("short", 10), "short");
/// ```
pub fn truncate(s: &str, max_chars: usize) -> String {
    let s = s.trim();
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", truncated.trim_end())
    }
}

/// Normalize a free-form label for loose comparison.
///
/// Lowercases, trims, and folds spaces, dashes and underscores into a single
/// `_`, so `"Root Cause"`, `"root-cause"` and `"ROOT_CAUSE"` compare equal.
///
/// ```
/// use logan_core::normalize_label;
///
/// assert_eq!(normalize_label("  Suggested  Fix "), "suggested_fix");
/// assert_eq!(normalize_label("root-cause"), "root_cause");
/// ```
pub fn normalize_label(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::fits("short", 10, "short")]
    #[case::exact("12345", 5, "12345")]
    #[case::cut("hello world", 8, "hello...")]
    #[case::trims("  padded  ", 10, "padded")]
    #[case::unicode("日本語テキスト", 5, "日本...")]
    fn test_truncate(#[case] input: &str, #[case] max: usize, #[case] expected: &str) {
        assert_eq!(truncate(input, max), expected);
    }

    #[rstest]
    #[case("Root Cause", "root_cause")]
    #[case("suggested_fix", "suggested_fix")]
    #[case("TIME-STAMP", "time_stamp")]
    #[case("", "")]
    fn test_normalize_label(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_label(input), expected);
    }
}
