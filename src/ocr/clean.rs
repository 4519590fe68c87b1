/// Normalizes raw OCR lines into tokens.
///
/// Trailing commas (left over from thousands grouping at a line break) are
/// removed, then lines that are empty or whitespace-only are dropped.
/// Order is preserved. Surviving tokens are returned trimmed. Tesseract's
/// trailing form feed counts as whitespace.
pub fn clean_lines<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    lines
        .iter()
        .map(|line| {
            line.as_ref()
                .trim_end_matches(|c: char| c == ',' || c.is_whitespace())
                .trim_start()
        })
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Removes thousands separators: `"1,234,567"` → `"1234567"`.
pub fn strip_thousands(token: &str) -> String {
    token.replace(',', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_commas_stripped() {
        let lines = ["1,234,", "567,,", "89"];
        assert_eq!(clean_lines(&lines), vec!["1,234", "567", "89"]);
    }

    #[test]
    fn test_blank_lines_removed_order_kept() {
        let lines = ["", "  ", "a", "\t", "b", ",", "c", "\r"];
        assert_eq!(clean_lines(&lines), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_all_empty_input() {
        let lines: [&str; 3] = ["", " ", ","];
        assert!(clean_lines(&lines).is_empty());
        assert!(clean_lines::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let lines = ["  12.50 ,", "", "1,000,", "x  ", " , ", "7, ,"];
        let once = clean_lines(&lines);
        let twice = clean_lines(&once);
        assert_eq!(once, twice);
        for token in &once {
            assert!(!token.trim().is_empty());
            assert!(!token.ends_with(','));
        }
    }

    #[test]
    fn test_engine_output_lines() {
        let lines: Vec<&str> = "2,450.10\n2,450.05,\n\n2,450.00\n\x0c".split('\n').collect();
        assert_eq!(clean_lines(&lines), vec!["2,450.10", "2,450.05", "2,450.00"]);
    }

    #[test]
    fn test_strip_thousands() {
        assert_eq!(strip_thousands("1,234"), "1234");
        assert_eq!(strip_thousands("1,234,567.50"), "1234567.50");
        assert_eq!(strip_thousands("987"), "987");
    }
}
