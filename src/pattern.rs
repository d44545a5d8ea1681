//! Issue key detection.

use std::ops::Range;
use std::sync::LazyLock;

use regex::{CaptureMatches, Regex};

/// Uppercase project key, a hyphen, then the issue number.
static ISSUE_KEY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]+)-([0-9]+)\b").expect("invalid issue key regex"));

/// A single issue key found in a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueMatch<'t> {
    /// The whole key, e.g. `PROJ-123`.
    pub full_key: &'t str,
    /// The project part of the key, e.g. `PROJ`.
    pub project_key: &'t str,
    /// Byte offset of the key in the scanned text.
    pub offset: usize,
    /// Byte length of the key.
    pub len: usize,
}

impl IssueMatch<'_> {
    /// Byte range of the key in the scanned text.
    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Lazy iterator over the issue keys of a string, left to right.
#[derive(Debug)]
pub struct Matches<'r, 't> {
    inner: CaptureMatches<'r, 't>,
}

impl<'t> Iterator for Matches<'_, 't> {
    type Item = IssueMatch<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let caps = self.inner.next()?;
        let full = caps.get(0)?;
        let project = caps.get(1)?;
        Some(IssueMatch {
            full_key: full.as_str(),
            project_key: project.as_str(),
            offset: full.start(),
            len: full.len(),
        })
    }
}

/// Scans `text` for issue keys.
///
/// Matches never overlap and come back in order of occurrence. Keys embedded
/// in longer alphanumeric tokens (`XPROJ-1a`) are not reported. Calling this
/// again on the same input restarts the scan and yields the same sequence.
#[must_use]
pub fn match_pattern(text: &str) -> Matches<'static, '_> {
    Matches {
        inner: ISSUE_KEY_REGEX.captures_iter(text),
    }
}

/// Cheap pre-check used before building any replacement.
#[must_use]
pub fn contains_issue_key(text: &str) -> bool {
    ISSUE_KEY_REGEX.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(text: &str) -> Vec<&str> {
        match_pattern(text).map(|m| m.full_key).collect()
    }

    #[test]
    fn test_match_single_key() {
        let matches: Vec<_> = match_pattern("See PROJ-123 now").collect();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].full_key, "PROJ-123");
        assert_eq!(matches[0].project_key, "PROJ");
        assert_eq!(matches[0].offset, 4);
        assert_eq!(matches[0].len, 8);
        assert_eq!(matches[0].range(), 4..12);
    }

    #[test]
    fn test_match_multiple_keys_in_order() {
        assert_eq!(
            keys("PROJ-1, BACK-22 and X-333"),
            vec!["PROJ-1", "BACK-22", "X-333"]
        );
    }

    #[test]
    fn test_match_at_string_edges() {
        assert_eq!(keys("AB-1"), vec!["AB-1"]);
        assert_eq!(keys("AB-1 middle CD-2"), vec!["AB-1", "CD-2"]);
    }

    #[test]
    fn test_no_match() {
        assert!(keys("").is_empty());
        assert!(keys("nothing to see here").is_empty());
        assert!(keys("proj-123 lowercase").is_empty());
        assert!(keys("PROJ- missing number").is_empty());
        assert!(keys("-123 missing project").is_empty());
        assert!(keys("PROJ123 no hyphen").is_empty());
    }

    #[test]
    fn test_word_boundaries() {
        assert!(keys("xPROJ-123").is_empty());
        assert!(keys("PROJ-123abc").is_empty());
        assert!(keys("PROJ-123_x").is_empty());
        assert_eq!(keys("(PROJ-123)"), vec!["PROJ-123"]);
        assert_eq!(keys("PROJ-123."), vec!["PROJ-123"]);
        assert_eq!(keys("PROJ-12-34"), vec!["PROJ-12"]);
        assert!(keys("éPROJ-1").is_empty());
        assert_eq!(keys("é PROJ-1"), vec!["PROJ-1"]);
    }

    #[test]
    fn test_mixed_case_project_does_not_match_partially() {
        assert!(keys("Proj-123").is_empty());
        assert!(keys("pROJ-123").is_empty());
    }

    #[test]
    fn test_offsets_are_byte_offsets() {
        let text = "héllo PROJ-7";
        let matches: Vec<_> = match_pattern(text).collect();
        assert_eq!(matches[0].offset, 7);
        assert_eq!(&text[matches[0].range()], "PROJ-7");
    }

    #[test]
    fn test_reassembly_reconstructs_input() {
        let text = "PROJ-1 then some BACK-22, and a tail X-9";
        let mut rebuilt = String::new();
        let mut cursor = 0;
        let mut last_end = 0;
        for m in match_pattern(text) {
            assert!(m.offset >= last_end, "matches must not overlap");
            rebuilt.push_str(&text[cursor..m.offset]);
            rebuilt.push_str(m.full_key);
            cursor = m.offset + m.len;
            last_end = cursor;
        }
        rebuilt.push_str(&text[cursor..]);
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_scan_is_restartable() {
        let text = "A-1 B-2";
        assert_eq!(keys(text), keys(text));
    }

    #[test]
    fn test_contains_issue_key() {
        assert!(contains_issue_key("fix PROJ-1"));
        assert!(!contains_issue_key("fix proj-1"));
    }
}
