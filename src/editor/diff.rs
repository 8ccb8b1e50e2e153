//! editor::diff
//!
//! Unified diff of a pending edit, for the session's diff mode.

use similar::TextDiff;

/// Render a unified diff (3 lines of context) between two versions of `name`.
///
/// Returns an empty string when both sides are equal.
pub fn unified_diff(name: &str, original: &str, modified: &str) -> String {
    if original == modified {
        return String::new();
    }
    let old_header = format!("a/{name}");
    let new_header = format!("b/{name}");
    TextDiff::from_lines(original, modified)
        .unified_diff()
        .context_radius(3)
        .header(&old_header, &new_header)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changed_line_is_marked() {
        let diff = unified_diff("f.yaml", "a: 1\nb: 2\n", "a: 1\nb: 3\n");
        assert!(diff.starts_with("--- a/f.yaml\n+++ b/f.yaml\n"));
        assert!(diff.contains("-b: 2"));
        assert!(diff.contains("+b: 3"));
        assert!(diff.contains(" a: 1"));
    }

    #[test]
    fn no_change_is_empty() {
        assert_eq!(unified_diff("f", "same\n", "same\n"), "");
    }

    #[test]
    fn new_file_is_all_additions() {
        let diff = unified_diff("new.txt", "", "one\ntwo\n");
        assert!(diff.contains("+one"));
        assert!(diff.contains("+two"));
    }
}
