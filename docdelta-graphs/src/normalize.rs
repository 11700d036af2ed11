// Source canonicalization for change detection.
//
// Used only to decide equality; stored source text is never rewritten.

/// Canonicalize `source` so formatting-only edits compare equal.
///
/// Steps, in order:
/// 1. CRLF and lone CR become LF.
/// 2. Trailing whitespace is stripped from every line.
/// 3. Each tab becomes a single space.
/// 4. Lines are rejoined.
/// 5. Runs of three or more newlines collapse to exactly two.
/// 6. Leading and trailing whitespace of the whole text is trimmed.
///
/// Tabs are replaced before blank-line collapsing, so a line holding only
/// tabs is already empty by the time runs are counted.
pub fn normalize_source(source: &str) -> String {
    if source.is_empty() {
        return String::new();
    }

    let unified = source.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(unified.len());
    let mut blank_run = 0usize;
    for (i, line) in unified.split('\n').enumerate() {
        let line = line.trim_end().replace('\t', " ");
        if line.is_empty() {
            blank_run += 1;
            // A second consecutive blank line would produce a third newline.
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&line);
    }

    out.trim().to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stays_empty() {
        assert_eq!(normalize_source(""), "");
    }

    #[test]
    fn clean_source_is_unchanged() {
        assert_eq!(normalize_source("def foo(): pass"), "def foo(): pass");
    }

    #[test]
    fn line_endings_become_lf() {
        assert_eq!(normalize_source("line1\r\nline2"), "line1\nline2");
        assert_eq!(normalize_source("line1\rline2"), "line1\nline2");
    }

    #[test]
    fn trailing_whitespace_is_stripped() {
        assert_eq!(normalize_source("line1   \nline2\t"), "line1\nline2");
    }

    #[test]
    fn tabs_become_single_spaces() {
        assert_eq!(normalize_source("hello\tworld"), "hello world");
    }

    #[test]
    fn blank_line_runs_collapse() {
        assert_eq!(normalize_source("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(normalize_source("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn tab_only_lines_join_the_blank_run() {
        assert_eq!(normalize_source("a\n\t\n\t\t\n\nb"), "a\n\nb");
    }

    #[test]
    fn whole_text_is_trimmed() {
        assert_eq!(normalize_source("  \n  code  \n  "), "code");
    }

    #[test]
    fn combined_normalization() {
        let source = "def foo():  \r\n\treturn 42\r\n\r\n\r\n";
        assert_eq!(normalize_source(source), "def foo():\n return 42");
    }

    #[test]
    fn leading_indentation_is_preserved_inside() {
        assert_eq!(
            normalize_source("def f():\n    return 1"),
            "def f():\n    return 1"
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            #[test]
            fn normalization_is_idempotent(s in "[a-c \t\r\n]{0,40}") {
                let once = normalize_source(&s);
                prop_assert_eq!(normalize_source(&once), once.clone());
            }

            #[test]
            fn output_has_no_cr_or_tab(s in "[a-c \t\r\n]{0,40}") {
                let out = normalize_source(&s);
                prop_assert!(!out.contains('\r'));
                prop_assert!(!out.contains('\t'));
                prop_assert!(!out.contains("\n\n\n"));
            }
        }
    }
}
