//! Normalization passes for rendered Markdown.
//!
//! Each pass is a function `&str -> String` applied in sequence. Line offsets
//! are measured after these passes run, so they must be deterministic.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full tidy pipeline on rendered Markdown text.
pub fn tidy(md: &str) -> String {
    let mut result = md.to_string();

    result = normalize_line_endings(&result);
    result = normalize_whitespace(&result);
    result = clean_blank_lines(&result);
    result = trim_leading_blank_lines(&result);
    result = ensure_trailing_newline(&result);

    result
}

/// Push every ATX heading down by `levels`, capped at H6. Code fences are left alone.
pub fn demote_headings(md: &str, levels: usize) -> String {
    static H_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^(#{1,6})(\s+.*)$").expect("valid regex"));

    let mut in_code_block = false;
    let mut lines: Vec<String> = Vec::new();

    for line in md.lines() {
        if line.trim_start().starts_with("```") {
            in_code_block = !in_code_block;
            lines.push(line.to_string());
            continue;
        }

        match H_RE.captures(line) {
            Some(caps) if !in_code_block => {
                let depth = (caps[1].len() + levels).min(6);
                lines.push(format!("{}{}", "#".repeat(depth), &caps[2]));
            }
            _ => lines.push(line.to_string()),
        }
    }

    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

/// Convert `\r\n` and lone `\r` to `\n`.
fn normalize_line_endings(md: &str) -> String {
    md.replace("\r\n", "\n").replace('\r', "\n")
}

/// Trim trailing whitespace on every line.
fn normalize_whitespace(md: &str) -> String {
    md.lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse runs of 2+ blank lines into exactly one.
fn clean_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n").to_string()
}

fn trim_leading_blank_lines(md: &str) -> String {
    md.trim_start_matches('\n').to_string()
}

/// Ensure the text ends with exactly one newline.
fn ensure_trailing_newline(md: &str) -> String {
    let trimmed = md.trim_end_matches('\n');
    format!("{trimmed}\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demote_headings_shifts_levels() {
        let input = "# Title\n\nText\n\n## Section\n\n###### Deep";
        let result = demote_headings(input, 1);
        assert_eq!(result, "## Title\n\nText\n\n### Section\n\n###### Deep");
    }

    #[test]
    fn demote_headings_preserves_code_blocks() {
        let input = "# Title\n\n```bash\n# not a heading\n```";
        let result = demote_headings(input, 1);
        assert!(result.contains("\n# not a heading\n"));
        assert!(result.starts_with("## Title"));
    }

    #[test]
    fn demote_headings_ignores_hashtags() {
        let input = "#hashtag stays";
        assert_eq!(demote_headings(input, 1), input);
    }

    #[test]
    fn clean_blank_lines_collapses_excess() {
        let input = "Line 1\n\n\n\n\nLine 2";
        assert_eq!(clean_blank_lines(input), "Line 1\n\nLine 2");
    }

    #[test]
    fn clean_blank_lines_keeps_single_blank() {
        let input = "Line 1\n\nLine 2";
        assert_eq!(clean_blank_lines(input), input);
    }

    #[test]
    fn normalize_whitespace_trims_trailing() {
        let input = "Line 1   \nLine 2\t\nLine 3";
        assert_eq!(normalize_whitespace(input), "Line 1\nLine 2\nLine 3");
    }

    #[test]
    fn ensure_trailing_newline_normalizes_multiple() {
        assert_eq!(ensure_trailing_newline("Content"), "Content\n");
        assert_eq!(ensure_trailing_newline("Content\n\n\n"), "Content\n");
    }

    #[test]
    fn tidy_handles_windows_line_endings() {
        let input = "\n\n# Title\r\n\r\n\r\n\r\nBody  \r\n";
        assert_eq!(tidy(input), "# Title\n\nBody\n");
    }

    #[test]
    fn tidy_blank_lines_with_spaces_collapse() {
        // Whitespace-only lines become empty before collapsing.
        let input = "a\n   \n \t\n\nb";
        assert_eq!(tidy(input), "a\n\nb\n");
    }
}
