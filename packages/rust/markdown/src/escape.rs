//! Table cell escaping, truncation and table formatting.

/// Make text safe for a single Markdown table cell.
///
/// Pipes are escaped and line breaks collapse to single spaces.
pub fn escape_cell(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

/// Truncate to at most `max_chars` characters, appending `...` when cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut cut: String = text.chars().take(keep).collect();
    cut.truncate(cut.trim_end().len());
    format!("{cut}...")
}

/// Wrap text in backticks for inline code, escaping embedded backticks.
pub fn code_span(text: &str) -> String {
    if text.contains('`') {
        format!("`` {text} ``")
    } else {
        format!("`{text}`")
    }
}

/// Render a Markdown table. Cells must already be escaped.
///
/// Returns one string per line, with no trailing newline.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format!("| {} |", headers.join(" | ")));
    lines.push(format!(
        "|{}|",
        headers.iter().map(|_| "---").collect::<Vec<_>>().join("|")
    ));
    for row in rows {
        lines.push(format!("| {} |", row.join(" | ")));
    }
    lines
}
