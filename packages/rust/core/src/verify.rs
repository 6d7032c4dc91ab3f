//! Corpus verification.
//!
//! Re-reads `positions.json` and each merged file and checks the published
//! line windows against the bytes on disk. When a manifest is present, file
//! hashes are checked too.

use std::collections::HashSet;
use std::path::Path;

use tracing::{info, instrument, warn};

use nodedocs_shared::{CorpusManifest, MergedFileInfo, NodeDocsError, PositionTable, Result};

use crate::output::{MANIFEST_FILE, POSITIONS_FILE, sha256_hex};
use crate::packager::SEPARATOR_LINES;

/// Outcome of [`verify_corpus`].
#[derive(Debug, Clone, Default)]
pub struct VerifyReport {
    pub files_checked: usize,
    pub positions_checked: usize,
    pub hashes_checked: usize,
    pub problems: Vec<String>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Verify a corpus rooted at `root`.
///
/// A missing or unreadable `positions.json` is an error; everything else is
/// collected as a problem in the report.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn verify_corpus(root: &Path) -> Result<VerifyReport> {
    let positions_path = root.join(POSITIONS_FILE);
    let content = std::fs::read_to_string(&positions_path)
        .map_err(|e| NodeDocsError::io(&positions_path, e))?;
    let table: PositionTable = serde_json::from_str(&content)
        .map_err(|e| NodeDocsError::Serialization(format!("{}: {e}", positions_path.display())))?;

    let mut report = VerifyReport::default();

    for info in &table.merged_files {
        let path = root.join(info.relative_path());
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                let lines: Vec<&str> = text.lines().collect();
                report.files_checked += 1;
                report.positions_checked += info.positions.len();
                report.problems.extend(check_merged_file(info, &lines));
            }
            Err(e) => report
                .problems
                .push(format!("{}: cannot read ({e})", info.relative_path())),
        }
    }

    check_manifest(root, &mut report)?;

    if report.is_ok() {
        info!(
            files = report.files_checked,
            positions = report.positions_checked,
            "corpus verified"
        );
    } else {
        warn!(problems = report.problems.len(), "corpus verification found problems");
    }

    Ok(report)
}

/// Check every published window of one merged file against its lines.
pub fn check_merged_file(info: &MergedFileInfo, lines: &[&str]) -> Vec<String> {
    let file = info.relative_path();
    let mut problems = Vec::new();
    let mut anchors: HashSet<&str> = HashSet::new();

    if info.node_count != info.positions.len() {
        problems.push(format!(
            "{file}: node_count {} but {} positions",
            info.node_count,
            info.positions.len()
        ));
    }

    for pos in &info.positions {
        let label = format!("{file}: {}", pos.node_type);

        if pos.start_line == 0 || pos.line_count == 0 {
            problems.push(format!("{label}: empty or zero-based window"));
            continue;
        }
        if pos.end_line != pos.start_line + pos.line_count - 1 {
            problems.push(format!(
                "{label}: end line {} does not match start {} + count {} - 1",
                pos.end_line, pos.start_line, pos.line_count
            ));
        }
        if pos.end_line > lines.len() {
            problems.push(format!(
                "{label}: window ends at line {} but file has {} lines",
                pos.end_line,
                lines.len()
            ));
            continue;
        }

        let expected = format!("## {}", pos.display_name.trim());
        if lines[pos.start_line - 1] != expected {
            problems.push(format!(
                "{label}: line {} is '{}', expected '{expected}'",
                pos.start_line,
                lines[pos.start_line - 1]
            ));
        }
        if !anchors.insert(pos.anchor.as_str()) {
            problems.push(format!("{label}: duplicate anchor '{}'", pos.anchor));
        }
    }

    for pair in info.positions.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.end_line + 1 + SEPARATOR_LINES != b.start_line {
            problems.push(format!(
                "{file}: gap between {} (ends {}) and {} (starts {}) is not {SEPARATOR_LINES} lines",
                a.node_type, a.end_line, b.node_type, b.start_line
            ));
            continue;
        }
        let gap = lines.get(a.end_line..b.start_line - 1);
        if gap != Some(&["", "---", ""][..]) {
            problems.push(format!(
                "{file}: separator after {} is not a horizontal rule",
                a.node_type
            ));
        }
    }

    if let Some(last) = info.positions.last().filter(|p| p.end_line != lines.len()) {
        problems.push(format!(
            "{file}: last window ends at line {} but file has {} lines",
            last.end_line,
            lines.len()
        ));
    }

    problems
}

fn check_manifest(root: &Path, report: &mut VerifyReport) -> Result<()> {
    let manifest_path = root.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        return Ok(());
    }

    let content = std::fs::read_to_string(&manifest_path)
        .map_err(|e| NodeDocsError::io(&manifest_path, e))?;
    let manifest: CorpusManifest = serde_json::from_str(&content)
        .map_err(|e| NodeDocsError::Serialization(format!("{}: {e}", manifest_path.display())))?;

    for file in &manifest.files {
        match std::fs::read_to_string(root.join(&file.path)) {
            Ok(text) => {
                report.hashes_checked += 1;
                if sha256_hex(&text) != file.sha256 {
                    report.problems.push(format!("{}: checksum mismatch", file.path));
                }
            }
            Err(e) => report.problems.push(format!("{}: cannot read ({e})", file.path)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodedocs_shared::NodePosition;

    fn position(name: &str, start: usize, count: usize, anchor: &str) -> NodePosition {
        NodePosition {
            node_type: format!("x.{}", name.to_lowercase()),
            display_name: name.to_string(),
            file_name: "core-merged.md".into(),
            start_line: start,
            end_line: start + count - 1,
            line_count: count,
            anchor: anchor.to_string(),
            description: None,
            usage_percentage: None,
        }
    }

    fn info(positions: Vec<NodePosition>) -> MergedFileInfo {
        MergedFileInfo {
            file_name: "core-merged.md".into(),
            category: "core".into(),
            node_count: positions.len(),
            positions,
        }
    }

    const FILE: &[&str] = &[
        "# Core Nodes", // 1
        "",
        "## Table of Contents",
        "",
        "- [A](#a)", // 5
        "- [B](#b)",
        "",
        "---",
        "",
        "## A", // 10
        "",
        "alpha",
        "",
        "---",
        "", // 15
        "## B",
        "beta",
    ];

    #[test]
    fn valid_file_has_no_problems() {
        let info = info(vec![position("A", 10, 3, "a"), position("B", 16, 2, "b")]);
        assert!(check_merged_file(&info, FILE).is_empty());
    }

    #[test]
    fn shifted_window_is_reported() {
        let info = info(vec![position("A", 11, 3, "a"), position("B", 17, 1, "b")]);
        let problems = check_merged_file(&info, FILE);
        assert!(problems.iter().any(|p| p.contains("expected '## A'")));
    }

    #[test]
    fn window_past_end_is_reported() {
        let info = info(vec![position("A", 10, 3, "a"), position("B", 16, 5, "b")]);
        let problems = check_merged_file(&info, FILE);
        assert!(problems.iter().any(|p| p.contains("file has 17 lines")));
    }

    #[test]
    fn duplicate_anchor_is_reported() {
        let info = info(vec![position("A", 10, 3, "a"), position("B", 16, 2, "a")]);
        let problems = check_merged_file(&info, FILE);
        assert!(problems.iter().any(|p| p.contains("duplicate anchor")));
    }

    #[test]
    fn inconsistent_end_line_is_reported() {
        let mut bad = position("A", 10, 3, "a");
        bad.end_line = 13;
        let info = info(vec![bad, position("B", 16, 2, "b")]);
        let problems = check_merged_file(&info, FILE);
        assert!(problems.iter().any(|p| p.contains("does not match")));
    }

    #[test]
    fn missing_positions_file_is_an_error() {
        let tmp = std::env::temp_dir()
            .join(format!("nodedocs-verify-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&tmp).unwrap();
        assert!(verify_corpus(&tmp).is_err());
        let _ = std::fs::remove_dir_all(&tmp);
    }
}
