//! Corpus output writer.
//!
//! Every file goes through [`CorpusWriter`], which writes atomically
//! (temp file, then rename), records a SHA-256 per file and produces the
//! `manifest.json` listing. Files listed by a previous manifest are removed
//! before a rebuild.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use nodedocs_shared::{CorpusManifest, ManifestFile, NodeDocsError, Result};

/// Manifest file name at the corpus root.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Position table file name at the corpus root.
pub const POSITIONS_FILE: &str = "positions.json";

/// Writes files under a corpus root and remembers what it wrote.
#[derive(Debug)]
pub struct CorpusWriter {
    root: PathBuf,
    written: Vec<ManifestFile>,
}

impl CorpusWriter {
    /// Create the root directory if needed.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| NodeDocsError::io(&root, e))?;
        Ok(Self {
            root,
            written: Vec::new(),
        })
    }

    /// Write `content` to `relative` (forward-slash separated) atomically.
    pub fn write(&mut self, relative: &str, content: &str) -> Result<()> {
        let target = self.root.join(relative);

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| NodeDocsError::io(parent, e))?;
        }

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| NodeDocsError::validation(format!("invalid output path '{relative}'")))?;
        let temp = target.with_file_name(format!(".{file_name}.tmp"));

        std::fs::write(&temp, content).map_err(|e| NodeDocsError::io(&temp, e))?;
        std::fs::rename(&temp, &target).map_err(|e| {
            let _ = std::fs::remove_file(&temp);
            NodeDocsError::io(&target, e)
        })?;

        debug!(path = %relative, size = content.len(), "wrote file");

        self.written.retain(|f| f.path != relative);
        self.written.push(ManifestFile {
            path: relative.to_string(),
            sha256: sha256_hex(content),
            size_bytes: content.len(),
        });
        Ok(())
    }

    /// Write a pretty-printed JSON file.
    pub fn write_json<T: serde::Serialize>(&mut self, relative: &str, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| NodeDocsError::Serialization(format!("{relative}: {e}")))?;
        self.write(relative, &format!("{json}\n"))
    }

    /// Files written so far, sorted by path.
    pub fn files(&self) -> Vec<ManifestFile> {
        let mut files = self.written.clone();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }
}

/// Remove the files listed in an existing `manifest.json` under `root`.
///
/// Returns the number of files removed. A missing manifest is not an error;
/// an unreadable one is skipped with a warning so a rebuild can proceed.
pub fn clean_previous_build(root: &Path) -> Result<usize> {
    let manifest_path = root.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        return Ok(0);
    }

    let content = std::fs::read_to_string(&manifest_path)
        .map_err(|e| NodeDocsError::io(&manifest_path, e))?;
    let manifest: CorpusManifest = match serde_json::from_str(&content) {
        Ok(m) => m,
        Err(e) => {
            warn!(
                path = %manifest_path.display(),
                error = %e,
                "unreadable previous manifest, not cleaning"
            );
            return Ok(0);
        }
    };

    let mut removed = 0;
    for file in &manifest.files {
        if file.path.contains("..") || Path::new(&file.path).is_absolute() {
            warn!(path = %file.path, "refusing to remove path outside the corpus root");
            continue;
        }
        let path = root.join(&file.path);
        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(NodeDocsError::io(&path, e)),
        }
    }
    let _ = std::fs::remove_file(&manifest_path);

    // Drop category directories the old build left empty.
    if let Ok(entries) = std::fs::read_dir(root) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                let _ = std::fs::remove_dir(&path);
            }
        }
    }

    info!(removed, root = %root.display(), "removed previous build output");
    Ok(removed)
}

pub(crate) fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
