// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Walks a directory tree and loads every text file whose
// extension is on the allow-list (by default the source and
// docs files of a typical JS/Python monorepo).
//
//   corpus/
//     README.md        ✓ loaded
//     src/app.ts       ✓ loaded
//     assets/logo.png  ✗ skipped (extension)
//     notes/bad.md     ✗ skipped with a warning (not UTF-8)
//
// Directory entries are sorted before they are visited, so the
// corpus — and therefore the training window order — is the
// same on every run. Symlinks to files are read; symlinks to
// directories are skipped, so link cycles cannot recurse.
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::document::Document;
use crate::domain::traits::CorpusSource;

/// Extensions collected when none are configured
pub const DEFAULT_EXTENSIONS: &[&str] = &["py", "ts", "js", "tsx", "jsx", "json", "md"];

/// Loads all matching files below a root directory.
/// Implements the CorpusSource trait from Layer 3.
pub struct CorpusLoader {
    root:       PathBuf,
    extensions: Vec<String>,
}

impl CorpusLoader {
    pub fn new(root: impl Into<PathBuf>, extensions: &[String]) -> Self {
        let extensions = if extensions.is_empty() {
            DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
        } else {
            extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect()
        };
        Self { root: root.into(), extensions }
    }

    fn wanted(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|want| want == e))
            .unwrap_or(false)
    }
}

impl CorpusSource for CorpusLoader {
    fn load_all(&self) -> Result<Vec<Document>> {
        if !self.root.exists() {
            tracing::warn!(
                "Corpus directory '{}' does not exist — returning empty corpus",
                self.root.display()
            );
            return Ok(Vec::new());
        }

        let mut docs    = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            // file_type() describes the entry itself, not a link target
            let mut entries: Vec<(PathBuf, fs::FileType)> = fs::read_dir(&dir)
                .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
                .filter_map(|entry| entry.ok())
                .filter_map(|e| e.file_type().ok().map(|kind| (e.path(), kind)))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            // Reverse so the stack pops subdirectories in sorted order
            for (path, kind) in entries.into_iter().rev() {
                if kind.is_dir() {
                    pending.push(path);
                } else if kind.is_symlink() && path.is_dir() {
                    // Linked directories are never descended into
                    tracing::debug!("Not following directory link '{}'", path.display());
                } else if self.wanted(&path) {
                    match fs::read_to_string(&path) {
                        Ok(text) => docs.push(Document::new(self.relative(&path), text)),
                        // Log a warning but continue — don't fail on one bad file
                        Err(e) => tracing::warn!("Skipping '{}': {}", path.display(), e),
                    }
                }
            }
        }

        // Restore the sorted visiting order that the stack reversed
        docs.sort_by(|a, b| a.source.cmp(&b.source));

        tracing::info!("Loaded {} corpus files from '{}'", docs.len(), self.root.display());
        Ok(docs)
    }
}

impl CorpusLoader {
    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}
