// ============================================================
// Layer 3 — Document Domain Type
// ============================================================
// A single corpus file loaded from disk: where it came from
// and its full UTF-8 text. No behaviour beyond construction.

use serde::{Deserialize, Serialize};

/// A raw corpus document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Path relative to the corpus root, kept for traceability
    pub source: String,

    /// The full text content, untouched — whitespace runs are
    /// vocabulary entries, so nothing is normalised here
    pub text: String,
}

impl Document {
    /// Create a new Document with a source path and text content.
    ///
    /// Example:
    ///   let doc = Document::new("src/index.ts", "export const x = 1;");
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text:   text.into(),
        }
    }
}
