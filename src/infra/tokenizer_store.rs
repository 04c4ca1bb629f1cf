// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Owns the two files a tokenizer is loaded from:
//
//   vocab.json   — { "<subword>": id, ... }
//   merges.txt   — one "left right" merge rule per line
//
// If vocab.json already exists it is loaded as-is. Otherwise
// a word-level vocabulary is bootstrapped from the corpus:
//
//   id 0   <unk>
//   id 1   <eos>
//   id 2.. the most frequent atomic units (whitespace runs
//          included), ties broken alphabetically so the same
//          corpus always yields the same ids
//
// and an empty merges.txt is written next to it, so every
// atomic unit is looked up whole.

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::data::{
    tokenizer::{atomic_units, Tokenizer},
    vocabulary::Vocabulary,
};
use crate::domain::token::{EOS_ID, EOS_TOKEN, UNK_ID, UNK_TOKEN};

pub struct TokenizerStore {
    vocab_path:  PathBuf,
    merges_path: PathBuf,
}

impl TokenizerStore {
    pub fn new(vocab_path: impl Into<PathBuf>, merges_path: impl Into<PathBuf>) -> Self {
        Self {
            vocab_path:  vocab_path.into(),
            merges_path: merges_path.into(),
        }
    }

    /// Load existing tokenizer files, or build them from `texts`
    pub fn load_or_build(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        if self.vocab_path.exists() {
            tracing::info!("Loading existing vocabulary from '{}'", self.vocab_path.display());
        } else {
            tracing::info!("Building new vocabulary (vocab_size={})", vocab_size);
            self.build_and_save(texts, vocab_size)?;
        }
        self.load()
    }

    /// Load a previously saved tokenizer
    pub fn load(&self) -> Result<Tokenizer> {
        Tokenizer::from_source(&self.vocab_path, &self.merges_path).with_context(|| {
            format!(
                "Cannot load tokenizer from '{}' and '{}'",
                self.vocab_path.display(),
                self.merges_path.display()
            )
        })
    }

    fn build_and_save(&self, texts: &[String], vocab_size: usize) -> Result<()> {
        let vocab = build_vocabulary(texts, vocab_size)?;

        write_file(&self.vocab_path, &vocab.to_json()?)?;
        if !self.merges_path.exists() {
            write_file(&self.merges_path, "")?;
        }

        tracing::info!(
            "Vocabulary built with {} entries, saved to '{}'",
            vocab.len(),
            self.vocab_path.display()
        );
        Ok(())
    }
}

/// Frequency-ranked vocabulary over the atomic units of `texts`,
/// capped at `vocab_size` entries including the two reserved ones.
pub fn build_vocabulary(texts: &[String], vocab_size: usize) -> Result<Vocabulary> {
    let mut freq: HashMap<&str, usize> = HashMap::new();
    for text in texts {
        for unit in atomic_units(text) {
            *freq.entry(unit).or_insert(0) += 1;
        }
    }

    // Most frequent first; equal counts in lexicographic order
    let mut units: Vec<(&str, usize)> = freq
        .into_iter()
        .filter(|(unit, _)| *unit != UNK_TOKEN && *unit != EOS_TOKEN)
        .collect();
    units.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    units.truncate(vocab_size.saturating_sub(2));

    let mut table = HashMap::with_capacity(units.len() + 2);
    table.insert(UNK_TOKEN.to_string(), UNK_ID);
    table.insert(EOS_TOKEN.to_string(), EOS_ID);
    for (unit, _) in units {
        let id = table.len() as u32;
        table.insert(unit.to_string(), id);
    }

    Ok(Vocabulary::new(table)?)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Cannot write '{}'", path.display()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_vocabulary_ranks_by_frequency() {
        let texts = vec!["b a b".to_string(), "c b".to_string()];
        let vocab = build_vocabulary(&texts, 10).unwrap();
        // " " ×3 and "b" ×3 tie → alphabetical: " " before "b"
        assert_eq!(vocab.lookup_id("<unk>"), 0);
        assert_eq!(vocab.lookup_id("<eos>"), 1);
        assert_eq!(vocab.lookup_id(" "), 2);
        assert_eq!(vocab.lookup_id("b"), 3);
        assert_eq!(vocab.lookup_id("a"), 4);
        assert_eq!(vocab.lookup_id("c"), 5);
    }

    #[test]
    fn test_build_vocabulary_respects_cap() {
        let texts = vec!["one two three four".to_string()];
        let vocab = build_vocabulary(&texts, 3).unwrap();
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.lookup_token(2), " ");
    }

    #[test]
    fn test_load_or_build_writes_then_reuses_files() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path().join("vocab.json"), dir.path().join("merges.txt"));

        let texts = vec!["hi there".to_string()];
        let tok   = store.load_or_build(&texts, 100).unwrap();
        assert_eq!(tok.decode(&tok.encode("hi there")), "hi there");
        assert!(tok.merges().is_empty());

        // Second call loads the saved files instead of rebuilding
        let again = store.load_or_build(&["other words".to_string()], 100).unwrap();
        assert_eq!(again.vocabulary().len(), tok.vocabulary().len());
        assert_eq!(again.encode("hi"), tok.encode("hi"));
    }

    #[test]
    fn test_unwritable_vocab_dir_is_reported() {
        let dir     = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("taken");
        fs::write(&blocker, "a file, not a directory").unwrap();
        let store   = TokenizerStore::new(blocker.join("vocab.json"), blocker.join("merges.txt"));

        let err = store.load_or_build(&["hi".to_string()], 10).unwrap_err();
        assert!(format!("{err:#}").contains("Cannot create directory"), "{err:#}");
    }

    #[test]
    fn test_load_without_files_fails() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path().join("vocab.json"), dir.path().join("merges.txt"));
        assert!(store.load().is_err());
    }
}
