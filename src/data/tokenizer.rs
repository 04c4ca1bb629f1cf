// ============================================================
// Layer 4 — Subword Tokenizer
// ============================================================
// Maps text to token ids and back using a Vocabulary and an
// ordered list of merge rules.
//
// Encoding, in three steps:
//
//   1. Atomic units — split the text into maximal runs of
//      non-whitespace and maximal runs of whitespace:
//
//        "hi  there" → ["hi", "  ", "there"]
//
//   2. Merging — inside each unit independently:
//        - no merge rules: the unit is one subword
//        - otherwise start from its characters and keep
//          applying the highest-priority rule that matches an
//          adjacent pair, until no rule matches
//
//        rules [(l,o), (h,e), (he,lo)]   "hello"
//          h e l l o → h e l lo → he l lo   (no (he,l) rule)
//
//   3. Lookup — each subword goes through lookup_id; unknown
//      subwords become <unk> and bump a diagnostic counter.
//
// Decoding concatenates lookup_token(id) with no separator —
// whitespace runs are vocabulary entries of their own.
//
// Merges never cross a unit boundary, so "a" + " " can never
// fuse into one subword.

use std::{
    collections::HashMap,
    fs,
    path::Path,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::data::vocabulary::Vocabulary;
use crate::domain::token::{MergeRule, TokenSequence};
use crate::error::{ChatError, Result};

#[derive(Debug)]
pub struct Tokenizer {
    vocab:  Vocabulary,
    merges: Vec<MergeRule>,
    /// (left, right) → priority (index into `merges`)
    ranks:  HashMap<(String, String), usize>,
    /// Subwords that fell back to <unk>, for diagnostics
    unknown: AtomicU64,
}

impl Tokenizer {
    pub fn new(vocab: Vocabulary, merges: Vec<MergeRule>) -> Self {
        let mut ranks = HashMap::with_capacity(merges.len());
        for (rank, rule) in merges.iter().enumerate() {
            // A duplicated rule keeps its first (highest) priority
            ranks
                .entry((rule.left.clone(), rule.right.clone()))
                .or_insert(rank);
        }
        Self {
            vocab,
            merges,
            ranks,
            unknown: AtomicU64::new(0),
        }
    }

    /// Load `vocab.json` and `merges.txt`.
    pub fn from_source(vocab_path: impl AsRef<Path>, merges_path: impl AsRef<Path>) -> Result<Self> {
        let vocab = Vocabulary::from_file(vocab_path)?;

        let merges_path = merges_path.as_ref();
        let text = fs::read_to_string(merges_path)
            .map_err(|e| ChatError::load(merges_path.display().to_string(), e))?;
        let merges = parse_merges(&text).map_err(|e| match e {
            ChatError::Load { reason, .. } => {
                ChatError::load(merges_path.display().to_string(), reason)
            }
            other => other,
        })?;

        tracing::info!(
            "Tokenizer loaded: {} vocabulary entries, {} merge rules",
            vocab.len(),
            merges.len()
        );
        Ok(Self::new(vocab, merges))
    }

    /// Text → ids. Pure in its output; never fails.
    pub fn encode(&self, text: &str) -> TokenSequence {
        let mut ids = Vec::new();
        for unit in atomic_units(text) {
            for subword in self.segment(unit) {
                if !self.vocab.contains(&subword) {
                    self.unknown.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!("Unknown subword {:?} encoded as <unk>", subword);
                }
                ids.push(self.vocab.lookup_id(&subword));
            }
        }
        ids
    }

    /// Ids → text, concatenated with no separator.
    pub fn decode(&self, ids: &[u32]) -> String {
        ids.iter().map(|&id| self.vocab.lookup_token(id)).collect()
    }

    /// How many subwords have degraded to <unk> since construction
    pub fn unknown_count(&self) -> u64 {
        self.unknown.load(Ordering::Relaxed)
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn merges(&self) -> &[MergeRule] {
        &self.merges
    }

    /// Apply the merge rules inside one atomic unit.
    fn segment(&self, unit: &str) -> Vec<String> {
        if self.merges.is_empty() {
            return vec![unit.to_string()];
        }

        let mut parts: Vec<String> = unit.chars().map(String::from).collect();

        loop {
            // Highest-priority (lowest-rank) adjacent pair present
            let best = parts
                .windows(2)
                .filter_map(|w| self.ranks.get(&(w[0].clone(), w[1].clone())).copied())
                .min();
            let Some(rank) = best else { break };
            let rule = &self.merges[rank];

            // Fuse every non-overlapping occurrence, left to right, before
            // ranks are looked at again. With [(ab, a), (a, b)], "abab"
            // becomes [ab, ab], not [aba, b].
            let mut merged = Vec::with_capacity(parts.len());
            let mut i = 0;
            while i < parts.len() {
                if i + 1 < parts.len() && parts[i] == rule.left && parts[i + 1] == rule.right {
                    merged.push(rule.merged());
                    i += 2;
                } else {
                    merged.push(std::mem::take(&mut parts[i]));
                    i += 1;
                }
            }
            parts = merged;
        }

        parts
    }
}

/// Split text into maximal whitespace / non-whitespace runs.
/// Every character lands in exactly one run.
pub fn atomic_units(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut start = 0;
    let mut current: Option<bool> = None;

    for (idx, ch) in text.char_indices() {
        let is_space = ch.is_whitespace();
        match current {
            Some(kind) if kind != is_space => {
                units.push(&text[start..idx]);
                start = idx;
            }
            _ => {}
        }
        current = Some(is_space);
    }
    if start < text.len() {
        units.push(&text[start..]);
    }
    units
}

/// Parse a merges file: one `left right` pair per line.
///
/// Blank lines and a leading `#version` header are skipped;
/// any other line must have exactly two whitespace-separated
/// fields.
pub fn parse_merges(text: &str) -> Result<Vec<MergeRule>> {
    let mut merges = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if line_no == 0 && trimmed.starts_with("#version") {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        match fields.as_slice() {
            [left, right] => merges.push(MergeRule::new(*left, *right)),
            _ => {
                return Err(ChatError::load(
                    "merges",
                    format!(
                        "line {} has {} fields, expected 2: {:?}",
                        line_no + 1,
                        fields.len(),
                        trimmed
                    ),
                ))
            }
        }
    }

    Ok(merges)
}
