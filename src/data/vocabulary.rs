// ============================================================
// Layer 4 — Vocabulary
// ============================================================
// An immutable bidirectional map between subword strings and
// integer ids, loaded once from a JSON object:
//
//   { "<unk>": 0, "<eos>": 1, "hi": 2, "there": 3, " ": 4 }
//
// Invariants checked at construction:
//   - ids are unique (the map is a bijection)
//   - ids are dense: exactly 0..len, so they index W_in rows
//   - a vocabulary loaded from a source contains "<unk>"
//
// Lookups never fail. Unknown strings map to the <unk> id
// (or 0 when <unk> is absent); unknown ids map to "<unk>".

use std::{collections::HashMap, fs, path::Path};

use crate::domain::token::{EOS_TOKEN, UNK_ID, UNK_TOKEN};
use crate::error::{ChatError, Result};

#[derive(Debug, Clone)]
pub struct Vocabulary {
    token_to_id: HashMap<String, u32>,
    id_to_token: Vec<String>,
    unk_id:      u32,
}

impl Vocabulary {
    /// Build a vocabulary from an in-memory table.
    /// Fails if ids collide or leave gaps in 0..len.
    pub fn new(token_to_id: HashMap<String, u32>) -> Result<Self> {
        let size = token_to_id.len();
        let mut slots: Vec<Option<String>> = vec![None; size];

        for (token, &id) in &token_to_id {
            let slot = slots.get_mut(id as usize).ok_or_else(|| {
                ChatError::load(
                    "vocabulary",
                    format!("id {id} of {token:?} is outside the dense range 0..{size}"),
                )
            })?;
            if let Some(existing) = slot {
                return Err(ChatError::load(
                    "vocabulary",
                    format!("id {id} is shared by {existing:?} and {token:?}"),
                ));
            }
            *slot = Some(token.clone());
        }

        // Every slot is filled: `size` distinct ids landed in `size` slots.
        let id_to_token: Vec<String> = slots.into_iter().flatten().collect();
        let unk_id = token_to_id.get(UNK_TOKEN).copied().unwrap_or(UNK_ID);

        Ok(Self { token_to_id, id_to_token, unk_id })
    }

    /// Parse a JSON vocabulary table. The `<unk>` entry is required.
    pub fn from_json(json: &str) -> Result<Self> {
        // u32 values reject negative and fractional ids during parsing
        let table: HashMap<String, u32> = serde_json::from_str(json)
            .map_err(|e| ChatError::load("vocabulary", e))?;

        if !table.contains_key(UNK_TOKEN) {
            return Err(ChatError::load(
                "vocabulary",
                format!("missing required {UNK_TOKEN} entry"),
            ));
        }
        if !table.contains_key(EOS_TOKEN) {
            tracing::warn!("Vocabulary has no {} entry; replies can only stop at max length", EOS_TOKEN);
        }

        Self::new(table)
    }

    /// Read and parse a `vocab.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| ChatError::load(path.display().to_string(), e))?;
        Self::from_json(&json).map_err(|e| match e {
            ChatError::Load { reason, .. } => ChatError::load(path.display().to_string(), reason),
            other => other,
        })
    }

    /// Id for an exact string match, else the unknown id.
    pub fn lookup_id(&self, token: &str) -> u32 {
        self.token_to_id.get(token).copied().unwrap_or(self.unk_id)
    }

    /// String for an id, else the literal `<unk>` marker.
    pub fn lookup_token(&self, id: u32) -> &str {
        self.id_to_token
            .get(id as usize)
            .map(String::as_str)
            .unwrap_or(UNK_TOKEN)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.token_to_id.contains_key(token)
    }

    pub fn unk_id(&self) -> u32 {
        self.unk_id
    }

    pub fn len(&self) -> usize {
        self.id_to_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_token.is_empty()
    }

    /// Serialise back to the JSON table format, entries in id order
    /// (serde_json is built with `preserve_order`).
    pub fn to_json(&self) -> Result<String> {
        let ordered: serde_json::Map<String, serde_json::Value> = self
            .id_to_token
            .iter()
            .enumerate()
            .map(|(id, token)| (token.clone(), serde_json::Value::from(id as u32)))
            .collect();
        serde_json::to_string_pretty(&ordered).map_err(|e| ChatError::load("vocabulary", e))
    }
}
