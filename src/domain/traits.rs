// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Components are wired together through these traits instead
// of concrete types:
//
//   CorpusSource   — CorpusLoader walks a directory today;
//                    tests hand in an in-memory list
//   NextTokenModel — SequenceModel<B> implements it with burn
//                    tensors; generator tests use a stub
//   Responder      — AppContext turns a message into a reply;
//                    the CLI only sees this trait
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::document::Document;
use crate::domain::token::HiddenState;

// ─── CorpusSource ────────────────────────────────────────────────────────────
/// Any component that can produce training documents.
pub trait CorpusSource {
    /// Load all available documents from this source.
    fn load_all(&self) -> Result<Vec<Document>>;
}

// ─── NextTokenModel ──────────────────────────────────────────────────────────
/// The read-only view of a sequence model that decoding needs.
///
/// `embed` and `project` are the two halves of one step; the
/// provided `step` and `forward_sequence` are built from them,
/// so implementors only override those for speed.
pub trait NextTokenModel {
    /// Number of ids the model can embed and score
    fn vocab_size(&self) -> usize;

    /// Hidden state contributed by a single token (a W_in row)
    fn embed(&self, token_id: u32) -> HiddenState;

    /// Scores over the whole vocabulary for a hidden state
    fn project(&self, state: &HiddenState) -> Vec<f32>;

    /// One incremental update. The incoming state is not folded
    /// into the result: only the newest token's embedding survives.
    fn step(&self, _state: &HiddenState, token_id: u32) -> (HiddenState, Vec<f32>) {
        let next   = self.embed(token_id);
        let logits = self.project(&next);
        (next, logits)
    }

    /// The state stack after each id of `ids`, in order
    fn forward_sequence(&self, ids: &[u32]) -> Vec<HiddenState> {
        ids.iter().map(|&id| self.embed(id)).collect()
    }
}

// ─── Responder ───────────────────────────────────────────────────────────────
/// Any component that can reply to a raw text message.
pub trait Responder {
    fn generate_reply(&self, raw_text: &str) -> Result<String>;
}
