// ============================================================
// Error Taxonomy
// ============================================================
// Typed errors raised by the data and ML layers.
//
//   LoadError      — vocabulary, merge or parameter source is
//                    missing or malformed. Fatal at startup.
//   ShapeMismatch  — W_in / W_out disagree on their shared
//                    dimensions. Fatal at startup.
//   Save           — the parameter bundle could not be written.
//   InvalidInput   — a caller broke a precondition (empty
//                    generator prompt, id outside the vocab,
//                    a window too short to train on).
//
// Unknown subwords are NOT an error: the tokenizer degrades
// them to the <unk> id and counts them (see data/tokenizer.rs).
//
// The application and CLI layers work with anyhow::Result;
// these variants convert into anyhow::Error through `?`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    /// A backing source could not be read or parsed
    #[error("failed to load {source_name}: {reason}")]
    Load {
        source_name: String,
        reason:      String,
    },

    /// Parameter matrices with inconsistent dimensions
    #[error(
        "parameter shapes disagree: W_in is {w_in:?}, W_out is {w_out:?} \
         (expected W_in = [vocab, hidden] and W_out = [hidden, vocab])"
    )]
    ShapeMismatch {
        w_in:  [usize; 2],
        w_out: [usize; 2],
    },

    /// Parameters could not be written
    #[error("failed to save {target}: {reason}")]
    Save {
        target: String,
        reason: String,
    },

    /// Precondition violation by the caller
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ChatError {
    pub fn load(source_name: impl Into<String>, reason: impl ToString) -> Self {
        ChatError::Load {
            source_name: source_name.into(),
            reason:      reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
