// ============================================================
// Layer 3 — Token Domain Types
// ============================================================
// The vocabulary reserves two ids:
//
//   0  <unk>  — every subword the vocabulary doesn't know
//   1  <eos>  — the model emits this to end a reply
//
// A TokenSequence is just a Vec<u32> of those ids.
//
// A HiddenState is the model's summary of "what came last".
// In this architecture it is the W_in row of the most
// recent token, NOT a recurrence over the whole prefix:
//
//   state after t[0..n) = W_in[t[n-1]]
//
// so the generator conditions only on the last state row.

use serde::{Deserialize, Serialize};

/// Literal string of the unknown token
pub const UNK_TOKEN: &str = "<unk>";

/// Literal string of the end-of-sequence token
pub const EOS_TOKEN: &str = "<eos>";

/// Reserved id of `<unk>`, also the fallback when `<unk>` is absent
pub const UNK_ID: u32 = 0;

/// Reserved id of `<eos>` — the generator stops when it emits this
pub const EOS_ID: u32 = 1;

/// An ordered sequence of vocabulary ids
pub type TokenSequence = Vec<u32>;

/// A fixed-width activation vector (`hidden_size` floats).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HiddenState(Vec<f32>);

impl HiddenState {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// The state before any token has been consumed
    pub fn initial() -> Self {
        Self(Vec::new())
    }

    pub fn values(&self) -> &[f32] {
        &self.0
    }

    pub fn width(&self) -> usize {
        self.0.len()
    }
}

/// A merge rule: adjacent `left` and `right` fuse into `left + right`.
/// Priority is the rule's position in the merge list (earlier wins).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergeRule {
    pub left:  String,
    pub right: String,
}

impl MergeRule {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left:  left.into(),
            right: right.into(),
        }
    }

    /// The subword this rule produces
    pub fn merged(&self) -> String {
        format!("{}{}", self.left, self.right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_rule_concatenates() {
        let rule = MergeRule::new("th", "e");
        assert_eq!(rule.merged(), "the");
    }

    #[test]
    fn test_initial_state_is_empty() {
        assert_eq!(HiddenState::initial().width(), 0);
    }
}
