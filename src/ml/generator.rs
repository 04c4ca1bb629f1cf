// ============================================================
// Layer 5 — Greedy Generator
// ============================================================
// The autoregressive decoding loop, as a small state machine:
//
//   Priming ──► Decoding ──┬──► StoppedEos        (emitted <eos>)
//                  ▲       │
//                  └───────┴──► StoppedMaxLength  (hit max_length)
//
//   Priming   run forward_sequence over the prompt; the last
//             state row becomes the active state
//   Decoding  logits = project(active); next = argmax(logits);
//             append next; active = embed(next)
//
// The returned tokens include the <eos> that stopped decoding.
// There is no sampling and no retry, so the same prompt, weights
// and max_length always give the same reply. The generator only
// reads the model, so dropping it mid-loop is always safe.

use crate::domain::token::{HiddenState, TokenSequence, EOS_ID};
use crate::domain::traits::NextTokenModel;
use crate::error::{ChatError, Result};

/// Replies stop after this many tokens unless configured otherwise
pub const DEFAULT_MAX_LENGTH: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    Priming,
    Decoding,
    StoppedEos,
    StoppedMaxLength,
}

impl DecodeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, DecodeState::StoppedEos | DecodeState::StoppedMaxLength)
    }
}

/// The generated ids and the terminal state that ended decoding
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub tokens: TokenSequence,
    pub stop:   DecodeState,
}

pub struct Generator<'m, M: NextTokenModel + ?Sized> {
    model:      &'m M,
    max_length: usize,
}

impl<'m, M: NextTokenModel + ?Sized> Generator<'m, M> {
    pub fn new(model: &'m M, max_length: usize) -> Self {
        Self { model, max_length }
    }

    pub fn run(&self, input: &[u32]) -> Result<Generation> {
        if input.is_empty() {
            return Err(ChatError::InvalidInput(
                "cannot generate from an empty token sequence".to_string(),
            ));
        }
        let vocab = self.model.vocab_size();
        if let Some(id) = input.iter().find(|&&id| id as usize >= vocab) {
            return Err(ChatError::InvalidInput(format!(
                "prompt id {id} is outside the model vocabulary of {vocab}"
            )));
        }

        let mut state  = DecodeState::Priming;
        let mut stack: Vec<HiddenState> = Vec::new();
        let mut output = TokenSequence::new();

        while !state.is_terminal() {
            state = match state {
                DecodeState::Priming => {
                    stack = self.model.forward_sequence(input);
                    DecodeState::Decoding
                }
                DecodeState::Decoding if output.len() >= self.max_length => {
                    DecodeState::StoppedMaxLength
                }
                DecodeState::Decoding => {
                    let active = stack.last().ok_or_else(|| {
                        ChatError::InvalidInput("model returned no hidden states".to_string())
                    })?;
                    let logits = self.model.project(active);
                    let next   = argmax(&logits).ok_or_else(|| {
                        ChatError::InvalidInput("model returned no logits".to_string())
                    })?;
                    output.push(next);

                    if next == EOS_ID {
                        DecodeState::StoppedEos
                    } else if output.len() >= self.max_length {
                        DecodeState::StoppedMaxLength
                    } else {
                        stack.push(self.model.embed(next));
                        DecodeState::Decoding
                    }
                }
                terminal => terminal,
            };
        }

        tracing::debug!(
            "Generated {} tokens from a {}-token prompt ({:?})",
            output.len(),
            input.len(),
            state
        );
        Ok(Generation { tokens: output, stop: state })
    }
}

/// Index of the largest score. Ties go to the lowest id; NaN never wins.
pub fn argmax(logits: &[f32]) -> Option<u32> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &score) in logits.iter().enumerate() {
        match best {
            _ if score.is_nan() => {}
            Some((_, top)) if score <= top => {}
            _ => best = Some((idx, score)),
        }
    }
    best.map(|(idx, _)| idx as u32)
}
