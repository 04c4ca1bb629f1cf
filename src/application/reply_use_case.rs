// ============================================================
// Layer 2 — Reply Use Case
// ============================================================
// Turns a line of user text into a model reply:
//
//   1. Encode the message with the tokenizer
//   2. Run the greedy generator on the ids
//   3. Decode the generated ids (including a final <eos>)
//
// The tokenizer and the model are loaded together and held as
// one unit behind a RwLock. Any number of replies can read at
// the same time; `reload` builds a complete new pair off-lock
// and swaps it in, so a reply always sees either the old pair
// or the new one, never a mix. A failed reload keeps the old
// pair in place.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

use crate::data::tokenizer::Tokenizer;
use crate::domain::traits::Responder;
use crate::error::ChatError;
use crate::infra::{checkpoint::CheckpointManager, tokenizer_store::TokenizerStore};
use crate::ml::{
    generator::{Generation, Generator, DEFAULT_MAX_LENGTH},
    model::SequenceModel,
    Device, InferBackend,
};

/// Where the reply pipeline loads its state from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyConfig {
    pub checkpoint_dir: String,
    pub vocab_path:     String,
    pub merges_path:    String,
    pub max_length:     usize,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: "checkpoints".to_string(),
            vocab_path:     "vocab.json".to_string(),
            merges_path:    "merges.txt".to_string(),
            max_length:     DEFAULT_MAX_LENGTH,
        }
    }
}

struct Loaded {
    tokenizer: Tokenizer,
    model:     SequenceModel<InferBackend>,
}

impl Loaded {
    fn new(tokenizer: Tokenizer, model: SequenceModel<InferBackend>) -> Result<Self> {
        let vocab = tokenizer.vocabulary().len();
        if model.vocab_size() != vocab {
            return Err(ChatError::load(
                "model",
                format!(
                    "checkpoint has {} vocabulary rows but the tokenizer has {} entries",
                    model.vocab_size(),
                    vocab
                ),
            )
            .into());
        }
        Ok(Self { tokenizer, model })
    }

    fn from_config(config: &ReplyConfig) -> Result<Self> {
        let tokenizer = TokenizerStore::new(&config.vocab_path, &config.merges_path).load()?;
        let model     = CheckpointManager::new(&config.checkpoint_dir)
            .load_latest::<InferBackend>(&Device::default())?;
        Self::new(tokenizer, model)
    }
}

pub struct AppContext {
    config: ReplyConfig,
    state:  RwLock<Loaded>,
}

impl AppContext {
    /// Load the tokenizer and the latest checkpoint named by `config`
    pub fn load(config: ReplyConfig) -> Result<Self> {
        let loaded = Loaded::from_config(&config).context("Cannot start the reply pipeline")?;
        tracing::info!(
            "Reply pipeline ready: vocab_size={}, max_length={}",
            loaded.tokenizer.vocabulary().len(),
            config.max_length
        );
        Ok(Self { config, state: RwLock::new(loaded) })
    }

    /// Build from an already loaded tokenizer and model
    pub fn from_parts(
        tokenizer: Tokenizer,
        model:     SequenceModel<InferBackend>,
        config:    ReplyConfig,
    ) -> Result<Self> {
        let loaded = Loaded::new(tokenizer, model)?;
        Ok(Self { config, state: RwLock::new(loaded) })
    }

    /// Re-read tokenizer files and the latest checkpoint from disk
    pub fn reload(&self) -> Result<()> {
        let fresh = Loaded::from_config(&self.config).context("Reload failed, keeping current model")?;

        let mut guard = self.state.write().map_err(|_| anyhow!("reply state lock poisoned"))?;
        *guard = fresh;
        tracing::info!("Reloaded tokenizer and model from '{}'", self.config.checkpoint_dir);
        Ok(())
    }

    /// Encode and generate, returning the raw ids and why decoding stopped
    pub fn generate(&self, raw_input: &str) -> Result<Generation> {
        let state = self.state.read().map_err(|_| anyhow!("reply state lock poisoned"))?;
        let ids   = state.tokenizer.encode(raw_input);
        Ok(Generator::new(&state.model, self.config.max_length).run(&ids)?)
    }

    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        let state = self.state.read().map_err(|_| anyhow!("reply state lock poisoned"))?;
        Ok(state.tokenizer.decode(ids))
    }
}

impl Responder for AppContext {
    fn generate_reply(&self, raw_input: &str) -> Result<String> {
        // One read guard for encode, generate and decode
        let state = self.state.read().map_err(|_| anyhow!("reply state lock poisoned"))?;
        let ids   = state.tokenizer.encode(raw_input);
        let out   = Generator::new(&state.model, self.config.max_length).run(&ids)?;

        tracing::debug!("Reply stopped with {:?} after {} tokens", out.stop, out.tokens.len());
        Ok(state.tokenizer.decode(&out.tokens))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::{Tensor, TensorData};
    use std::fs;

    use crate::data::vocabulary::Vocabulary;
    use crate::ml::generator::DecodeState;

    const VOCAB: &str = r#"{"<unk>":0, "<eos>":1, "hi":2, "there":3, " ":4}"#;

    fn tokenizer() -> Tokenizer {
        Tokenizer::new(Vocabulary::from_json(VOCAB).unwrap(), Vec::new())
    }

    /// Identity W_in; W_out sends each id to a fixed successor:
    /// hi → " " → there → <eos>, and <unk>/<eos> → <eos>
    fn chain_model() -> SequenceModel<InferBackend> {
        let successor = [1usize, 1, 4, 1, 3];
        let n = successor.len();
        let mut w_in  = vec![0.0f32; n * n];
        let mut w_out = vec![0.0f32; n * n];
        for (i, &next) in successor.iter().enumerate() {
            w_in[i * n + i]     = 1.0;
            w_out[i * n + next] = 1.0;
        }
        let device = Device::default();
        SequenceModel::from_weights(
            Tensor::from_data(TensorData::new(w_in, [n, n]), &device),
            Tensor::from_data(TensorData::new(w_out, [n, n]), &device),
        )
        .unwrap()
    }

    /// W_out scores <eos> highest for every hidden state
    fn eos_model() -> SequenceModel<InferBackend> {
        let n = 5;
        let mut w_out = vec![0.0f32; n * n];
        for i in 0..n {
            w_out[i * n + 1] = 1.0;
        }
        let device = Device::default();
        SequenceModel::from_weights(
            Tensor::from_data(TensorData::new(vec![1.0f32; n * n], [n, n]), &device),
            Tensor::from_data(TensorData::new(w_out, [n, n]), &device),
        )
        .unwrap()
    }

    fn config_in(dir: &std::path::Path) -> ReplyConfig {
        ReplyConfig {
            checkpoint_dir: dir.join("ckpt").display().to_string(),
            vocab_path:     dir.join("vocab.json").display().to_string(),
            merges_path:    dir.join("merges.txt").display().to_string(),
            max_length:     DEFAULT_MAX_LENGTH,
        }
    }

    #[test]
    fn test_reply_follows_the_chain() {
        let ctx = AppContext::from_parts(tokenizer(), chain_model(), ReplyConfig::default()).unwrap();
        assert_eq!(ctx.generate_reply("hi").unwrap(), " there<eos>");

        let out = ctx.generate("hi").unwrap();
        assert_eq!(out.tokens, vec![4, 3, 1]);
        assert_eq!(out.stop, DecodeState::StoppedEos);
    }

    #[test]
    fn test_eos_model_replies_with_eos_only() {
        let ctx = AppContext::from_parts(tokenizer(), eos_model(), ReplyConfig::default()).unwrap();
        assert_eq!(ctx.generate_reply("hi there").unwrap(), "<eos>");
    }

    #[test]
    fn test_empty_message_is_rejected() {
        let ctx = AppContext::from_parts(tokenizer(), eos_model(), ReplyConfig::default()).unwrap();
        let err = ctx.generate_reply("").unwrap_err();
        assert!(matches!(err.downcast_ref::<ChatError>(), Some(ChatError::InvalidInput(_))));
    }

    #[test]
    fn test_unknown_words_still_get_a_reply() {
        let ctx = AppContext::from_parts(tokenizer(), eos_model(), ReplyConfig::default()).unwrap();
        assert_eq!(ctx.generate_reply("bonjour").unwrap(), "<eos>");
    }

    #[test]
    fn test_mismatched_vocab_is_rejected() {
        let model = crate::ml::model::SequenceModelConfig::new(7, 3).init::<InferBackend>(&Device::default());
        assert!(AppContext::from_parts(tokenizer(), model, ReplyConfig::default()).is_err());
    }

    #[test]
    fn test_reload_swaps_in_the_new_checkpoint() {
        let dir    = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        fs::write(&config.vocab_path, VOCAB).unwrap();
        fs::write(&config.merges_path, "").unwrap();

        let ckpt = CheckpointManager::new(&config.checkpoint_dir);
        ckpt.save_model(&eos_model(), 1).unwrap();

        let ctx = AppContext::load(config).unwrap();
        assert_eq!(ctx.generate_reply("hi").unwrap(), "<eos>");

        ckpt.save_model(&chain_model(), 2).unwrap();
        ctx.reload().unwrap();
        assert_eq!(ctx.generate_reply("hi").unwrap(), " there<eos>");
    }

    #[test]
    fn test_failed_reload_keeps_old_state() {
        let dir    = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        fs::write(&config.vocab_path, VOCAB).unwrap();
        fs::write(&config.merges_path, "").unwrap();
        CheckpointManager::new(&config.checkpoint_dir).save_model(&chain_model(), 1).unwrap();

        let ctx = AppContext::load(config.clone()).unwrap();
        fs::write(&config.vocab_path, "not json").unwrap();

        assert!(ctx.reload().is_err());
        assert_eq!(ctx.generate_reply("hi").unwrap(), " there<eos>");
        assert_eq!(ctx.decode(&[2, 4, 3]).unwrap(), "hi there");
    }
}
