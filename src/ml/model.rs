use std::path::Path;

use burn::{
    module::Param,
    nn::loss::CrossEntropyLossConfig,
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
    tensor::Distribution,
};

use crate::domain::token::{HiddenState, UNK_ID};
use crate::domain::traits::NextTokenModel;
use crate::error::{self, ChatError};

// #[derive(Config)] expands to serde impls written against the std
// two-parameter Result, so this module never imports the crate alias.
#[derive(Config, Debug)]
pub struct SequenceModelConfig {
    pub vocab_size:  usize,
    pub hidden_size: usize,
    /// Standard deviation of the normal weight initialisation
    #[config(default = 0.01)]
    pub init_std:    f64,
}

impl SequenceModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SequenceModel<B> {
        let dist  = Distribution::Normal(0.0, self.init_std);
        let w_in  = Tensor::random([self.vocab_size, self.hidden_size], dist, device);
        let w_out = Tensor::random([self.hidden_size, self.vocab_size], dist, device);
        SequenceModel {
            w_in:  Param::from_tensor(w_in),
            w_out: Param::from_tensor(w_out),
        }
    }
}

/// One-hot embedding followed by a linear projection back onto the vocabulary.
///
/// `w_in`  : [vocab_size, hidden_size] — row `i` is the hidden state of token `i`
/// `w_out` : [hidden_size, vocab_size] — hidden state → next-token logits
#[derive(Module, Debug)]
pub struct SequenceModel<B: Backend> {
    pub w_in:  Param<Tensor<B, 2>>,
    pub w_out: Param<Tensor<B, 2>>,
}

impl<B: Backend> SequenceModel<B> {
    /// Build from explicit weights, checking that the shapes line up.
    pub fn from_weights(w_in: Tensor<B, 2>, w_out: Tensor<B, 2>) -> error::Result<Self> {
        check_shapes(w_in.dims(), w_out.dims())?;
        Ok(Self {
            w_in:  Param::from_tensor(w_in),
            w_out: Param::from_tensor(w_out),
        })
    }

    pub fn vocab_size(&self) -> usize {
        self.w_in.val().dims()[0]
    }

    pub fn hidden_size(&self) -> usize {
        self.w_in.val().dims()[1]
    }

    fn device(&self) -> B::Device {
        self.w_in.val().device()
    }

    fn id_tensor(&self, ids: &[u32]) -> Tensor<B, 1, Int> {
        let data: Vec<i64> = ids.iter().map(|&id| id as i64).collect();
        Tensor::from_data(TensorData::new(data, [ids.len()]), &self.device())
    }

    /// Embedding lookup: a row index into W_in, no one-hot matrix.
    /// ids: [n] → [n, hidden_size]
    pub fn hidden(&self, ids: &[u32]) -> Tensor<B, 2> {
        self.w_in.val().select(0, self.id_tensor(ids))
    }

    /// [n, hidden_size] → [n, vocab_size]
    pub fn logits(&self, hidden: Tensor<B, 2>) -> Tensor<B, 2> {
        hidden.matmul(self.w_out.val())
    }

    /// Cross-entropy of predicting `window[1..]` from `window[..n-1]`.
    pub fn loss(&self, window: &[u32]) -> error::Result<Tensor<B, 1>> {
        if window.len() < 2 {
            return Err(ChatError::InvalidInput(format!(
                "a training window needs at least 2 ids, got {}",
                window.len()
            )));
        }
        self.check_ids(window)?;

        let (inputs, targets) = (&window[..window.len() - 1], &window[1..]);
        let logits  = self.logits(self.hidden(inputs));
        let targets = self.id_tensor(targets);
        let ce      = CrossEntropyLossConfig::new().init(&logits.device());
        Ok(ce.forward(logits, targets))
    }

    /// Fail with InvalidInput if any id has no W_in row.
    fn check_ids(&self, ids: &[u32]) -> error::Result<()> {
        let vocab = self.vocab_size();
        match ids.iter().find(|&&id| id as usize >= vocab) {
            Some(id) => Err(ChatError::InvalidInput(format!(
                "token id {id} is outside the model vocabulary of {vocab}"
            ))),
            None => Ok(()),
        }
    }

    /// Write W_in / W_out as a named, gzip-compressed MessagePack record.
    /// The recorder appends `.mpk.gz` to `path`.
    pub fn save(&self, path: &Path) -> error::Result<()> {
        recorder()
            .record(self.clone().into_record(), path.to_path_buf())
            .map_err(|e| ChatError::Save {
                target: path.display().to_string(),
                reason: e.to_string(),
            })
    }

    /// Restore a model from a record written by `save`.
    /// Both sizes come from the stored matrix shapes.
    pub fn load(path: &Path, device: &B::Device) -> error::Result<Self> {
        let record: SequenceModelRecord<B> = recorder()
            .load(path.to_path_buf(), device)
            .map_err(|e| ChatError::load(path.display().to_string(), e))?;

        check_shapes(record.w_in.val().dims(), record.w_out.val().dims())?;

        Ok(Self {
            w_in:  record.w_in,
            w_out: record.w_out,
        })
    }
}

fn recorder() -> NamedMpkGzFileRecorder<FullPrecisionSettings> {
    NamedMpkGzFileRecorder::<FullPrecisionSettings>::new()
}

/// W_in must be [vocab, hidden] and W_out [hidden, vocab].
fn check_shapes(w_in: [usize; 2], w_out: [usize; 2]) -> error::Result<()> {
    if w_in[1] != w_out[0] || w_in[0] != w_out[1] {
        return Err(ChatError::ShapeMismatch { w_in, w_out });
    }
    Ok(())
}

fn to_floats<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Vec<f32> {
    tensor.into_data().iter::<f32>().collect()
}

impl<B: Backend> NextTokenModel for SequenceModel<B> {
    fn vocab_size(&self) -> usize {
        SequenceModel::vocab_size(self)
    }

    fn embed(&self, token_id: u32) -> HiddenState {
        let id = if (token_id as usize) < SequenceModel::vocab_size(self) {
            token_id
        } else {
            tracing::warn!("Token id {} has no embedding row, using <unk>", token_id);
            UNK_ID
        };
        HiddenState::new(to_floats(self.hidden(&[id])))
    }

    fn project(&self, state: &HiddenState) -> Vec<f32> {
        let hidden_size = self.hidden_size();
        if state.width() != hidden_size {
            tracing::warn!(
                "Hidden state has width {}, model expects {}; scoring as all zeros",
                state.width(),
                hidden_size
            );
            return vec![0.0; SequenceModel::vocab_size(self)];
        }
        let row = Tensor::<B, 1>::from_data(
            TensorData::new(state.values().to_vec(), [hidden_size]),
            &self.device(),
        )
        .unsqueeze::<2>();
        to_floats(self.logits(row))
    }

    // One batched select instead of a lookup per id
    fn forward_sequence(&self, ids: &[u32]) -> Vec<HiddenState> {
        if ids.is_empty() {
            return Vec::new();
        }
        let safe: Vec<u32> = ids
            .iter()
            .map(|&id| if (id as usize) < SequenceModel::vocab_size(self) { id } else { UNK_ID })
            .collect();
        let flat = to_floats(self.hidden(&safe));
        flat.chunks(self.hidden_size())
            .map(|row| HiddenState::new(row.to_vec()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, NdArray};

    type B = NdArray;

    /// vocab 3, hidden 2: token i embeds to row i; W_out maps
    /// hidden (a, b) to logits (a, b, a + b)
    fn tiny_model() -> SequenceModel<B> {
        let device = NdArrayDevice::default();
        let w_in = Tensor::<B, 2>::from_data(
            TensorData::new(vec![1.0f32, 0.0, 0.0, 1.0, 0.5, 0.5], [3, 2]),
            &device,
        );
        let w_out = Tensor::<B, 2>::from_data(
            TensorData::new(vec![1.0f32, 0.0, 1.0, 0.0, 1.0, 1.0], [2, 3]),
            &device,
        );
        SequenceModel::from_weights(w_in, w_out).unwrap()
    }

    #[test]
    fn test_model_config_json_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_config.json");
        let cfg  = SequenceModelConfig::new(12, 4).with_init_std(0.05);
        cfg.save(&path).unwrap();

        let back = SequenceModelConfig::load(&path).unwrap();
        assert_eq!(back.vocab_size, 12);
        assert_eq!(back.hidden_size, 4);
        assert_eq!(back.init_std, 0.05);
    }

    #[test]
    fn test_embed_is_a_row_lookup() {
        let model = tiny_model();
        assert_eq!(model.embed(1).values(), &[0.0, 1.0]);
        assert_eq!(model.embed(2).values(), &[0.5, 0.5]);
    }

    #[test]
    fn test_step_ignores_previous_state() {
        let model = tiny_model();
        let (state_a, logits_a) = model.step(&HiddenState::initial(), 1);
        let (state_b, logits_b) = model.step(&model.embed(0), 1);
        assert_eq!(state_a, state_b);
        assert_eq!(logits_a, logits_b);
        assert_eq!(logits_a, vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_forward_sequence_stacks_one_state_per_id() {
        let model  = tiny_model();
        let states = model.forward_sequence(&[0, 2, 1]);
        assert_eq!(states.len(), 3);
        assert_eq!(states[0].values(), &[1.0, 0.0]);
        assert_eq!(states[1].values(), &[0.5, 0.5]);
        assert_eq!(states[2].values(), &[0.0, 1.0]);
    }

    #[test]
    fn test_from_weights_rejects_hidden_mismatch() {
        let device = NdArrayDevice::default();
        let w_in   = Tensor::<B, 2>::zeros([5, 8], &device);
        let w_out  = Tensor::<B, 2>::zeros([4, 5], &device);
        let err    = SequenceModel::from_weights(w_in, w_out).unwrap_err();
        assert!(matches!(err, ChatError::ShapeMismatch { w_in: [5, 8], w_out: [4, 5] }));
    }

    #[test]
    fn test_loss_rejects_short_windows_and_bad_ids() {
        let model = tiny_model();
        assert!(matches!(model.loss(&[1]), Err(ChatError::InvalidInput(_))));
        assert!(matches!(model.loss(&[1, 7]), Err(ChatError::InvalidInput(_))));
        let loss = model.loss(&[0, 1, 2]).unwrap().into_scalar().elem::<f64>();
        assert!(loss.is_finite() && loss > 0.0);
    }

    #[test]
    fn test_save_then_load_reproduces_logits() {
        let dir   = tempfile::tempdir().unwrap();
        let path  = dir.path().join("model");
        let model = SequenceModelConfig::new(6, 4).init::<B>(&NdArrayDevice::default());
        model.save(&path).unwrap();

        let loaded = SequenceModel::<B>::load(&path, &NdArrayDevice::default()).unwrap();
        assert_eq!(loaded.vocab_size(), 6);
        assert_eq!(loaded.hidden_size(), 4);
        for id in 0..6 {
            assert_eq!(loaded.step(&HiddenState::initial(), id), model.step(&HiddenState::initial(), id));
        }
    }

    /// Same field name as W_in, but no W_out
    #[derive(Module, Debug)]
    struct InputOnly<B: Backend> {
        w_in: Param<Tensor<B, 2>>,
    }

    #[test]
    fn test_load_without_w_out_fails() {
        let dir    = tempfile::tempdir().unwrap();
        let path   = dir.path().join("partial");
        let device = NdArrayDevice::default();
        let partial = InputOnly::<B> {
            w_in: Param::from_tensor(Tensor::zeros([3, 2], &device)),
        };
        recorder().record(partial.into_record(), path.clone()).unwrap();

        let err = SequenceModel::<B>::load(&path, &device).unwrap_err();
        assert!(matches!(err, ChatError::Load { .. }));
    }

    #[test]
    fn test_load_with_mismatched_shapes_fails() {
        let dir    = tempfile::tempdir().unwrap();
        let path   = dir.path().join("mismatch");
        let device = NdArrayDevice::default();
        // Bypass from_weights to write an inconsistent bundle
        let bad = SequenceModel::<B> {
            w_in:  Param::from_tensor(Tensor::zeros([5, 8], &device)),
            w_out: Param::from_tensor(Tensor::zeros([4, 5], &device)),
        };
        bad.save(&path).unwrap();

        let err = SequenceModel::<B>::load(&path, &device).unwrap_err();
        assert!(matches!(err, ChatError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = SequenceModel::<B>::load(Path::new("/no/such/model"), &NdArrayDevice::default())
            .unwrap_err();
        assert!(matches!(err, ChatError::Load { .. }));
    }
}
