// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the config                       (Layer 2)
//   Step 2: Load corpus files                         (Layer 4 - data)
//   Step 3: Load or bootstrap the tokenizer           (Layer 6 - infra)
//   Step 4: Encode every document                     (Layer 4 - data)
//   Step 5: Cut fixed-length training windows         (Layer 4 - data)
//   Step 6: Optional seeded shuffle + val split       (Layer 4 - data)
//   Step 7: Save config                               (Layer 6 - infra)
//   Step 8: Run training loop, checkpoint each epoch  (Layer 5 - ml)
//
// `train_from_corpus` is the minimal version of steps 4, 5 and 8
// for callers that already hold raw texts and a tokenizer.

use anyhow::{bail, Result};
use burn::optim::{AdamConfig, Optimizer, SgdConfig};
use serde::{Deserialize, Serialize};

use crate::data::{
    loader::CorpusLoader,
    splitter::split_train_val,
    tokenizer::Tokenizer,
    windows::{build_windows, num_windows},
};
use crate::domain::token::TokenSequence;
use crate::domain::traits::CorpusSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
    tokenizer_store::TokenizerStore,
};
use crate::ml::{
    model::{SequenceModel, SequenceModelConfig},
    trainer::Trainer,
    Device, TrainBackend,
};

/// Which update rule applies the gradients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    Sgd,
    Adam,
}

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters and paths for a training run.
// Saved next to the checkpoints as train_config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub corpus_dir:     String,
    pub extensions:     Vec<String>,
    pub checkpoint_dir: String,
    pub vocab_path:     String,
    pub merges_path:    String,
    pub vocab_size:     usize,
    pub max_length:     usize,
    pub hidden_size:    usize,
    pub epochs:         usize,
    pub lr:             f64,
    pub optimizer:      OptimizerKind,
    pub val_fraction:   f64,
    pub shuffle_seed:   Option<u64>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            corpus_dir:     ".".to_string(),
            extensions:     Vec::new(),
            checkpoint_dir: "checkpoints".to_string(),
            vocab_path:     "vocab.json".to_string(),
            merges_path:    "merges.txt".to_string(),
            vocab_size:     8192,
            max_length:     100,
            hidden_size:    256,
            epochs:         5,
            lr:             1e-3,
            optimizer:      OptimizerKind::Sgd,
            val_fraction:   0.0,
            shuffle_seed:   None,
        }
    }
}

impl TrainConfig {
    /// Reject settings that would make training meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.max_length < 2 {
            bail!("max_length must be at least 2 (one input and one target), got {}", self.max_length);
        }
        if self.hidden_size == 0 {
            bail!("hidden_size must be positive");
        }
        if self.epochs == 0 {
            bail!("epochs must be positive");
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            bail!("learning rate must be a positive number, got {}", self.lr);
        }
        if !(0.0..1.0).contains(&self.val_fraction) {
            bail!("val_fraction must be in [0, 1), got {}", self.val_fraction);
        }
        if self.vocab_size < 3 {
            bail!("vocab_size must leave room for <unk>, <eos> and at least one subword");
        }
        Ok(())
    }
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub documents:   usize,
    pub vocab_size:  usize,
    pub train_count: usize,
    pub val_count:   usize,
    pub epochs:      Vec<EpochMetrics>,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainReport> {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;

        // ── Step 2: Load corpus files ─────────────────────────────────────────
        tracing::info!("Loading corpus from '{}'", cfg.corpus_dir);
        let docs  = CorpusLoader::new(&cfg.corpus_dir, &cfg.extensions).load_all()?;
        let texts: Vec<String> = docs.into_iter().map(|d| d.text).collect();

        // ── Step 3: Load or bootstrap the tokenizer ───────────────────────────
        let store     = TokenizerStore::new(&cfg.vocab_path, &cfg.merges_path);
        let tokenizer = store.load_or_build(&texts, cfg.vocab_size)?;

        // ── Step 4: Encode ────────────────────────────────────────────────────
        let sequences = encode_corpus(&tokenizer, &texts);

        // ── Step 5: Training windows ──────────────────────────────────────────
        let too_short = sequences
            .iter()
            .filter(|seq| num_windows(seq.len(), cfg.max_length) == 0)
            .count();
        if too_short > 0 {
            tracing::warn!(
                "{} of {} documents are shorter than {} tokens and give no windows",
                too_short,
                sequences.len(),
                cfg.max_length
            );
        }
        let windows = build_windows(&sequences, cfg.max_length);
        tracing::info!(
            "Created {} training windows of {} tokens",
            windows.len(),
            cfg.max_length
        );
        if windows.is_empty() {
            bail!(
                "no training windows: every document encodes to fewer than {} tokens",
                cfg.max_length
            );
        }

        // ── Step 6: Optional shuffle + validation split ───────────────────────
        let (train, val) = split_train_val(windows, 1.0 - cfg.val_fraction, cfg.shuffle_seed);
        if train.is_empty() {
            bail!("validation split left no training windows; lower val_fraction");
        }

        // ── Step 7: Save config ───────────────────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt.save_config(cfg)?;

        // ── Step 8: Train ─────────────────────────────────────────────────────
        let vocab_size = tokenizer.vocabulary().len();
        let model = SequenceModelConfig::new(vocab_size, cfg.hidden_size)
            .init::<TrainBackend>(&Device::default());
        tracing::info!("Model ready: vocab_size={}, hidden_size={}", vocab_size, cfg.hidden_size);

        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;
        let epochs = match cfg.optimizer {
            OptimizerKind::Sgd => {
                let trainer = Trainer::new(model, SgdConfig::new().init(), cfg.lr);
                fit_and_checkpoint(trainer, &train, &val, cfg.epochs, &ckpt, &metrics)?
            }
            OptimizerKind::Adam => {
                let optim   = AdamConfig::new().with_epsilon(1e-8).init();
                let trainer = Trainer::new(model, optim, cfg.lr);
                fit_and_checkpoint(trainer, &train, &val, cfg.epochs, &ckpt, &metrics)?
            }
        };

        tracing::info!(
            "Training complete! Metrics in '{}'",
            metrics.csv_path().display()
        );
        Ok(TrainReport {
            documents:   texts.len(),
            vocab_size,
            train_count: train.len(),
            val_count:   val.len(),
            epochs,
        })
    }
}

fn fit_and_checkpoint<O>(
    mut trainer: Trainer<TrainBackend, O>,
    train:       &[Vec<u32>],
    val:         &[Vec<u32>],
    epochs:      usize,
    ckpt:        &CheckpointManager,
    metrics:     &MetricsLogger,
) -> Result<Vec<EpochMetrics>>
where
    O: Optimizer<SequenceModel<TrainBackend>, TrainBackend>,
{
    let mut best = f64::INFINITY;
    trainer.fit(train, val, epochs, |m, model| {
        metrics.log(m)?;
        ckpt.save_model(model, m.epoch)?;
        if m.is_improvement(best) {
            best = m.val_loss;
            tracing::info!("New best validation loss {:.4} at epoch {}", best, m.epoch);
        }
        Ok(())
    })
}

/// Encode every text, reporting how many subwords fell back to <unk>.
pub fn encode_corpus(tokenizer: &Tokenizer, texts: &[String]) -> Vec<TokenSequence> {
    let unknown_before = tokenizer.unknown_count();
    let sequences: Vec<TokenSequence> = texts.iter().map(|t| tokenizer.encode(t)).collect();

    let total: usize = sequences.iter().map(Vec::len).sum();
    let unknown = tokenizer.unknown_count() - unknown_before;
    tracing::info!(
        "Encoded {} texts into {} tokens ({} unknown subwords)",
        texts.len(),
        total,
        unknown
    );
    sequences
}

/// Encode `texts`, build windows of `max_length`, and run plain SGD
/// over them. Returns the trained model and the average loss per epoch.
pub fn train_from_corpus(
    tokenizer:     &Tokenizer,
    model:         SequenceModel<TrainBackend>,
    texts:         &[String],
    max_length:    usize,
    epochs:        usize,
    learning_rate: f64,
) -> Result<(SequenceModel<TrainBackend>, Vec<f64>)> {
    let sequences   = encode_corpus(tokenizer, texts);
    let windows     = build_windows(&sequences, max_length);
    let mut trainer = Trainer::new(model, SgdConfig::new().init(), learning_rate);
    let losses      = trainer.run(&windows, epochs)?;
    Ok((trainer.into_model(), losses))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::vocabulary::Vocabulary;

    fn tokenizer() -> Tokenizer {
        let vocab = Vocabulary::from_json(r#"{"<unk>":0, "<eos>":1, "hi":2, "there":3, " ":4}"#).unwrap();
        Tokenizer::new(vocab, Vec::new())
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        assert!(TrainConfig::default().validate().is_ok());
        assert!(TrainConfig { max_length: 1, ..TrainConfig::default() }.validate().is_err());
        assert!(TrainConfig { epochs: 0, ..TrainConfig::default() }.validate().is_err());
        assert!(TrainConfig { lr: -1.0, ..TrainConfig::default() }.validate().is_err());
        assert!(TrainConfig { val_fraction: 1.0, ..TrainConfig::default() }.validate().is_err());
    }

    #[test]
    fn test_train_from_corpus_reports_each_epoch() {
        let tok   = tokenizer();
        let model = SequenceModelConfig::new(5, 4).init::<TrainBackend>(&Device::default());
        // "hi there hi there" → 7 ids → windows of 4 at offsets 0, 2
        let texts = vec!["hi there hi there".to_string(), "hi".to_string()];

        let (trained, losses) = train_from_corpus(&tok, model, &texts, 4, 3, 0.1).unwrap();
        assert_eq!(losses.len(), 3);
        assert!(losses.iter().all(|l| l.is_finite()));
        assert_eq!(trained.vocab_size(), 5);
    }

    #[test]
    fn test_execute_trains_and_checkpoints() {
        let dir    = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("corpus");
        std::fs::create_dir_all(&corpus).unwrap();
        std::fs::write(corpus.join("a.md"), "one two three one two three one two three").unwrap();

        let cfg = TrainConfig {
            corpus_dir:     corpus.display().to_string(),
            checkpoint_dir: dir.path().join("ckpt").display().to_string(),
            vocab_path:     dir.path().join("vocab.json").display().to_string(),
            merges_path:    dir.path().join("merges.txt").display().to_string(),
            max_length:     6,
            hidden_size:    4,
            epochs:         2,
            lr:             0.05,
            optimizer:      OptimizerKind::Adam,
            val_fraction:   0.25,
            shuffle_seed:   Some(9),
            ..TrainConfig::default()
        };
        let report = TrainUseCase::new(cfg.clone()).execute().unwrap();

        // 17 ids, windows of 6 with stride 3 → offsets 0,3,6,9 → 4 windows
        assert_eq!(report.train_count + report.val_count, 4);
        assert_eq!(report.val_count, 1);
        assert_eq!(report.epochs.len(), 2);
        // <unk>, <eos>, " ", one, three, two
        assert_eq!(report.vocab_size, 6);

        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir);
        assert_eq!(ckpt.latest_epoch().unwrap(), 2);
        assert_eq!(ckpt.load_config().unwrap().max_length, 6);
    }

    #[test]
    fn test_execute_fails_on_short_corpus() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "tiny").unwrap();
        let cfg = TrainConfig {
            corpus_dir:     dir.path().display().to_string(),
            checkpoint_dir: dir.path().join("ckpt").display().to_string(),
            vocab_path:     dir.path().join("vocab.json").display().to_string(),
            merges_path:    dir.path().join("merges.txt").display().to_string(),
            ..TrainConfig::default()
        };
        assert!(TrainUseCase::new(cfg).execute().is_err());
    }
}
