// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands `train`, `reply` and `chat`,
// and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};

use crate::application::{
    reply_use_case::ReplyConfig,
    train_use_case::{OptimizerKind, TrainConfig},
};
use crate::ml::generator::DEFAULT_MAX_LENGTH;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the model on a directory of source files
    Train(TrainArgs),

    /// Generate one reply to a message
    Reply(ReplyArgs),

    /// Interactive session; type :reload to pick up a new checkpoint
    Chat(ModelArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OptimizerArg {
    Sgd,
    Adam,
}

impl From<OptimizerArg> for OptimizerKind {
    fn from(o: OptimizerArg) -> Self {
        match o {
            OptimizerArg::Sgd  => OptimizerKind::Sgd,
            OptimizerArg::Adam => OptimizerKind::Adam,
        }
    }
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Root directory walked recursively for training files
    #[arg(long, default_value = ".")]
    pub corpus_dir: String,

    /// File extensions to read (repeatable); defaults to
    /// py, ts, js, tsx, jsx, json and md
    #[arg(long = "ext")]
    pub extensions: Vec<String>,

    /// Directory to save checkpoints, config and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Subword → id table; built from the corpus if missing
    #[arg(long, default_value = "vocab.json")]
    pub vocab: String,

    /// Merge rules, one "left right" pair per line
    #[arg(long, default_value = "merges.txt")]
    pub merges: String,

    /// Upper bound on entries when bootstrapping a vocabulary
    #[arg(long, default_value_t = 8192)]
    pub vocab_size: usize,

    /// Tokens per training window
    #[arg(long, default_value_t = 100)]
    pub max_length: usize,

    /// Width of the hidden state
    #[arg(long, default_value_t = 256)]
    pub hidden_size: usize,

    /// Number of full passes over the windows
    #[arg(long, default_value_t = 5)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    #[arg(long, value_enum, default_value_t = OptimizerArg::Sgd)]
    pub optimizer: OptimizerArg,

    /// Share of windows held out for validation loss
    #[arg(long, default_value_t = 0.0)]
    pub val_fraction: f64,

    /// Shuffle windows with this seed before splitting
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// This is the boundary between Layer 1 and Layer 2 —
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            corpus_dir:     a.corpus_dir,
            extensions:     a.extensions,
            checkpoint_dir: a.checkpoint_dir,
            vocab_path:     a.vocab,
            merges_path:    a.merges,
            vocab_size:     a.vocab_size,
            max_length:     a.max_length,
            hidden_size:    a.hidden_size,
            epochs:         a.epochs,
            lr:             a.lr,
            optimizer:      a.optimizer.into(),
            val_fraction:   a.val_fraction,
            shuffle_seed:   a.seed,
        }
    }
}

/// Where a trained model and its tokenizer live
#[derive(Args, Debug)]
pub struct ModelArgs {
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value = "vocab.json")]
    pub vocab: String,

    #[arg(long, default_value = "merges.txt")]
    pub merges: String,

    /// Most tokens generated per reply
    #[arg(long, default_value_t = DEFAULT_MAX_LENGTH)]
    pub max_length: usize,
}

impl From<ModelArgs> for ReplyConfig {
    fn from(a: ModelArgs) -> Self {
        ReplyConfig {
            checkpoint_dir: a.checkpoint_dir,
            vocab_path:     a.vocab,
            merges_path:    a.merges,
            max_length:     a.max_length,
        }
    }
}

/// All arguments for the `reply` command
#[derive(Args, Debug)]
pub struct ReplyArgs {
    /// The message to reply to
    #[arg(long)]
    pub message: String,

    /// Also print the generated ids and why decoding stopped
    #[arg(long)]
    pub show_ids: bool,

    #[command(flatten)]
    pub model: ModelArgs,
}
