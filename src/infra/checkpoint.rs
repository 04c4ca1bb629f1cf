// ============================================================
// Layer 6 — Parameter Bundles
// ============================================================
// One bundle per finished epoch, plus two small JSON files:
//
//   <dir>/model_epoch_{n}.mpk.gz   W_in and W_out, named, full precision
//   <dir>/latest_epoch.json        n of the newest complete bundle
//   <dir>/train_config.json        the TrainConfig of the run
//
// The model is rebuilt from a bundle alone: vocab_size and
// hidden_size come from the stored matrix shapes, so inference
// never needs train_config.json. The pointer is only rewritten
// after a bundle has been written in full.

use anyhow::{Context, Result};
use burn::tensor::backend::Backend;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::SequenceModel;

const LATEST_FILE: &str = "latest_epoch.json";
const CONFIG_FILE: &str = "train_config.json";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Nothing touches disk until the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Save parameters for a given epoch and point latest_epoch.json at it.
    pub fn save_model<B: Backend>(&self, model: &SequenceModel<B>, epoch: usize) -> Result<()> {
        self.ensure_dir()?;

        // Recorder appends the .mpk.gz extension
        model.save(&self.epoch_path(epoch))?;
        write_json(&self.dir.join(LATEST_FILE), &serde_json::to_string(&epoch)?)?;

        tracing::debug!("Bundle for epoch {} written to '{}'", epoch, self.dir.display());
        Ok(())
    }

    /// Load parameters from the latest saved checkpoint.
    pub fn load_latest<B: Backend>(&self, device: &B::Device) -> Result<SequenceModel<B>> {
        let epoch = self.latest_epoch()?;
        tracing::info!("Restoring parameters of epoch {}", epoch);
        self.load_epoch(epoch, device)
    }

    pub fn load_epoch<B: Backend>(&self, epoch: usize, device: &B::Device) -> Result<SequenceModel<B>> {
        let path  = self.epoch_path(epoch);
        let model = SequenceModel::load(&path, device).with_context(|| {
            format!(
                "Cannot load checkpoint '{}'. Have you trained the model first?",
                path.display()
            )
        })?;
        tracing::info!(
            "Model loaded: vocab_size={}, hidden_size={}",
            model.vocab_size(),
            model.hidden_size()
        );
        Ok(model)
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.ensure_dir()?;
        write_json(&self.dir.join(CONFIG_FILE), &serde_json::to_string_pretty(cfg)?)
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let json = read_json(&self.dir.join(CONFIG_FILE))?;
        serde_json::from_str(&json).context("train_config.json is not a valid TrainConfig")
    }

    /// Epoch number stored in latest_epoch.json
    pub fn latest_epoch(&self) -> Result<usize> {
        let json = read_json(&self.dir.join(LATEST_FILE))?;
        serde_json::from_str::<usize>(&json).context("latest_epoch.json does not hold an epoch number")
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", self.dir.display()))
    }

    fn epoch_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("model_epoch_{epoch}"))
    }
}

fn write_json(path: &Path, json: &str) -> Result<()> {
    fs::write(path, json).with_context(|| format!("Cannot write '{}'", path.display()))
}

fn read_json(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'. Has 'train' been run yet?", path.display()))
}
