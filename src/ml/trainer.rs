// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Drives parameter updates over pre-built training windows.
//
// One train_step per window:
//   forward   hidden = W_in[window[..n-1]], logits = hidden · W_out
//   loss      cross-entropy against window[1..]
//   backward  autodiff gradients for W_in and W_out
//   update    optimiser step with the configured learning rate
//
// Windows are visited in the order given, every epoch. The
// trainer never shuffles; callers that want a random order
// shuffle before calling run (see data/splitter.rs).
//
// The trainer owns its model, and train_step takes &mut self,
// so two updates — or an update and a read — can never overlap.
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::windows::TrainingWindow;
use crate::infra::metrics::EpochMetrics;
use crate::ml::model::SequenceModel;

pub struct Trainer<B: AutodiffBackend, O: Optimizer<SequenceModel<B>, B>> {
    model:         SequenceModel<B>,
    optim:         O,
    learning_rate: f64,
}

impl<B, O> Trainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<SequenceModel<B>, B>,
{
    pub fn new(model: SequenceModel<B>, optim: O, learning_rate: f64) -> Self {
        Self { model, optim, learning_rate }
    }

    /// One forward/backward/update over a single window. Returns the loss
    /// measured before the update.
    pub fn train_step(&mut self, window: &[u32]) -> crate::error::Result<f64> {
        let loss     = self.model.loss(window)?;
        let loss_val = loss.clone().into_scalar().elem::<f64>();

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        self.model = self.optim.step(self.learning_rate, self.model.clone(), grads);

        Ok(loss_val)
    }

    /// Average loss over `windows` without touching the parameters.
    /// Scored on the inner backend, so no autodiff graph is built.
    pub fn evaluate(&self, windows: &[TrainingWindow]) -> crate::error::Result<f64> {
        if windows.is_empty() {
            return Ok(f64::NAN);
        }
        let model = self.model.valid();
        let mut sum = 0.0f64;
        for window in windows {
            sum += model.loss(window)?.into_scalar().elem::<f64>();
        }
        Ok(sum / windows.len() as f64)
    }

    /// Train for `epochs` passes; returns the average loss of each epoch.
    pub fn run(&mut self, windows: &[TrainingWindow], epochs: usize) -> Result<Vec<f64>> {
        let metrics = self.fit(windows, &[], epochs, |_, _| Ok(()))?;
        Ok(metrics.into_iter().map(|m| m.train_loss).collect())
    }

    /// Like `run`, but also scores `val_windows` after each epoch and
    /// hands every epoch's metrics and model to `on_epoch`
    /// (checkpointing, CSV logging).
    pub fn fit<F>(
        &mut self,
        windows:      &[TrainingWindow],
        val_windows:  &[TrainingWindow],
        epochs:       usize,
        mut on_epoch: F,
    ) -> Result<Vec<EpochMetrics>>
    where
        F: FnMut(&EpochMetrics, &SequenceModel<B>) -> Result<()>,
    {
        let mut history = Vec::with_capacity(epochs);

        for epoch in 1..=epochs {
            let mut loss_sum = 0.0f64;
            for window in windows {
                loss_sum += self.train_step(window)?;
            }

            let train_loss = if windows.is_empty() {
                f64::NAN
            } else {
                loss_sum / windows.len() as f64
            };
            let val_loss = self.evaluate(val_windows)?;

            let metrics = EpochMetrics::new(epoch, train_loss, val_loss, windows.len());
            tracing::info!(
                "Epoch {}/{} | train_loss={:.4} | val_loss={:.4} | windows={}",
                epoch, epochs, train_loss, val_loss, windows.len()
            );

            on_epoch(&metrics, &self.model)?;
            history.push(metrics);
        }

        Ok(history)
    }

    pub fn into_model(self) -> SequenceModel<B> {
        self.model
    }
}
