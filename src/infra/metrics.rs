// ============================================================
// Layer 6 — Training Metrics CSV
// ============================================================
// One row per finished epoch, appended to <checkpoint_dir>/metrics.csv:
//
//   epoch,train_loss,train_ppl,val_loss,windows
//   1,6.904100,996.412,6.887300,412
//   2,5.718800,304.600,5.802200,412
//
//   train_loss  mean next-token cross-entropy over the windows
//   train_ppl   exp(train_loss), comparable to vocab_size: an
//               untrained model sits close to it
//   val_loss    same loss on held-out windows, NaN without a split
//   windows     windows the epoch trained on
//
// Losses keep 6 decimals. Rows from earlier runs in the same
// directory are kept; the header is written once.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

const HEADER: &str = "epoch,train_loss,train_ppl,val_loss,windows";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// 1-based
    pub epoch:      usize,
    pub train_loss: f64,
    pub val_loss:   f64,
    pub windows:    usize,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64, windows: usize) -> Self {
        Self { epoch, train_loss, val_loss, windows }
    }

    /// Perplexity of the training loss
    pub fn train_perplexity(&self) -> f64 {
        self.train_loss.exp()
    }

    /// Whether the validation loss beats `best`. Always false
    /// without a validation split, since NaN compares false.
    pub fn is_improvement(&self, best: f64) -> bool {
        self.val_loss < best
    }
}

/// Appends one CSV row per epoch to `<dir>/metrics.csv`.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Open (or start) the CSV log in `dir`. The header is only
    /// written for a new file, so repeated runs append below it.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create metrics dir '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            fs::write(&csv_path, format!("{HEADER}\n"))
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        }
        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot append to '{}'", self.csv_path.display()))?;

        writeln!(
            file,
            "{},{:.6},{:.3},{:.6},{}",
            m.epoch,
            m.train_loss,
            m.train_perplexity(),
            m.val_loss,
            m.windows
        )?;
        tracing::debug!("Appended epoch {} to '{}'", m.epoch, self.csv_path.display());
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_improvement_needs_a_lower_val_loss() {
        let m = EpochMetrics::new(2, 2.5, 2.3, 40);
        assert!(m.is_improvement(3.0));
        assert!(!m.is_improvement(2.3));
        assert!(!EpochMetrics::new(1, 2.5, f64::NAN, 40).is_improvement(f64::INFINITY));
    }

    #[test]
    fn test_perplexity_of_uniform_guess_is_vocab_size() {
        let m = EpochMetrics::new(1, (50.0f64).ln(), f64::NAN, 1);
        assert!((m.train_perplexity() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_appends_rows_under_one_header() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&EpochMetrics::new(1, 2.0, f64::NAN, 10)).unwrap();

        // A second logger on the same directory keeps the existing file
        let again = MetricsLogger::new(dir.path()).unwrap();
        again.log(&EpochMetrics::new(2, 1.5, 1.7, 10)).unwrap();

        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "1,2.000000,7.389,NaN,10");
        assert_eq!(lines[2], "2,1.500000,4.482,1.700000,10");
        assert_eq!(lines.len(), 3);
    }
}
