// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Optionally shuffles training windows, then splits them into:
//   - Training set:   fed to train_step, one window at a time
//   - Validation set: only scored, never used for updates
//
// The trainer itself never shuffles — window order is part of
// what makes a training run reproducible. Shuffling is the
// caller's choice, and it is always seeded: the same seed
// gives the same order on every run.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom over a
// seeded StdRng.
//
// Reference: rand crate documentation

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` (if any) and split into (train, validation).
///
/// # Arguments
/// * `samples`        - All available samples (consumed by this function)
/// * `train_fraction` - Proportion for training, e.g. 0.9 = 90%
/// * `seed`           - `Some(seed)` shuffles first; `None` keeps input order
pub fn split_train_val<T>(
    mut samples:    Vec<T>,
    train_fraction: f64,
    seed:           Option<u64>,
) -> (Vec<T>, Vec<T>) {
    if let Some(seed) = seed {
        let mut rng = StdRng::seed_from_u64(seed);
        samples.shuffle(&mut rng);
    }

    // e.g. 100 samples * 0.9 = 90 → first 90 are training
    let total    = samples.len();
    let split_at = ((total as f64) * train_fraction.clamp(0.0, 1.0)).round() as usize;
    let split_at = split_at.min(total);

    // split_off(n) leaves [0..n) in `samples` and returns [n..total)
    let val = samples.split_off(split_at);

    tracing::debug!(
        "Window split: {} training, {} validation",
        samples.len(),
        val.len(),
    );

    (samples, val)
}
