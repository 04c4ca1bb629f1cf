// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches disk on behalf of the other layers:
//
//   checkpoint.rs      — Parameter bundles and run config
//                        W_in / W_out go through Burn's named
//                        recorder; TrainConfig is plain JSON.
//
//   tokenizer_store.rs — vocab.json + merges.txt
//                        Loads them, or bootstraps a vocabulary
//                        from the corpus when none exists yet,
//                        so training and inference share ids.
//
//   metrics.rs         — Training metrics logging
//                        One CSV row of losses per epoch.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer loading and vocabulary bootstrap
pub mod tokenizer_store;

/// Training metrics CSV logger
pub mod metrics;
