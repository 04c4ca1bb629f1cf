// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific code.
// No other layer builds tensors directly — the generator sees
// the model only through the NextTokenModel trait.
//
// What's in this layer:
//
//   model.rs     — SequenceModel: two weight matrices
//                  • W_in  [vocab, hidden]  embedding rows
//                  • W_out [hidden, vocab]  output projection
//                  plus the cross-entropy loss and save/load
//
//   trainer.rs   — The training loop
//                  Forward pass, loss, backward pass,
//                  optimiser step, per-epoch reporting
//
//   generator.rs — Greedy autoregressive decoding
//                  Primes on the prompt, then emits the
//                  argmax token until <eos> or max_length
//
// Backends: training runs on Autodiff<NdArray>, inference on
// plain NdArray (CPU, no autodiff overhead).
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// One-hot embedding + projection model
pub mod model;

/// Training loop over fixed-length windows
pub mod trainer;

/// Greedy decoding state machine
pub mod generator;

pub type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;
pub type InferBackend = burn::backend::NdArray;
pub type Device       = burn::backend::ndarray::NdArrayDevice;
