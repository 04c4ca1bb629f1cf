// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between raw text on disk and the id windows the
// model trains on.
//
//   corpus files
//       │
//       ▼
//   CorpusLoader      → walks the tree, reads matching files
//       │
//       ▼
//   Tokenizer         → text ⇄ ids (Vocabulary + merge rules)
//       │
//       ▼
//   build_windows     → fixed-length, half-overlapping windows
//       │
//       ▼
//   split_train_val   → optional seeded shuffle, train/val split
//
// The same Tokenizer also serves inference: it encodes the
// incoming message and decodes the generated reply.
//
// Reference: Rust Book §13 (Iterators and Closures)

/// Recursively loads text files from a corpus directory
pub mod loader;

/// Bidirectional subword ⇄ id table
pub mod vocabulary;

/// Atomic-unit splitting, merge rules, encode/decode
pub mod tokenizer;

/// Fixed-length overlapping training windows
pub mod windows;

/// Seeded shuffle and train/validation split
pub mod splitter;
