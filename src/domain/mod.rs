// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types and traits that define what the system
// talks about: token ids, hidden states, merge rules, corpus
// documents, and the abstractions the other layers implement.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, constants and traits
//
// Keeping the generator's view of a model as a trait here
// means the decoding loop can be tested with a hand-written
// stub instead of real weights.

// A corpus document loaded from disk
pub mod document;

// Token ids, hidden states and merge rules
pub mod token;

// Core abstractions (traits) that other layers implement
pub mod traits;
