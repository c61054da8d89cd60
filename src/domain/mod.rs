// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits describing what the system works
// with: sentence pairs and the things that load or translate them.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

// An aligned source/target sentence
pub mod sentence_pair;

// Core abstractions (traits) that other layers implement
pub mod traits;
