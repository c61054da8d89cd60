// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence used by both training and translation:
//
//   checkpoint.rs   — model weights (Burn CompactRecorder) plus
//                     the JSON training config needed to rebuild
//                     the architecture for inference
//
//   vocab_store.rs  — one word-level tokenizer per language, built
//                     from the corpus once and reused afterwards
//
//   metrics.rs      — per-epoch cost / perplexity CSV log
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Source/target vocabularies and special token ids
pub mod vocab_store;

/// Training metrics CSV logger
pub mod metrics;
