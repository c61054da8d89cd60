// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between two aligned text files and padded tensor
// batches:
//
//   source.txt + target.txt
//       │
//       ▼
//   ParallelCorpusLoader  → line-aligned SentencePairs
//       │
//       ▼
//   Preprocessor          → whitespace / control-char cleanup
//       │
//       ▼
//   VocabStore (infra)    → word ids per language
//       │
//       ▼
//   make_samples          → <sos>/<eos> framing + length filter
//       │
//       ▼
//   split_train_val       → seeded shuffle, train / validation
//       │
//       ▼
//   TranslationDataset    → Burn Dataset
//       │
//       ▼
//   TranslationBatcher    → dynamically padded tensor batches
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads a line-aligned source/target corpus
pub mod loader;

/// Normalises a single corpus line
pub mod preprocessor;

/// TranslationSample and Burn's Dataset implementation
pub mod dataset;

/// Burn Batcher with per-batch padding
pub mod batcher;

/// Seeded shuffle and train/validation split
pub mod splitter;
