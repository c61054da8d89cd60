// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to these traits, not to concrete
// loaders or models, so a different corpus format or a different
// decoding strategy can be dropped in without touching it.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::sentence_pair::SentencePair;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Anything that can produce aligned sentence pairs.
///
/// Implementations:
///   - ParallelCorpusLoader → two line-aligned text files
pub trait CorpusSource {
    fn load_all(&self) -> Result<Vec<SentencePair>>;
}

// ─── Translator ───────────────────────────────────────────────────────────────
/// Anything that can translate a source-language sentence.
///
/// Implementations:
///   - TranslateUseCase → greedy decoding with the trained model
pub trait Translator {
    fn translate(&self, sentence: &str) -> Result<String>;
}
