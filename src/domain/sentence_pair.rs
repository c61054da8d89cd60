// ============================================================
// Layer 3 — SentencePair Domain Type
// ============================================================
// One aligned translation example in raw text form: a sentence
// in the source language and its reference translation.
//
// Example:
//   source: "The weather is nice today ."
//   target: "今天天气很好。"

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentencePair {
    pub source: String,
    pub target: String,
}

impl SentencePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// True when either side is blank after trimming
    pub fn is_blank(&self) -> bool {
        self.source.trim().is_empty() || self.target.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_blank() {
        assert!(SentencePair::new("  ", "x").is_blank());
        assert!(SentencePair::new("x", "").is_blank());
        assert!(!SentencePair::new("hi", "你好").is_blank());
    }
}
