// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// One word-level tokenizer per language, built from corpus word
// frequencies and persisted in HuggingFace tokenizer JSON so the
// exact same ids are used for training and translation.
//
//   checkpoints/
//     src_tokenizer.json
//     trg_tokenizer.json
//
// Fixed special ids (the decoder and data pipeline rely on them):
//   <unk> = 0   out-of-vocabulary word
//   <sos> = 1   first decoder input
//   <eos> = 2   end of every source and target sequence
//
// The BertNormalizer with handle_chinese_chars puts spaces around
// every CJK ideograph, so Chinese text is tokenised per character
// while English stays word-level. Words are counted with the
// same normaliser + pre-tokenizer the saved tokenizer uses, so
// every counted word is one the tokenizer can actually emit.
//
// Building the tokenizer JSON by hand sidesteps the trainer /
// ModelWrapper type mismatch in tokenizers 0.15.

use anyhow::{Context, Result};
use std::{collections::HashMap, path::PathBuf};
use tokenizers::{
    normalizers::bert::BertNormalizer,
    pre_tokenizers::bert::BertPreTokenizer,
    Normalizer, OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer, Tokenizer,
};

pub const UNK_ID: u32 = 0;
pub const SOS_ID: u32 = 1;
pub const EOS_ID: u32 = 2;

const SPECIALS: [&str; 3] = ["<unk>", "<sos>", "<eos>"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Source,
    Target,
}

impl Side {
    fn file_name(self) -> &'static str {
        match self {
            Side::Source => "src_tokenizer.json",
            Side::Target => "trg_tokenizer.json",
        }
    }
}

pub struct VocabStore {
    dir: PathBuf,
}

impl VocabStore {
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: PathBuf::from(dir.into()) }
    }

    /// Reuse the saved tokenizer for `side` if there is one, otherwise build it from `texts`.
    /// A saved vocabulary larger than `vocab_size` would emit ids past the end of
    /// the embedding table, so it is rebuilt instead.
    pub fn load_or_build(&self, side: Side, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        if self.dir.join(side.file_name()).exists() {
            tracing::info!("Loading existing {:?} vocabulary from disk", side);
            let tokenizer = self.load(side)?;
            let saved = tokenizer.get_vocab_size(false);
            if saved <= vocab_size {
                return Ok(tokenizer);
            }
            tracing::warn!(
                "Saved {:?} vocabulary has {} entries but vocab_size={}; rebuilding",
                side, saved, vocab_size
            );
        } else {
            tracing::info!("Building {:?} vocabulary (vocab_size={})", side, vocab_size);
        }
        self.build_and_save(side, texts, vocab_size)
    }

    pub fn load(&self, side: Side) -> Result<Tokenizer> {
        let path = self.dir.join(side.file_name());
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
    }

    fn build_and_save(&self, side: Side, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let mut freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for word in split_words(text)? {
                *freq.entry(word).or_insert(0) += 1;
            }
        }

        // Most frequent first; ties broken alphabetically so rebuilds are stable
        let mut words: Vec<(String, usize)> = freq
            .into_iter()
            .filter(|(w, _)| !SPECIALS.contains(&w.as_str()))
            .collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(vocab_size.saturating_sub(SPECIALS.len()));

        let mut vocab = serde_json::Map::new();
        for (id, special) in SPECIALS.iter().enumerate() {
            vocab.insert(special.to_string(), serde_json::json!(id));
        }
        for (offset, (word, _)) in words.iter().enumerate() {
            vocab.insert(word.clone(), serde_json::json!(SPECIALS.len() + offset));
        }

        let added_tokens: Vec<serde_json::Value> = SPECIALS
            .iter()
            .enumerate()
            .map(|(id, content)| serde_json::json!({
                "id": id, "content": content, "single_word": false, "lstrip": false,
                "rstrip": false, "normalized": false, "special": true
            }))
            .collect();

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": false,
                "lowercase": true
            },
            "pre_tokenizer": { "type": "BertPreTokenizer" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "<unk>"
            }
        });

        let path = self.dir.join(side.file_name());
        std::fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write tokenizer JSON '{}'", path.display()))?;

        tracing::info!(
            "{:?} vocabulary: {} entries saved to '{}'",
            side,
            words.len() + SPECIALS.len(),
            path.display()
        );

        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Cannot reload tokenizer: {e}"))
    }
}

/// Word ids for `text`, without any special tokens.
pub fn encode(tokenizer: &Tokenizer, text: &str) -> Result<Vec<u32>> {
    let enc = tokenizer
        .encode(text, false)
        .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;
    Ok(enc.get_ids().to_vec())
}

/// Turn ids back into text. CJK characters are joined without spaces.
pub fn decode(tokenizer: &Tokenizer, ids: &[u32]) -> String {
    let mut out = String::new();
    let mut prev_cjk = false;
    for &id in ids {
        let token = tokenizer
            .id_to_token(id)
            .unwrap_or_else(|| SPECIALS[UNK_ID as usize].to_string());
        let cjk = token.chars().all(is_cjk_like);
        if !out.is_empty() && !cjk && !prev_cjk {
            out.push(' ');
        }
        out.push_str(&token);
        prev_cjk = cjk;
    }
    out
}

/// Same settings as the "normalizer" entry of the saved tokenizer JSON.
fn normalizer() -> BertNormalizer {
    BertNormalizer::new(true, true, Some(false), true)
}

/// Words of `text` exactly as the saved tokenizer's normaliser and
/// pre-tokenizer produce them.
pub fn split_words(text: &str) -> Result<Vec<String>> {
    let normalizer = normalizer();
    let mut pretokenized = PreTokenizedString::from(text);
    pretokenized
        .normalize(|s| normalizer.normalize(s))
        .map_err(|e| anyhow::anyhow!("Normalisation error: {e}"))?;
    BertPreTokenizer
        .pre_tokenize(&mut pretokenized)
        .map_err(|e| anyhow::anyhow!("Pre-tokenisation error: {e}"))?;

    Ok(pretokenized
        .get_splits(OffsetReferential::Original, OffsetType::Byte)
        .into_iter()
        .map(|(word, _, _)| word.to_string())
        .collect())
}

fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF
        | 0x3400..=0x4DBF
        | 0x20000..=0x2A6DF
        | 0x2A700..=0x2B73F
        | 0x2B740..=0x2B81F
        | 0x2B820..=0x2CEAF
        | 0xF900..=0xFAFF
        | 0x2F800..=0x2FA1F)
}

/// Joined without spaces on decode: ideographs and full-width punctuation.
fn is_cjk_like(c: char) -> bool {
    is_cjk(c) || (!c.is_ascii() && !c.is_alphanumeric() && !c.is_whitespace())
}
