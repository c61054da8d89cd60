// ============================================================
// Layer 2 — Translate Use Case
// ============================================================
// sentence → clean → source ids → greedy decode → target text
//
// The vocabularies and the model are loaded once in `new`, so a
// caller can translate many sentences with one instance.

use anyhow::Result;
use burn::prelude::*;
use tokenizers::Tokenizer;

use crate::data::preprocessor::Preprocessor;
use crate::domain::traits::Translator;
use crate::infra::{
    checkpoint::CheckpointManager,
    vocab_store::{decode, encode, Side, VocabStore, EOS_ID, SOS_ID},
};
use crate::ml::inferencer::Inferencer;

type InferBackend = burn::backend::Wgpu;

pub struct TranslateUseCase<B: Backend> {
    src_tokenizer: Tokenizer,
    trg_tokenizer: Tokenizer,
    inferencer:    Inferencer<B>,
    max_dec_len:   usize,
}

impl TranslateUseCase<InferBackend> {
    pub fn new(checkpoint_dir: &str, max_dec_len: usize) -> Result<Self> {
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);
        Self::with_device(checkpoint_dir, max_dec_len, &device)
    }
}

impl<B: Backend> TranslateUseCase<B> {
    pub fn with_device(checkpoint_dir: &str, max_dec_len: usize, device: &B::Device) -> Result<Self> {
        let ckpt = CheckpointManager::open(checkpoint_dir)?;

        let vocab = VocabStore::new(checkpoint_dir);
        let src_tokenizer = vocab.load(Side::Source)?;
        let trg_tokenizer = vocab.load(Side::Target)?;

        let inferencer = Inferencer::from_checkpoint(&ckpt, device)?;

        Ok(Self { src_tokenizer, trg_tokenizer, inferencer, max_dec_len })
    }
}

impl<B: Backend> Translator for TranslateUseCase<B> {
    fn translate(&self, sentence: &str) -> Result<String> {
        let cleaned = Preprocessor::new().clean(sentence);
        if cleaned.is_empty() {
            return Ok(String::new());
        }

        let mut src_ids = encode(&self.src_tokenizer, &cleaned)?;
        src_ids.push(EOS_ID);
        tracing::debug!("Source ids: {:?}", src_ids);

        let trg_ids = self.inferencer.translate_ids(&src_ids, self.max_dec_len, SOS_ID, EOS_ID);
        tracing::debug!("Target ids: {:?}", trg_ids);

        Ok(decode(&self.trg_tokenizer, &trg_ids))
    }
}
