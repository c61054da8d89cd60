// ============================================================
// Layer 4 — Translation Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec of
// TranslationSamples into padded Int tensors.
//
// Sentences have different lengths, so padding is dynamic:
// every sequence in a batch is padded to the longest one IN
// THAT BATCH, not to a global maximum.
//
//   src_input  [B, max_src]    src_size [B]
//   trg_input  [B, max_trg]    trg_size [B]
//   trg_label  [B, max_trg]
//
// The pad id itself never matters — the encoder, attention and
// loss all mask by src_size / trg_size. <eos> is used so every
// padded id is still a valid embedding index.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::TranslationSample;

#[derive(Debug, Clone)]
pub struct TranslationBatch<B: Backend> {
    pub src_input: Tensor<B, 2, Int>,
    pub src_size:  Tensor<B, 1, Int>,
    pub trg_input: Tensor<B, 2, Int>,
    pub trg_label: Tensor<B, 2, Int>,
    pub trg_size:  Tensor<B, 1, Int>,
}

impl<B: Backend> TranslationBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.src_size.dims()[0]
    }
}

#[derive(Clone, Debug)]
pub struct TranslationBatcher {
    pad_id: u32,
}

impl TranslationBatcher {
    pub fn new(pad_id: u32) -> Self {
        Self { pad_id }
    }
}

impl<B: Backend> Batcher<B, TranslationSample, TranslationBatch<B>> for TranslationBatcher {
    fn batch(&self, items: Vec<TranslationSample>, device: &B::Device) -> TranslationBatch<B> {
        let max_src = items.iter().map(|s| s.src_len()).max().unwrap_or(0);
        let max_trg = items.iter().map(|s| s.trg_len()).max().unwrap_or(0);

        let src_input = self.pad(items.iter().map(|s| s.src_ids.as_slice()), max_src, device);
        let trg_input = self.pad(items.iter().map(|s| s.trg_input.as_slice()), max_trg, device);
        let trg_label = self.pad(items.iter().map(|s| s.trg_label.as_slice()), max_trg, device);

        let src_sizes: Vec<i32> = items.iter().map(|s| s.src_len() as i32).collect();
        let trg_sizes: Vec<i32> = items.iter().map(|s| s.trg_len() as i32).collect();

        TranslationBatch {
            src_input,
            src_size: Tensor::<B, 1, Int>::from_ints(src_sizes.as_slice(), device),
            trg_input,
            trg_label,
            trg_size: Tensor::<B, 1, Int>::from_ints(trg_sizes.as_slice(), device),
        }
    }
}

impl TranslationBatcher {
    fn pad<'a, B: Backend>(
        &self,
        rows:    impl ExactSizeIterator<Item = &'a [u32]>,
        width:   usize,
        device:  &B::Device,
    ) -> Tensor<B, 2, Int> {
        let height = rows.len();
        let flat: Vec<i32> = rows
            .flat_map(|row| {
                row.iter()
                    .copied()
                    .chain(std::iter::repeat(self.pad_id))
                    .take(width)
                    .map(|id| id as i32)
            })
            .collect();

        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), device).reshape([height, width])
    }
}
