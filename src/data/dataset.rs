use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One tokenised sentence pair, ready for batching.
///
///   source    "a b c"  → src_ids   = [a, b, c, <eos>]
///   target    "x y"    → trg_input = [<sos>, x, y]
///                          trg_label = [x, y, <eos>]
///
/// trg_input is trg_label shifted right by one — the decoder sees
/// the ground-truth previous token at every step (teacher forcing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationSample {
    pub src_ids:   Vec<u32>,
    pub trg_input: Vec<u32>,
    pub trg_label: Vec<u32>,
}

impl TranslationSample {
    pub fn new(source: &[u32], target: &[u32], sos_id: u32, eos_id: u32) -> Self {
        let mut src_ids = source.to_vec();
        src_ids.push(eos_id);

        let mut trg_input = Vec::with_capacity(target.len() + 1);
        trg_input.push(sos_id);
        trg_input.extend_from_slice(target);

        let mut trg_label = target.to_vec();
        trg_label.push(eos_id);

        Self { src_ids, trg_input, trg_label }
    }

    pub fn src_len(&self) -> usize { self.src_ids.len() }

    pub fn trg_len(&self) -> usize { self.trg_label.len() }

    /// Both sides must hold more than the bare `<eos>` and at most `max_len` ids.
    pub fn fits(&self, max_len: usize) -> bool {
        let ok = |len: usize| len > 1 && len <= max_len;
        ok(self.src_len()) && ok(self.trg_len())
    }
}

/// Build samples from tokenised pairs, dropping the ones outside the length window.
pub fn make_samples(
    pairs:   impl IntoIterator<Item = (Vec<u32>, Vec<u32>)>,
    max_len: usize,
    sos_id:  u32,
    eos_id:  u32,
) -> Vec<TranslationSample> {
    let mut dropped = 0usize;
    let samples: Vec<TranslationSample> = pairs
        .into_iter()
        .map(|(src, trg)| TranslationSample::new(&src, &trg, sos_id, eos_id))
        .filter(|s| {
            let keep = s.fits(max_len);
            if !keep { dropped += 1; }
            keep
        })
        .collect();

    if dropped > 0 {
        tracing::info!("Dropped {} pairs outside length window (1, {}]", dropped, max_len);
    }
    samples
}

pub struct TranslationDataset {
    samples: Vec<TranslationSample>,
}

impl TranslationDataset {
    pub fn new(samples: Vec<TranslationSample>) -> Self { Self { samples } }

    pub fn token_count(&self) -> usize {
        self.samples.iter().map(|s| s.trg_len()).sum()
    }
}

impl Dataset<TranslationSample> for TranslationDataset {
    fn get(&self, index: usize) -> Option<TranslationSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
