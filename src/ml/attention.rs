// ============================================================
// Layer 5 — Bahdanau (additive) attention
// ============================================================
// For a decoder query q and encoder memory m[0..S]:
//
//   keys      = W_m · m                       (once per batch)
//   score[s]  = vᵀ · tanh(keys[s] + W_q · q)
//   α         = softmax(score)                 (padded s masked)
//   context   = Σ_s α[s] · m[s]
//
// All three projections are bias-free Burn Linear layers.
// Masked positions get a large negative score rather than -inf
// so an empty source row degrades to uniform weights, not NaN.
//
// Reference: Bahdanau, Cho & Bengio (2015) eq. 5-6

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::{softmax, tanh},
};

use crate::ml::encoder::length_mask;

const SCORE_MASK_VALUE: f32 = -1.0e9;

#[derive(Config, Debug)]
pub struct BahdanauAttentionConfig {
    /// Size of the decoder query vector
    pub d_query:   usize,
    /// Size of each encoder memory vector (2H for a bidirectional encoder)
    pub d_memory:  usize,
    /// Width of the hidden scoring layer
    pub num_units: usize,
}

impl BahdanauAttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BahdanauAttention<B> {
        BahdanauAttention {
            query_layer:  LinearConfig::new(self.d_query, self.num_units).with_bias(false).init(device),
            memory_layer: LinearConfig::new(self.d_memory, self.num_units).with_bias(false).init(device),
            v:            LinearConfig::new(self.num_units, 1).with_bias(false).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct BahdanauAttention<B: Backend> {
    pub query_layer:  Linear<B>,
    pub memory_layer: Linear<B>,
    pub v:            Linear<B>,
}

/// Encoder memory with its projected keys and padding mask,
/// computed once and reused at every decoder step.
#[derive(Debug, Clone)]
pub struct AttentionMemory<B: Backend> {
    /// [batch, src_len, d_memory]
    pub values:   Tensor<B, 3>,
    /// [batch, src_len, num_units]
    pub keys:     Tensor<B, 3>,
    /// [batch, src_len], true at padded positions
    pub pad_mask: Tensor<B, 2, Bool>,
}

impl<B: Backend> BahdanauAttention<B> {
    pub fn prepare(&self, memory: Tensor<B, 3>, lengths: Tensor<B, 1, Int>) -> AttentionMemory<B> {
        let [_, max_len, _] = memory.dims();
        let keys = self.memory_layer.forward(memory.clone());
        let pad_mask = length_mask(lengths, max_len).bool_not();
        AttentionMemory { values: memory, keys, pad_mask }
    }

    /// query: [batch, d_query] → (context [batch, d_memory], alignments [batch, src_len])
    pub fn forward(&self, query: Tensor<B, 2>, memory: &AttentionMemory<B>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [batch_size, max_len, num_units] = memory.keys.dims();
        let [_, _, d_memory] = memory.values.dims();

        let processed_query = self.query_layer
            .forward(query)
            .unsqueeze_dim::<3>(1)
            .expand([batch_size, max_len, num_units]);

        let score = self.v
            .forward(tanh(memory.keys.clone() + processed_query))
            .reshape([batch_size, max_len])
            .mask_fill(memory.pad_mask.clone(), SCORE_MASK_VALUE);

        let alignments = softmax(score, 1);

        // [B, 1, S] x [B, S, D] → [B, 1, D]
        let context = alignments.clone()
            .unsqueeze_dim::<3>(1)
            .matmul(memory.values.clone())
            .reshape([batch_size, d_memory]);

        (context, alignments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    #[test]
    fn test_alignments_ignore_padding() {
        let device = Default::default();
        let attention = BahdanauAttentionConfig::new(3, 4, 5).init::<TestBackend>(&device);

        let memory = Tensor::<TestBackend, 3>::random([2, 4, 4], Distribution::Normal(0.0, 1.0), &device);
        let lengths = Tensor::<TestBackend, 1, Int>::from_ints([4, 2], &device);
        let memory = attention.prepare(memory, lengths);

        let query = Tensor::<TestBackend, 2>::random([2, 3], Distribution::Normal(0.0, 1.0), &device);
        let (context, alignments) = attention.forward(query, &memory);

        assert_eq!(context.dims(), [2, 4]);
        let a = alignments.into_data().convert::<f32>().to_vec::<f32>().unwrap();

        let row0: f32 = a[0..4].iter().sum();
        let row1: f32 = a[4..8].iter().sum();
        assert!((row0 - 1.0).abs() < 1e-5);
        assert!((row1 - 1.0).abs() < 1e-5);
        assert!(a[6] < 1e-6 && a[7] < 1e-6, "padded weights: {:?}", &a[6..8]);
    }

    #[test]
    fn test_empty_source_gives_uniform_weights() {
        let device = Default::default();
        let attention = BahdanauAttentionConfig::new(2, 2, 2).init::<TestBackend>(&device);

        let memory = Tensor::<TestBackend, 3>::ones([1, 4, 2], &device);
        let lengths = Tensor::<TestBackend, 1, Int>::from_ints([0], &device);
        let memory = attention.prepare(memory, lengths);

        let (_, alignments) = attention.forward(Tensor::ones([1, 2], &device), &memory);
        let a = alignments.into_data().convert::<f32>().to_vec::<f32>().unwrap();
        assert!(a.iter().all(|w| w.is_finite() && (w - 0.25).abs() < 1e-5));
    }
}
