// ============================================================
// Layer 5 — Bidirectional Encoder
// ============================================================
// Two Burn LSTMs read the source embeddings, one left-to-right
// and one right-to-left. Their outputs are concatenated so every
// source position carries context from both sides:
//
//   memory[b, t] = [ fw[b, t] ; bw[b, t] ]      shape [B, S, 2H]
//
// Batches are padded, so "right-to-left" must mean right-to-left
// WITHIN each sentence. For a sentence of length 3 padded to 5:
//
//   input:            x0 x1 x2 P  P
//   reversed input:   x2 x1 x0 P  P     ← padding stays at the end
//
// The backward LSTM therefore never sees padding before a real
// token. Its outputs are reversed back with the same index map
// (the map is its own inverse) and padded steps are zeroed.
//
// Reference: Bahdanau et al. (2015) §3.2
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{Lstm, LstmConfig},
    prelude::*,
};

#[derive(Config, Debug)]
pub struct BiEncoderConfig {
    pub d_input:  usize,
    pub d_hidden: usize,
}

impl BiEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BiEncoder<B> {
        BiEncoder {
            forward_lstm:  LstmConfig::new(self.d_input, self.d_hidden, true).init(device),
            backward_lstm: LstmConfig::new(self.d_input, self.d_hidden, true).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct BiEncoder<B: Backend> {
    pub forward_lstm:  Lstm<B>,
    pub backward_lstm: Lstm<B>,
}

impl<B: Backend> BiEncoder<B> {
    /// emb: [batch, src_len, d_input], lengths: [batch]
    /// → memory: [batch, src_len, 2 * d_hidden], zero past each length
    pub fn forward(&self, emb: Tensor<B, 3>, lengths: Tensor<B, 1, Int>) -> Tensor<B, 3> {
        let [batch_size, max_len, d_input] = emb.dims();

        let (fw_out, _) = self.forward_lstm.forward(emb.clone(), None);

        let rev = reverse_indices(lengths.clone(), max_len);
        let rev_in = rev.clone()
            .unsqueeze_dim::<3>(2)
            .expand([batch_size, max_len, d_input]);
        let (bw_out, _) = self.backward_lstm.forward(emb.gather(1, rev_in), None);

        let d_hidden = bw_out.dims()[2];
        let rev_out = rev
            .unsqueeze_dim::<3>(2)
            .expand([batch_size, max_len, d_hidden]);
        let bw_out = bw_out.gather(1, rev_out);

        let mask = sequence_mask(lengths, max_len)
            .unsqueeze_dim::<3>(2)
            .expand([batch_size, max_len, 2 * d_hidden]);

        Tensor::cat(vec![fw_out, bw_out], 2) * mask
    }
}

/// Boolean mask [batch, max_len]: true where `t < lengths[b]`.
pub fn length_mask<B: Backend>(lengths: Tensor<B, 1, Int>, max_len: usize) -> Tensor<B, 2, Bool> {
    let [batch_size] = lengths.dims();
    let steps = Tensor::<B, 1, Int>::arange(0..max_len as i64, &lengths.device())
        .unsqueeze::<2>()
        .expand([batch_size, max_len]);
    let lengths = lengths.unsqueeze_dim::<2>(1).expand([batch_size, max_len]);
    steps.lower(lengths)
}

/// Float version of [`length_mask`]; 1.0 for real tokens, 0.0 for padding.
pub fn sequence_mask<B: Backend>(lengths: Tensor<B, 1, Int>, max_len: usize) -> Tensor<B, 2> {
    length_mask(lengths, max_len).float()
}

/// Per-row time index that reverses the first `lengths[b]` steps and
/// leaves padded steps in place. Applying it twice is the identity.
pub fn reverse_indices<B: Backend>(lengths: Tensor<B, 1, Int>, max_len: usize) -> Tensor<B, 2, Int> {
    let [batch_size] = lengths.dims();
    let steps = Tensor::<B, 1, Int>::arange(0..max_len as i64, &lengths.device())
        .unsqueeze::<2>()
        .expand([batch_size, max_len]);
    let lengths = lengths.unsqueeze_dim::<2>(1).expand([batch_size, max_len]);

    let reversed = lengths.clone().sub(steps.clone()).sub_scalar(1);
    let inside   = steps.clone().lower(lengths);
    steps.mask_where(inside, reversed)
}
