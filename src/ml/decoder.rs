// ============================================================
// Layer 5 — Attention Decoder
// ============================================================
// A stack of Burn LSTMs wrapped with Bahdanau attention.
// One decoder step:
//
//   cell_input  = [ y_emb ; prev_attention ]          (input feeding)
//   cell_out    = LSTM_n( ... LSTM_1(cell_input) )
//   context     = attend(cell_out, memory)
//   attention   = W_a · [ cell_out ; context ]
//
// `attention` is both the step output (fed to the softmax layer)
// and the prev_attention for the next step.
//
// The decoder always starts from a zero state. It does not
// inherit the encoder's final state; everything it knows about
// the source arrives through attention.

use burn::{
    nn::{Linear, LinearConfig, Lstm, LstmConfig, LstmState},
    prelude::*,
};

use crate::ml::attention::{AttentionMemory, BahdanauAttention, BahdanauAttentionConfig};

#[derive(Config, Debug)]
pub struct AttentionDecoderConfig {
    pub d_input:    usize,
    pub d_hidden:   usize,
    pub d_memory:   usize,
    pub num_layers: usize,
}

impl AttentionDecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> AttentionDecoder<B> {
        // The attention vector has width d_hidden and is concatenated
        // onto the embedding before the first layer.
        let cells = (0..self.num_layers)
            .map(|layer| {
                let d_in = if layer == 0 { self.d_input + self.d_hidden } else { self.d_hidden };
                LstmConfig::new(d_in, self.d_hidden, true).init(device)
            })
            .collect();

        let attention = BahdanauAttentionConfig::new(self.d_hidden, self.d_memory, self.d_hidden)
            .init(device);
        let attention_layer = LinearConfig::new(self.d_hidden + self.d_memory, self.d_hidden)
            .with_bias(false)
            .init(device);

        AttentionDecoder { cells, attention, attention_layer, d_hidden: self.d_hidden }
    }
}

#[derive(Module, Debug)]
pub struct AttentionDecoder<B: Backend> {
    pub cells:           Vec<Lstm<B>>,
    pub attention:       BahdanauAttention<B>,
    pub attention_layer: Linear<B>,
    pub d_hidden:        usize,
}

/// Recurrent state carried between decoder steps.
pub struct DecoderState<B: Backend> {
    /// One entry per LSTM layer; `None` means the zero state
    pub cells:     Vec<Option<LstmState<B, 2>>>,
    /// [batch, d_hidden]
    pub attention: Tensor<B, 2>,
}

impl<B: Backend> AttentionDecoder<B> {
    pub fn init_state(&self, batch_size: usize, device: &B::Device) -> DecoderState<B> {
        DecoderState {
            cells:     (0..self.cells.len()).map(|_| None).collect(),
            attention: Tensor::zeros([batch_size, self.d_hidden], device),
        }
    }

    /// input: [batch, d_input] → (output [batch, d_hidden], next state)
    pub fn step(
        &self,
        input:  Tensor<B, 2>,
        state:  DecoderState<B>,
        memory: &AttentionMemory<B>,
    ) -> (Tensor<B, 2>, DecoderState<B>) {
        let DecoderState { cells: cell_states, attention } = state;

        let mut x = Tensor::cat(vec![input, attention], 1).unsqueeze_dim::<3>(1);
        let mut next_cells = Vec::with_capacity(self.cells.len());
        for (cell, cell_state) in self.cells.iter().zip(cell_states) {
            let (out, next) = cell.forward(x, cell_state);
            next_cells.push(Some(next));
            x = out;
        }

        let [batch_size, _, d_hidden] = x.dims();
        let cell_out = x.reshape([batch_size, d_hidden]);

        let (context, _) = self.attention.forward(cell_out.clone(), memory);
        let attention = self.attention_layer.forward(Tensor::cat(vec![cell_out, context], 1));

        (attention.clone(), DecoderState { cells: next_cells, attention })
    }

    /// Teacher-forced decoding over the whole target sequence.
    /// inputs: [batch, trg_len, d_input] → [batch, trg_len, d_hidden]
    pub fn forward(&self, inputs: Tensor<B, 3>, memory: &AttentionMemory<B>) -> Tensor<B, 3> {
        let [batch_size, max_len, d_input] = inputs.dims();
        let mut state = self.init_state(batch_size, &inputs.device());
        let mut outputs = Vec::with_capacity(max_len);

        for t in 0..max_len {
            let y = inputs.clone()
                .slice([0..batch_size, t..t + 1, 0..d_input])
                .reshape([batch_size, d_input]);
            let (out, next) = self.step(y, state, memory);
            outputs.push(out.unsqueeze_dim::<3>(1));
            state = next;
        }

        Tensor::cat(outputs, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    #[test]
    fn test_forward_matches_stepwise_decoding() {
        let device = Default::default();
        let decoder = AttentionDecoderConfig::new(3, 4, 6, 2).init::<TestBackend>(&device);

        let memory = Tensor::<TestBackend, 3>::random([2, 5, 6], Distribution::Normal(0.0, 1.0), &device);
        let lengths = Tensor::<TestBackend, 1, Int>::from_ints([5, 3], &device);
        let memory = decoder.attention.prepare(memory, lengths);

        let inputs = Tensor::<TestBackend, 3>::random([2, 4, 3], Distribution::Normal(0.0, 1.0), &device);
        let full = decoder.forward(inputs.clone(), &memory);
        assert_eq!(full.dims(), [2, 4, 4]);

        let mut state = decoder.init_state(2, &device);
        for t in 0..4 {
            let y = inputs.clone().slice([0..2, t..t + 1, 0..3]).reshape([2, 3]);
            let (out, next) = decoder.step(y, state, &memory);
            let expected = full.clone().slice([0..2, t..t + 1, 0..4]).reshape([2, 4]);
            let diff = (out - expected).abs().max().into_scalar();
            assert!(diff < 1e-5, "step {t} diff {diff}");
            state = next;
        }
    }
}
