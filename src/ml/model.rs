use burn::{
    nn::{Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear, LinearConfig},
    module::Param,
    prelude::*,
    tensor::activation::log_softmax,
};

use crate::ml::attention::AttentionMemory;
use crate::ml::decoder::{AttentionDecoder, AttentionDecoderConfig};
use crate::ml::encoder::{sequence_mask, BiEncoder, BiEncoderConfig};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct NmtConfig {
    #[config(default = 10000)]
    pub src_vocab_size: usize,
    #[config(default = 4000)]
    pub trg_vocab_size: usize,
    #[config(default = 1024)]
    pub hidden_size: usize,
    #[config(default = 2)]
    pub decoder_layers: usize,
    /// 1 - keep_prob; applied to both embedding lookups
    #[config(default = 0.2)]
    pub dropout: f64,
    /// Reuse the target embedding table (transposed) as the softmax weight
    #[config(default = true)]
    pub share_emb_and_softmax: bool,
}

impl NmtConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> NmtModel<B> {
        let hidden = self.hidden_size;

        let src_embedding = EmbeddingConfig::new(self.src_vocab_size, hidden).init(device);
        let trg_embedding = EmbeddingConfig::new(self.trg_vocab_size, hidden).init(device);
        let encoder = BiEncoderConfig::new(hidden, hidden).init(device);
        let decoder = AttentionDecoderConfig::new(hidden, hidden, 2 * hidden, self.decoder_layers)
            .init(device);

        let softmax_weight = (!self.share_emb_and_softmax).then(|| {
            LinearConfig::new(hidden, self.trg_vocab_size)
                .with_bias(false)
                .init(device)
        });
        let softmax_bias = Param::from_tensor(Tensor::zeros([self.trg_vocab_size], device));

        NmtModel {
            src_embedding,
            trg_embedding,
            encoder,
            decoder,
            softmax_weight,
            softmax_bias,
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct NmtModel<B: Backend> {
    pub src_embedding:  Embedding<B>,
    pub trg_embedding:  Embedding<B>,
    pub encoder:        BiEncoder<B>,
    pub decoder:        AttentionDecoder<B>,
    /// Only present when the softmax layer is not tied to `trg_embedding`
    pub softmax_weight: Option<Linear<B>>,
    pub softmax_bias:   Param<Tensor<B, 1>>,
    pub dropout:        Dropout,
}

/// Masked cross-entropy over one batch.
pub struct NmtLoss<B: Backend> {
    /// Σ token loss over real (unpadded) target positions — shape [1]
    pub cost:           Tensor<B, 1>,
    /// `cost` divided by the number of real target tokens — shape [1]
    pub cost_per_token: Tensor<B, 1>,
}

impl<B: Backend> NmtModel<B> {
    /// Full training forward pass with teacher forcing.
    ///
    /// src_input: [batch, src_len]   src_size: [batch]
    /// trg_input: [batch, trg_len]   trg_label: [batch, trg_len]   trg_size: [batch]
    pub fn forward(
        &self,
        src_input: Tensor<B, 2, Int>,
        src_size:  Tensor<B, 1, Int>,
        trg_input: Tensor<B, 2, Int>,
        trg_label: Tensor<B, 2, Int>,
        trg_size:  Tensor<B, 1, Int>,
    ) -> NmtLoss<B> {
        let logits = self.logits(src_input, src_size, trg_input);
        masked_cross_entropy(logits, trg_label, trg_size)
    }

    /// Decoder logits for every target position: [batch, trg_len, trg_vocab]
    pub fn logits(
        &self,
        src_input: Tensor<B, 2, Int>,
        src_size:  Tensor<B, 1, Int>,
        trg_input: Tensor<B, 2, Int>,
    ) -> Tensor<B, 3> {
        let memory  = self.encode(src_input, src_size);
        let trg_emb = self.dropout.forward(self.trg_embedding.forward(trg_input));

        let dec_out = self.decoder.forward(trg_emb, &memory);
        let [batch_size, trg_len, hidden] = dec_out.dims();

        let logits = self.project(dec_out.reshape([batch_size * trg_len, hidden]));
        let [_, vocab] = logits.dims();
        logits.reshape([batch_size, trg_len, vocab])
    }

    /// Greedy decoding of a single source sentence.
    /// Starts from `sos_id`, stops on `eos_id` or after `max_dec_len` tokens.
    /// The returned ids exclude both markers.
    pub fn translate(&self, src_ids: &[u32], max_dec_len: usize, sos_id: u32, eos_id: u32) -> Vec<u32> {
        let device = self.softmax_bias.val().device();
        if src_ids.is_empty() {
            return Vec::new();
        }

        let src_flat: Vec<i32> = src_ids.iter().map(|&id| id as i32).collect();
        let src_input = Tensor::<B, 1, Int>::from_ints(src_flat.as_slice(), &device)
            .unsqueeze::<2>();
        let src_size = Tensor::<B, 1, Int>::from_ints([src_ids.len() as i32], &device);

        let memory = self.encode(src_input, src_size);
        let mut state = self.decoder.init_state(1, &device);

        let mut token = sos_id;
        let mut output = Vec::new();
        for _ in 0..max_dec_len {
            let y = Tensor::<B, 1, Int>::from_ints([token as i32], &device).unsqueeze::<2>();
            let y = self.trg_embedding.forward(y);
            let [_, _, hidden] = y.dims();
            let y = y.reshape([1, hidden]);

            let (out, next) = self.decoder.step(y, state, &memory);
            state = next;

            token = self.project(out).argmax(1).into_scalar().elem::<i64>() as u32;
            if token == eos_id {
                break;
            }
            output.push(token);
        }

        tracing::debug!("Greedy decode produced {} tokens", output.len());
        output
    }

    fn encode(&self, src_input: Tensor<B, 2, Int>, src_size: Tensor<B, 1, Int>) -> AttentionMemory<B> {
        let src_emb = self.dropout.forward(self.src_embedding.forward(src_input));
        let enc_out = self.encoder.forward(src_emb, src_size.clone());
        self.decoder.attention.prepare(enc_out, src_size)
    }

    /// [n, hidden] → [n, trg_vocab]
    fn project(&self, output: Tensor<B, 2>) -> Tensor<B, 2> {
        let weight = match &self.softmax_weight {
            Some(linear) => linear.weight.val(),
            None         => self.trg_embedding.weight.val().transpose(),
        };
        output.matmul(weight) + self.softmax_bias.val().unsqueeze::<2>()
    }
}

/// Sparse softmax cross-entropy weighted by the target length mask.
fn masked_cross_entropy<B: Backend>(
    logits:  Tensor<B, 3>,
    labels:  Tensor<B, 2, Int>,
    lengths: Tensor<B, 1, Int>,
) -> NmtLoss<B> {
    let [batch_size, trg_len, vocab] = logits.dims();
    let n = batch_size * trg_len;

    let log_probs  = log_softmax(logits.reshape([n, vocab]), 1);
    let token_loss = log_probs
        .gather(1, labels.reshape([n, 1]))
        .reshape([n])
        .neg();

    let weights = sequence_mask(lengths, trg_len).reshape([n]);
    let cost = (token_loss * weights.clone()).sum();
    let cost_per_token = cost.clone() / weights.sum();

    NmtLoss { cost, cost_per_token }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn tiny_config() -> NmtConfig {
        NmtConfig::new()
            .with_src_vocab_size(11)
            .with_trg_vocab_size(7)
            .with_hidden_size(8)
            .with_dropout(0.0)
    }

    fn ints2(rows: &[&[i32]]) -> Tensor<TestBackend, 2, Int> {
        let width = rows[0].len();
        let flat: Vec<i32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Tensor::<TestBackend, 1, Int>::from_ints(flat.as_slice(), &Default::default())
            .reshape([rows.len(), width])
    }

    fn ints1(values: &[i32]) -> Tensor<TestBackend, 1, Int> {
        Tensor::from_ints(values, &Default::default())
    }

    #[test]
    fn test_logits_shape() {
        let model = tiny_config().init::<TestBackend>(&Default::default());
        let logits = model.logits(
            ints2(&[&[3, 4, 5, 2], &[6, 2, 2, 2]]),
            ints1(&[4, 2]),
            ints2(&[&[1, 3, 4], &[1, 5, 5]]),
        );
        assert_eq!(logits.dims(), [2, 3, 7]);
    }

    #[test]
    fn test_initial_cost_is_near_uniform() {
        let model = tiny_config().init::<TestBackend>(&Default::default());
        let loss = model.forward(
            ints2(&[&[3, 4, 5, 2]]),
            ints1(&[4]),
            ints2(&[&[1, 3, 4]]),
            ints2(&[&[3, 4, 2]]),
            ints1(&[3]),
        );
        let per_token: f32 = loss.cost_per_token.into_scalar();
        let cost: f32 = loss.cost.into_scalar();

        assert!(per_token.is_finite() && per_token > 0.0);
        assert!((cost / 3.0 - per_token).abs() < 1e-4);
        // Untrained logits are near-random: same order as ln(vocab)
        assert!(per_token < 3.0 * (7.0f32).ln(), "cost per token {per_token}");
    }

    #[test]
    fn test_padded_labels_do_not_change_cost() {
        let model = tiny_config().init::<TestBackend>(&Default::default());
        let run = |labels: &[i32]| -> f32 {
            model
                .forward(
                    ints2(&[&[3, 4, 5, 2]]),
                    ints1(&[4]),
                    ints2(&[&[1, 3, 4, 2]]),
                    ints2(&[labels]),
                    ints1(&[2]),
                )
                .cost_per_token
                .into_scalar()
        };

        let a = run(&[3, 2, 2, 2]);
        let b = run(&[3, 2, 6, 5]);
        assert!((a - b).abs() < 1e-6);
    }

    #[test]
    fn test_untied_softmax_has_its_own_weight() {
        let model = tiny_config()
            .with_share_emb_and_softmax(false)
            .init::<TestBackend>(&Default::default());
        let weight = model.softmax_weight.as_ref().map(|l| l.weight.val().dims());
        assert_eq!(weight, Some([8, 7]));

        let tied = tiny_config().init::<TestBackend>(&Default::default());
        assert!(tied.softmax_weight.is_none());
    }

    #[test]
    fn test_translate_respects_max_len() {
        let model = tiny_config().init::<TestBackend>(&Default::default());
        // eos id outside the vocab can never be produced, so decoding
        // must stop at the length cap.
        let out = model.translate(&[3, 4, 2], 5, 1, 99);
        assert_eq!(out.len(), 5);
        assert!(out.iter().all(|&id| id < 7));

        assert!(model.translate(&[], 5, 1, 2).is_empty());
    }
}
