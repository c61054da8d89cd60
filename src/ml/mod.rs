// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model code lives here. The recurrent cells, autodiff
// and the SGD optimiser come from Burn; this layer only wires
// them into an attention-based encoder-decoder:
//
//   encoder.rs    — bidirectional LSTM over source embeddings,
//                   length-aware reversal and sequence masks
//
//   attention.rs  — Bahdanau additive attention over the
//                   encoder memory
//
//   decoder.rs    — stacked LSTMs wrapped with attention and
//                   input feeding, teacher-forced or stepwise
//
//   model.rs      — embeddings, (optionally tied) softmax layer,
//                   masked cross-entropy, greedy translation
//
//   trainer.rs    — train step with global-norm clipping + SGD,
//                   validation and the epoch loop
//
//   inferencer.rs — rebuilds the model from a checkpoint
//
// Reference: Bahdanau, Cho & Bengio (2015)
//            Burn Book §3 (Building Blocks), §5 (Training)

/// Bidirectional LSTM encoder and mask helpers
pub mod encoder;

/// Bahdanau attention
pub mod attention;

/// Attention-wrapped LSTM decoder
pub mod decoder;

/// The full translation model
pub mod model;

/// Training step, clipping and epoch loop
pub mod trainer;

/// Checkpoint-backed inference
pub mod inferencer;
