// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `translate`, and all
// their flags. Defaults reproduce the reference English→Chinese
// setup: 1024 hidden units, 2 decoder layers, 10k/4k vocabularies,
// batches of 100, keep-prob 0.8, gradient norm capped at 5.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the translation model on a line-aligned parallel corpus
    Train(TrainArgs),

    /// Translate one sentence using the latest checkpoint
    Translate(TranslateArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Source-language text file, one sentence per line
    #[arg(long, default_value = "data/train.en")]
    pub src_file: String,

    /// Target-language text file, line-aligned with --src-file
    #[arg(long, default_value = "data/train.zh")]
    pub trg_file: String,

    /// Directory for checkpoints, vocabularies, config and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// LSTM hidden size; also the embedding and attention size
    #[arg(long, default_value_t = 1024)]
    pub hidden_size: usize,

    /// Number of stacked decoder LSTM layers
    #[arg(long, default_value_t = 2)]
    pub decoder_layers: usize,

    #[arg(long, default_value_t = 10000)]
    pub src_vocab_size: usize,

    #[arg(long, default_value_t = 4000)]
    pub trg_vocab_size: usize,

    /// Give the softmax layer its own weight instead of reusing
    /// the transposed target embedding
    #[arg(long)]
    pub no_share_emb: bool,

    #[arg(long, default_value_t = 100)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 5)]
    pub epochs: usize,

    /// SGD learning rate
    #[arg(long, default_value_t = 1.0)]
    pub lr: f64,

    /// Dropout on the embeddings (1 - keep probability)
    #[arg(long, default_value_t = 0.2)]
    pub dropout: f64,

    /// Global gradient norm threshold for clipping
    #[arg(long, default_value_t = 5.0)]
    pub max_grad_norm: f64,

    /// Longest sentence kept (in tokens, including <eos>)
    #[arg(long, default_value_t = 50)]
    pub max_len: usize,

    /// Fraction of pairs used for training; the rest is validation
    #[arg(long, default_value_t = 0.95)]
    pub train_fraction: f64,

    /// Seed for the train/validation split and batch shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Log cost every N steps (0 disables step logging)
    #[arg(long, default_value_t = 10)]
    pub log_every: usize,
}

/// Boundary between Layer 1 and Layer 2 — the application layer
/// never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            src_file:              a.src_file,
            trg_file:              a.trg_file,
            checkpoint_dir:        a.checkpoint_dir,
            hidden_size:           a.hidden_size,
            decoder_layers:        a.decoder_layers,
            src_vocab_size:        a.src_vocab_size,
            trg_vocab_size:        a.trg_vocab_size,
            share_emb_and_softmax: !a.no_share_emb,
            batch_size:            a.batch_size,
            epochs:                a.epochs,
            lr:                    a.lr,
            dropout:               a.dropout,
            max_grad_norm:         a.max_grad_norm,
            max_len:               a.max_len,
            train_fraction:        a.train_fraction,
            seed:                  a.seed,
            log_every:             a.log_every,
        }
    }
}

#[derive(Args, Debug)]
pub struct TranslateArgs {
    /// The source-language sentence to translate
    #[arg(long)]
    pub sentence: String,

    /// Directory where `train` saved its checkpoints
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Maximum number of target tokens to generate
    #[arg(long, default_value_t = 100)]
    pub max_dec_len: usize,
}
