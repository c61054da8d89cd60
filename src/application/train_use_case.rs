// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load the parallel corpus      (Layer 4 - data)
//   Step 2: Clean both sides              (Layer 4 - data)
//   Step 3: Build / load vocabularies     (Layer 6 - infra)
//   Step 4: Tokenise into samples         (Layer 4 - data)
//   Step 5: Split train/validation        (Layer 4 - data)
//   Step 6: Build datasets                (Layer 4 - data)
//   Step 7: Save config                   (Layer 6 - infra)
//   Step 8: Run training loop             (Layer 5 - ml)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::{make_samples, TranslationDataset},
    loader::ParallelCorpusLoader,
    preprocessor::Preprocessor,
    splitter::split_train_val,
};
use crate::domain::{sentence_pair::SentencePair, traits::CorpusSource};
use crate::infra::{
    checkpoint::CheckpointManager,
    vocab_store::{encode, Side, VocabStore, EOS_ID, SOS_ID},
};
use crate::ml::{model::NmtConfig, trainer::run_training};

// ─── Training Configuration ──────────────────────────────────────────────────
// Every hyperparameter of a run. Saved next to the checkpoints so
// `translate` can rebuild exactly the same architecture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub src_file:              String,
    pub trg_file:              String,
    pub checkpoint_dir:        String,
    pub hidden_size:           usize,
    pub decoder_layers:        usize,
    pub src_vocab_size:        usize,
    pub trg_vocab_size:        usize,
    pub share_emb_and_softmax: bool,
    pub batch_size:            usize,
    pub epochs:                usize,
    pub lr:                    f64,
    pub dropout:               f64,
    pub max_grad_norm:         f64,
    /// Longest sequence kept, counting the appended <eos>
    pub max_len:               usize,
    pub train_fraction:        f64,
    pub seed:                  u64,
    pub log_every:             usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            src_file:              "data/train.en".to_string(),
            trg_file:              "data/train.zh".to_string(),
            checkpoint_dir:        "checkpoints".to_string(),
            hidden_size:           1024,
            decoder_layers:        2,
            src_vocab_size:        10000,
            trg_vocab_size:        4000,
            share_emb_and_softmax: true,
            batch_size:            100,
            epochs:                5,
            lr:                    1.0,
            dropout:               0.2,
            max_grad_norm:         5.0,
            max_len:               50,
            train_fraction:        0.95,
            seed:                  42,
            log_every:             10,
        }
    }
}

impl TrainConfig {
    /// The Burn model config implied by these hyperparameters.
    pub fn model_config(&self) -> NmtConfig {
        NmtConfig::new()
            .with_src_vocab_size(self.src_vocab_size)
            .with_trg_vocab_size(self.trg_vocab_size)
            .with_hidden_size(self.hidden_size)
            .with_decoder_layers(self.decoder_layers)
            .with_dropout(self.dropout)
            .with_share_emb_and_softmax(self.share_emb_and_softmax)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.epochs == 0 || self.hidden_size == 0 || self.decoder_layers == 0 {
            bail!("batch_size, epochs, hidden_size and decoder_layers must all be positive");
        }
        if self.src_vocab_size <= 3 || self.trg_vocab_size <= 3 {
            bail!("vocabulary sizes must leave room beyond the 3 special tokens");
        }
        if !(0.0..1.0).contains(&self.dropout) {
            bail!("dropout must be in [0, 1), got {}", self.dropout);
        }
        if self.max_grad_norm <= 0.0 {
            bail!("max_grad_norm must be positive, got {}", self.max_grad_norm);
        }
        if self.max_len < 2 {
            bail!("max_len must be at least 2, got {}", self.max_len);
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Load aligned sentence pairs ──────────────────────────────
        let loader = ParallelCorpusLoader::new(&cfg.src_file, &cfg.trg_file);
        let raw_pairs = loader.load_all()?;

        // ── Step 2: Clean / normalise both sides ─────────────────────────────
        let preprocessor = Preprocessor::new();
        let pairs: Vec<SentencePair> = raw_pairs
            .iter()
            .map(|p| SentencePair::new(preprocessor.clean(&p.source), preprocessor.clean(&p.target)))
            .filter(|p| !p.is_blank())
            .collect();
        if pairs.is_empty() {
            bail!("No usable sentence pairs in '{}' / '{}'", cfg.src_file, cfg.trg_file);
        }
        tracing::info!("{} non-blank pairs after cleaning", pairs.len());

        // ── Step 3: Vocabularies ─────────────────────────────────────────────
        let sources: Vec<String> = pairs.iter().map(|p| p.source.clone()).collect();
        let targets: Vec<String> = pairs.iter().map(|p| p.target.clone()).collect();

        let vocab = VocabStore::new(&cfg.checkpoint_dir);
        let src_tok = vocab.load_or_build(Side::Source, &sources, cfg.src_vocab_size)?;
        let trg_tok = vocab.load_or_build(Side::Target, &targets, cfg.trg_vocab_size)?;

        // ── Step 4: Tokenise and frame with <sos>/<eos> ──────────────────────
        let mut encoded = Vec::with_capacity(pairs.len());
        for (src, trg) in sources.iter().zip(&targets) {
            encoded.push((encode(&src_tok, src)?, encode(&trg_tok, trg)?));
        }
        let samples = make_samples(encoded, cfg.max_len, SOS_ID, EOS_ID);
        if samples.is_empty() {
            bail!("Every pair was filtered out by max_len={}", cfg.max_len);
        }
        tracing::info!("Built {} training samples", samples.len());

        // ── Step 5: Train / validation split ─────────────────────────────────
        let (train_samples, val_samples) = split_train_val(samples, cfg.train_fraction, cfg.seed);
        tracing::info!("Split: {} train, {} validation", train_samples.len(), val_samples.len());

        // ── Step 6: Burn datasets ────────────────────────────────────────────
        let train_dataset = TranslationDataset::new(train_samples);
        let val_dataset   = TranslationDataset::new(val_samples);
        tracing::info!(
            "Target tokens: {} train, {} validation",
            train_dataset.token_count(),
            val_dataset.token_count()
        );

        // ── Step 7: Save config for inference ────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.save_config(cfg)?;

        // ── Step 8: Training loop (Layer 5) ──────────────────────────────────
        run_training(cfg, train_dataset, val_dataset, ckpt_manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_setup() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.hidden_size, 1024);
        assert_eq!(cfg.decoder_layers, 2);
        assert_eq!(cfg.src_vocab_size, 10000);
        assert_eq!(cfg.trg_vocab_size, 4000);
        assert_eq!(cfg.batch_size, 100);
        assert!((cfg.dropout - 0.2).abs() < 1e-12);
        assert_eq!(cfg.max_grad_norm, 5.0);
        assert_eq!(cfg.lr, 1.0);
        assert!(cfg.share_emb_and_softmax);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_model_config_carries_hyperparameters() {
        let cfg = TrainConfig { hidden_size: 32, share_emb_and_softmax: false, ..TrainConfig::default() };
        let model_cfg = cfg.model_config();
        assert_eq!(model_cfg.hidden_size, 32);
        assert_eq!(model_cfg.trg_vocab_size, 4000);
        assert!(!model_cfg.share_emb_and_softmax);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            TrainConfig { batch_size: 0, ..TrainConfig::default() },
            TrainConfig { dropout: 1.0, ..TrainConfig::default() },
            TrainConfig { max_grad_norm: 0.0, ..TrainConfig::default() },
            TrainConfig { trg_vocab_size: 3, ..TrainConfig::default() },
            TrainConfig { max_len: 1, ..TrainConfig::default() },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "{cfg:?} should be rejected");
        }
    }

    #[test]
    fn test_missing_corpus_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            src_file:       dir.path().join("nope.en").to_string_lossy().to_string(),
            trg_file:       dir.path().join("nope.zh").to_string_lossy().to_string(),
            checkpoint_dir: dir.path().join("ckpt").to_string_lossy().to_string(),
            ..TrainConfig::default()
        };
        assert!(TrainUseCase::new(cfg).execute().is_err());
    }
}
