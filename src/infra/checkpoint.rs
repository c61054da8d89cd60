// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores NmtModel weights with Burn's CompactRecorder
// (half-precision MessagePack), plus two small JSON sidecar files:
//
//   checkpoints/
//     model_epoch_1.mpk      ← weights after epoch 1
//     model_epoch_2.mpk
//     ...
//     latest_epoch.json      ← number of the newest epoch
//     train_config.json      ← everything needed to rebuild the
//                              architecture before loading weights
//
// Loading is type-checked by the recorder: a checkpoint saved
// with hidden_size=1024 cannot be loaded into a 512 model.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{bail, Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::NmtModel;

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Read-only access to an existing directory; nothing is created on disk.
    pub fn open(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        if !dir.is_dir() {
            bail!(
                "Checkpoint dir '{}' does not exist. Have you run 'train' first?",
                dir.display()
            );
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Write `model_epoch_{epoch}` and move the latest-epoch pointer to it.
    pub fn save_model<B: Backend>(&self, model: &NmtModel<B>, epoch: usize) -> Result<()> {
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        fs::write(self.dir.join("latest_epoch.json"), serde_json::to_string(&epoch)?)
            .with_context(|| "Failed to write latest_epoch.json")?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Restore the newest checkpoint into `model`, which must have the
    /// architecture described by the saved config.
    pub fn load_model<B: Backend>(&self, model: NmtModel<B>, device: &B::Device) -> Result<NmtModel<B>> {
        let epoch = self.latest_epoch()?;
        let path  = self.dir.join(format!("model_epoch_{epoch}"));
        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?", path.display())
            })?;

        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' before 'translate'.",
                path.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config in '{}'", path.display()))
    }

    fn latest_epoch(&self) -> Result<usize> {
        let s = fs::read_to_string(self.dir.join("latest_epoch.json"))
            .with_context(|| "Cannot find 'latest_epoch.json'. Have you run 'train' first?")?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn tiny_config() -> TrainConfig {
        TrainConfig {
            hidden_size:    4,
            src_vocab_size: 6,
            trg_vocab_size: 5,
            decoder_layers: 1,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().to_string_lossy()).unwrap();

        let cfg = tiny_config();
        ckpt.save_config(&cfg).unwrap();
        let loaded = ckpt.load_config().unwrap();
        assert_eq!(loaded.hidden_size, 4);
        assert_eq!(loaded.trg_vocab_size, 5);
        assert_eq!(loaded.max_grad_norm, cfg.max_grad_norm);
    }

    #[test]
    fn test_load_without_training_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().to_string_lossy()).unwrap();
        assert!(ckpt.load_config().is_err());

        let device = Default::default();
        let model = tiny_config().model_config().init::<TestBackend>(&device);
        assert!(ckpt.load_model(model, &device).is_err());
    }

    #[test]
    fn test_open_does_not_create_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("typo");

        assert!(CheckpointManager::open(missing.to_string_lossy()).is_err());
        assert!(!missing.exists());

        CheckpointManager::new(missing.to_string_lossy()).unwrap();
        assert!(CheckpointManager::open(missing.to_string_lossy()).is_ok());
    }

    #[test]
    fn test_weights_survive_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().to_string_lossy()).unwrap();
        let device = Default::default();
        let model_cfg = tiny_config().model_config();

        let saved = model_cfg.init::<TestBackend>(&device);
        ckpt.save_model(&saved, 3).unwrap();
        assert!(dir.path().join("model_epoch_3.mpk").exists());

        let fresh = model_cfg.init::<TestBackend>(&device);
        let loaded = ckpt.load_model(fresh, &device).unwrap();

        let a = saved.trg_embedding.weight.val();
        let b = loaded.trg_embedding.weight.val();
        // CompactRecorder stores half precision
        let diff = (a - b).abs().max().into_scalar();
        assert!(diff < 1e-2, "max diff {diff}");
    }
}
