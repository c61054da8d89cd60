// ============================================================
// Layer 5 — Inferencer
// ============================================================
use anyhow::Result;
use burn::prelude::*;

use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::NmtModel;

pub struct Inferencer<B: Backend> {
    model: NmtModel<B>,
}

impl<B: Backend> Inferencer<B> {
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, device: &B::Device) -> Result<Self> {
        let cfg = ckpt_manager.load_config()?;
        // Dropout is a no-op without autodiff, but keep the rebuilt config honest
        let model_cfg = cfg.model_config().with_dropout(0.0);
        let model: NmtModel<B> = model_cfg.init(device);
        let model = ckpt_manager.load_model(model, device)?;
        tracing::info!("Model loaded from checkpoint");
        Ok(Self { model })
    }

    /// Greedy decode; returns target ids without <sos>/<eos>.
    pub fn translate_ids(&self, src_ids: &[u32], max_dec_len: usize, sos_id: u32, eos_id: u32) -> Vec<u32> {
        self.model.translate(src_ids, max_dec_len, sos_id, eos_id)
    }
}
