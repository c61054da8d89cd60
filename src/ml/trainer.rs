// ============================================================
// Layer 5 — Training Loop
// ============================================================
// One training step (the "train op"):
//
//   1. loss  = model.forward(batch)                 masked cross-entropy
//   2. grads = backward(cost / batch_size)          Burn autodiff
//   3. grads = clip_by_global_norm(grads, 5.0)
//   4. θ     = θ - lr · grads                       plain SGD, lr = 1.0
//
// The gradient is taken on the per-SENTENCE cost while the value
// reported to the user is the per-TOKEN cost — sentences of very
// different length contribute proportionally to their tokens.
//
// Global-norm clipping looks at all gradients together:
//
//   g      = sqrt( Σ_params ‖grad_p‖² )
//   grad_p = grad_p · max_norm / max(g, max_norm)
//
// Burn's built-in GradientClipping works per parameter; the global
// version is a ModuleVisitor over the model's parameters.
//
// Validation runs on the inner (non-autodiff) backend via
// model.valid(), which also turns dropout off. Train and validation
// costs in the metrics CSV are both token-weighted means.
//
// Reference: Pascanu et al. (2013) "On the difficulty of training RNNs"
//            Burn Book §5 (Custom Training Loop)

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::{AutodiffModule, ModuleVisitor, Param},
    optim::{adaptor::OptimizerAdaptor, GradientsParams, Optimizer, Sgd, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{TranslationBatch, TranslationBatcher},
    dataset::TranslationDataset,
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
    vocab_store::EOS_ID,
};
use crate::ml::model::NmtModel;

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

// ─── Global-norm clipping ─────────────────────────────────────────────────────

struct GradNormVisitor<'a> {
    grads:  &'a GradientsParams,
    sum_sq: f64,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for GradNormVisitor<'_> {
    fn visit_float<const D: usize>(&mut self, param: &Param<Tensor<B, D>>) {
        if let Some(grad) = self.grads.get::<B::InnerBackend, D>(param.id) {
            self.sum_sq += (grad.clone() * grad).sum().into_scalar().elem::<f64>();
        }
    }
}

struct GradScaleVisitor<'a> {
    grads: &'a mut GradientsParams,
    scale: f64,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for GradScaleVisitor<'_> {
    fn visit_float<const D: usize>(&mut self, param: &Param<Tensor<B, D>>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(param.id) {
            self.grads.register::<B::InnerBackend, D>(param.id, grad.mul_scalar(self.scale));
        }
    }
}

/// sqrt of the summed squares of every parameter gradient of `model`.
pub fn global_norm<B: AutodiffBackend, M: AutodiffModule<B>>(model: &M, grads: &GradientsParams) -> f64 {
    let mut visitor = GradNormVisitor { grads, sum_sq: 0.0 };
    model.visit(&mut visitor);
    visitor.sum_sq.sqrt()
}

/// Rescale `grads` in place so their global norm is at most `max_norm`.
/// Returns the norm measured BEFORE clipping.
pub fn clip_by_global_norm<B: AutodiffBackend, M: AutodiffModule<B>>(
    model:    &M,
    grads:    &mut GradientsParams,
    max_norm: f64,
) -> f64 {
    let norm = global_norm::<B, M>(model, grads);
    if norm.is_finite() && norm > max_norm {
        let mut visitor = GradScaleVisitor { grads, scale: max_norm / norm };
        model.visit(&mut visitor);
    } else if !norm.is_finite() {
        tracing::warn!("Non-finite gradient norm ({norm}); update left unclipped");
    }
    norm
}

// ─── NmtTrainer ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct StepStats {
    /// Summed cost of the batch
    pub cost:           f64,
    /// Real (unpadded) target tokens in the batch
    pub tokens:         f64,
    pub cost_per_token: f64,
    /// Global gradient norm before clipping
    pub grad_norm:      f64,
}

/// Running Σ cost / Σ tokens over many batches.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenWeightedCost {
    cost_sum:  f64,
    token_sum: f64,
}

impl TokenWeightedCost {
    pub fn add(&mut self, cost: f64, tokens: f64) {
        self.cost_sum  += cost;
        self.token_sum += tokens;
    }

    /// NaN when no tokens were seen.
    pub fn mean(&self) -> f64 {
        if self.token_sum > 0.0 { self.cost_sum / self.token_sum } else { f64::NAN }
    }
}

pub struct NmtTrainer<B: AutodiffBackend> {
    optim:         OptimizerAdaptor<Sgd<B::InnerBackend>, NmtModel<B>, B>,
    learning_rate: f64,
    max_grad_norm: f64,
}

impl<B: AutodiffBackend> NmtTrainer<B> {
    pub fn new(learning_rate: f64, max_grad_norm: f64) -> Self {
        Self {
            optim: SgdConfig::new().init(),
            learning_rate,
            max_grad_norm,
        }
    }

    pub fn step(&mut self, model: NmtModel<B>, batch: TranslationBatch<B>) -> (NmtModel<B>, StepStats) {
        let batch_size = batch.batch_size();
        let tokens = batch.trg_size.clone().sum().into_scalar().elem::<f64>();
        let loss = model.forward(
            batch.src_input,
            batch.src_size,
            batch.trg_input,
            batch.trg_label,
            batch.trg_size,
        );
        let cost_per_token = loss.cost_per_token.into_scalar().elem::<f64>();
        let cost = loss.cost.clone().into_scalar().elem::<f64>();

        let grads = (loss.cost / batch_size as f64).backward();
        let mut grads = GradientsParams::from_grads(grads, &model);
        let grad_norm = clip_by_global_norm::<B, _>(&model, &mut grads, self.max_grad_norm);

        let model = self.optim.step(self.learning_rate, model, grads);
        (model, StepStats { cost, tokens, cost_per_token, grad_norm })
    }
}

/// Token-weighted mean cost per token over `batches`; NaN when there are none.
pub fn evaluate<B: Backend>(
    model:   &NmtModel<B>,
    batches: impl Iterator<Item = TranslationBatch<B>>,
) -> f64 {
    let mut total = TokenWeightedCost::default();

    for batch in batches {
        let tokens = batch.trg_size.clone().sum().into_scalar().elem::<f64>();
        let loss = model.forward(
            batch.src_input,
            batch.src_size,
            batch.trg_input,
            batch.trg_label,
            batch.trg_size,
        );
        total.add(loss.cost.into_scalar().elem::<f64>(), tokens);
    }

    total.mean()
}

// ─── Epoch loop ───────────────────────────────────────────────────────────────

pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: TranslationDataset,
    val_dataset:   TranslationDataset,
    ckpt_manager:  CheckpointManager,
) -> Result<()> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<MyBackend>(cfg, train_dataset, val_dataset, &ckpt_manager, &device)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    train_dataset: TranslationDataset,
    val_dataset:   TranslationDataset,
    ckpt_manager:  &CheckpointManager,
    device:        &B::Device,
) -> Result<()> {
    let mut model: NmtModel<B> = cfg.model_config().init(device);
    tracing::info!(
        "Model ready: hidden={}, decoder_layers={}, vocab {}→{}, shared softmax={}",
        cfg.hidden_size, cfg.decoder_layers, cfg.src_vocab_size, cfg.trg_vocab_size,
        cfg.share_emb_and_softmax,
    );

    let mut trainer = NmtTrainer::<B>::new(cfg.lr, cfg.max_grad_norm);
    let metrics = MetricsLogger::new(ckpt_manager.dir().to_string_lossy())?;
    tracing::info!("Writing epoch metrics to '{}'", metrics.csv_path().display());

    // ── Training loader (autodiff backend) ───────────────────────────────────
    let train_loader = DataLoaderBuilder::<B, _, _>::new(TranslationBatcher::new(EOS_ID))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_dataset);

    // ── Validation loader (inner backend, no autodiff) ───────────────────────
    let val_loader = DataLoaderBuilder::<B::InnerBackend, _, _>::new(TranslationBatcher::new(EOS_ID))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    let mut best_val = f64::INFINITY;
    let mut global_step = 0usize;

    for epoch in 1..=cfg.epochs {
        let mut train_cost    = TokenWeightedCost::default();
        let mut max_grad_norm = 0.0f64;

        for batch in train_loader.iter() {
            let (next, stats) = trainer.step(model, batch);
            model = next;

            global_step += 1;
            train_cost.add(stats.cost, stats.tokens);
            max_grad_norm = max_grad_norm.max(stats.grad_norm);

            if cfg.log_every > 0 && global_step % cfg.log_every == 0 {
                tracing::info!(
                    "step {:>6} | cost_per_token={:.3} | grad_norm={:.3}",
                    global_step, stats.cost_per_token, stats.grad_norm,
                );
            }
        }

        let model_valid: NmtModel<B::InnerBackend> = model.valid();
        let val_cost = evaluate(&model_valid, val_loader.iter());

        let m = EpochMetrics::new(epoch, train_cost.mean(), val_cost, max_grad_norm);
        println!(
            "Epoch {:>3}/{} | train_cost={:.4} | val_cost={:.4} | val_ppl={:.2} | max_grad_norm={:.2}",
            epoch, cfg.epochs, m.train_cost_per_token, m.val_cost_per_token,
            m.val_perplexity, m.max_grad_norm,
        );
        if m.is_improvement(best_val) {
            best_val = m.val_cost_per_token;
            tracing::info!("New best validation cost {:.4}", best_val);
        }
        metrics.log(&m)?;

        ckpt_manager.save_model(&model, epoch)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);
    }

    tracing::info!("Training complete after {} steps", global_step);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::data::dataloader::batcher::Batcher;

    use crate::data::dataset::TranslationSample;
    use crate::ml::model::NmtConfig;

    type TestBackend = Autodiff<NdArray>;

    fn tiny_model() -> NmtModel<TestBackend> {
        NmtConfig::new()
            .with_src_vocab_size(9)
            .with_trg_vocab_size(6)
            .with_hidden_size(8)
            .with_dropout(0.0)
            .init(&Default::default())
    }

    fn batch<B: Backend>() -> TranslationBatch<B> {
        let items = vec![
            TranslationSample::new(&[3, 4, 5], &[3, 4], 1, 2),
            TranslationSample::new(&[6, 7], &[5, 3, 4], 1, 2),
            TranslationSample::new(&[8], &[5], 1, 2),
        ];
        TranslationBatcher::new(2).batch(items, &Default::default())
    }

    fn grads_for(model: &NmtModel<TestBackend>) -> GradientsParams {
        let b = batch::<TestBackend>();
        let loss = model.forward(b.src_input, b.src_size, b.trg_input, b.trg_label, b.trg_size);
        GradientsParams::from_grads(loss.cost.backward(), model)
    }

    #[test]
    fn test_clipping_bounds_the_global_norm() {
        let model = tiny_model();
        let mut grads = grads_for(&model);

        let before = global_norm::<TestBackend, _>(&model, &grads);
        assert!(before > 0.0);

        let max = before / 4.0;
        let reported = clip_by_global_norm::<TestBackend, _>(&model, &mut grads, max);
        let after = global_norm::<TestBackend, _>(&model, &grads);

        assert!((reported - before).abs() < 1e-9);
        assert!((after - max).abs() / max < 1e-3, "after {after}, max {max}");
    }

    #[test]
    fn test_small_gradients_are_untouched() {
        let model = tiny_model();
        let mut grads = grads_for(&model);

        let before = global_norm::<TestBackend, _>(&model, &grads);
        clip_by_global_norm::<TestBackend, _>(&model, &mut grads, before * 10.0);
        let after = global_norm::<TestBackend, _>(&model, &grads);

        assert!((after - before).abs() / before < 1e-6);
    }

    #[test]
    fn test_sgd_steps_reduce_cost_on_a_fixed_batch() {
        let mut model = tiny_model();
        let mut trainer = NmtTrainer::<TestBackend>::new(1.0, 5.0);

        let (next, first) = trainer.step(model, batch());
        model = next;
        let mut last = first;
        for _ in 0..40 {
            let (next, stats) = trainer.step(model, batch());
            model = next;
            last = stats;
        }

        assert!(first.cost_per_token.is_finite());
        assert!(
            last.cost_per_token < first.cost_per_token,
            "cost did not fall: {} → {}",
            first.cost_per_token,
            last.cost_per_token
        );
    }

    #[test]
    fn test_token_weighted_cost() {
        let mut total = TokenWeightedCost::default();
        assert!(total.mean().is_nan());

        // 10 over 5 tokens and 6 over 1 token: 16 / 6, not (2 + 6) / 2
        total.add(10.0, 5.0);
        total.add(6.0, 1.0);
        assert!((total.mean() - 16.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_step_reports_batch_cost_and_tokens() {
        let mut trainer = NmtTrainer::<TestBackend>::new(1.0, 5.0);
        let (_, stats) = trainer.step(tiny_model(), batch());

        // trg lengths 3 + 4 + 2 (each label ends with <eos>)
        assert_eq!(stats.tokens, 9.0);
        assert!((stats.cost / stats.tokens - stats.cost_per_token).abs() < 1e-4);
    }

    fn tiny_samples(n: usize) -> Vec<TranslationSample> {
        (0..n)
            .map(|i| {
                let a = 3 + (i % 5) as u32;
                TranslationSample::new(&[a, a + 1], &[3 + (i % 3) as u32, 4], 1, 2)
            })
            .collect()
    }

    #[test]
    fn test_one_epoch_writes_metrics_and_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().to_string_lossy()).unwrap();
        let cfg = TrainConfig {
            hidden_size:    8,
            decoder_layers: 1,
            src_vocab_size: 9,
            trg_vocab_size: 6,
            batch_size:     4,
            epochs:         1,
            dropout:        0.0,
            log_every:      0,
            ..TrainConfig::default()
        };

        train_loop::<TestBackend>(
            &cfg,
            TranslationDataset::new(tiny_samples(10)),
            TranslationDataset::new(tiny_samples(3)),
            &ckpt,
            &Default::default(),
        )
        .unwrap();

        let csv = std::fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("1,"));
        assert!(!lines[1].contains("NaN"), "row {}", lines[1]);

        assert!(dir.path().join("model_epoch_1.mpk").exists());
        let latest = std::fs::read_to_string(dir.path().join("latest_epoch.json")).unwrap();
        assert_eq!(latest.trim(), "1");
    }

    #[test]
    fn test_evaluate_weights_by_tokens() {
        let model = tiny_model().valid();
        let cost = evaluate(&model, std::iter::once(batch::<NdArray>()));
        assert!(cost.is_finite() && cost > 0.0);

        assert!(evaluate(&model, std::iter::empty()).is_nan());
    }
}
