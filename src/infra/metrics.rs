// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per epoch:
//
//   epoch,train_cost_per_token,val_cost_per_token,val_perplexity,max_grad_norm
//   1,6.912345,6.701234,813.210000,41.200000
//   2,5.803311,5.720019,304.870000,12.900000
//
// How to read it:
//   - cost_per_token is the masked cross-entropy per target token
//   - perplexity = exp(cost_per_token); a uniform guess over V
//     target words scores exactly V
//   - max_grad_norm is the largest PRE-clip global gradient norm of
//     the epoch; values far above the clip threshold early on are
//     normal, persistent ones suggest a too-large learning rate
//
// Output file: checkpoints/metrics.csv

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};
use serde::{Deserialize, Serialize};

const HEADER: &str = "epoch,train_cost_per_token,val_cost_per_token,val_perplexity,max_grad_norm";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:                usize,
    pub train_cost_per_token: f64,
    pub val_cost_per_token:   f64,
    pub val_perplexity:       f64,
    pub max_grad_norm:        f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_cost_per_token: f64, val_cost_per_token: f64, max_grad_norm: f64) -> Self {
        Self {
            epoch,
            train_cost_per_token,
            val_cost_per_token,
            val_perplexity: perplexity(val_cost_per_token),
            max_grad_norm,
        }
    }

    pub fn is_improvement(&self, best_val_cost: f64) -> bool {
        self.val_cost_per_token < best_val_cost
    }
}

/// exp(cost per token); NaN stays NaN so an empty validation set is visible.
pub fn perplexity(cost_per_token: f64) -> f64 {
    cost_per_token.exp()
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet, so reruns append.
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch,
            m.train_cost_per_token,
            m.val_cost_per_token,
            m.val_perplexity,
            m.max_grad_norm,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train={:.4}, val={:.4}, ppl={:.2}",
            m.epoch,
            m.train_cost_per_token,
            m.val_cost_per_token,
            m.val_perplexity,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
