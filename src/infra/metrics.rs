// ============================================================
// Layer 6 — Metrics
// ============================================================
// Epoch-level bookkeeping for training runs:
//
//   RunningAverage — sum / count over batches (NaN when empty)
//   CodebookUsage  — histogram of chosen codes → perplexity
//   EpochMetrics   — one row of results per epoch
//   TrainingHistory — every EpochMetrics of a run, for plotting
//   MetricsLogger  — writes the rows to metrics.csv
//
// Output file: checkpoints/metrics.csv
//
// Example CSV output:
//   epoch,train_loss,val_loss,train_ssim,val_ssim,val_perplexity
//   1,0.041200,0.038900,0.512300,0.540100,87.310000
//   2,0.021700,0.020300,0.688000,0.701500,141.020000
//   ...
//
// How to read the metrics:
//   - Loss should decrease each epoch (model is learning)
//   - SSIM should rise toward 1.0 as reconstructions sharpen
//   - If val_loss increases while train_loss decreases → overfitting
//   - Perplexity near 1 means the codebook has collapsed to a few codes
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

// ─── RunningAverage ───────────────────────────────────────────────────────────
/// Mean of values pushed one batch at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningAverage {
    sum:   f64,
    count: usize,
}

impl RunningAverage {
    pub fn new() -> Self { Self::default() }

    pub fn push(&mut self, value: f64) {
        self.sum   += value;
        self.count += 1;
    }

    pub fn count(&self) -> usize { self.count }

    /// NaN when nothing was pushed, so an empty epoch is visible
    /// instead of reported as a perfect score.
    pub fn mean(&self) -> f64 {
        if self.count > 0 { self.sum / self.count as f64 } else { f64::NAN }
    }
}

// ─── CodebookUsage ────────────────────────────────────────────────────────────
/// Counts how often each codebook entry is selected.
#[derive(Debug, Clone)]
pub struct CodebookUsage {
    counts: Vec<u64>,
}

impl CodebookUsage {
    pub fn new(num_embeddings: usize) -> Self {
        Self { counts: vec![0; num_embeddings] }
    }

    /// Out-of-range indices are ignored.
    pub fn record(&mut self, indices: impl IntoIterator<Item = i64>) {
        for i in indices {
            if let Some(c) = usize::try_from(i).ok().and_then(|i| self.counts.get_mut(i)) {
                *c += 1;
            }
        }
    }

    pub fn total(&self) -> u64 { self.counts.iter().sum() }

    /// Number of distinct codes selected at least once.
    pub fn codes_used(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    /// exp(−Σ p·ln p) over the code distribution; NaN when empty.
    pub fn perplexity(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return f64::NAN;
        }
        let entropy: f64 = self.counts
            .iter()
            .filter(|&&c| c > 0)
            .map(|&c| {
                let p = c as f64 / total as f64;
                -p * p.ln()
            })
            .sum();
        entropy.exp()
    }
}

// ─── EpochMetrics ─────────────────────────────────────────────────────────────
/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Average loss (reconstruction MSE + quantization loss) over training batches
    pub train_loss: f64,

    /// Average loss on the validation set
    pub val_loss: f64,

    /// Average SSIM over training batches, in [-1, 1], 1 = identical
    pub train_ssim: f64,

    /// Average SSIM on the validation set
    pub val_ssim: f64,

    /// Effective number of codebook entries used on the validation set
    pub val_perplexity: f64,
}

impl EpochMetrics {
    pub fn new(
        epoch:          usize,
        train_loss:     f64,
        val_loss:       f64,
        train_ssim:     f64,
        val_ssim:       f64,
        val_perplexity: f64,
    ) -> Self {
        Self { epoch, train_loss, val_loss, train_ssim, val_ssim, val_perplexity }
    }

    /// Returns true if this epoch improved over the previous best val_loss
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }
}

// ─── TrainingHistory ──────────────────────────────────────────────────────────
/// Per-epoch results of one run, in epoch order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochMetrics>,
}

impl TrainingHistory {
    pub fn push(&mut self, m: EpochMetrics) { self.epochs.push(m); }

    pub fn len(&self) -> usize { self.epochs.len() }

    pub fn is_empty(&self) -> bool { self.epochs.is_empty() }

    pub fn train_losses(&self) -> Vec<f64> { self.epochs.iter().map(|m| m.train_loss).collect() }
    pub fn val_losses(&self)   -> Vec<f64> { self.epochs.iter().map(|m| m.val_loss).collect() }
    pub fn train_ssims(&self)  -> Vec<f64> { self.epochs.iter().map(|m| m.train_ssim).collect() }
    pub fn val_ssims(&self)    -> Vec<f64> { self.epochs.iter().map(|m| m.val_ssim).collect() }

    /// Epoch with the lowest finite validation loss.
    pub fn best_epoch(&self) -> Option<&EpochMetrics> {
        let mut best: Option<&EpochMetrics> = None;
        for m in self.epochs.iter().filter(|m| m.val_loss.is_finite()) {
            if best.map_or(true, |b| m.is_improvement(b.val_loss)) {
                best = Some(m);
            }
        }
        best
    }
}

// ─── MetricsLogger ────────────────────────────────────────────────────────────
/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    /// Full path to the CSV file
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Start a fresh metrics.csv in `dir`, replacing any previous run.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "epoch,train_loss,val_loss,train_ssim,val_ssim,val_perplexity")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6}",
            m.epoch,
            m.train_loss,
            m.val_loss,
            m.train_ssim,
            m.val_ssim,
            m.val_perplexity,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );

        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics::new(2, 2.5, 2.3, 0.5, 0.5, 10.0);
        assert!(m.is_improvement(3.0));
        assert!(!m.is_improvement(2.0));
    }

    #[test]
    fn test_running_average() {
        let mut avg = RunningAverage::new();
        assert!(avg.mean().is_nan());
        avg.push(1.0);
        avg.push(3.0);
        assert_eq!(avg.count(), 2);
        assert_eq!(avg.mean(), 2.0);
    }

    #[test]
    fn test_perplexity_uniform_and_collapsed() {
        let mut uniform = CodebookUsage::new(4);
        uniform.record([0, 1, 2, 3, 0, 1, 2, 3]);
        assert!((uniform.perplexity() - 4.0).abs() < 1e-9);
        assert_eq!(uniform.codes_used(), 4);

        let mut collapsed = CodebookUsage::new(4);
        collapsed.record([2, 2, 2, -1, 9]);
        assert!((collapsed.perplexity() - 1.0).abs() < 1e-9);
        assert_eq!(collapsed.codes_used(), 1);
        assert_eq!(collapsed.total(), 3);

        assert!(CodebookUsage::new(4).perplexity().is_nan());
    }

    #[test]
    fn test_best_epoch_skips_nan() {
        let mut h = TrainingHistory::default();
        h.push(EpochMetrics::new(1, 1.0, f64::NAN, 0.1, f64::NAN, f64::NAN));
        h.push(EpochMetrics::new(2, 0.8, 0.5, 0.2, 0.3, 5.0));
        h.push(EpochMetrics::new(3, 0.6, 0.7, 0.3, 0.2, 5.0));
        assert_eq!(h.best_epoch().map(|m| m.epoch), Some(2));
        assert_eq!(h.train_losses(), vec![1.0, 0.8, 0.6]);
    }

    #[test]
    fn test_logger_writes_header_and_rows_fresh_each_run() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::create(dir.path()).unwrap();
        logger.log(&EpochMetrics::new(1, 0.5, 0.4, 0.6, 0.7, 12.0)).unwrap();

        // A second run starts over
        let logger = MetricsLogger::create(dir.path()).unwrap();
        logger.log(&EpochMetrics::new(1, 0.3, 0.2, 0.8, 0.9, 20.0)).unwrap();

        let text  = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "epoch,train_loss,val_loss,train_ssim,val_ssim,val_perplexity");
        assert_eq!(lines[1], "1,0.300000,0.200000,0.800000,0.900000,20.000000");
    }
}
