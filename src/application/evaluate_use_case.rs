// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Scores a saved checkpoint on held-out slices:
//
//   Step 1: Open checkpoint dir, rebuild the model from
//           train_config.json and load the chosen weights
//   Step 2: Resolve test dir / batch size from that config
//   Step 3: Load test slices with the same preprocessing
//   Step 4: Report loss, SSIM and codebook usage

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::application::train_use_case::{load_samples, TrainConfig};
use crate::data::dataset::SliceDataset;
use crate::infra::checkpoint::{CheckpointManager, CheckpointSelection};
use crate::ml::evaluator::{EvaluationReport, Evaluator};

type EvalBackend = burn::backend::Wgpu;

#[derive(Debug, Clone)]
pub struct EvaluateRequest {
    pub checkpoint_dir: PathBuf,
    /// Overrides the test directory stored in the training config
    pub test_dir:       Option<String>,
    /// Epoch checkpoint to load; the final model when None
    pub epoch:          Option<usize>,
    pub batch_size:     Option<usize>,
}

pub struct EvaluateUseCase {
    request: EvaluateRequest,
}

impl EvaluateUseCase {
    pub fn new(request: EvaluateRequest) -> Self {
        Self { request }
    }

    pub fn execute(&self) -> Result<EvaluationReport> {
        let req = &self.request;

        // ── Step 1: Checkpoint + model ────────────────────────────────────────
        let ckpt_manager = CheckpointManager::open(&req.checkpoint_dir)?;
        let selection    = CheckpointSelection::from(req.epoch);
        let device       = burn::backend::wgpu::WgpuDevice::default();
        let evaluator    = Evaluator::<EvalBackend>::from_checkpoint(&ckpt_manager, selection, device)?;

        // ── Step 2: Settings saved with the run ───────────────────────────────
        let (test_dir, batch_size) = resolve_settings(req, evaluator.config());

        // ── Step 3: Test slices ───────────────────────────────────────────────
        tracing::info!("Loading test slices from '{}'", test_dir);
        let samples = load_samples(&test_dir, &evaluator.config().preprocessor())?;
        if samples.is_empty() {
            bail!("No test slices found in '{}'", test_dir);
        }
        let sample_count = samples.len();

        // ── Step 4: Score ─────────────────────────────────────────────────────
        let report = evaluator.evaluate(SliceDataset::new(samples), batch_size);
        tracing::info!("Evaluated {} slices in {} batches", sample_count, report.batches);
        Ok(report)
    }
}

/// Request overrides win over the values stored with the checkpoint.
fn resolve_settings(req: &EvaluateRequest, cfg: &TrainConfig) -> (String, usize) {
    let test_dir   = req.test_dir.clone().unwrap_or_else(|| cfg.test_dir.clone());
    let batch_size = req.batch_size.unwrap_or(cfg.batch_size).max(1);
    (test_dir, batch_size)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn request(test_dir: Option<&str>, batch_size: Option<usize>) -> EvaluateRequest {
        EvaluateRequest {
            checkpoint_dir: PathBuf::from("checkpoints"),
            test_dir:       test_dir.map(str::to_string),
            epoch:          None,
            batch_size,
        }
    }

    #[test]
    fn test_settings_default_to_saved_config() {
        let mut cfg = TrainConfig::default();
        cfg.test_dir   = "data/keras_slices_test".to_string();
        cfg.batch_size = 8;

        let (dir, batch) = resolve_settings(&request(None, None), &cfg);
        assert_eq!(dir, "data/keras_slices_test");
        assert_eq!(batch, 8);
    }

    #[test]
    fn test_request_overrides_saved_config() {
        let cfg = TrainConfig::default();
        let (dir, batch) = resolve_settings(&request(Some("other"), Some(0)), &cfg);
        assert_eq!(dir, "other");
        assert_eq!(batch, 1);
    }

    #[test]
    fn test_missing_checkpoint_dir_fails() {
        let mut req = request(None, None);
        req.checkpoint_dir = PathBuf::from("/no/such/checkpoints");
        assert!(EvaluateUseCase::new(req).execute().is_err());
    }
}
