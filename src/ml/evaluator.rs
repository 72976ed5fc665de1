// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Runs a model over batches without gradients and reports:
//
//   loss        — mean of MSE(recon, image) + quantization loss
//   ssim        — mean SSIM between reconstructions and inputs
//   perplexity  — effective number of codebook entries used
//   codes_used  — distinct codebook entries used
//
// The same routine serves per-epoch validation (called with
// model.valid()) and the standalone test-set evaluation that
// rebuilds the model from a checkpoint.

use anyhow::Result;
use burn::{data::dataloader::DataLoaderBuilder, prelude::*};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{SliceBatch, SliceBatcher},
    dataset::SliceDataset,
};
use crate::infra::{
    checkpoint::{CheckpointManager, CheckpointSelection},
    metrics::{CodebookUsage, RunningAverage},
};
use crate::ml::{
    model::{loss_fn, VqVae},
    ssim::{ssim, SsimConfig},
};

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub loss:       f64,
    pub ssim:       f64,
    pub perplexity: f64,
    pub codes_used: usize,
    pub batches:    usize,
}

/// Average loss / SSIM and codebook usage over `batches`.
/// With no batches every average is NaN.
pub fn evaluate_model<B: Backend>(
    model:       &VqVae<B>,
    batches:     impl IntoIterator<Item = SliceBatch<B>>,
    ssim_config: &SsimConfig,
) -> EvaluationReport {
    let mut loss      = RunningAverage::new();
    let mut ssim_avg  = RunningAverage::new();
    let mut usage     = CodebookUsage::new(model.quantizer.num_embeddings());

    for batch in batches {
        let output = model.forward(batch.images.clone());

        let batch_ssim: f64 = ssim(output.reconstructed.clone(), batch.images.clone(), ssim_config)
            .into_scalar()
            .elem::<f64>();
        let batch_loss: f64 = loss_fn(output.reconstructed, batch.images, output.quantization_loss)
            .into_scalar()
            .elem::<f64>();

        loss.push(batch_loss);
        ssim_avg.push(batch_ssim);
        usage.record(output.indices.into_data().iter::<i64>());
    }

    EvaluationReport {
        loss:       loss.mean(),
        ssim:       ssim_avg.mean(),
        perplexity: usage.perplexity(),
        codes_used: usage.codes_used(),
        batches:    loss.count(),
    }
}

// ─── Evaluator ────────────────────────────────────────────────────────────────
/// A trained model rebuilt from a checkpoint directory.
pub struct Evaluator<B: Backend> {
    model:  VqVae<B>,
    config: TrainConfig,
    device: B::Device,
}

impl<B: Backend> Evaluator<B> {
    /// Rebuild the architecture from train_config.json, then load weights.
    pub fn from_checkpoint(
        ckpt_manager: &CheckpointManager,
        selection:    CheckpointSelection,
        device:       B::Device,
    ) -> Result<Self> {
        let config = ckpt_manager.load_config()?;
        let model: VqVae<B> = config.model_config().init(&device);
        let model = ckpt_manager.load_model(model, selection, &device)?;
        tracing::info!("Model loaded from checkpoint ({:?})", selection);
        Ok(Self { model, config, device })
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn evaluate(&self, dataset: SliceDataset, batch_size: usize) -> EvaluationReport {
        let loader = DataLoaderBuilder::new(SliceBatcher::<B>::new(self.device.clone()))
            .batch_size(batch_size)
            .num_workers(1)
            .build(dataset);
        evaluate_model(&self.model, loader.iter(), &SsimConfig::default())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::SliceSample;
    use crate::ml::model::VqVaeConfig;
    use burn::backend::NdArray;
    use serial_test::serial;

    type TestBackend = NdArray;

    fn samples(n: usize) -> Vec<SliceSample> {
        (0..n)
            .map(|i| SliceSample {
                pixels: (0..16 * 16).map(|p| ((p + i) % 7) as f32 / 6.0).collect(),
                height: 16,
                width:  16,
            })
            .collect()
    }

    #[test]
    #[serial]
    fn test_empty_input_gives_nan_report() {
        let device = Default::default();
        let model: VqVae<TestBackend> = VqVaeConfig::new(1, 4, 2, 1, 8, 2, 0.25).init(&device);
        let report = evaluate_model(&model, Vec::new(), &SsimConfig::default());
        assert_eq!(report.batches, 0);
        assert!(report.loss.is_nan() && report.ssim.is_nan() && report.perplexity.is_nan());
    }

    #[test]
    #[serial]
    fn test_evaluator_from_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path()).unwrap();

        let mut cfg = TrainConfig::default();
        cfg.hidden_channels   = 4;
        cfg.residual_channels = 2;
        cfg.num_res_layers    = 1;
        cfg.num_embeddings    = 8;
        cfg.embedding_dim     = 2;
        mgr.save_config(&cfg).unwrap();

        let device = Default::default();
        let model: VqVae<TestBackend> = cfg.model_config().init(&device);
        mgr.save_final(&model).unwrap();

        let evaluator = Evaluator::<TestBackend>::from_checkpoint(&mgr, CheckpointSelection::Final, device)
            .unwrap();
        assert_eq!(evaluator.config().num_embeddings, 8);
        assert_eq!(evaluator.config().test_dir, cfg.test_dir);
        let report = evaluator.evaluate(SliceDataset::new(samples(5)), 2);

        assert_eq!(report.batches, 3);
        assert!(report.loss.is_finite() && report.loss >= 0.0);
        assert!(report.ssim.is_finite() && report.ssim <= 1.0);
        assert!((1..=8).contains(&report.codes_used));
        assert!(report.perplexity >= 1.0 - 1e-9);
    }
}
