// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the configuration
//   Step 2: Load training slices       (Layer 4 - data)
//   Step 3: Load validation slices     (Layer 4 - data)
//           falling back to a seeded split of the training set
//   Step 4: Build datasets             (Layer 4 - data)
//   Step 5: Save config                (Layer 6 - infra)
//   Step 6: Run training loop          (Layer 5 - ml)
//   Step 7: Plot loss / SSIM curves    (Layer 6 - infra)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::{SliceDataset, SliceSample},
    loader::NiftiSliceLoader,
    preprocessor::SlicePreprocessor,
    splitter::split_train_val,
};
use crate::domain::{slice::MriSlice, traits::SliceSource};
use crate::infra::{checkpoint::CheckpointManager, plot::plot_losses_and_ssim};
use crate::ml::{model::VqVaeConfig, ssim::SsimConfig, trainer::run_training};

const DATA_ROOT: &str = "/home/groups/comp3710/HipMRI_Study_open/keras_slices_data";

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Serialisable so it can be saved to disk and reloaded for evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub train_dir:         String,
    pub val_dir:           String,
    pub test_dir:          String,
    pub checkpoint_dir:    String,
    pub epochs:            usize,
    pub batch_size:        usize,
    pub lr:                f64,
    pub num_embeddings:    usize,
    pub embedding_dim:     usize,
    pub commitment_cost:   f64,
    pub num_res_layers:    usize,
    pub hidden_channels:   usize,
    pub residual_channels: usize,
    pub image_height:      usize,
    pub image_width:       usize,
    pub checkpoint_every:  usize,
    pub val_fraction:      f64,
    pub seed:              u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            train_dir:         format!("{DATA_ROOT}/keras_slices_train"),
            val_dir:           format!("{DATA_ROOT}/keras_slices_validate"),
            test_dir:          format!("{DATA_ROOT}/keras_slices_test"),
            checkpoint_dir:    "checkpoints".to_string(),
            epochs:            100,
            batch_size:        16,
            lr:                1e-4,
            num_embeddings:    512,
            embedding_dim:     64,
            commitment_cost:   0.25,
            num_res_layers:    2,
            hidden_channels:   64,
            residual_channels: 32,
            image_height:      256,
            image_width:       128,
            checkpoint_every:  10,
            val_fraction:      0.1,
            seed:              42,
        }
    }
}

impl TrainConfig {
    /// Single-channel VQ-VAE with this run's hyperparameters.
    pub fn model_config(&self) -> VqVaeConfig {
        VqVaeConfig::new(
            1,
            self.hidden_channels,
            self.residual_channels,
            self.num_res_layers,
            self.num_embeddings,
            self.embedding_dim,
            self.commitment_cost,
        )
    }

    pub fn preprocessor(&self) -> SlicePreprocessor {
        SlicePreprocessor::new(self.image_height, self.image_width)
    }

    /// Reject settings that would fail deep inside the training loop.
    pub fn validate(&self) -> Result<()> {
        let window = SsimConfig::default().window_size;

        if self.epochs == 0 {
            bail!("epochs must be at least 1");
        }
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if self.checkpoint_every == 0 {
            bail!("checkpoint_every must be at least 1");
        }
        if !(self.lr > 0.0 && self.lr.is_finite()) {
            bail!("learning rate must be positive, got {}", self.lr);
        }
        for (name, side) in [("image_height", self.image_height), ("image_width", self.image_width)] {
            // Two stride-2 convolutions down, two transposed convolutions up
            if side % 4 != 0 {
                bail!("{name} must be a multiple of 4, got {side}");
            }
            if side < window {
                bail!("{name} must be at least the SSIM window ({window}), got {side}");
            }
        }
        if !(0.0..1.0).contains(&self.val_fraction) {
            bail!("val_fraction must be in [0, 1), got {}", self.val_fraction);
        }
        if self.hidden_channels < 2 || self.hidden_channels % 2 != 0 {
            bail!("hidden_channels must be even and at least 2, got {}", self.hidden_channels);
        }
        if self.num_embeddings == 0 || self.embedding_dim == 0 || self.residual_channels == 0 {
            bail!("num_embeddings, embedding_dim and residual_channels must be non-zero");
        }
        Ok(())
    }
}

/// Load every slice under `dir` and preprocess to the training shape.
pub fn load_samples(dir: &str, preprocessor: &SlicePreprocessor) -> Result<Vec<SliceSample>> {
    let slices: Vec<MriSlice> = NiftiSliceLoader::new(dir).load_all()?;
    Ok(slices
        .iter()
        .map(|s| SliceSample::from_slice(s, preprocessor))
        .collect())
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1: Validate configuration ────────────────────────────────────
        cfg.validate()?;

        // ── Step 2: Load training slices ──────────────────────────────────────
        let preprocessor = cfg.preprocessor();
        tracing::info!("Loading training slices from '{}'", cfg.train_dir);
        let train_samples = load_samples(&cfg.train_dir, &preprocessor)?;
        if train_samples.is_empty() {
            bail!("No training slices found in '{}'", cfg.train_dir);
        }

        // ── Step 3: Load validation slices ────────────────────────────────────
        tracing::info!("Loading validation slices from '{}'", cfg.val_dir);
        let val_samples = load_samples(&cfg.val_dir, &preprocessor)?;
        let (train_samples, val_samples) = resolve_validation(train_samples, val_samples, cfg)?;
        tracing::info!(
            "Split: {} train, {} validation",
            train_samples.len(),
            val_samples.len()
        );

        // ── Step 4: Build Burn datasets ───────────────────────────────────────
        let train_dataset = SliceDataset::new(train_samples);
        let val_dataset   = SliceDataset::new(val_samples);

        // ── Step 5: Save config for evaluation ────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.save_config(cfg)?;

        // ── Step 6: Run training loop (Layer 5) ───────────────────────────────
        let history = run_training(cfg, train_dataset, val_dataset, &ckpt_manager)?;

        if let Some(best) = history.best_epoch() {
            tracing::info!(
                "Best validation loss {:.4} at epoch {} (SSIM {:.4})",
                best.val_loss, best.epoch, best.val_ssim
            );
        }

        // ── Step 7: Plot curves ───────────────────────────────────────────────
        plot_losses_and_ssim(&ckpt_manager.dir().join("loss_ssim_plot.svg"), &history)?;

        Ok(())
    }
}

/// Use the validation directory when it has slices; otherwise carve
/// `val_fraction` out of the training set. Training must keep at least
/// one slice.
fn resolve_validation(
    train: Vec<SliceSample>,
    val:   Vec<SliceSample>,
    cfg:   &TrainConfig,
) -> Result<(Vec<SliceSample>, Vec<SliceSample>)> {
    if !val.is_empty() || cfg.val_fraction == 0.0 {
        return Ok((train, val));
    }
    if train.len() < 2 {
        bail!(
            "No validation slices in '{}' and only {} training slice(s) to split",
            cfg.val_dir,
            train.len()
        );
    }
    tracing::warn!(
        "No validation slices in '{}'; holding out {:.0}% of the training set",
        cfg.val_dir,
        cfg.val_fraction * 100.0
    );
    Ok(split_train_val(train, 1.0 - cfg.val_fraction, cfg.seed))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SliceSample {
        SliceSample { pixels: vec![0.0; 4], height: 2, width: 2 }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(TrainConfig::default().validate().is_ok());
    }

    fn assert_rejected(tweak: impl Fn(&mut TrainConfig)) {
        let mut cfg = TrainConfig::default();
        tweak(&mut cfg);
        assert!(cfg.validate().is_err(), "{cfg:?}");
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        assert_rejected(|c| c.epochs = 0);
        assert_rejected(|c| c.batch_size = 0);
        assert_rejected(|c| c.checkpoint_every = 0);
        assert_rejected(|c| c.lr = 0.0);
        assert_rejected(|c| c.image_height = 130);
        assert_rejected(|c| c.image_width = 8);
        assert_rejected(|c| c.val_fraction = 1.0);
        assert_rejected(|c| c.hidden_channels = 3);
    }

    #[test]
    fn test_validation_falls_back_to_split() {
        let cfg = TrainConfig::default();
        let (train, val) = resolve_validation(vec![sample(); 20], Vec::new(), &cfg).unwrap();
        assert_eq!((train.len(), val.len()), (18, 2));

        let (train, val) = resolve_validation(vec![sample(); 20], vec![sample(); 3], &cfg).unwrap();
        assert_eq!((train.len(), val.len()), (20, 3));
    }

    #[test]
    fn test_fallback_split_never_empties_training() {
        let mut cfg = TrainConfig::default();
        cfg.val_fraction = 0.6;
        assert!(resolve_validation(vec![sample()], Vec::new(), &cfg).is_err());

        let (train, val) = resolve_validation(vec![sample(); 2], Vec::new(), &cfg).unwrap();
        assert_eq!((train.len(), val.len()), (1, 1));

        cfg.val_fraction = 0.1;
        let (train, val) = resolve_validation(vec![sample(); 3], Vec::new(), &cfg).unwrap();
        assert_eq!((train.len(), val.len()), (2, 1));
    }

    #[test]
    fn test_load_samples_from_missing_dir_is_empty() {
        let p = TrainConfig::default().preprocessor();
        assert!(load_samples("/no/such/slices", &p).unwrap().is_empty());
    }

    #[test]
    fn test_empty_training_set_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = TrainConfig::default();
        cfg.train_dir      = dir.path().join("train").display().to_string();
        cfg.val_dir        = dir.path().join("val").display().to_string();
        cfg.checkpoint_dir = dir.path().join("ckpt").display().to_string();
        let err = TrainUseCase::new(cfg).execute().unwrap_err();
        assert!(err.to_string().contains("No training slices"));
    }
}
