// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores VQ-VAE weights using Burn's CompactRecorder.
//
// File naming convention:
//   checkpoints/
//     train_config.json             ← architecture + hyperparameters
//     vqvae_model_epoch_10.mpk.gz   ← every `checkpoint_every` epochs
//     vqvae_model_epoch_20.mpk.gz
//     ...
//     vqvae_final_model.mpk.gz      ← after the last epoch
//
// The config is written before training starts. Evaluation reads
// it to rebuild the exact model before loading weights into it;
// loading fails if the architecture doesn't match the record.
//
// Burn's CompactRecorder:
//   - Serialises model parameters to MessagePack format
//   - Stores floats at half precision
//   - Compresses with gzip
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::VqVae;

/// Which saved weights to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointSelection {
    Final,
    Epoch(usize),
}

impl CheckpointSelection {
    /// File stem, without the extension the recorder adds.
    pub fn file_stem(self) -> String {
        match self {
            Self::Final        => "vqvae_final_model".to_string(),
            Self::Epoch(epoch) => format!("vqvae_model_epoch_{epoch}"),
        }
    }
}

impl From<Option<usize>> for CheckpointSelection {
    fn from(epoch: Option<usize>) -> Self {
        epoch.map_or(Self::Final, Self::Epoch)
    }
}

/// True when `epoch` (1-based) falls on the save interval.
pub fn is_checkpoint_epoch(epoch: usize, every: usize) -> bool {
    every > 0 && epoch % every == 0
}

/// Manages saving and loading of model checkpoints.
/// All files are stored in the configured directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Open an existing checkpoint directory without creating it.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            anyhow::bail!(
                "Checkpoint directory '{}' not found. Have you run 'train' first?",
                dir.display()
            );
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the recorder writes for `selection`, including extension.
    pub fn model_path(&self, selection: CheckpointSelection) -> PathBuf {
        self.dir.join(format!("{}.mpk.gz", selection.file_stem()))
    }

    /// Save model weights after `epoch`.
    pub fn save_model<B: Backend>(&self, model: &VqVae<B>, epoch: usize) -> Result<()> {
        self.save(model, CheckpointSelection::Epoch(epoch))
    }

    /// Save the weights at the end of training.
    pub fn save_final<B: Backend>(&self, model: &VqVae<B>) -> Result<()> {
        self.save(model, CheckpointSelection::Final)
    }

    fn save<B: Backend>(&self, model: &VqVae<B>, selection: CheckpointSelection) -> Result<()> {
        // Build the file path (without extension — recorder adds it)
        let path = self.dir.join(selection.file_stem());

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| {
                format!("Failed to save checkpoint to '{}'", path.display())
            })?;

        tracing::debug!("Saved checkpoint: {:?}", selection);
        Ok(())
    }

    /// Load weights into `model`, which must have the saved architecture.
    pub fn load_model<B: Backend>(
        &self,
        model:     VqVae<B>,
        selection: CheckpointSelection,
        device:    &B::Device,
    ) -> Result<VqVae<B>> {
        let path = self.dir.join(selection.file_stem());
        tracing::info!("Loading checkpoint '{}'", path.display());

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display())
            })?;

        Ok(model.load_record(record))
    }

    /// Save the training configuration to JSON.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| {
                format!("Cannot write config to '{}'", path.display())
            })?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Load the training configuration from JSON.
    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");

        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read config from '{}'. \
                     Make sure you have run 'train' before 'evaluate'.",
                    path.display()
                )
            })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config '{}'", path.display()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use serial_test::serial;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    #[test]
    fn test_checkpoint_schedule() {
        let saved: Vec<usize> = (1..=25).filter(|&e| is_checkpoint_epoch(e, 10)).collect();
        assert_eq!(saved, vec![10, 20]);
        assert!(!is_checkpoint_epoch(5, 0));
    }

    #[test]
    fn test_selection_file_names() {
        assert_eq!(CheckpointSelection::from(None), CheckpointSelection::Final);
        assert_eq!(CheckpointSelection::Epoch(30).file_stem(), "vqvae_model_epoch_30");
        assert_eq!(CheckpointSelection::Final.file_stem(), "vqvae_final_model");
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path()).unwrap();
        let mut cfg = TrainConfig::default();
        cfg.epochs = 7;
        mgr.save_config(&cfg).unwrap();
        assert_eq!(mgr.load_config().unwrap().epochs, 7);
    }

    #[test]
    fn test_open_missing_directory_fails() {
        assert!(CheckpointManager::open("/no/such/checkpoints").is_err());
    }

    #[test]
    #[serial]
    fn test_save_and_reload_model() {
        let dir    = tempfile::tempdir().unwrap();
        let mgr    = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let cfg    = crate::ml::model::VqVaeConfig::new(1, 4, 2, 1, 8, 2, 0.25);

        let model: VqVae<TestBackend> = cfg.init(&device);
        mgr.save_model(&model, 3).unwrap();
        mgr.save_final(&model).unwrap();
        assert!(mgr.model_path(CheckpointSelection::Epoch(3)).exists());
        assert!(mgr.model_path(CheckpointSelection::Final).exists());

        let fresh: VqVae<TestBackend> = cfg.init(&device);
        let loaded = mgr.load_model(fresh, CheckpointSelection::Final, &device).unwrap();

        let images = Tensor::<TestBackend, 4>::random([1, 1, 8, 8], Distribution::Uniform(0.0, 1.0), &device);
        let a = model.forward(images.clone()).indices.into_data();
        let b = loaded.forward(images).indices.into_data();
        assert_eq!(a.shape, b.shape);

        assert!(mgr.load_model(cfg.init::<TestBackend>(&device), CheckpointSelection::Epoch(99), &device).is_err());
    }
}
