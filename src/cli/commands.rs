// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `evaluate`
// and all their configurable flags.
//
// Data and checkpoint directories can also come from the
// environment (HIPMRI_TRAIN_DIR, HIPMRI_VAL_DIR, HIPMRI_TEST_DIR,
// HIPMRI_CHECKPOINT_DIR); an explicit flag wins over the variable.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::{
    evaluate_use_case::EvaluateRequest,
    train_use_case::TrainConfig,
};

const TRAIN_DIR: &str = "/home/groups/comp3710/HipMRI_Study_open/keras_slices_data/keras_slices_train";
const VAL_DIR:   &str = "/home/groups/comp3710/HipMRI_Study_open/keras_slices_data/keras_slices_validate";
const TEST_DIR:  &str = "/home/groups/comp3710/HipMRI_Study_open/keras_slices_data/keras_slices_test";

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the VQ-VAE on HipMRI slices
    Train(TrainArgs),

    /// Score a saved checkpoint on the test slices
    Evaluate(EvaluateArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory of training slices (.nii / .nii.gz)
    #[arg(long, env = "HIPMRI_TRAIN_DIR", default_value = TRAIN_DIR)]
    pub train_dir: String,

    /// Directory of validation slices
    #[arg(long, env = "HIPMRI_VAL_DIR", default_value = VAL_DIR)]
    pub val_dir: String,

    /// Directory of test slices, recorded for `evaluate`
    #[arg(long, env = "HIPMRI_TEST_DIR", default_value = TEST_DIR)]
    pub test_dir: String,

    /// Where checkpoints, metrics.csv and the plot are written
    #[arg(long, env = "HIPMRI_CHECKPOINT_DIR", default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 100)]
    pub epochs: usize,

    /// Number of slices processed together in one forward pass
    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    /// Number of codebook entries
    #[arg(long, default_value_t = 512)]
    pub num_embeddings: usize,

    /// Size of each codebook vector
    #[arg(long, default_value_t = 64)]
    pub embedding_dim: usize,

    /// Weight of the commitment term in the quantization loss
    #[arg(long, default_value_t = 0.25)]
    pub commitment_cost: f64,

    /// Residual blocks in each of the encoder and decoder stacks
    #[arg(long, default_value_t = 2)]
    pub num_res_layers: usize,

    /// Channels after the second encoder convolution (must be even)
    #[arg(long, default_value_t = 64)]
    pub hidden_channels: usize,

    /// Bottleneck channels inside each residual block
    #[arg(long, default_value_t = 32)]
    pub residual_channels: usize,

    /// Slices are cropped/padded to this height (multiple of 4)
    #[arg(long, default_value_t = 256)]
    pub image_height: usize,

    /// Slices are cropped/padded to this width (multiple of 4)
    #[arg(long, default_value_t = 128)]
    pub image_width: usize,

    /// Save a checkpoint every N epochs
    #[arg(long, default_value_t = 10)]
    pub checkpoint_every: usize,

    /// Share of training slices held out when the validation dir is empty
    #[arg(long, default_value_t = 0.1)]
    pub val_fraction: f64,

    /// Seed for data shuffling and the fallback split
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            train_dir:         a.train_dir,
            val_dir:           a.val_dir,
            test_dir:          a.test_dir,
            checkpoint_dir:    a.checkpoint_dir,
            epochs:            a.epochs,
            batch_size:        a.batch_size,
            lr:                a.lr,
            num_embeddings:    a.num_embeddings,
            embedding_dim:     a.embedding_dim,
            commitment_cost:   a.commitment_cost,
            num_res_layers:    a.num_res_layers,
            hidden_channels:   a.hidden_channels,
            residual_channels: a.residual_channels,
            image_height:      a.image_height,
            image_width:       a.image_width,
            checkpoint_every:  a.checkpoint_every,
            val_fraction:      a.val_fraction,
            seed:              a.seed,
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory where checkpoints were saved during training
    #[arg(long, env = "HIPMRI_CHECKPOINT_DIR", default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Test slices; defaults to the directory recorded at training time
    #[arg(long)]
    pub test_dir: Option<String>,

    /// Load this epoch's checkpoint instead of the final model
    #[arg(long)]
    pub epoch: Option<usize>,

    /// Defaults to the training batch size
    #[arg(long)]
    pub batch_size: Option<usize>,
}

impl From<EvaluateArgs> for EvaluateRequest {
    fn from(a: EvaluateArgs) -> Self {
        EvaluateRequest {
            checkpoint_dir: a.checkpoint_dir,
            test_dir:       a.test_dir,
            epoch:          a.epoch,
            batch_size:     a.batch_size,
        }
    }
}
