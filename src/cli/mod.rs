// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`    — trains the VQ-VAE on HipMRI slices
//   2. `evaluate` — scores a checkpoint on the test slices
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "hipmri-vqvae",
    version = "0.1.0",
    about = "Train a VQ-VAE on HipMRI slices and track reconstruction loss and SSIM."
)]
pub struct Cli {
    /// The subcommand to run (train or evaluate)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

/// Handles the `train` subcommand.
fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on slices in: {}", args.train_dir);

    let use_case = TrainUseCase::new(args.into());
    use_case.execute()
}

/// Handles the `evaluate` subcommand.
fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let report = EvaluateUseCase::new(args.into()).execute()?;

    println!("Test Loss: {:.4}", report.loss);
    println!("Test SSIM: {:.4}", report.ssim);
    println!(
        "Codebook usage: {} codes, perplexity {:.2}",
        report.codes_used, report.perplexity
    );
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_train_flags_map_to_config() {
        let cli = Cli::try_parse_from([
            "hipmri-vqvae", "train",
            "--train-dir", "/data/train",
            "--epochs", "5",
            "--num-embeddings", "128",
            "--image-height", "64",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.train_dir, "/data/train");
        assert_eq!(cfg.epochs, 5);
        assert_eq!(cfg.num_embeddings, 128);
        assert_eq!(cfg.image_height, 64);
        assert_eq!(cfg.image_width, 128);
        assert_eq!(cfg.checkpoint_every, 10);
    }

    #[test]
    fn test_evaluate_defaults_to_final_model() {
        let cli = Cli::try_parse_from(["hipmri-vqvae", "evaluate", "--checkpoint-dir", "runs/a"]).unwrap();
        let Commands::Evaluate(args) = cli.command else { panic!("expected evaluate") };
        assert_eq!(args.checkpoint_dir, std::path::PathBuf::from("runs/a"));
        assert!(args.epoch.is_none() && args.test_dir.is_none());
    }
}
