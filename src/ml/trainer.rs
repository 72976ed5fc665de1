// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Full train + validation loop using Burn's DataLoader and Adam.
//
// Key Burn insight:
//   - Training uses MyBackend (Autodiff<Wgpu>) for gradients
//   - model.valid() returns the model on MyInnerBackend (Wgpu)
//   - Validation batcher must also use the inner backend
//   - Training SSIM is computed on .inner() tensors so the
//     metric never joins the autodiff graph
//
// Per epoch:
//   1. train: forward → loss → backward → Adam step
//   2. print average training loss / SSIM
//   3. validate: loss, SSIM, codebook usage
//   4. checkpoint every `checkpoint_every` epochs
//   5. append to metrics.csv and the in-memory history
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use indicatif::{ProgressBar, ProgressStyle};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::SliceBatcher, dataset::SliceDataset};
use crate::infra::{
    checkpoint::{is_checkpoint_epoch, CheckpointManager},
    metrics::{EpochMetrics, MetricsLogger, RunningAverage, TrainingHistory},
};
use crate::ml::{
    evaluator::evaluate_model,
    model::VqVae,
    ssim::{ssim, SsimConfig},
};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: SliceDataset,
    val_dataset:   SliceDataset,
    ckpt_manager:  &CheckpointManager,
) -> Result<TrainingHistory> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<MyBackend>(cfg, train_dataset, val_dataset, ckpt_manager, device)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    train_dataset: SliceDataset,
    val_dataset:   SliceDataset,
    ckpt_manager:  &CheckpointManager,
    device:        B::Device,
) -> Result<TrainingHistory> {

    // ── Build model ───────────────────────────────────────────────────────────
    // Seed the backend RNG so weight and codebook init repeat across runs
    B::seed(cfg.seed);
    let mut model: VqVae<B> = cfg.model_config().init(&device);
    tracing::info!(
        "Model ready: hidden={}, codebook={}x{}, res_layers={}",
        cfg.hidden_channels, cfg.num_embeddings, cfg.embedding_dim, cfg.num_res_layers,
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    let num_train_batches = train_dataset.batch_count(cfg.batch_size);
    tracing::info!(
        "Training on {} slices ({} batches/epoch), validating on {}",
        train_dataset.sample_count(), num_train_batches, val_dataset.sample_count(),
    );

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_loader = DataLoaderBuilder::new(SliceBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_dataset);

    // ── Validation data loader (InnerBackend — no autodiff overhead) ──────────
    let val_loader = DataLoaderBuilder::new(SliceBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    let ssim_cfg = SsimConfig::default();
    let logger   = MetricsLogger::create(ckpt_manager.dir())?;
    let mut history = TrainingHistory::default();

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let progress = ProgressBar::new(num_train_batches as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("Epoch {msg} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len}")?,
        );
        progress.set_message(format!("{}/{}", epoch, cfg.epochs));

        let mut train_loss = RunningAverage::new();
        let mut train_ssim = RunningAverage::new();

        for batch in train_loader.iter() {
            let (loss, output) = model.forward_loss(batch.images.clone());

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            let ssim_val: f64 = ssim(output.reconstructed.inner(), batch.images.inner(), &ssim_cfg)
                .into_scalar()
                .elem::<f64>();
            train_loss.push(loss_val);
            train_ssim.push(ssim_val);

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);

            progress.inc(1);
        }
        progress.finish_and_clear();

        println!(
            "Epoch [{}/{}], Average Training Loss: {:.4}, Average Training SSIM: {:.4}",
            epoch, cfg.epochs, train_loss.mean(), train_ssim.mean(),
        );

        // ── Validation phase ──────────────────────────────────────────────────
        // model.valid() → VqVae<B::InnerBackend>, no gradient tracking
        let model_valid = model.valid();
        let val = evaluate_model(&model_valid, val_loader.iter(), &ssim_cfg);

        println!(
            "Epoch [{}/{}], Average Validation Loss: {:.4}, Average Validation SSIM: {:.4}",
            epoch, cfg.epochs, val.loss, val.ssim,
        );
        tracing::debug!(
            "Epoch {} codebook: {} codes used, perplexity {:.2}",
            epoch, val.codes_used, val.perplexity,
        );

        if is_checkpoint_epoch(epoch, cfg.checkpoint_every) {
            ckpt_manager.save_model(&model, epoch)?;
            println!("Model saved at epoch {}.", epoch);
        }

        let metrics = EpochMetrics::new(
            epoch,
            train_loss.mean(),
            val.loss,
            train_ssim.mean(),
            val.ssim,
            val.perplexity,
        );
        logger.log(&metrics)?;
        history.push(metrics);
    }

    ckpt_manager.save_final(&model)?;
    println!("Final model saved.");

    tracing::info!("Training complete!");
    Ok(history)
}
