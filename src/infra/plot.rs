// ============================================================
// Layer 6 — Loss / SSIM Plot
// ============================================================
// Draws one chart with two y-axes:
//
//   left  axis: training loss (blue), validation loss (orange)
//   right axis: training SSIM (green), validation SSIM (red)
//
// Written as SVG so text rendering needs no system fonts.
// Epochs with a NaN average (no batches) are left out of the
// lines rather than drawn at a fake value.
//
// Loss falls toward the bottom and SSIM climbs toward the top of
// the right edge, so the shared legend sits middle-right.

use anyhow::{anyhow, Result};
use plotters::prelude::*;
use std::{ops::Range, path::Path};

use crate::infra::metrics::TrainingHistory;

const ORANGE: RGBColor = RGBColor(255, 165, 0);

pub fn plot_losses_and_ssim(path: &Path, history: &TrainingHistory) -> Result<()> {
    draw(path, history)
        .map_err(|e| anyhow!("Failed to draw plot '{}': {}", path.display(), e))?;
    tracing::info!("Saved loss/SSIM plot to '{}'", path.display());
    Ok(())
}

fn draw(path: &Path, history: &TrainingHistory) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(path, (1000, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let epochs: Vec<f64> = history.epochs.iter().map(|m| m.epoch as f64).collect();
    let train_loss = finite_points(&epochs, &history.train_losses());
    let val_loss   = finite_points(&epochs, &history.val_losses());
    let train_ssim = finite_points(&epochs, &history.train_ssims());
    let val_ssim   = finite_points(&epochs, &history.val_ssims());

    // A one-epoch run still needs a non-empty x range
    let x_max = epochs.last().copied().unwrap_or(1.0).max(2.0);
    let loss_range = value_range(train_loss.iter().chain(&val_loss), 0.0..1.0);
    let ssim_range = value_range(train_ssim.iter().chain(&val_ssim), 0.0..1.0);

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption("Training and Validation Loss & SSIM", ("sans-serif", 22))
        .x_label_area_size(45)
        .y_label_area_size(60)
        .right_y_label_area_size(60)
        .build_cartesian_2d(1.0..x_max, loss_range)?
        .set_secondary_coord(1.0..x_max, ssim_range);

    chart.configure_mesh().x_desc("Epochs").y_desc("Loss").draw()?;
    chart.configure_secondary_axes().y_desc("SSIM").draw()?;

    chart
        .draw_series(LineSeries::new(train_loss, &BLUE))?
        .label("Training Loss")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.filled()));
    chart
        .draw_series(LineSeries::new(val_loss, &ORANGE))?
        .label("Validation Loss")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], ORANGE.filled()));
    chart
        .draw_secondary_series(LineSeries::new(train_ssim, &GREEN))?
        .label("Training SSIM")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], GREEN.filled()));
    chart
        .draw_secondary_series(LineSeries::new(val_ssim, &RED))?
        .label("Validation SSIM")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.filled()));

    // Secondary series register in the primary legend list
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::MiddleRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

fn finite_points(xs: &[f64], ys: &[f64]) -> Vec<(f64, f64)> {
    xs.iter()
        .zip(ys)
        .filter(|(_, y)| y.is_finite())
        .map(|(&x, &y)| (x, y))
        .collect()
}

/// Min..max of the y values with a small margin; `fallback` when empty.
fn value_range<'a>(points: impl Iterator<Item = &'a (f64, f64)>, fallback: Range<f64>) -> Range<f64> {
    let (lo, hi) = points.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, y)| {
        (lo.min(y), hi.max(y))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return fallback;
    }
    let pad = ((hi - lo) * 0.05).max(1e-3);
    (lo - pad)..(hi + pad)
}
