// ============================================================
// Layer 5 — Structural Similarity (SSIM)
// ============================================================
// SSIM compares local means, variances and covariance of two
// images under a Gaussian window:
//
//   ssim = ((2·μx·μy + C1)(2·σxy + C2))
//        / ((μx² + μy² + C1)(σx² + σy² + C2))
//
//   C1 = (K1·L)², C2 = (K2·L)², L = data range
//
// The window statistics are depthwise 2-D convolutions (one
// group per channel). Only positions where the whole window fits
// are kept, which is the same region a reflect-padded convolution
// keeps after cropping the border. The map is averaged over every
// pixel and image.
//
// Reference: Wang et al. (2004) Image Quality Assessment:
//            From Error Visibility to Structural Similarity

use burn::{
    prelude::*,
    tensor::{module::conv2d, ops::ConvOptions},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SsimConfig {
    pub window_size: usize,
    pub sigma:       f64,
    pub k1:          f64,
    pub k2:          f64,
    pub data_range:  f64,
}

impl Default for SsimConfig {
    fn default() -> Self {
        Self {
            window_size: 11,
            sigma:       1.5,
            k1:          0.01,
            k2:          0.03,
            data_range:  1.0,
        }
    }
}

/// Normalised 2-D Gaussian window, row-major `size * size`.
pub fn gaussian_kernel(size: usize, sigma: f64) -> Vec<f32> {
    let centre = (size as f64 - 1.0) / 2.0;
    let g: Vec<f64> = (0..size)
        .map(|i| {
            let d = (i as f64 - centre) / sigma;
            (-0.5 * d * d).exp()
        })
        .collect();
    let total: f64 = g.iter().sum();
    let g: Vec<f64> = g.into_iter().map(|v| v / total).collect();

    let mut kernel = Vec::with_capacity(size * size);
    for a in &g {
        for b in &g {
            kernel.push((a * b) as f32);
        }
    }
    kernel
}

/// Mean SSIM between `preds` and `target`, both [B, C, H, W].
///
/// H and W must be at least `config.window_size`.
pub fn ssim<B: Backend>(
    preds:  Tensor<B, 4>,
    target: Tensor<B, 4>,
    config: &SsimConfig,
) -> Tensor<B, 1> {
    let [_, channels, _, _] = preds.dims();
    let size   = config.window_size;
    let device = preds.device();

    let window: Vec<f32> = gaussian_kernel(size, config.sigma)
        .into_iter()
        .cycle()
        .take(channels * size * size)
        .collect();
    let window = Tensor::<B, 1>::from_floats(window.as_slice(), &device)
        .reshape([channels, 1, size, size]);

    let filter = |x: Tensor<B, 4>| {
        conv2d(
            x,
            window.clone(),
            None,
            ConvOptions::new([1, 1], [0, 0], [1, 1], channels),
        )
    };

    let mu_x  = filter(preds.clone());
    let mu_y  = filter(target.clone());
    let xx    = filter(preds.clone() * preds.clone());
    let yy    = filter(target.clone() * target.clone());
    let xy    = filter(preds * target);

    let mu_x_sq = mu_x.clone() * mu_x.clone();
    let mu_y_sq = mu_y.clone() * mu_y.clone();
    let mu_xy   = mu_x * mu_y;

    let sigma_x  = xx - mu_x_sq.clone();
    let sigma_y  = yy - mu_y_sq.clone();
    let sigma_xy = xy - mu_xy.clone();

    let c1 = (config.k1 * config.data_range).powi(2);
    let c2 = (config.k2 * config.data_range).powi(2);

    let numerator   = mu_xy.mul_scalar(2.0).add_scalar(c1) * sigma_xy.mul_scalar(2.0).add_scalar(c2);
    let denominator = (mu_x_sq + mu_y_sq).add_scalar(c1) * (sigma_x + sigma_y).add_scalar(c2);

    (numerator / denominator).mean()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use serial_test::serial;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    fn scalar(t: Tensor<TestBackend, 1>) -> f64 {
        t.into_scalar().elem::<f64>()
    }

    #[test]
    fn test_kernel_is_normalised_and_symmetric() {
        let k = gaussian_kernel(11, 1.5);
        assert_eq!(k.len(), 121);
        let sum: f32 = k.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(k[0], k[120]);
        // Centre is the peak
        let peak = k.iter().cloned().fold(f32::MIN, f32::max);
        assert_eq!(k[60], peak);
    }

    #[test]
    #[serial]
    fn test_identical_images_score_one() {
        let device = Default::default();
        let img = Tensor::<TestBackend, 4>::random([2, 1, 16, 16], Distribution::Uniform(0.0, 1.0), &device);
        let s = scalar(ssim(img.clone(), img, &SsimConfig::default()));
        assert!((s - 1.0).abs() < 1e-4, "ssim = {s}");
    }

    #[test]
    #[serial]
    fn test_different_images_score_below_one() {
        let device = Default::default();
        let img = Tensor::<TestBackend, 4>::random([1, 1, 16, 16], Distribution::Uniform(0.0, 1.0), &device);
        let inverted = img.clone().neg().add_scalar(1.0);
        let s = scalar(ssim(img, inverted, &SsimConfig::default()));
        assert!(s < 0.5, "ssim = {s}");
    }

    #[test]
    #[serial]
    fn test_multi_channel_input() {
        let device = Default::default();
        let img = Tensor::<TestBackend, 4>::random([1, 3, 12, 12], Distribution::Uniform(0.0, 1.0), &device);
        let s = scalar(ssim(img.clone(), img, &SsimConfig::default()));
        assert!((s - 1.0).abs() < 1e-4);
    }
}
