use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        loss::{MseLoss, Reduction},
        PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::{relu, sigmoid},
};

use crate::ml::quantizer::{VectorQuantizer, VectorQuantizerConfig};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct VqVaeConfig {
    pub in_channels:       usize,
    pub hidden_channels:   usize,
    pub residual_channels: usize,
    pub num_res_layers:    usize,
    pub num_embeddings:    usize,
    pub embedding_dim:     usize,
    pub commitment_cost:   f64,
}

impl VqVaeConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> VqVae<B> {
        let encoder   = self.build_encoder(device);
        let pre_quant = Conv2dConfig::new([self.hidden_channels, self.embedding_dim], [1, 1])
            .init(device);
        let quantizer = VectorQuantizerConfig::new(self.num_embeddings, self.embedding_dim)
            .with_commitment_cost(self.commitment_cost)
            .init(device);
        let decoder   = self.build_decoder(device);
        VqVae { encoder, pre_quant, quantizer, decoder }
    }

    fn build_encoder<B: Backend>(&self, device: &B::Device) -> Encoder<B> {
        let half = self.hidden_channels / 2;
        Encoder {
            conv1:    conv4x4_down([self.in_channels, half], device),
            conv2:    conv4x4_down([half, self.hidden_channels], device),
            conv3:    conv3x3([self.hidden_channels, self.hidden_channels], device),
            residual: self.build_residual_stack(device),
        }
    }

    fn build_decoder<B: Backend>(&self, device: &B::Device) -> Decoder<B> {
        let half = self.hidden_channels / 2;
        Decoder {
            conv1:    conv3x3([self.embedding_dim, self.hidden_channels], device),
            residual: self.build_residual_stack(device),
            deconv1:  conv4x4_up([self.hidden_channels, half], device),
            deconv2:  conv4x4_up([half, self.in_channels], device),
        }
    }

    fn build_residual_stack<B: Backend>(&self, device: &B::Device) -> ResidualStack<B> {
        let blocks = (0..self.num_res_layers)
            .map(|_| ResidualBlock {
                conv3x3: conv3x3([self.hidden_channels, self.residual_channels], device),
                conv1x1: Conv2dConfig::new([self.residual_channels, self.hidden_channels], [1, 1])
                    .init(device),
            })
            .collect();
        ResidualStack { blocks }
    }
}

/// 4x4 kernel, stride 2, padding 1: halves height and width.
fn conv4x4_down<B: Backend>(channels: [usize; 2], device: &B::Device) -> Conv2d<B> {
    Conv2dConfig::new(channels, [4, 4])
        .with_stride([2, 2])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .init(device)
}

/// 4x4 transposed kernel, stride 2, padding 1: doubles height and width.
fn conv4x4_up<B: Backend>(channels: [usize; 2], device: &B::Device) -> ConvTranspose2d<B> {
    ConvTranspose2dConfig::new(channels, [4, 4])
        .with_stride([2, 2])
        .with_padding([1, 1])
        .init(device)
}

fn conv3x3<B: Backend>(channels: [usize; 2], device: &B::Device) -> Conv2d<B> {
    Conv2dConfig::new(channels, [3, 3])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .init(device)
}

// ─── Residual stack ───────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct ResidualBlock<B: Backend> {
    pub conv3x3: Conv2d<B>,
    pub conv1x1: Conv2d<B>,
}

impl<B: Backend> ResidualBlock<B> {
    /// x + conv1x1(relu(conv3x3(relu(x))))
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let h = self.conv3x3.forward(relu(x.clone()));
        x + self.conv1x1.forward(relu(h))
    }
}

#[derive(Module, Debug)]
pub struct ResidualStack<B: Backend> {
    pub blocks: Vec<ResidualBlock<B>>,
}

impl<B: Backend> ResidualStack<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.blocks.iter().fold(x, |x, block| block.forward(x));
        relu(x)
    }
}

// ─── Encoder / Decoder ────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub conv1:    Conv2d<B>,
    pub conv2:    Conv2d<B>,
    pub conv3:    Conv2d<B>,
    pub residual: ResidualStack<B>,
}

impl<B: Backend> Encoder<B> {
    /// [B, C, H, W] → [B, hidden, H/4, W/4]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = relu(self.conv1.forward(x));
        let x = relu(self.conv2.forward(x));
        let x = self.conv3.forward(x);
        self.residual.forward(x)
    }
}

#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    pub conv1:    Conv2d<B>,
    pub residual: ResidualStack<B>,
    pub deconv1:  ConvTranspose2d<B>,
    pub deconv2:  ConvTranspose2d<B>,
}

impl<B: Backend> Decoder<B> {
    /// [B, emb, H/4, W/4] → [B, C, H, W], values in (0, 1)
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv1.forward(x);
        let x = self.residual.forward(x);
        let x = relu(self.deconv1.forward(x));
        sigmoid(self.deconv2.forward(x))
    }
}

// ─── VQ-VAE ───────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct VqVae<B: Backend> {
    pub encoder:   Encoder<B>,
    pub pre_quant: Conv2d<B>,
    pub quantizer: VectorQuantizer<B>,
    pub decoder:   Decoder<B>,
}

#[derive(Debug, Clone)]
pub struct VqVaeOutput<B: Backend> {
    pub reconstructed:     Tensor<B, 4>,
    pub quantization_loss: Tensor<B, 1>,
    pub indices:           Tensor<B, 1, Int>,
}

impl<B: Backend> VqVae<B> {
    /// images: [batch, channels, H, W] with H, W multiples of 4
    pub fn forward(&self, images: Tensor<B, 4>) -> VqVaeOutput<B> {
        let z   = self.pre_quant.forward(self.encoder.forward(images));
        let vq  = self.quantizer.forward(z);
        let reconstructed = self.decoder.forward(vq.quantized);

        VqVaeOutput {
            reconstructed,
            quantization_loss: vq.loss,
            indices:           vq.indices,
        }
    }

    pub fn forward_loss(&self, images: Tensor<B, 4>) -> (Tensor<B, 1>, VqVaeOutput<B>) {
        let output = self.forward(images.clone());
        let loss   = loss_fn(
            output.reconstructed.clone(),
            images,
            output.quantization_loss.clone(),
        );
        (loss, output)
    }
}

/// Reconstruction MSE plus the quantizer's codebook/commitment loss.
pub fn loss_fn<B: Backend>(
    reconstructed:     Tensor<B, 4>,
    original:          Tensor<B, 4>,
    quantization_loss: Tensor<B, 1>,
) -> Tensor<B, 1> {
    MseLoss::new().forward(reconstructed, original, Reduction::Mean) + quantization_loss
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use serial_test::serial;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    fn tiny_config() -> VqVaeConfig {
        VqVaeConfig::new(1, 8, 4, 2, 16, 4, 0.25)
    }

    #[test]
    #[serial]
    fn test_reconstruction_shape_and_range() {
        let device = Default::default();
        let model: VqVae<TestBackend> = tiny_config().init(&device);
        let images = Tensor::<TestBackend, 4>::random([2, 1, 16, 8], Distribution::Uniform(0.0, 1.0), &device);

        let out = model.forward(images);
        assert_eq!(out.reconstructed.dims(), [2, 1, 16, 8]);
        // Latent grid is 4 x 2 per image
        assert_eq!(out.indices.dims(), [2 * 4 * 2]);

        let min: f32 = out.reconstructed.clone().min().into_scalar().elem::<f32>();
        let max: f32 = out.reconstructed.max().into_scalar().elem::<f32>();
        assert!(min >= 0.0 && max <= 1.0);
    }

    #[test]
    #[serial]
    fn test_loss_is_finite_and_non_negative() {
        let device = Default::default();
        let model: VqVae<TestBackend> = tiny_config().init(&device);
        let images = Tensor::<TestBackend, 4>::random([1, 1, 8, 8], Distribution::Uniform(0.0, 1.0), &device);

        let (loss, _) = model.forward_loss(images);
        let loss: f64 = loss.into_scalar().elem::<f64>();
        assert!(loss.is_finite() && loss >= 0.0);
    }

    #[test]
    fn test_loss_fn_adds_quantization_term() {
        let device = Default::default();
        let a = Tensor::<TestBackend, 4>::zeros([1, 1, 2, 2], &device);
        let b = Tensor::<TestBackend, 4>::ones([1, 1, 2, 2], &device);
        let q = Tensor::<TestBackend, 1>::from_floats([0.5], &device);

        let loss: f32 = loss_fn(a, b, q).into_scalar().elem::<f32>();
        assert!((loss - 1.5).abs() < 1e-6);
    }
}
