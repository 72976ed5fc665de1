// ============================================================
// Layer 5 — Vector Quantizer
// ============================================================
// Maps every latent vector from the encoder to its nearest
// entry in a learned codebook.
//
// Shapes:
//   latents   [B, D, H, W]  → flattened to [B·H·W, D]
//   codebook  [K, D]
//   distances [B·H·W, K]    = |z|² + |e|² − 2·z·eᵀ
//   indices   [B·H·W]       = argmin over K
//
// Loss (sg = stop-gradient, i.e. .detach()):
//   codebook term   mse(q, sg(z))     pulls codes toward encodings
//   commitment term β · mse(sg(q), z) keeps encodings near codes
//
// argmin has no gradient, so the output uses the straight-through
// estimator z + sg(q − z): forward value q, backward gradient of z.
//
// Reference: van den Oord et al. (2017) Neural Discrete
//            Representation Learning

use burn::{
    module::Param,
    nn::loss::{MseLoss, Reduction},
    prelude::*,
    tensor::Distribution,
};

#[derive(Config, Debug)]
pub struct VectorQuantizerConfig {
    pub num_embeddings: usize,
    pub embedding_dim:  usize,
    #[config(default = 0.25)]
    pub commitment_cost: f64,
}

impl VectorQuantizerConfig {
    /// Codebook entries start in Uniform(-1/K, 1/K).
    pub fn init<B: Backend>(&self, device: &B::Device) -> VectorQuantizer<B> {
        let bound = 1.0 / self.num_embeddings as f64;
        let codebook = Tensor::<B, 2>::random(
            [self.num_embeddings, self.embedding_dim],
            Distribution::Uniform(-bound, bound),
            device,
        );
        VectorQuantizer {
            codebook:        Param::from_tensor(codebook),
            commitment_cost: self.commitment_cost,
        }
    }
}

#[derive(Module, Debug)]
pub struct VectorQuantizer<B: Backend> {
    pub codebook:        Param<Tensor<B, 2>>,
    pub commitment_cost: f64,
}

#[derive(Debug, Clone)]
pub struct QuantizerOutput<B: Backend> {
    /// Straight-through quantized latents — [B, D, H, W]
    pub quantized: Tensor<B, 4>,
    /// Codebook + commitment loss — [1]
    pub loss:      Tensor<B, 1>,
    /// Chosen code per latent position — [B·H·W]
    pub indices:   Tensor<B, 1, Int>,
}

impl<B: Backend> VectorQuantizer<B> {
    pub fn num_embeddings(&self) -> usize {
        self.codebook.val().dims()[0]
    }

    pub fn forward(&self, latents: Tensor<B, 4>) -> QuantizerOutput<B> {
        let [batch, dim, height, width] = latents.dims();
        let positions = batch * height * width;

        // [B, D, H, W] → [B, H, W, D] → [B·H·W, D]
        let flat = latents
            .clone()
            .swap_dims(1, 2)
            .swap_dims(2, 3)
            .reshape([positions, dim]);

        let indices   = self.nearest_codes(flat);
        let quantized = self
            .codebook
            .val()
            .select(0, indices.clone())
            .reshape([batch, height, width, dim])
            .swap_dims(2, 3)
            .swap_dims(1, 2);

        let mse             = MseLoss::new();
        let codebook_loss   = mse.forward(quantized.clone(), latents.clone().detach(), Reduction::Mean);
        let commitment_loss = mse.forward(quantized.clone().detach(), latents.clone(), Reduction::Mean);
        let loss            = codebook_loss + commitment_loss.mul_scalar(self.commitment_cost);

        let quantized = latents.clone() + (quantized - latents).detach();

        QuantizerOutput { quantized, loss, indices }
    }

    /// Index of the closest codebook entry for each row of `flat` ([N, D]).
    fn nearest_codes(&self, flat: Tensor<B, 2>) -> Tensor<B, 1, Int> {
        let [n, _] = flat.dims();
        let codebook = self.codebook.val();
        let k = codebook.dims()[0];

        let z_sq = flat.clone().powf_scalar(2.0).sum_dim(1).expand([n, k]);
        let e_sq = codebook.clone().powf_scalar(2.0).sum_dim(1).transpose().expand([n, k]);
        let dot  = flat.matmul(codebook.transpose());

        let distances = z_sq + e_sq - dot.mul_scalar(2.0);
        distances.argmin(1).flatten::<1>(0, 1)
    }
}
