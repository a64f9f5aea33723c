// ============================================================
// Layer 5 — Transformer Block
// ============================================================
// The one layer kind that is not a single burn module:
// "transformerblock" in a model description builds
//
//   x ─► self-attention ─► dropout ─► (+x) ─► LayerNorm ─┐
//   ┌────────────────────────────────────────────────────┘
//   └► Linear(ff_dim) ─► ReLU ─► Linear(embed_dim) ─► dropout ─► (+) ─► LayerNorm
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

const NORM_EPSILON: f64 = 1e-6;

#[derive(Config, Debug)]
pub struct TransformerBlockConfig {
    pub embed_dim: usize,
    pub num_heads: usize,
    pub ff_dim:    usize,
    #[config(default = 0.1)]
    pub rate:      f64,
}

impl TransformerBlockConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TransformerBlock<B> {
        let attention = MultiHeadAttentionConfig::new(self.embed_dim, self.num_heads)
            .with_dropout(self.rate)
            .init(device);
        TransformerBlock {
            attention,
            ffn_linear1: LinearConfig::new(self.embed_dim, self.ff_dim).init(device),
            ffn_linear2: LinearConfig::new(self.ff_dim, self.embed_dim).init(device),
            norm1: LayerNormConfig::new(self.embed_dim).with_epsilon(NORM_EPSILON).init(device),
            norm2: LayerNormConfig::new(self.embed_dim).with_epsilon(NORM_EPSILON).init(device),
            dropout: DropoutConfig::new(self.rate).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct TransformerBlock<B: Backend> {
    pub attention:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> TransformerBlock<B> {
    /// x: [batch, seq_len, embed_dim] → same shape
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let attn_output = self.attention.forward(MhaInput::self_attn(x.clone())).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(relu(self.ffn_linear1.forward(x.clone())));
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_block_keeps_shape() {
        let device = Default::default();
        let block = TransformerBlockConfig::new(8, 2, 16).init::<NdArray>(&device);
        let out = block.forward(Tensor::ones([3, 4, 8], &device));
        assert_eq!(out.dims(), [3, 4, 8]);
    }

    #[test]
    fn test_default_rate() {
        assert_eq!(TransformerBlockConfig::new(8, 2, 16).rate, 0.1);
    }
}
