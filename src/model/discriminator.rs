//! PatchGAN discriminator over (input, candidate) pairs.

use super::config::{DiscriminatorConfig, IMAGE_SIZE};
use super::Critic;
use crate::autograd::{concat_channels, leaky_relu, Context, ConvGeometry, PaddingMode};
use crate::error::{Error, Result};
use crate::nn::{init_rng, prefixed, BatchNorm2d, Conv2d, Module};
use crate::Tensor;
use ndarray::Array1;
use rand::Rng;

/// Convolution, batch norm, leaky ReLU
struct CriticBlock {
    conv: Conv2d,
    bn: BatchNorm2d,
}

/// Convolutional classifier emitting one logit per receptive-field patch
///
/// A 256×256 pair yields a 30×30 logit map; the scalar score is its mean.
pub struct PatchDiscriminator {
    config: DiscriminatorConfig,
    initial: Conv2d,
    blocks: Vec<CriticBlock>,
    head: Conv2d,
}

impl PatchDiscriminator {
    pub fn new(config: DiscriminatorConfig) -> Self {
        Self::build(config, &mut init_rng(None))
    }

    pub fn with_seed(config: DiscriminatorConfig, seed: u64) -> Self {
        Self::build(config, &mut init_rng(Some(seed)))
    }

    fn build(config: DiscriminatorConfig, rng: &mut impl Rng) -> Self {
        let features = &config.features;
        let first = features.first().copied().unwrap_or(64);
        let initial = Conv2d::downsample(config.in_channels * 2, first, PaddingMode::Reflect, rng);

        let mut blocks = Vec::new();
        let mut in_channels = first;
        for (i, &out_channels) in features.iter().enumerate().skip(1) {
            let stride = if i + 1 == features.len() { 1 } else { 2 };
            let geometry = ConvGeometry::new(4, stride, 1, PaddingMode::Reflect);
            blocks.push(CriticBlock {
                conv: Conv2d::new(in_channels, out_channels, geometry, rng),
                bn: BatchNorm2d::new(out_channels),
            });
            in_channels = out_channels;
        }

        let head_geometry = ConvGeometry::new(4, 1, 1, PaddingMode::Reflect);
        let head = Conv2d::new(in_channels, 1, head_geometry, rng);
        Self { config, initial, blocks, head }
    }

    pub fn config(&self) -> &DiscriminatorConfig {
        &self.config
    }

    fn check_pair(&self, input: &Tensor, candidate: &Tensor) -> Result<()> {
        let batch = input.shape().first().copied().unwrap_or(0).max(1);
        let expected = [batch, self.config.in_channels, IMAGE_SIZE, IMAGE_SIZE];
        input.expect_shape(&expected, "discriminator input")?;
        candidate.expect_shape(&expected, "discriminator candidate")
    }
}

impl Critic for PatchDiscriminator {
    fn logits(&self, input: &Tensor, candidate: &Tensor, ctx: &mut Context) -> Result<Tensor> {
        self.check_pair(input, candidate)?;
        let slope = self.config.negative_slope;
        let mode = ctx.mode();

        let pair = concat_channels(input, candidate);
        let mut h = leaky_relu(&self.initial.forward(&pair), slope);
        for block in &self.blocks {
            h = leaky_relu(&block.bn.forward(&block.conv.forward(&h), mode), slope);
        }
        let logits = self.head.forward(&h);
        if logits.is_empty() {
            return Err(Error::InvalidParameter("discriminator produced an empty patch map".into()));
        }
        Ok(logits)
    }
}

impl Module for PatchDiscriminator {
    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        let mut params: Vec<(String, &Tensor)> =
            prefixed("initial", self.initial.named_parameters()).collect();
        for (i, block) in self.blocks.iter().enumerate() {
            let name = format!("block{}", i + 1);
            params.extend(prefixed(&format!("{name}.conv"), block.conv.named_parameters()));
            params.extend(prefixed(&format!("{name}.bn"), block.bn.named_parameters()));
        }
        params.extend(prefixed("head", self.head.named_parameters()));
        params
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut Tensor)> {
        let mut params: Vec<(String, &mut Tensor)> =
            prefixed("initial", self.initial.named_parameters_mut()).collect();
        for (i, block) in self.blocks.iter_mut().enumerate() {
            let name = format!("block{}", i + 1);
            params.extend(prefixed(&format!("{name}.conv"), block.conv.named_parameters_mut()));
            params.extend(prefixed(&format!("{name}.bn"), block.bn.named_parameters_mut()));
        }
        params.extend(prefixed("head", self.head.named_parameters_mut()));
        params
    }

    fn named_buffers(&self) -> Vec<(String, Array1<f32>)> {
        let mut buffers = Vec::new();
        for (i, block) in self.blocks.iter().enumerate() {
            buffers.extend(prefixed(&format!("block{}.bn", i + 1), block.bn.named_buffers()));
        }
        buffers
    }

    fn named_buffers_mut(&mut self) -> Vec<(String, &mut Array1<f32>)> {
        let mut buffers = Vec::new();
        for (i, block) in self.blocks.iter_mut().enumerate() {
            buffers.extend(prefixed(&format!("block{}.bn", i + 1), block.bn.named_buffers_mut()));
        }
        buffers
    }
}
