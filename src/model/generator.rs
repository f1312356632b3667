//! U-Net generator: paired convolution blocks with long-range skip connections.

use super::config::{GeneratorConfig, IMAGE_SIZE};
use super::ImageGenerator;
use crate::autograd::{concat_channels, leaky_relu, no_grad, relu, tanh, Context, PaddingMode};
use crate::error::{Error, Result};
use crate::nn::{init_rng, prefixed, BatchNorm2d, Conv2d, ConvTranspose2d, Dropout, Module};
use crate::Tensor;
use ndarray::{Array1, Axis};
use rand::Rng;

const LEAKY_SLOPE: f32 = 0.2;

static ENCODER_STAGES: [&str; 6] = ["down1", "down2", "down3", "down4", "down5", "down6"];
static DECODER_STAGES: [&str; 7] = ["up1", "up2", "up3", "up4", "up5", "up6", "up7"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activation {
    Relu,
    Leaky,
}

impl Activation {
    fn apply(self, x: &Tensor) -> Tensor {
        match self {
            Activation::Relu => relu(x),
            Activation::Leaky => leaky_relu(x, LEAKY_SLOPE),
        }
    }
}

enum Resample {
    Down(Conv2d),
    Up(ConvTranspose2d),
}

/// Resolution-changing convolution then a same-resolution 3×3 convolution,
/// each followed by batch norm and the block's activation
pub struct PairedBlock {
    resample: Resample,
    bn1: BatchNorm2d,
    conv2: Conv2d,
    bn2: BatchNorm2d,
    activation: Activation,
    dropout: Option<Dropout>,
}

impl PairedBlock {
    fn encoder(in_channels: usize, out_channels: usize, rng: &mut impl Rng) -> Self {
        let conv1 = Conv2d::downsample(in_channels, out_channels, PaddingMode::Reflect, rng);
        Self::assemble(Resample::Down(conv1), out_channels, Activation::Leaky, None, rng)
    }

    fn decoder(
        in_channels: usize,
        out_channels: usize,
        dropout: Option<Dropout>,
        rng: &mut impl Rng,
    ) -> Self {
        let conv1 = ConvTranspose2d::upsample(in_channels, out_channels, rng);
        Self::assemble(Resample::Up(conv1), out_channels, Activation::Relu, dropout, rng)
    }

    fn assemble(
        resample: Resample,
        channels: usize,
        activation: Activation,
        dropout: Option<Dropout>,
        rng: &mut impl Rng,
    ) -> Self {
        let same = crate::autograd::ConvGeometry::new(3, 1, 1, PaddingMode::Reflect);
        Self {
            resample,
            bn1: BatchNorm2d::new(channels),
            conv2: Conv2d::new(channels, channels, same, rng),
            bn2: BatchNorm2d::new(channels),
            activation,
            dropout,
        }
    }

    pub fn forward(&self, x: &Tensor, ctx: &mut Context) -> Tensor {
        let mode = ctx.mode();
        let h = match &self.resample {
            Resample::Down(conv) => conv.forward(x),
            Resample::Up(conv) => conv.forward(x),
        };
        let h = self.activation.apply(&self.bn1.forward(&h, mode));
        let h = self.conv2.forward(&h);
        let h = self.activation.apply(&self.bn2.forward(&h, mode));
        match &self.dropout {
            Some(dropout) => dropout.forward(&h, ctx),
            None => h,
        }
    }

    /// Channels the block expects on its input
    pub fn in_channels(&self) -> usize {
        match &self.resample {
            Resample::Down(conv) => conv.weight.shape()[1],
            Resample::Up(conv) => conv.weight.shape()[0],
        }
    }

    pub fn has_dropout(&self) -> bool {
        self.dropout.is_some()
    }
}

impl Module for PairedBlock {
    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        let conv1 = match &self.resample {
            Resample::Down(conv) => conv.named_parameters(),
            Resample::Up(conv) => conv.named_parameters(),
        };
        prefixed("conv1", conv1)
            .chain(prefixed("bn1", self.bn1.named_parameters()))
            .chain(prefixed("conv2", self.conv2.named_parameters()))
            .chain(prefixed("bn2", self.bn2.named_parameters()))
            .collect()
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut Tensor)> {
        let conv1 = match &mut self.resample {
            Resample::Down(conv) => conv.named_parameters_mut(),
            Resample::Up(conv) => conv.named_parameters_mut(),
        };
        prefixed("conv1", conv1)
            .chain(prefixed("bn1", self.bn1.named_parameters_mut()))
            .chain(prefixed("conv2", self.conv2.named_parameters_mut()))
            .chain(prefixed("bn2", self.bn2.named_parameters_mut()))
            .collect()
    }

    fn named_buffers(&self) -> Vec<(String, Array1<f32>)> {
        prefixed("bn1", self.bn1.named_buffers())
            .chain(prefixed("bn2", self.bn2.named_buffers()))
            .collect()
    }

    fn named_buffers_mut(&mut self) -> Vec<(String, &mut Array1<f32>)> {
        prefixed("bn1", self.bn1.named_buffers_mut())
            .chain(prefixed("bn2", self.bn2.named_buffers_mut()))
            .collect()
    }
}

/// Encoder activations of one forward pass, shallowest first
///
/// The decoder consumes them deepest first. Lives only for a single call.
#[derive(Default, Clone)]
pub struct SkipMap {
    activations: Vec<Tensor>,
}

impl SkipMap {
    fn push(&mut self, activation: Tensor) {
        self.activations.push(activation);
    }

    pub fn len(&self) -> usize {
        self.activations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activations.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Tensor> {
        self.activations.get(index)
    }

    /// Order in which the decoder concatenates them
    pub fn deepest_first(&self) -> impl Iterator<Item = &Tensor> {
        self.activations.iter().rev()
    }

    /// Channel count of every stored activation, shallowest first
    pub fn channels(&self) -> Vec<usize> {
        self.activations.iter().map(|t| t.shape()[1]).collect()
    }
}

/// Channel bookkeeping at one skip concatenation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderInput {
    pub stage: String,
    /// Channels arriving from the previous decoder stage
    pub previous: usize,
    /// Channels contributed by the matching encoder stage
    pub skip: usize,
    /// Channels of the concatenation fed to the stage
    pub total: usize,
}

/// Output of a forward pass together with its intermediate structure
pub struct GeneratorTrace {
    pub output: Tensor,
    pub skips: SkipMap,
    pub decoder_inputs: Vec<DecoderInput>,
}

/// Encoder-decoder generator with seven skip connections
pub struct UNetGenerator {
    config: GeneratorConfig,
    initial_down: Conv2d,
    encoder: Vec<PairedBlock>,
    bottleneck: Conv2d,
    decoder: Vec<PairedBlock>,
    final_up: ConvTranspose2d,
}

impl UNetGenerator {
    /// Create a generator with random initialization
    pub fn new(config: GeneratorConfig) -> Self {
        Self::build(config, &mut init_rng(None))
    }

    /// Create a generator with a seed for reproducibility
    pub fn with_seed(config: GeneratorConfig, seed: u64) -> Self {
        Self::build(config, &mut init_rng(Some(seed)))
    }

    fn build(config: GeneratorConfig, rng: &mut impl Rng) -> Self {
        let enc = config.encoder_channels();
        let dec = config.decoder_channels();

        let initial_down =
            Conv2d::downsample(config.in_channels, enc[0], PaddingMode::Reflect, rng);
        let encoder = (0..ENCODER_STAGES.len())
            .map(|i| PairedBlock::encoder(enc[i], enc[i + 1], rng))
            .collect();
        let bottleneck = Conv2d::downsample(enc[6], enc[6], PaddingMode::Zeros, rng);

        let decoder = (0..DECODER_STAGES.len())
            .map(|i| {
                // up1 reads the bottleneck alone, later stages a skip concatenation
                let in_channels = if i == 0 { enc[6] } else { dec[i - 1] + enc[7 - i] };
                let dropout = (i < config.dropout_stages).then(|| Dropout::new(config.dropout));
                PairedBlock::decoder(in_channels, dec[i], dropout, rng)
            })
            .collect();
        let final_up = ConvTranspose2d::upsample(dec[6] + enc[0], config.in_channels, rng);

        Self { config, initial_down, encoder, bottleneck, decoder, final_up }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Decoder stages in order `up1..up7`
    pub fn decoder_stages(&self) -> &[PairedBlock] {
        &self.decoder
    }

    fn check_input(&self, x: &Tensor) -> Result<()> {
        let shape = x.shape();
        let batch = shape.first().copied().unwrap_or(0).max(1);
        x.expect_shape(&[batch, self.config.in_channels, IMAGE_SIZE, IMAGE_SIZE], "generator input")
    }

    /// Translate a batch `[N, C, 256, 256]` into `[N, C, 256, 256]` in [-1, 1]
    pub fn forward(&self, x: &Tensor, ctx: &mut Context) -> Result<Tensor> {
        Ok(self.forward_traced(x, ctx)?.output)
    }

    /// Forward pass that also reports the skip map and concatenation widths
    pub fn forward_traced(&self, x: &Tensor, ctx: &mut Context) -> Result<GeneratorTrace> {
        self.check_input(x)?;

        let mut skips = SkipMap::default();
        let mut h = leaky_relu(&self.initial_down.forward(x), LEAKY_SLOPE);
        skips.push(h.clone());
        for block in &self.encoder {
            h = block.forward(&h, ctx);
            skips.push(h.clone());
        }

        h = relu(&self.bottleneck.forward(&h));
        h = self.decoder[0].forward(&h, ctx);

        let mut decoder_inputs = Vec::with_capacity(DECODER_STAGES.len());
        let mut joined_input = |stage: &str, previous: &Tensor, skip: &Tensor| {
            let joined = concat_channels(previous, skip);
            decoder_inputs.push(DecoderInput {
                stage: stage.to_string(),
                previous: previous.shape()[1],
                skip: skip.shape()[1],
                total: joined.shape()[1],
            });
            joined
        };

        // d7 pairs with up2, ..., d2 with up7; d1 is left for the final stage
        for ((stage, block), skip) in
            DECODER_STAGES[1..].iter().zip(&self.decoder[1..]).zip(skips.deepest_first())
        {
            let joined = joined_input(stage, &h, skip);
            h = block.forward(&joined, ctx);
        }
        let shallowest = skips.get(0).ok_or_else(|| {
            Error::InvalidParameter("generator produced no encoder activations".into())
        })?;
        let joined = joined_input("final_up", &h, shallowest);
        let output = tanh(&self.final_up.forward(&joined));

        Ok(GeneratorTrace { output, skips, decoder_inputs })
    }
}

impl ImageGenerator for UNetGenerator {
    /// Translate a single `[C, 256, 256]` image without recording a graph
    fn generate(&self, image: &Tensor, ctx: &mut Context) -> Result<Tensor> {
        if image.shape().len() != 3 {
            return Err(Error::shape(
                &[self.config.in_channels, IMAGE_SIZE, IMAGE_SIZE],
                image.shape(),
                "generate input",
            ));
        }
        let batch = Tensor::new(image.data().clone().insert_axis(Axis(0)), false);
        let output = no_grad(|| self.forward(&batch, ctx))?;
        Ok(Tensor::new(output.data().index_axis(Axis(0), 0).to_owned(), false))
    }
}

impl Module for UNetGenerator {
    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        let mut params: Vec<(String, &Tensor)> =
            prefixed("initial_down", self.initial_down.named_parameters()).collect();
        for (name, block) in ENCODER_STAGES.iter().zip(&self.encoder) {
            params.extend(prefixed(name, block.named_parameters()));
        }
        params.extend(prefixed("bottleneck", self.bottleneck.named_parameters()));
        for (name, block) in DECODER_STAGES.iter().zip(&self.decoder) {
            params.extend(prefixed(name, block.named_parameters()));
        }
        params.extend(prefixed("final_up", self.final_up.named_parameters()));
        params
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut Tensor)> {
        let mut params: Vec<(String, &mut Tensor)> =
            prefixed("initial_down", self.initial_down.named_parameters_mut()).collect();
        for (name, block) in ENCODER_STAGES.iter().zip(self.encoder.iter_mut()) {
            params.extend(prefixed(name, block.named_parameters_mut()));
        }
        params.extend(prefixed("bottleneck", self.bottleneck.named_parameters_mut()));
        for (name, block) in DECODER_STAGES.iter().zip(self.decoder.iter_mut()) {
            params.extend(prefixed(name, block.named_parameters_mut()));
        }
        params.extend(prefixed("final_up", self.final_up.named_parameters_mut()));
        params
    }

    fn named_buffers(&self) -> Vec<(String, Array1<f32>)> {
        let stages = ENCODER_STAGES.iter().zip(&self.encoder);
        let stages = stages.chain(DECODER_STAGES.iter().zip(&self.decoder));
        stages.flat_map(|(name, block)| prefixed(name, block.named_buffers()).collect::<Vec<_>>()).collect()
    }

    fn named_buffers_mut(&mut self) -> Vec<(String, &mut Array1<f32>)> {
        let mut buffers = Vec::new();
        for (name, block) in ENCODER_STAGES.iter().zip(self.encoder.iter_mut()) {
            buffers.extend(prefixed(name, block.named_buffers_mut()));
        }
        for (name, block) in DECODER_STAGES.iter().zip(self.decoder.iter_mut()) {
            buffers.extend(prefixed(name, block.named_buffers_mut()));
        }
        buffers
    }
}
