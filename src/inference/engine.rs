//! Request handling on top of the model registry

use super::preprocess::preprocess;
use super::registry::{ModelRegistry, ModelVariant};
use super::select::{select_best, Selection};
use crate::autograd::{Context, ForwardMode};
use crate::error::Result;
use crate::io::encode_png;
use crate::Tensor;

/// Candidates drawn per request unless the request says otherwise
pub const DEFAULT_SAMPLES: usize = 5;

/// Raw upload plus the variant that should serve it
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub image: Vec<u8>,
    pub variant: ModelVariant,
    /// Overrides the engine's sample count
    pub samples: Option<usize>,
}

impl GenerateRequest {
    pub fn new(image: Vec<u8>, variant: ModelVariant) -> Self {
        Self { image, variant, samples: None }
    }
}

/// Turns uploads into PNG translations using best-of-N sampling
pub struct InferenceEngine {
    registry: ModelRegistry,
    ctx: Context,
    samples: usize,
}

impl InferenceEngine {
    pub fn new(registry: ModelRegistry) -> Self {
        Self { registry, ctx: Context::new(ForwardMode::Sampling), samples: DEFAULT_SAMPLES }
    }

    /// Fix the sampling seed so responses are reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.ctx = Context::with_seed(ForwardMode::Sampling, seed);
        self
    }

    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Best-of-N translation of an already normalised `[3, 256, 256]` input
    pub fn generate(&mut self, variant: ModelVariant, input: &Tensor, samples: usize) -> Result<Selection> {
        let pair = self.registry.get(variant)?;
        select_best(&pair.generator, &pair.discriminator, input, samples, &mut self.ctx)
    }

    /// Preprocess the upload, select the best candidate and encode it as PNG
    pub fn handle(&mut self, request: &GenerateRequest) -> Result<Vec<u8>> {
        let input = preprocess(&request.image)?;
        let samples = request.samples.unwrap_or(self.samples);
        let selection = self.generate(request.variant, &input, samples)?;
        tracing::info!(
            variant = %request.variant,
            samples,
            chosen = selection.index,
            score = selection.score,
            "generated image"
        );
        encode_png(&selection.image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::ModelPair;
    use crate::io::decode_rgb;
    use crate::model::{DiscriminatorConfig, GeneratorConfig, PatchDiscriminator, UNetGenerator};
    use crate::Error;
    use image::{Rgb, RgbImage};

    fn engine() -> InferenceEngine {
        let pair = ModelPair::new(
            UNetGenerator::with_seed(GeneratorConfig { base_channels: 1, ..GeneratorConfig::default() }, 1),
            PatchDiscriminator::with_seed(DiscriminatorConfig::scaled_down(64), 2),
        );
        let mut registry = ModelRegistry::new();
        registry.insert(ModelVariant::Object, pair);
        InferenceEngine::new(registry).with_seed(9).with_samples(2)
    }

    fn upload() -> Vec<u8> {
        encode_png(&RgbImage::from_pixel(64, 48, Rgb([255, 255, 255]))).unwrap()
    }

    #[test]
    fn test_handle_returns_256_png() {
        let mut engine = engine();
        let png = engine.handle(&GenerateRequest::new(upload(), ModelVariant::Object)).unwrap();
        assert_eq!(decode_rgb(&png).unwrap().dimensions(), (256, 256));
    }

    #[test]
    fn test_unloaded_variant_is_rejected() {
        let mut engine = engine();
        let result = engine.handle(&GenerateRequest::new(upload(), ModelVariant::Scene));
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_request_sample_override() {
        let mut engine = engine();
        let input = preprocess(&upload()).unwrap();
        let selection = engine.generate(ModelVariant::Object, &input, 3).unwrap();
        assert_eq!(selection.scores.len(), 3);
        assert_eq!(engine.samples(), 2);
    }
}
