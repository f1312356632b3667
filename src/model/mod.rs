//! Generator and discriminator networks
//!
//! - [`UNetGenerator`]: encoder-decoder translating a 256×256 input image
//! - [`PatchDiscriminator`]: conditional critic over (input, candidate) pairs
//!
//! Inference and training code depend on the [`ImageGenerator`] and [`Critic`]
//! traits so either side can be swapped for a test double.

mod config;
mod discriminator;
mod generator;

pub use config::{DiscriminatorConfig, GeneratorConfig, IMAGE_SIZE};
pub use discriminator::PatchDiscriminator;
pub use generator::{DecoderInput, GeneratorTrace, PairedBlock, SkipMap, UNetGenerator};

use crate::autograd::Context;
use crate::error::Result;
use crate::Tensor;

/// Produces one candidate translation per call
///
/// May be stochastic: repeated calls on the same input can differ.
pub trait ImageGenerator {
    /// Translate a single `[C, 256, 256]` image in [-1, 1]
    fn generate(&self, image: &Tensor, ctx: &mut Context) -> Result<Tensor>;
}

/// Conditional critic scoring (input, candidate) pairs
pub trait Critic {
    /// Unbounded real/fake logits for batched pairs `[N, C, 256, 256]`
    fn logits(&self, input: &Tensor, candidate: &Tensor, ctx: &mut Context) -> Result<Tensor>;

    /// Mean logit of a pair; higher means more likely genuine
    fn score(&self, input: &Tensor, candidate: &Tensor, ctx: &mut Context) -> Result<f32> {
        let logits = self.logits(input, candidate, ctx)?;
        Ok(logits.data().mean().unwrap_or(0.0))
    }
}
