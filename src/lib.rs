//! Boceto: sketch-to-photo image translation
//!
//! A pix2pix-style conditional GAN built on a small tape-based autograd
//! engine:
//!
//! - [`model::UNetGenerator`]: 8-stage encoder / 7-stage decoder U-Net with
//!   skip connections
//! - [`model::PatchDiscriminator`]: PatchGAN critic over (input, candidate)
//!   pairs
//! - [`train::GanTrainer`]: adversarial + L1 + perceptual training with loss
//!   scaling and resumable checkpoints
//! - [`inference::select_best`]: best-of-N sampling ranked by the critic
//!
//! # Example
//!
//! ```ignore
//! use boceto::autograd::{Context, ForwardMode};
//! use boceto::inference::{preprocess, select_best, ModelPair, VariantPaths};
//!
//! let pair = ModelPair::load(&VariantPaths::from_checkpoints("gen.safetensors", "disc.safetensors")?)?;
//! let input = preprocess(&std::fs::read("sketch.png")?)?;
//! let mut ctx = Context::new(ForwardMode::Sampling);
//! let best = select_best(&pair.generator, &pair.discriminator, &input, 5, &mut ctx)?;
//! best.image.save("photo.png")?;
//! ```

pub mod autograd;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod inference;
pub mod io;
pub mod model;
pub mod nn;
pub mod optim;
#[cfg(feature = "server")]
pub mod server;
pub mod train;

pub use autograd::Tensor;
pub use error::{Error, Result};
