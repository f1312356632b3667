//! Mixed-precision gradient handling
//!
//! Parameters stay in f32. Gradients of the scaled loss are quantized to the
//! configured 16-bit format before the optimizer sees them, which reproduces
//! the overflow and underflow behaviour of accelerator training:
//!
//! ```ignore
//! let mut scaler = GradScaler::from_config(&MixedPrecisionConfig::fp16());
//! let scaled = scaler.scale(&loss);
//! backward(&scaled, None);
//! scaler.step(&mut optimizer, &mut params);
//! scaler.update();
//! ```

mod config;
mod conversions;
mod precision_types;
mod scaler;

#[cfg(test)]
mod tests;

pub use config::MixedPrecisionConfig;
pub use conversions::{bf16_to_f32, f32_to_bf16, f32_to_fp16, fp16_to_f32, round_trip};
pub use precision_types::Precision;
pub use scaler::{scaler_from_config, GradScaler, GradientScaler, NoopScaler};
