//! Conversions between f32 and the 16-bit formats.

use super::Precision;
use half::{bf16, f16};

/// Convert f32 to bf16 bits (round to nearest even)
pub fn f32_to_bf16(value: f32) -> u16 {
    bf16::from_f32(value).to_bits()
}

/// Convert bf16 bits to f32
pub fn bf16_to_f32(value: u16) -> f32 {
    bf16::from_bits(value).to_f32()
}

/// Convert f32 to IEEE half precision bits
///
/// Magnitudes above 65504 become infinity.
pub fn f32_to_fp16(value: f32) -> u16 {
    f16::from_f32(value).to_bits()
}

/// Convert IEEE half precision bits to f32
pub fn fp16_to_f32(value: u16) -> f32 {
    f16::from_bits(value).to_f32()
}

/// Quantize a value to `precision` and widen it back to f32
pub fn round_trip(value: f32, precision: Precision) -> f32 {
    match precision {
        Precision::Fp32 => value,
        Precision::Fp16 => f16::from_f32(value).to_f32(),
        Precision::Bf16 => bf16::from_f32(value).to_f32(),
    }
}
