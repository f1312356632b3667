//! Numeric formats for gradient computation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Floating point format gradients are computed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// 32-bit floating point
    #[default]
    Fp32,
    /// IEEE half precision (5 exponent bits, 10 mantissa bits)
    Fp16,
    /// Brain floating point (8 exponent bits, 7 mantissa bits)
    Bf16,
}

impl Precision {
    pub fn size_bytes(&self) -> usize {
        match self {
            Precision::Fp32 => 4,
            Precision::Fp16 | Precision::Bf16 => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Precision::Fp32 => "fp32",
            Precision::Fp16 => "fp16",
            Precision::Bf16 => "bf16",
        }
    }

    /// Whether values lose range or precision relative to f32
    pub fn is_reduced(&self) -> bool {
        !matches!(self, Precision::Fp32)
    }

    /// Largest finite magnitude representable
    pub fn max_finite(&self) -> f32 {
        match self {
            Precision::Fp32 => f32::MAX,
            Precision::Fp16 => half::f16::MAX.to_f32(),
            Precision::Bf16 => half::bf16::MAX.to_f32(),
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Precision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fp32" | "f32" => Ok(Precision::Fp32),
            "fp16" | "f16" | "half" => Ok(Precision::Fp16),
            "bf16" => Ok(Precision::Bf16),
            other => Err(format!("unknown precision '{other}' (expected fp32, fp16 or bf16)")),
        }
    }
}
