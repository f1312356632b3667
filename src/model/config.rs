//! Architecture configuration for the generator and discriminator.

use serde::{Deserialize, Serialize};

/// Side length every image entering the networks must have
pub const IMAGE_SIZE: usize = 256;

/// Configuration for the U-Net generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Image channels in and out
    pub in_channels: usize,
    /// Width of the first encoder stage; deeper stages use multiples of it
    pub base_channels: usize,
    /// Dropout rate in the regularised decoder stages
    pub dropout: f32,
    /// How many leading decoder stages apply dropout
    pub dropout_stages: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self { in_channels: 3, base_channels: 64, dropout: 0.5, dropout_stages: 3 }
    }
}

impl GeneratorConfig {
    /// Output channels of `initial_down` followed by `down1..down6`
    pub fn encoder_channels(&self) -> [usize; 7] {
        let b = self.base_channels;
        [b, b * 2, b * 4, b * 8, b * 8, b * 8, b * 8]
    }

    /// Output channels of `up1..up7`
    pub fn decoder_channels(&self) -> [usize; 7] {
        let b = self.base_channels;
        [b * 8, b * 8, b * 8, b * 8, b * 4, b * 2, b]
    }

    /// Short label stored in checkpoint metadata
    pub fn architecture(&self) -> String {
        format!("unet-{}x{}", self.in_channels, self.base_channels)
    }

    /// Inverse of [`architecture`](Self::architecture); dropout keeps its default
    pub fn from_architecture(label: &str) -> Option<Self> {
        let (in_channels, base_channels) = label.strip_prefix("unet-")?.split_once('x')?;
        Some(Self {
            in_channels: in_channels.parse().ok()?,
            base_channels: base_channels.parse().ok()?,
            ..Self::default()
        })
    }
}

/// Configuration for the PatchGAN discriminator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscriminatorConfig {
    /// Channels of each image in the pair
    pub in_channels: usize,
    /// Widths of the convolution stages; the last stage keeps stride 1
    pub features: Vec<usize>,
    /// Leaky ReLU slope
    pub negative_slope: f32,
}

impl Default for DiscriminatorConfig {
    fn default() -> Self {
        Self { in_channels: 3, features: vec![64, 128, 256, 512], negative_slope: 0.2 }
    }
}

impl DiscriminatorConfig {
    /// Config with every stage width divided by `divisor`, for small test models
    pub fn scaled_down(divisor: usize) -> Self {
        let base = Self::default();
        let features = base.features.iter().map(|f| (f / divisor.max(1)).max(1)).collect();
        Self { features, ..base }
    }

    pub fn architecture(&self) -> String {
        let widths: Vec<String> = self.features.iter().map(ToString::to_string).collect();
        format!("patchgan-{}x{}", self.in_channels, widths.join("-"))
    }

    /// Inverse of [`architecture`](Self::architecture)
    pub fn from_architecture(label: &str) -> Option<Self> {
        let (in_channels, widths) = label.strip_prefix("patchgan-")?.split_once('x')?;
        let features = widths.split('-').map(|w| w.parse().ok()).collect::<Option<Vec<usize>>>()?;
        Some(Self { in_channels: in_channels.parse().ok()?, features, ..Self::default() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_channel_plan() {
        let config = GeneratorConfig::default();
        assert_eq!(config.encoder_channels(), [64, 128, 256, 512, 512, 512, 512]);
        assert_eq!(config.decoder_channels(), [512, 512, 512, 512, 256, 128, 64]);
        assert_eq!(config.architecture(), "unet-3x64");
    }

    #[test]
    fn test_yaml_defaults_fill_missing_fields() {
        let config: GeneratorConfig = serde_yaml::from_str("base_channels: 8").unwrap();
        assert_eq!(config.base_channels, 8);
        assert_eq!(config.dropout_stages, 3);
    }

    #[test]
    fn test_scaled_down_discriminator() {
        let config = DiscriminatorConfig::scaled_down(64);
        assert_eq!(config.features, vec![1, 2, 4, 8]);
        assert_eq!(config.architecture(), "patchgan-3x1-2-4-8");
    }

    #[test]
    fn test_architecture_labels_parse_back() {
        let gen = GeneratorConfig { base_channels: 16, ..GeneratorConfig::default() };
        assert_eq!(GeneratorConfig::from_architecture(&gen.architecture()), Some(gen));
        let disc = DiscriminatorConfig::scaled_down(32);
        assert_eq!(DiscriminatorConfig::from_architecture(&disc.architecture()), Some(disc));

        assert_eq!(GeneratorConfig::from_architecture("patchgan-3x64"), None);
        assert_eq!(DiscriminatorConfig::from_architecture("patchgan-3x64-x"), None);
    }
}
