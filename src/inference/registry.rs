//! Model variants and the registry of loaded (generator, critic) pairs

use crate::error::{Error, Result};
use crate::io::{inspect_checkpoint, load_weights};
use crate::model::{DiscriminatorConfig, GeneratorConfig, PatchDiscriminator, UNetGenerator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Which trained pair serves a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    /// Line sketch of a single object
    Object,
    /// Low-fidelity scene photo
    Scene,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 2] = [ModelVariant::Object, ModelVariant::Scene];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelVariant::Object => "object",
            ModelVariant::Scene => "scene",
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "object" => Ok(ModelVariant::Object),
            "scene" => Ok(ModelVariant::Scene),
            other => Err(Error::InvalidParameter(format!(
                "unknown model type '{other}' (expected 'object' or 'scene')"
            ))),
        }
    }
}

/// Checkpoint locations of one variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantPaths {
    pub generator: PathBuf,
    pub discriminator: PathBuf,
    #[serde(default)]
    pub generator_config: GeneratorConfig,
    #[serde(default)]
    pub discriminator_config: DiscriminatorConfig,
}

impl VariantPaths {
    pub fn new(generator: impl Into<PathBuf>, discriminator: impl Into<PathBuf>) -> Self {
        Self {
            generator: generator.into(),
            discriminator: discriminator.into(),
            generator_config: GeneratorConfig::default(),
            discriminator_config: DiscriminatorConfig::default(),
        }
    }

    /// Paths whose architectures are read from the checkpoint metadata
    ///
    /// Labels that do not parse fall back to the default architecture.
    pub fn from_checkpoints(generator: impl Into<PathBuf>, discriminator: impl Into<PathBuf>) -> Result<Self> {
        let mut paths = Self::new(generator, discriminator);
        let gen_label = inspect_checkpoint(&paths.generator)?.architecture;
        let disc_label = inspect_checkpoint(&paths.discriminator)?.architecture;
        match GeneratorConfig::from_architecture(&gen_label) {
            Some(config) => paths.generator_config = config,
            None => tracing::warn!(label = %gen_label, "unknown generator architecture, using default"),
        }
        match DiscriminatorConfig::from_architecture(&disc_label) {
            Some(config) => paths.discriminator_config = config,
            None => tracing::warn!(label = %disc_label, "unknown discriminator architecture, using default"),
        }
        Ok(paths)
    }
}

/// A generator and the critic trained alongside it
///
/// Each pair owns its weights; variants never share tensors.
pub struct ModelPair {
    pub generator: UNetGenerator,
    pub discriminator: PatchDiscriminator,
}

impl ModelPair {
    pub fn new(generator: UNetGenerator, discriminator: PatchDiscriminator) -> Self {
        Self { generator, discriminator }
    }

    /// Build fresh networks and load their weights
    ///
    /// Fails if either file is missing or does not match the architecture.
    pub fn load(paths: &VariantPaths) -> Result<Self> {
        let mut generator = UNetGenerator::new(paths.generator_config.clone());
        let mut discriminator = PatchDiscriminator::new(paths.discriminator_config.clone());
        load_weights(&paths.generator, &mut generator)?;
        load_weights(&paths.discriminator, &mut discriminator)?;
        Ok(Self { generator, discriminator })
    }
}

/// Loaded model pairs keyed by variant
///
/// Built once at startup and handed to request handling by reference.
#[derive(Default)]
pub struct ModelRegistry {
    pairs: BTreeMap<ModelVariant, ModelPair>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every configured variant
    pub fn load(paths: &BTreeMap<ModelVariant, VariantPaths>) -> Result<Self> {
        let mut registry = Self::new();
        for (&variant, variant_paths) in paths {
            registry.insert(variant, ModelPair::load(variant_paths)?);
            tracing::info!(
                %variant,
                generator = %variant_paths.generator.display(),
                discriminator = %variant_paths.discriminator.display(),
                "model pair loaded"
            );
        }
        Ok(registry)
    }

    pub fn insert(&mut self, variant: ModelVariant, pair: ModelPair) -> Option<ModelPair> {
        self.pairs.insert(variant, pair)
    }

    pub fn get(&self, variant: ModelVariant) -> Result<&ModelPair> {
        self.pairs
            .get(&variant)
            .ok_or_else(|| Error::InvalidParameter(format!("model type '{variant}' is not loaded")))
    }

    pub fn variants(&self) -> Vec<ModelVariant> {
        self.pairs.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
