//! Discriminator-guided inference
//!
//! A generator with dropout yields a different translation on every call in
//! sampling mode. [`select_best`] draws several and keeps the one the paired
//! critic rates most genuine. [`InferenceEngine`] wraps this for raw uploads
//! routed to a [`ModelVariant`].
//!
//! # Example
//!
//! ```no_run
//! use std::collections::BTreeMap;
//! use boceto::inference::{GenerateRequest, InferenceEngine, ModelRegistry, ModelVariant, VariantPaths};
//!
//! let mut paths = BTreeMap::new();
//! paths.insert(ModelVariant::Scene, VariantPaths::new("scene_gen.safetensors", "scene_disc.safetensors"));
//! let mut engine = InferenceEngine::new(ModelRegistry::load(&paths)?);
//!
//! let upload = std::fs::read("photo.jpg")?;
//! let png = engine.handle(&GenerateRequest::new(upload, ModelVariant::Scene))?;
//! std::fs::write("out.png", png)?;
//! # Ok::<(), boceto::Error>(())
//! ```

mod engine;
mod evaluate;
mod preprocess;
mod registry;
mod select;

pub use engine::{GenerateRequest, InferenceEngine, DEFAULT_SAMPLES};
pub use evaluate::{evaluate_dataset, EvaluationReport};
pub use preprocess::preprocess;
pub use registry::{ModelPair, ModelRegistry, ModelVariant, VariantPaths};
pub use select::{select_best, Selection};
