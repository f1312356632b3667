//! Resumable training checkpoints in SafeTensors format
//!
//! One file per network. Tensors are stored under namespaced keys:
//!
//! - `param.<name>`: trainable weights
//! - `buffer.<name>`: batch-norm running statistics
//! - `optim.m.<name>` / `optim.v.<name>`: Adam moments of that parameter
//!
//! String metadata carries `format`, `epoch`, `optimizer_step`,
//! `learning_rate`, `architecture` and the `saved_at` timestamp.

use crate::error::{Error, Result};
use crate::nn::Module;
use crate::optim::{Adam, Optimizer};
use ndarray::{Array1, ArrayD, IxDyn};
use safetensors::tensor::{Dtype, TensorView};
use safetensors::SafeTensors;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Value of the `format` metadata entry
pub const CHECKPOINT_FORMAT: &str = "boceto-checkpoint-v1";

const META_FORMAT: &str = "format";
const META_EPOCH: &str = "epoch";
const META_STEP: &str = "optimizer_step";
const META_LR: &str = "learning_rate";
const META_ARCH: &str = "architecture";
const META_SAVED: &str = "saved_at";

/// Metadata and tensor inventory of a checkpoint file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckpointInfo {
    /// Next epoch to run when resuming
    pub epoch: usize,
    pub optimizer_step: u64,
    pub learning_rate: f32,
    pub architecture: String,
    /// Number of `param.*` tensors
    pub num_tensors: usize,
    /// Scalars across all `param.*` tensors
    pub num_parameters: usize,
    /// Whether Adam moments are present
    pub has_optimizer_state: bool,
    /// RFC 3339 time of writing, if recorded
    pub saved_at: Option<String>,
}

/// Write model weights, buffers and optimizer state
///
/// `epoch` is the epoch to resume from, i.e. one past the last completed.
pub fn save_checkpoint(
    path: impl AsRef<Path>,
    model: &dyn Module,
    optimizer: &Adam,
    epoch: usize,
    architecture: &str,
) -> Result<()> {
    let mut entries: Vec<(String, Vec<usize>, Vec<u8>)> = Vec::new();

    let params = model.named_parameters();
    for (idx, (name, tensor)) in params.iter().enumerate() {
        entries.push(entry(format!("param.{name}"), tensor.data()));
        if let Some(Some(m)) = optimizer.first_moments().get(idx) {
            entries.push(entry(format!("optim.m.{name}"), m));
        }
        if let Some(Some(v)) = optimizer.second_moments().get(idx) {
            entries.push(entry(format!("optim.v.{name}"), v));
        }
    }
    for (name, buffer) in model.named_buffers() {
        entries.push(entry(format!("buffer.{name}"), &buffer.into_dyn()));
    }

    let views = entries
        .iter()
        .map(|(name, shape, bytes)| {
            TensorView::new(Dtype::F32, shape.clone(), bytes)
                .map(|view| (name.as_str(), view))
                .map_err(|e| Error::Serialization(format!("Invalid tensor view {name}: {e}")))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut metadata = HashMap::new();
    metadata.insert(META_FORMAT.to_string(), CHECKPOINT_FORMAT.to_string());
    metadata.insert(META_EPOCH.to_string(), epoch.to_string());
    metadata.insert(META_STEP.to_string(), optimizer.step_count().to_string());
    metadata.insert(META_LR.to_string(), optimizer.lr().to_string());
    metadata.insert(META_ARCH.to_string(), architecture.to_string());
    metadata.insert(META_SAVED.to_string(), chrono::Utc::now().to_rfc3339());

    let bytes = safetensors::serialize(views, Some(metadata))
        .map_err(|e| Error::Serialization(format!("SafeTensors serialization failed: {e}")))?;

    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    tracing::debug!(path = %path.display(), epoch, tensors = entries.len(), "checkpoint saved");
    Ok(())
}

/// Restore model and optimizer state, returning the stored epoch
///
/// The learning rate is reset to `lr` rather than the stored value so a
/// resumed run follows the current configuration.
pub fn load_checkpoint(
    path: impl AsRef<Path>,
    model: &mut dyn Module,
    optimizer: &mut Adam,
    lr: f32,
) -> Result<usize> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let metadata = read_metadata(&data)?;
    let tensors = SafeTensors::deserialize(&data)
        .map_err(|e| Error::Serialization(format!("SafeTensors parsing failed: {e}")))?;

    restore_model(&tensors, model)?;

    let names: Vec<String> = model.named_parameters().into_iter().map(|(n, _)| n).collect();
    for (idx, name) in names.iter().enumerate() {
        if let Some((_, m)) = read_optional(&tensors, &format!("optim.m.{name}"))? {
            optimizer.set_first_moment(idx, m);
        }
        if let Some((_, v)) = read_optional(&tensors, &format!("optim.v.{name}"))? {
            optimizer.set_second_moment(idx, v);
        }
    }
    optimizer.set_step_count(parse_meta(&metadata, META_STEP)?);
    optimizer.set_lr(lr);

    let epoch = parse_meta(&metadata, META_EPOCH)?;
    tracing::info!(path = %path.display(), epoch, "checkpoint loaded");
    Ok(epoch)
}

/// Restore weights and buffers only, ignoring optimizer state
pub fn load_weights(path: impl AsRef<Path>, model: &mut dyn Module) -> Result<()> {
    let data = std::fs::read(path.as_ref())?;
    read_metadata(&data)?;
    let tensors = SafeTensors::deserialize(&data)
        .map_err(|e| Error::Serialization(format!("SafeTensors parsing failed: {e}")))?;
    restore_model(&tensors, model)
}

/// Read metadata and count tensors without building a model
pub fn inspect_checkpoint(path: impl AsRef<Path>) -> Result<CheckpointInfo> {
    let data = std::fs::read(path.as_ref())?;
    let metadata = read_metadata(&data)?;
    let tensors = SafeTensors::deserialize(&data)
        .map_err(|e| Error::Serialization(format!("SafeTensors parsing failed: {e}")))?;

    let mut num_tensors = 0;
    let mut num_parameters = 0;
    let mut has_optimizer_state = false;
    for (name, view) in tensors.tensors() {
        if name.starts_with("param.") {
            num_tensors += 1;
            num_parameters += view.shape().iter().product::<usize>();
        } else if name.starts_with("optim.") {
            has_optimizer_state = true;
        }
    }

    Ok(CheckpointInfo {
        epoch: parse_meta(&metadata, META_EPOCH)?,
        optimizer_step: parse_meta(&metadata, META_STEP)?,
        learning_rate: parse_meta(&metadata, META_LR)?,
        architecture: metadata.get(META_ARCH).cloned().unwrap_or_default(),
        num_tensors,
        num_parameters,
        has_optimizer_state,
        saved_at: metadata.get(META_SAVED).cloned(),
    })
}

fn entry(name: String, array: &ArrayD<f32>) -> (String, Vec<usize>, Vec<u8>) {
    let contiguous = array.as_standard_layout();
    let bytes = match contiguous.as_slice() {
        Some(values) => bytemuck::cast_slice::<f32, u8>(values).to_vec(),
        None => contiguous.iter().flat_map(|v| v.to_le_bytes()).collect(),
    };
    (name, array.shape().to_vec(), bytes)
}

fn read_metadata(data: &[u8]) -> Result<HashMap<String, String>> {
    let (_, header) = SafeTensors::read_metadata(data)
        .map_err(|e| Error::Serialization(format!("SafeTensors parsing failed: {e}")))?;
    let metadata = header.metadata().clone().unwrap_or_default();
    let format = metadata.get(META_FORMAT).cloned();
    match format.as_deref() {
        Some(CHECKPOINT_FORMAT) => Ok(metadata),
        Some(other) => Err(Error::Checkpoint(format!("unsupported checkpoint format '{other}'"))),
        None => Err(Error::Checkpoint("missing checkpoint format metadata".into())),
    }
}

fn parse_meta<T: std::str::FromStr>(metadata: &HashMap<String, String>, key: &str) -> Result<T> {
    let raw = metadata
        .get(key)
        .ok_or_else(|| Error::Checkpoint(format!("missing metadata entry '{key}'")))?;
    raw.parse()
        .map_err(|_| Error::Checkpoint(format!("invalid metadata entry '{key}': {raw}")))
}

fn read_optional(tensors: &SafeTensors<'_>, key: &str) -> Result<Option<(Vec<usize>, ArrayD<f32>)>> {
    let view = match tensors.tensor(key) {
        Ok(view) => view,
        Err(safetensors::SafeTensorError::TensorNotFound(_)) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if view.dtype() != Dtype::F32 {
        return Err(Error::Checkpoint(format!("{key}: expected F32, found {:?}", view.dtype())));
    }
    let values: Vec<f32> = view
        .data()
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    let shape = view.shape().to_vec();
    let array = ArrayD::from_shape_vec(IxDyn(&shape), values)
        .map_err(|e| Error::Checkpoint(format!("{key}: {e}")))?;
    Ok(Some((shape, array)))
}

fn read_required(tensors: &SafeTensors<'_>, key: &str, expected: &[usize]) -> Result<ArrayD<f32>> {
    let (shape, array) = read_optional(tensors, key)?
        .ok_or_else(|| Error::Checkpoint(format!("missing tensor '{key}'")))?;
    if shape != expected {
        return Err(Error::shape(expected, &shape, key));
    }
    Ok(array)
}

/// Copy weights and buffers into `model`
///
/// The file must hold exactly the model's tensors. Everything is read and
/// checked before the model is touched, so a failed load leaves it unchanged.
fn restore_model(tensors: &SafeTensors<'_>, model: &mut dyn Module) -> Result<()> {
    let param_keys: Vec<(String, Vec<usize>)> = model
        .named_parameters()
        .into_iter()
        .map(|(name, param)| (format!("param.{name}"), param.shape().to_vec()))
        .collect();
    let buffer_keys: Vec<(String, usize)> = model
        .named_buffers()
        .into_iter()
        .map(|(name, buffer)| (format!("buffer.{name}"), buffer.len()))
        .collect();

    let expected: BTreeSet<&str> = param_keys
        .iter()
        .map(|(key, _)| key.as_str())
        .chain(buffer_keys.iter().map(|(key, _)| key.as_str()))
        .collect();
    let stored: BTreeSet<String> = tensors
        .names()
        .into_iter()
        .map(|name| name.to_string())
        .filter(|name| name.starts_with("param.") || name.starts_with("buffer."))
        .collect();
    if let Some(extra) = stored.iter().find(|name| !expected.contains(name.as_str())) {
        return Err(Error::Checkpoint(format!(
            "unexpected tensor '{extra}': checkpoint has {} model tensors, model has {}",
            stored.len(),
            expected.len()
        )));
    }

    let params = param_keys
        .iter()
        .map(|(key, shape)| read_required(tensors, key, shape))
        .collect::<Result<Vec<_>>>()?;
    let buffers = buffer_keys
        .iter()
        .map(|(key, len)| read_required(tensors, key, &[*len]))
        .collect::<Result<Vec<_>>>()?;

    for ((_, param), data) in model.named_parameters_mut().into_iter().zip(params) {
        *param.data_mut() = data;
    }
    for ((_, buffer), data) in model.named_buffers_mut().into_iter().zip(buffers) {
        *buffer = Array1::from_iter(data.iter().copied());
    }
    Ok(())
}
