//! Paired image datasets

use crate::error::{Error, Result};
use crate::io::{load_rgb, resize_square, rgb_to_array};
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array3;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// One training example: `[3, H, W]` input and target in [-1, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePair {
    pub input: Array3<f32>,
    pub target: Array3<f32>,
}

/// Indexed collection of (input, target) pairs
///
/// `Send + Sync` so a loader can decode on a background thread.
pub trait PairedDataset: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode and normalise the pair at `index`
    fn get(&self, index: usize) -> Result<ImagePair>;
}

/// Directory of side-by-side images: left half input, right half target
///
/// Both halves are resized to `image_size × image_size` (bilinear).
#[derive(Debug, Clone)]
pub struct FolderDataset {
    root: PathBuf,
    files: Vec<PathBuf>,
    image_size: u32,
}

impl FolderDataset {
    /// Index every PNG/JPEG directly under `root`, sorted by file name
    pub fn open(root: impl AsRef<Path>, image_size: u32) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&root)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if path.is_file() && is_image {
                files.push(path);
            }
        }
        files.sort();
        tracing::debug!(root = %root.display(), images = files.len(), "dataset indexed");
        Ok(Self { root, files, image_size })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

/// Split a side-by-side image and resize both halves
pub fn split_pair(image: &RgbImage, image_size: u32) -> Result<(RgbImage, RgbImage)> {
    let (width, height) = image.dimensions();
    if width < 2 || height == 0 {
        return Err(Error::Image(format!("paired image too small: {width}x{height}")));
    }
    let half = width / 2;
    let input = image::imageops::crop_imm(image, 0, 0, half, height).to_image();
    let target = image::imageops::crop_imm(image, half, 0, half, height).to_image();
    Ok((
        resize_square(&input, image_size, FilterType::Triangle),
        resize_square(&target, image_size, FilterType::Triangle),
    ))
}

impl PairedDataset for FolderDataset {
    fn len(&self) -> usize {
        self.files.len()
    }

    fn get(&self, index: usize) -> Result<ImagePair> {
        let path = self.files.get(index).ok_or_else(|| {
            Error::InvalidParameter(format!("index {index} out of range for {} images", self.len()))
        })?;
        let image = load_rgb(path)
            .map_err(|e| Error::Image(format!("{}: {e}", path.display())))?;
        let (input, target) = split_pair(&image, self.image_size)?;
        Ok(ImagePair { input: rgb_to_array(&input), target: rgb_to_array(&target) })
    }
}

/// Pairs held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    pairs: Vec<ImagePair>,
}

impl MemoryDataset {
    pub fn new(pairs: Vec<ImagePair>) -> Self {
        Self { pairs }
    }
}

impl PairedDataset for MemoryDataset {
    fn len(&self) -> usize {
        self.pairs.len()
    }

    fn get(&self, index: usize) -> Result<ImagePair> {
        self.pairs.get(index).cloned().ok_or_else(|| {
            Error::InvalidParameter(format!("index {index} out of range for {} pairs", self.len()))
        })
    }
}
