//! Request image preprocessing

use crate::error::Result;
use crate::io::{decode_rgb, resize_square, tensor_from_rgb};
use crate::model::IMAGE_SIZE;
use crate::Tensor;
use image::imageops::FilterType;

/// Decode raw upload bytes into a normalised `[3, 256, 256]` tensor
///
/// Any decodable format is accepted; the image is resized with bicubic
/// filtering regardless of its aspect ratio.
pub fn preprocess(bytes: &[u8]) -> Result<Tensor> {
    let image = decode_rgb(bytes)?;
    let resized = resize_square(&image, IMAGE_SIZE as u32, FilterType::CatmullRom);
    Ok(tensor_from_rgb(&resized))
}
