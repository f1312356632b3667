//! Conversion between RGB images and normalised tensors
//!
//! Tensors hold `[3, H, W]` values in [-1, 1]: `x = (p / 255 - 0.5) / 0.5`.

use crate::error::{Error, Result};
use crate::Tensor;
use image::imageops::FilterType;
use image::{ImageFormat, RgbImage};
use ndarray::{Array3, Axis};
use std::io::Cursor;
use std::path::Path;

/// `[3, H, W]` array in [-1, 1] from 8-bit RGB
///
/// Plain arrays are `Send`, so decoding can happen off the training thread.
pub fn rgb_to_array(image: &RgbImage) -> Array3<f32> {
    let (width, height) = image.dimensions();
    Array3::from_shape_fn((3, height as usize, width as usize), |(c, y, x)| {
        let p = image.get_pixel(x as u32, y as u32)[c];
        (f32::from(p) / 255.0 - 0.5) / 0.5
    })
}

/// `[3, H, W]` constant tensor in [-1, 1] from 8-bit RGB
pub fn tensor_from_rgb(image: &RgbImage) -> Tensor {
    Tensor::constant(rgb_to_array(image).into_dyn())
}

/// 8-bit RGB from a `[3, H, W]` or `[1, 3, H, W]` tensor in [-1, 1]
///
/// Values are mapped to [0, 1], clamped, then scaled to [0, 255] and
/// truncated, so out-of-range generator outputs never wrap.
pub fn tensor_to_rgb(tensor: &Tensor) -> Result<RgbImage> {
    let data = match tensor.shape() {
        [3, _, _] => tensor.data().view(),
        [1, 3, _, _] => tensor.data().index_axis(Axis(0), 0),
        other => return Err(Error::shape(&[3, 0, 0], other, "RGB image tensor")),
    };
    let (height, width) = (data.shape()[1], data.shape()[2]);

    let mut image = RgbImage::new(width as u32, height as u32);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        for c in 0..3 {
            let v = data[[c, y as usize, x as usize]];
            pixel[c] = denormalize(v);
        }
    }
    Ok(image)
}

fn denormalize(v: f32) -> u8 {
    let unit = (v * 0.5 + 0.5).clamp(0.0, 1.0);
    // NaN clamps to NaN and casts to 0
    (unit * 255.0) as u8
}

/// Decode any supported image format to RGB
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

pub fn load_rgb(path: impl AsRef<Path>) -> Result<RgbImage> {
    Ok(image::open(path.as_ref())?.to_rgb8())
}

/// Resize to `size × size`, ignoring the aspect ratio
pub fn resize_square(image: &RgbImage, size: u32, filter: FilterType) -> RgbImage {
    if image.dimensions() == (size, size) {
        return image.clone();
    }
    image::imageops::resize(image, size, size, filter)
}

pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Write `input | generated | target` side by side as one PNG
///
/// All three panels must share the same size.
pub fn save_triptych(
    path: impl AsRef<Path>,
    input: &Tensor,
    generated: &Tensor,
    target: &Tensor,
) -> Result<()> {
    let panels = [tensor_to_rgb(input)?, tensor_to_rgb(generated)?, tensor_to_rgb(target)?];
    let (width, height) = panels[0].dimensions();
    for panel in &panels[1..] {
        if panel.dimensions() != (width, height) {
            let (w, h) = panel.dimensions();
            return Err(Error::shape(
                &[height as usize, width as usize],
                &[h as usize, w as usize],
                "triptych panel",
            ));
        }
    }

    let mut canvas = RgbImage::new(width * 3, height);
    for (i, panel) in panels.iter().enumerate() {
        image::imageops::replace(&mut canvas, panel, i64::from(width) * i as i64, 0);
    }

    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    canvas.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}
