//! Convolution layers

use super::init::kaiming_uniform;
use super::Module;
use crate::autograd::{conv2d, conv_transpose2d, ConvGeometry, PaddingMode};
use crate::Tensor;
use rand::Rng;

/// 2-D convolution with bias, weight layout `[out, in, k, k]`
pub struct Conv2d {
    pub weight: Tensor,
    pub bias: Tensor,
    geometry: ConvGeometry,
}

impl Conv2d {
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        geometry: ConvGeometry,
        rng: &mut impl Rng,
    ) -> Self {
        let k = geometry.kernel;
        let fan_in = in_channels * k * k;
        let shape = [out_channels, in_channels, k, k];
        let weight = kaiming_uniform(shape.iter().product(), fan_in, rng);
        let bias = kaiming_uniform(out_channels, fan_in, rng);
        Self {
            weight: Tensor::from_shape_vec(&shape, weight, true)
                .expect("initialiser length matches weight shape"),
            bias: Tensor::from_vec(bias, true),
            geometry,
        }
    }

    /// Kernel 4, stride 2, padding 1: halves the spatial size
    pub fn downsample(
        in_channels: usize,
        out_channels: usize,
        padding_mode: PaddingMode,
        rng: &mut impl Rng,
    ) -> Self {
        Self::new(in_channels, out_channels, ConvGeometry::new(4, 2, 1, padding_mode), rng)
    }

    pub fn forward(&self, x: &Tensor) -> Tensor {
        conv2d(x, &self.weight, Some(&self.bias), self.geometry)
    }

    pub fn geometry(&self) -> ConvGeometry {
        self.geometry
    }

    pub fn out_channels(&self) -> usize {
        self.weight.shape()[0]
    }
}

impl Module for Conv2d {
    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        vec![("weight".into(), &self.weight), ("bias".into(), &self.bias)]
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut Tensor)> {
        vec![("weight".into(), &mut self.weight), ("bias".into(), &mut self.bias)]
    }
}

/// Fractionally-strided convolution, weight layout `[in, out, k, k]`
///
/// Kernel 4, stride 2, padding 1: doubles the spatial size.
pub struct ConvTranspose2d {
    pub weight: Tensor,
    pub bias: Tensor,
    geometry: ConvGeometry,
}

impl ConvTranspose2d {
    pub fn upsample(in_channels: usize, out_channels: usize, rng: &mut impl Rng) -> Self {
        let geometry = ConvGeometry::new(4, 2, 1, PaddingMode::Zeros);
        let fan_in = out_channels * 16;
        let shape = [in_channels, out_channels, 4, 4];
        let weight = kaiming_uniform(shape.iter().product(), fan_in, rng);
        let bias = kaiming_uniform(out_channels, fan_in, rng);
        Self {
            weight: Tensor::from_shape_vec(&shape, weight, true)
                .expect("initialiser length matches weight shape"),
            bias: Tensor::from_vec(bias, true),
            geometry,
        }
    }

    pub fn forward(&self, x: &Tensor) -> Tensor {
        conv_transpose2d(x, &self.weight, Some(&self.bias), self.geometry)
    }

    pub fn out_channels(&self) -> usize {
        self.weight.shape()[1]
    }
}

impl Module for ConvTranspose2d {
    fn named_parameters(&self) -> Vec<(String, &Tensor)> {
        vec![("weight".into(), &self.weight), ("bias".into(), &self.bias)]
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, &mut Tensor)> {
        vec![("weight".into(), &mut self.weight), ("bias".into(), &mut self.bias)]
    }
}
