//! Convolution autograd operations: conv2d and conv_transpose2d
//!
//! Both are lowered to matrix products over an im2col buffer. The sample
//! loop runs on the rayon pool; each sample's columns are rebuilt during the
//! backward pass instead of being kept alive with the graph.

use crate::autograd::context::is_grad_enabled;
use crate::autograd::tensor::GradCell;
use crate::autograd::{BackwardOp, Tensor};
use ndarray::{
    Array1, Array2, Array3, ArrayD, ArrayView2, ArrayView3, ArrayView4, Axis, Ix4, IxDyn,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// How samples outside the input border are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaddingMode {
    /// Out-of-range samples are zero
    #[default]
    Zeros,
    /// Mirror the input at the border, excluding the edge sample
    Reflect,
}

/// Kernel geometry shared by both convolution directions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvGeometry {
    pub kernel: usize,
    pub stride: usize,
    pub padding: usize,
    pub padding_mode: PaddingMode,
}

impl ConvGeometry {
    pub fn new(kernel: usize, stride: usize, padding: usize, padding_mode: PaddingMode) -> Self {
        Self { kernel, stride, padding, padding_mode }
    }

    /// Spatial output length of a forward convolution
    pub fn conv_output_len(&self, input: usize) -> Option<usize> {
        let padded = input + 2 * self.padding;
        if padded < self.kernel || self.stride == 0 {
            return None;
        }
        Some((padded - self.kernel) / self.stride + 1)
    }

    /// Spatial output length of a transposed convolution
    pub fn transpose_output_len(&self, input: usize) -> Option<usize> {
        if input == 0 {
            return None;
        }
        ((input - 1) * self.stride + self.kernel).checked_sub(2 * self.padding)
    }
}

/// Map a padded coordinate back to the input, or `None` for a zero sample
fn source_index(pos: isize, len: usize, mode: PaddingMode) -> Option<usize> {
    let len = len as isize;
    if (0..len).contains(&pos) {
        return Some(pos as usize);
    }
    match mode {
        PaddingMode::Zeros => None,
        PaddingMode::Reflect => {
            let mirrored = if pos < 0 { -pos } else { 2 * (len - 1) - pos };
            (0..len).contains(&mirrored).then_some(mirrored as usize)
        }
    }
}

/// Offsets (source index per output position) for one kernel tap along one axis
fn tap_sources(g: &ConvGeometry, tap: usize, out_len: usize, in_len: usize) -> Vec<Option<usize>> {
    (0..out_len)
        .map(|o| {
            let pos = (o * g.stride + tap) as isize - g.padding as isize;
            source_index(pos, in_len, g.padding_mode)
        })
        .collect()
}

/// Gather `[C, H, W]` into `[C*k*k, out_h*out_w]`
fn im2col(x: ArrayView3<f32>, g: &ConvGeometry, out_h: usize, out_w: usize) -> Array2<f32> {
    let (channels, h, w) = x.dim();
    let k = g.kernel;
    let mut cols = Array2::zeros((channels * k * k, out_h * out_w));

    for ki in 0..k {
        let rows_src = tap_sources(g, ki, out_h, h);
        for kj in 0..k {
            let cols_src = tap_sources(g, kj, out_w, w);
            for c in 0..channels {
                let plane = x.index_axis(Axis(0), c);
                let mut dst = cols.row_mut((c * k + ki) * k + kj);
                for (oh, sh) in rows_src.iter().enumerate() {
                    let Some(sh) = *sh else { continue };
                    for (ow, sw) in cols_src.iter().enumerate() {
                        if let Some(sw) = *sw {
                            dst[oh * out_w + ow] = plane[[sh, sw]];
                        }
                    }
                }
            }
        }
    }

    cols
}

/// Adjoint of [`im2col`]: scatter-add `[C*k*k, out_h*out_w]` into `[C, h, w]`
fn col2im(
    cols: ArrayView2<f32>,
    channels: usize,
    h: usize,
    w: usize,
    g: &ConvGeometry,
    out_h: usize,
    out_w: usize,
) -> Array3<f32> {
    let k = g.kernel;
    let mut image = Array3::zeros((channels, h, w));

    for ki in 0..k {
        let rows_src = tap_sources(g, ki, out_h, h);
        for kj in 0..k {
            let cols_src = tap_sources(g, kj, out_w, w);
            for c in 0..channels {
                let src = cols.row((c * k + ki) * k + kj);
                let mut plane = image.index_axis_mut(Axis(0), c);
                for (oh, sh) in rows_src.iter().enumerate() {
                    let Some(sh) = *sh else { continue };
                    for (ow, sw) in cols_src.iter().enumerate() {
                        if let Some(sw) = *sw {
                            plane[[sh, sw]] += src[oh * out_w + ow];
                        }
                    }
                }
            }
        }
    }

    image
}

fn view4(a: &ArrayD<f32>) -> ArrayView4<'_, f32> {
    a.view().into_dimensionality::<Ix4>().expect("convolution operands are 4-D")
}

fn as_matrix(a: &ArrayD<f32>, rows: usize, cols: usize) -> ArrayView2<'_, f32> {
    a.view()
        .into_shape_with_order((rows, cols))
        .expect("weight tensors are contiguous with matching element count")
}

fn stack_samples(samples: Vec<Array3<f32>>) -> ArrayD<f32> {
    let views: Vec<_> = samples.iter().map(Array3::view).collect();
    ndarray::stack(Axis(0), &views).expect("per-sample outputs share a shape").into_dyn()
}

fn add_bias(out: &mut Array3<f32>, bias: Option<&ArrayD<f32>>) {
    if let Some(bias) = bias {
        for (mut plane, &b) in out.outer_iter_mut().zip(bias.iter()) {
            plane += b;
        }
    }
}

/// 2-D convolution
///
/// `x: [N, C, H, W]`, `weight: [O, C, k, k]`, `bias: [O]`. Output spatial size
/// is `(H + 2p - k) / s + 1`. Callers validate shapes; see `nn::Conv2d`.
pub fn conv2d(x: &Tensor, weight: &Tensor, bias: Option<&Tensor>, geometry: ConvGeometry) -> Tensor {
    let xv = view4(x.data());
    let (n, c, h, w) = xv.dim();
    let out_channels = weight.shape()[0];
    let k = geometry.kernel;
    let out_h = geometry.conv_output_len(h).expect("kernel larger than padded input");
    let out_w = geometry.conv_output_len(w).expect("kernel larger than padded input");
    let w2 = as_matrix(weight.data(), out_channels, c * k * k);
    let bias_data = bias.map(Tensor::data);

    let samples: Vec<Array3<f32>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let cols = im2col(xv.index_axis(Axis(0), i), &geometry, out_h, out_w);
            let mut out = w2
                .dot(&cols)
                .into_shape_with_order((out_channels, out_h, out_w))
                .expect("matmul output is contiguous");
            add_bias(&mut out, bias_data);
            out
        })
        .collect();

    let requires_grad = is_grad_enabled()
        && (x.requires_grad() || weight.requires_grad() || bias.is_some_and(Tensor::requires_grad));
    let mut result = Tensor::new(stack_samples(samples), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(Conv2dBackward {
            x: x.clone(),
            weight: weight.clone(),
            bias: bias.cloned(),
            geometry,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct Conv2dBackward {
    x: Tensor,
    weight: Tensor,
    bias: Option<Tensor>,
    geometry: ConvGeometry,
    result_grad: GradCell,
}

impl BackwardOp for Conv2dBackward {
    fn backward(&self) {
        let grad_ref = self.result_grad.borrow();
        let Some(grad) = grad_ref.as_ref() else { return };

        let g = &self.geometry;
        let xv = view4(self.x.data());
        let gv = view4(grad);
        let (n, c, h, w) = xv.dim();
        let (_, out_channels, out_h, out_w) = gv.dim();
        let ckk = c * g.kernel * g.kernel;
        let w2 = as_matrix(self.weight.data(), out_channels, ckk);
        let need_x = self.x.requires_grad();

        let per_sample: Vec<(Option<Array3<f32>>, Array2<f32>, Array1<f32>)> = (0..n)
            .into_par_iter()
            .map(|i| {
                let g_i = gv
                    .index_axis(Axis(0), i)
                    .to_shape((out_channels, out_h * out_w))
                    .expect("gradient reshape")
                    .into_owned();
                let cols = im2col(xv.index_axis(Axis(0), i), g, out_h, out_w);
                // ∂L/∂W = G · colsᵀ
                let grad_w = g_i.dot(&cols.t());
                let grad_b = g_i.sum_axis(Axis(1));
                // ∂L/∂x = col2im(Wᵀ · G)
                let grad_x = need_x.then(|| {
                    let dcols = w2.t().dot(&g_i);
                    col2im(dcols.view(), c, h, w, g, out_h, out_w)
                });
                (grad_x, grad_w, grad_b)
            })
            .collect();

        let mut grad_w = Array2::<f32>::zeros((out_channels, ckk));
        let mut grad_b = Array1::<f32>::zeros(out_channels);
        let mut grad_x = Vec::with_capacity(n);
        for (gx, gw, gb) in per_sample {
            grad_w += &gw;
            grad_b += &gb;
            if let Some(gx) = gx {
                grad_x.push(gx);
            }
        }

        if need_x {
            self.x.accumulate_grad(stack_samples(grad_x));
        }
        if self.weight.requires_grad() {
            let shaped = grad_w
                .into_shape_with_order(IxDyn(self.weight.shape()))
                .expect("weight gradient reshape");
            self.weight.accumulate_grad(shaped);
        }
        if let Some(bias) = self.bias.as_ref().filter(|b| b.requires_grad()) {
            bias.accumulate_grad(grad_b.into_dyn());
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        let mut inputs = vec![&self.x, &self.weight];
        if let Some(bias) = &self.bias {
            inputs.push(bias);
        }
        inputs
    }
}

/// 2-D transposed (fractionally-strided) convolution
///
/// `x: [N, C_in, H, W]`, `weight: [C_in, C_out, k, k]`, `bias: [C_out]`.
/// Output spatial size is `(H - 1) * s + k - 2p`; padding is always zeros.
pub fn conv_transpose2d(
    x: &Tensor,
    weight: &Tensor,
    bias: Option<&Tensor>,
    geometry: ConvGeometry,
) -> Tensor {
    let geometry = ConvGeometry { padding_mode: PaddingMode::Zeros, ..geometry };
    let xv = view4(x.data());
    let (n, in_channels, h, w) = xv.dim();
    let out_channels = weight.shape()[1];
    let k = geometry.kernel;
    let out_h = geometry.transpose_output_len(h).expect("invalid transposed geometry");
    let out_w = geometry.transpose_output_len(w).expect("invalid transposed geometry");
    let w2 = as_matrix(weight.data(), in_channels, out_channels * k * k);
    let bias_data = bias.map(Tensor::data);

    let samples: Vec<Array3<f32>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let x_i = xv
                .index_axis(Axis(0), i)
                .to_shape((in_channels, h * w))
                .expect("input reshape")
                .into_owned();
            let cols = w2.t().dot(&x_i);
            let mut out = col2im(cols.view(), out_channels, out_h, out_w, &geometry, h, w);
            add_bias(&mut out, bias_data);
            out
        })
        .collect();

    let requires_grad = is_grad_enabled()
        && (x.requires_grad() || weight.requires_grad() || bias.is_some_and(Tensor::requires_grad));
    let mut result = Tensor::new(stack_samples(samples), requires_grad);

    if requires_grad {
        let backward_op = Rc::new(ConvTranspose2dBackward {
            x: x.clone(),
            weight: weight.clone(),
            bias: bias.cloned(),
            geometry,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct ConvTranspose2dBackward {
    x: Tensor,
    weight: Tensor,
    bias: Option<Tensor>,
    geometry: ConvGeometry,
    result_grad: GradCell,
}

impl BackwardOp for ConvTranspose2dBackward {
    fn backward(&self) {
        let grad_ref = self.result_grad.borrow();
        let Some(grad) = grad_ref.as_ref() else { return };

        let g = &self.geometry;
        let xv = view4(self.x.data());
        let gv = view4(grad);
        let (n, in_channels, h, w) = xv.dim();
        let out_channels = gv.dim().1;
        let okk = out_channels * g.kernel * g.kernel;
        let w2 = as_matrix(self.weight.data(), in_channels, okk);
        let need_x = self.x.requires_grad();

        let per_sample: Vec<(Option<Array3<f32>>, Array2<f32>, Array1<f32>)> = (0..n)
            .into_par_iter()
            .map(|i| {
                let g_i = gv.index_axis(Axis(0), i);
                let x_i = xv
                    .index_axis(Axis(0), i)
                    .to_shape((in_channels, h * w))
                    .expect("input reshape")
                    .into_owned();
                let dcols = im2col(g_i, g, h, w);
                let grad_w = x_i.dot(&dcols.t());
                let grad_b = g_i.sum_axis(Axis(2)).sum_axis(Axis(1));
                let grad_x = need_x.then(|| {
                    w2.dot(&dcols)
                        .into_shape_with_order((in_channels, h, w))
                        .expect("input gradient reshape")
                });
                (grad_x, grad_w, grad_b)
            })
            .collect();

        let mut grad_w = Array2::<f32>::zeros((in_channels, okk));
        let mut grad_b = Array1::<f32>::zeros(out_channels);
        let mut grad_x = Vec::with_capacity(n);
        for (gx, gw, gb) in per_sample {
            grad_w += &gw;
            grad_b += &gb;
            if let Some(gx) = gx {
                grad_x.push(gx);
            }
        }

        if need_x {
            self.x.accumulate_grad(stack_samples(grad_x));
        }
        if self.weight.requires_grad() {
            let shaped = grad_w
                .into_shape_with_order(IxDyn(self.weight.shape()))
                .expect("weight gradient reshape");
            self.weight.accumulate_grad(shaped);
        }
        if let Some(bias) = self.bias.as_ref().filter(|b| b.requires_grad()) {
            bias.accumulate_grad(grad_b.into_dyn());
        }
    }

    fn inputs(&self) -> Vec<&Tensor> {
        let mut inputs = vec![&self.x, &self.weight];
        if let Some(bias) = &self.bias {
            inputs.push(bias);
        }
        inputs
    }
}
