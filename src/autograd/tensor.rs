//! Tensor type with gradient tracking

use ndarray::{ArrayD, IxDyn};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::BackwardOp;
use crate::error::{Error, Result};

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// Shared gradient slot; clones of a tensor accumulate into the same cell
pub(crate) type GradCell = Rc<RefCell<Option<ArrayD<f32>>>>;

/// N-dimensional `f32` tensor participating in the autograd graph
///
/// Cloning is cheap: data, gradient cell and backward op are reference counted,
/// and a clone keeps the node identity of the original.
#[derive(Clone)]
pub struct Tensor {
    id: usize,
    data: Rc<ArrayD<f32>>,
    grad: GradCell,
    backward_op: Option<Rc<dyn BackwardOp>>,
    requires_grad: bool,
}

impl Tensor {
    /// Create a tensor from an owned array
    pub fn new(data: ArrayD<f32>, requires_grad: bool) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            data: Rc::new(data),
            grad: Rc::new(RefCell::new(None)),
            backward_op: None,
            requires_grad,
        }
    }

    /// Create a 1-D tensor from a vector
    pub fn from_vec(data: Vec<f32>, requires_grad: bool) -> Self {
        let len = data.len();
        let array = ArrayD::from_shape_vec(IxDyn(&[len]), data)
            .expect("1-D shape always matches vector length");
        Self::new(array, requires_grad)
    }

    /// Create a tensor with an explicit shape
    pub fn from_shape_vec(shape: &[usize], data: Vec<f32>, requires_grad: bool) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(Error::shape(&[expected], &[data.len()], "tensor element count"));
        }
        let array = ArrayD::from_shape_vec(IxDyn(shape), data)
            .map_err(|e| Error::InvalidParameter(e.to_string()))?;
        Ok(Self::new(array, requires_grad))
    }

    /// Tensor of zeros
    pub fn zeros(shape: &[usize], requires_grad: bool) -> Self {
        Self::new(ArrayD::zeros(IxDyn(shape)), requires_grad)
    }

    /// Tensor of ones
    pub fn ones(shape: &[usize], requires_grad: bool) -> Self {
        Self::new(ArrayD::ones(IxDyn(shape)), requires_grad)
    }

    /// Tensor filled with a constant value
    pub fn full(shape: &[usize], value: f32, requires_grad: bool) -> Self {
        Self::new(ArrayD::from_elem(IxDyn(shape), value), requires_grad)
    }

    /// Non-differentiable tensor
    pub fn constant(data: ArrayD<f32>) -> Self {
        Self::new(data, false)
    }

    /// Node identity, shared by clones
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn data(&self) -> &ArrayD<f32> {
        &self.data
    }

    /// Mutable access to the data (copy-on-write if the graph still holds it)
    pub fn data_mut(&mut self) -> &mut ArrayD<f32> {
        Rc::make_mut(&mut self.data)
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    pub fn set_requires_grad(&mut self, requires_grad: bool) {
        self.requires_grad = requires_grad;
    }

    /// Copy of the accumulated gradient
    pub fn grad(&self) -> Option<ArrayD<f32>> {
        self.grad.borrow().clone()
    }

    /// Overwrite the gradient
    pub fn set_grad(&self, grad: ArrayD<f32>) {
        *self.grad.borrow_mut() = Some(grad);
    }

    /// Add to the gradient, initialising it if absent
    pub fn accumulate_grad(&self, grad: ArrayD<f32>) {
        let mut slot = self.grad.borrow_mut();
        match slot.as_mut() {
            Some(existing) => *existing += &grad,
            None => *slot = Some(grad),
        }
    }

    /// Drop the accumulated gradient
    pub fn zero_grad(&self) {
        *self.grad.borrow_mut() = None;
    }

    pub(crate) fn grad_cell(&self) -> GradCell {
        Rc::clone(&self.grad)
    }

    pub fn backward_op(&self) -> Option<Rc<dyn BackwardOp>> {
        self.backward_op.clone()
    }

    pub(crate) fn set_backward_op(&mut self, op: Rc<dyn BackwardOp>) {
        self.backward_op = Some(op);
    }

    /// Same values, cut from the graph
    pub fn detach(&self) -> Tensor {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            data: Rc::clone(&self.data),
            grad: Rc::new(RefCell::new(None)),
            backward_op: None,
            requires_grad: false,
        }
    }

    /// First element; intended for scalar losses
    pub fn item(&self) -> f32 {
        self.data.iter().next().copied().unwrap_or(0.0)
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    /// Check the tensor has exactly this shape
    pub fn expect_shape(&self, expected: &[usize], context: &str) -> Result<()> {
        if self.shape() == expected {
            Ok(())
        } else {
            Err(Error::shape(expected, self.shape(), context))
        }
    }

    /// Interpret as `[N, C, H, W]`
    pub fn dims4(&self) -> Result<[usize; 4]> {
        match *self.shape() {
            [n, c, h, w] => Ok([n, c, h, w]),
            _ => Err(Error::InvalidParameter(format!(
                "expected a 4-D tensor, got shape {:?}",
                self.shape()
            ))),
        }
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("id", &self.id)
            .field("shape", &self.shape())
            .field("requires_grad", &self.requires_grad)
            .field("has_grad", &self.grad.borrow().is_some())
            .field("has_backward_op", &self.backward_op.is_some())
            .finish()
    }
}
