//! Optimizer trait

use crate::Tensor;

/// Trait for optimization algorithms
///
/// Parameters are borrowed from a model in a stable order; stateful
/// optimizers key their buffers by position in that slice.
pub trait Optimizer {
    /// Perform a single optimization step using each parameter's gradient
    fn step(&mut self, params: &mut [&mut Tensor]);

    /// Zero out all gradients
    fn zero_grad(&mut self, params: &mut [&mut Tensor]) {
        for param in params.iter_mut() {
            param.zero_grad();
        }
    }

    /// Get learning rate
    fn lr(&self) -> f32;

    /// Set learning rate
    fn set_lr(&mut self, lr: f32);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    struct PlainDescent {
        learning_rate: f32,
    }

    impl Optimizer for PlainDescent {
        fn step(&mut self, params: &mut [&mut Tensor]) {
            for param in params.iter_mut() {
                if let Some(grad) = param.grad() {
                    let updated = param.data() - &(grad * self.learning_rate);
                    *param.data_mut() = updated;
                }
            }
        }

        fn lr(&self) -> f32 {
            self.learning_rate
        }

        fn set_lr(&mut self, lr: f32) {
            self.learning_rate = lr;
        }
    }

    #[test]
    fn test_step_skips_params_without_grad() {
        let mut opt = PlainDescent { learning_rate: 0.1 };
        let mut with_grad = Tensor::from_vec(vec![1.0, 2.0], true);
        let mut without = Tensor::from_vec(vec![3.0], true);
        with_grad.set_grad(arr1(&[0.5, 1.0]).into_dyn());

        opt.step(&mut [&mut with_grad, &mut without]);

        let data = with_grad.to_vec();
        assert!((data[0] - 0.95).abs() < 1e-6);
        assert!((data[1] - 1.9).abs() < 1e-6);
        assert_eq!(without.to_vec(), vec![3.0]);
    }

    #[test]
    fn test_default_zero_grad() {
        let mut opt = PlainDescent { learning_rate: 0.1 };
        let mut param = Tensor::from_vec(vec![1.0], true);
        param.set_grad(arr1(&[2.0]).into_dyn());
        opt.zero_grad(&mut [&mut param]);
        assert!(param.grad().map_or(true, |g| g.iter().all(|&v| v == 0.0)));
    }

    #[test]
    fn test_set_lr() {
        let mut opt = PlainDescent { learning_rate: 0.1 };
        opt.set_lr(0.01);
        assert_eq!(opt.lr(), 0.01);
    }
}
