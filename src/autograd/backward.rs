//! Backward operation trait and graph traversal

use std::collections::HashSet;

use ndarray::ArrayD;

use super::Tensor;

/// Gradient function recorded for a non-leaf tensor
///
/// `backward` reads the gradient of the op's result and accumulates the
/// contributions into its inputs. It does not recurse: graph traversal is
/// owned by [`backward`], which calls every op exactly once.
pub trait BackwardOp {
    fn backward(&self);

    /// Operands of the op, used to order the traversal
    fn inputs(&self) -> Vec<&Tensor>;
}

/// Perform backward pass from `tensor`
///
/// Seeds the root with `grad_output` (ones when `None`) and runs every
/// reachable op in reverse topological order, so shared activations receive
/// the full sum of their downstream gradients before propagating further.
pub fn backward(tensor: &Tensor, grad_output: Option<ArrayD<f32>>) {
    let seed = grad_output.unwrap_or_else(|| ArrayD::ones(tensor.data().raw_dim()));
    tensor.set_grad(seed);

    for node in topological_order(tensor).iter().rev() {
        if let Some(op) = node.backward_op() {
            op.backward();
        }
    }
}

/// Post-order of the graph below `root` (inputs before consumers)
fn topological_order(root: &Tensor) -> Vec<Tensor> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    // (node, children already pushed)
    let mut stack: Vec<(Tensor, bool)> = vec![(root.clone(), false)];

    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            order.push(node);
            continue;
        }
        if !visited.insert(node.id()) {
            continue;
        }
        let op = node.backward_op();
        stack.push((node, true));
        if let Some(op) = op {
            for input in op.inputs() {
                if input.requires_grad() && !visited.contains(&input.id()) {
                    stack.push((input.clone(), false));
                }
            }
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autograd::{add, mul, scale, sum};

    #[test]
    fn test_shared_node_receives_full_gradient() {
        // y = sum((x * 2) + (x * 2)) → dy/dx = 4
        let x = Tensor::from_vec(vec![1.0, -1.0, 3.0], true);
        let h = scale(&x, 2.0);
        let y = sum(&add(&h, &h));
        backward(&y, None);
        assert_eq!(x.grad().unwrap().iter().copied().collect::<Vec<f32>>(), vec![4.0, 4.0, 4.0]);
    }

    #[test]
    fn test_diamond_graph() {
        // y = sum(a * b) with a = 3x, b = x + x → dy/dx = 12x
        let x = Tensor::from_vec(vec![1.0, 2.0], true);
        let a = scale(&x, 3.0);
        let b = add(&x, &x);
        let y = sum(&mul(&a, &b));
        backward(&y, None);
        assert_eq!(x.grad().unwrap().iter().copied().collect::<Vec<f32>>(), vec![12.0, 24.0]);
    }

    #[test]
    fn test_custom_seed() {
        let x = Tensor::from_vec(vec![1.0], true);
        let y = scale(&x, 5.0);
        backward(&y, Some(ndarray::ArrayD::from_elem(ndarray::IxDyn(&[1]), 0.5)));
        assert_eq!(x.grad().unwrap().iter().copied().collect::<Vec<f32>>(), vec![2.5]);
    }

    #[test]
    fn test_topological_order_visits_once() {
        let x = Tensor::from_vec(vec![1.0], true);
        let h = scale(&x, 2.0);
        let y = add(&h, &h);
        let order = topological_order(&y);
        assert_eq!(order.len(), 3);
        assert_eq!(order.last().unwrap().id(), y.id());
    }
}
