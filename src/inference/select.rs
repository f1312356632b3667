//! Discriminator-guided best-of-N sampling

use crate::autograd::{no_grad, Context, ForwardMode};
use crate::error::{Error, Result};
use crate::io::tensor_to_rgb;
use crate::model::{Critic, ImageGenerator};
use crate::Tensor;
use image::RgbImage;
use ndarray::Axis;

/// Candidate kept by [`select_best`]
#[derive(Debug, Clone)]
pub struct Selection {
    /// Denormalised 8-bit image of the winner
    pub image: RgbImage,
    /// Winner as a `[3, 256, 256]` tensor in [-1, 1]
    pub tensor: Tensor,
    pub score: f32,
    /// Position of the winner among the samples
    pub index: usize,
    /// Score of every sample, in draw order
    pub scores: Vec<f32>,
}

/// Draw `n` candidates for `input` and keep the one the critic scores highest
///
/// Candidates are drawn in sampling mode so dropout makes them differ. A later
/// candidate replaces the current best only with a strictly higher score, so
/// ties keep the earliest. The context mode is restored before returning.
pub fn select_best(
    generator: &dyn ImageGenerator,
    critic: &dyn Critic,
    input: &Tensor,
    n: usize,
    ctx: &mut Context,
) -> Result<Selection> {
    if n == 0 {
        return Err(Error::InvalidParameter("best-of-N needs at least one sample".into()));
    }

    let previous = ctx.mode();
    ctx.sampling();
    let result = no_grad(|| draw(generator, critic, input, n, ctx));
    restore_mode(ctx, previous);
    let (tensor, index, scores) = result?;

    let score = scores[index];
    tracing::debug!(n, index, score, "best-of-N selection");
    Ok(Selection { image: tensor_to_rgb(&tensor)?, tensor, score, index, scores })
}

fn draw(
    generator: &dyn ImageGenerator,
    critic: &dyn Critic,
    input: &Tensor,
    n: usize,
    ctx: &mut Context,
) -> Result<(Tensor, usize, Vec<f32>)> {
    let batched_input = batched(input);
    let mut scores = Vec::with_capacity(n);
    let mut best: Option<(Tensor, usize, f32)> = None;

    for i in 0..n {
        let candidate = generator.generate(input, ctx)?;
        let score = critic.score(&batched_input, &batched(&candidate), ctx)?;
        scores.push(score);
        let better = match &best {
            None => true,
            Some((_, _, best_score)) => score > *best_score,
        };
        if better {
            best = Some((candidate, i, score));
        }
    }

    // n > 0, so the first sample always initialises `best`
    let (tensor, index, _) = best.ok_or_else(|| Error::InvalidParameter("no candidates drawn".into()))?;
    Ok((tensor, index, scores))
}

fn batched(image: &Tensor) -> Tensor {
    if image.shape().len() == 4 {
        return image.clone();
    }
    Tensor::constant(image.data().clone().insert_axis(Axis(0)))
}

fn restore_mode(ctx: &mut Context, mode: ForwardMode) {
    match mode {
        ForwardMode::Training => ctx.train(),
        ForwardMode::Inference => ctx.eval(),
        ForwardMode::Sampling => ctx.sampling(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Emits a constant image whose value follows a fixed sequence
    struct Sequence {
        values: Vec<f32>,
        next: Cell<usize>,
    }

    impl Sequence {
        fn new(values: &[f32]) -> Self {
            Self { values: values.to_vec(), next: Cell::new(0) }
        }
    }

    impl ImageGenerator for Sequence {
        fn generate(&self, image: &Tensor, ctx: &mut Context) -> Result<Tensor> {
            assert_eq!(ctx.mode(), ForwardMode::Sampling);
            let i = self.next.get();
            self.next.set(i + 1);
            Ok(Tensor::full(image.shape(), self.values[i % self.values.len()], false))
        }
    }

    /// Scores a pair by the candidate's mean value
    struct Brightness;

    impl Critic for Brightness {
        fn logits(&self, _input: &Tensor, candidate: &Tensor, _ctx: &mut Context) -> Result<Tensor> {
            let mean = candidate.data().mean().unwrap_or(0.0);
            Ok(Tensor::full(&[1, 1, 30, 30], mean, false))
        }
    }

    fn input() -> Tensor {
        Tensor::zeros(&[3, 8, 8], false)
    }

    #[test]
    fn test_picks_highest_score() {
        let mut ctx = Context::with_seed(ForwardMode::Inference, 0);
        let gen = Sequence::new(&[-0.5, 0.25, 0.75, 0.0]);
        let sel = select_best(&gen, &Brightness, &input(), 4, &mut ctx).unwrap();
        assert_eq!(sel.index, 2);
        assert_eq!(sel.scores.len(), 4);
        assert!(sel.scores.iter().all(|&s| sel.score >= s));
        assert_eq!(ctx.mode(), ForwardMode::Inference);
    }

    #[test]
    fn test_ties_keep_earliest() {
        let mut ctx = Context::with_seed(ForwardMode::Training, 0);
        let gen = Sequence::new(&[0.1, 0.5, 0.5, 0.5]);
        let sel = select_best(&gen, &Brightness, &input(), 4, &mut ctx).unwrap();
        assert_eq!(sel.index, 1);
        assert_eq!(ctx.mode(), ForwardMode::Training);
    }

    #[test]
    fn test_single_sample_is_returned_unchanged() {
        let mut ctx = Context::with_seed(ForwardMode::Inference, 0);
        let gen = Sequence::new(&[-1.0]);
        let sel = select_best(&gen, &Brightness, &input(), 1, &mut ctx).unwrap();
        assert_eq!(sel.index, 0);
        assert!(sel.tensor.to_vec().iter().all(|&v| v == -1.0));
        assert_eq!(sel.image.get_pixel(0, 0).0, [0, 0, 0]);
    }

    #[test]
    fn test_zero_samples_rejected() {
        let mut ctx = Context::with_seed(ForwardMode::Inference, 0);
        let gen = Sequence::new(&[0.0]);
        let result = select_best(&gen, &Brightness, &input(), 0, &mut ctx);
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_generator_error_restores_mode() {
        struct Failing;
        impl ImageGenerator for Failing {
            fn generate(&self, image: &Tensor, _ctx: &mut Context) -> Result<Tensor> {
                Err(Error::shape(&[3, 256, 256], image.shape(), "generate input"))
            }
        }
        let mut ctx = Context::with_seed(ForwardMode::Inference, 0);
        assert!(select_best(&Failing, &Brightness, &input(), 3, &mut ctx).is_err());
        assert_eq!(ctx.mode(), ForwardMode::Inference);
    }
}
