//! End-to-end shape contracts of the generator and critic

use boceto::autograd::{no_grad, Context, ForwardMode};
use boceto::io::tensor_to_rgb;
use boceto::model::{
    Critic, DiscriminatorConfig, GeneratorConfig, ImageGenerator, PatchDiscriminator, UNetGenerator,
};
use boceto::Tensor;

fn generator(base_channels: usize) -> UNetGenerator {
    UNetGenerator::with_seed(GeneratorConfig { base_channels, ..GeneratorConfig::default() }, 21)
}

#[test]
fn test_skip_connections_double_decoder_inputs() {
    let gen = generator(2);
    let mut ctx = Context::with_seed(ForwardMode::Inference, 0);
    let x = Tensor::full(&[1, 3, 256, 256], 0.3, false);

    let trace = no_grad(|| gen.forward_traced(&x, &mut ctx)).unwrap();
    assert_eq!(trace.output.shape(), &[1, 3, 256, 256]);
    let encoder = GeneratorConfig { base_channels: 2, ..GeneratorConfig::default() }.encoder_channels();
    assert_eq!(trace.skips.channels(), encoder.to_vec());

    // up1 sees only the bottleneck; up2..up7 and final_up each add one encoder skip
    let stages: Vec<&str> = trace.decoder_inputs.iter().map(|d| d.stage.as_str()).collect();
    assert_eq!(stages, vec!["up2", "up3", "up4", "up5", "up6", "up7", "final_up"]);
    let skip_widths: Vec<usize> = trace.decoder_inputs.iter().map(|d| d.skip).collect();
    let deepest_first: Vec<usize> = encoder.iter().rev().copied().collect();
    assert_eq!(skip_widths, deepest_first);
    for input in &trace.decoder_inputs {
        assert_eq!(input.total, input.previous + input.skip, "{}", input.stage);
        assert_eq!(input.previous, input.skip, "{}", input.stage);
    }
}

#[test]
fn test_batch_of_two_keeps_resolution() {
    let gen = generator(1);
    let disc = PatchDiscriminator::with_seed(DiscriminatorConfig::scaled_down(64), 3);
    let mut ctx = Context::with_seed(ForwardMode::Inference, 0);
    let x = Tensor::zeros(&[2, 3, 256, 256], false);

    let y = no_grad(|| gen.forward(&x, &mut ctx)).unwrap();
    assert_eq!(y.shape(), &[2, 3, 256, 256]);
    let logits = no_grad(|| disc.logits(&x, &y, &mut ctx)).unwrap();
    assert_eq!(logits.shape(), &[2, 1, 30, 30]);
}

#[test]
fn test_white_image_output_stays_in_pixel_range() {
    let gen = generator(1);
    let mut ctx = Context::with_seed(ForwardMode::Sampling, 8);
    let white = Tensor::full(&[3, 256, 256], 1.0, false);

    let out = gen.generate(&white, &mut ctx).unwrap();
    assert_eq!(out.shape(), &[3, 256, 256]);
    assert!(out.data().iter().all(|v| (-1.0..=1.0).contains(v)));

    let image = tensor_to_rgb(&out).unwrap();
    assert_eq!(image.dimensions(), (256, 256));
}
