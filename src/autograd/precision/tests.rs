//! Tests for mixed-precision gradient handling.

use super::*;
use crate::autograd::{backward, sum, Tensor};
use crate::optim::{Adam, Optimizer};

#[test]
fn test_precision_parse_and_display() {
    assert_eq!("fp16".parse::<Precision>().unwrap(), Precision::Fp16);
    assert_eq!("BF16".parse::<Precision>().unwrap(), Precision::Bf16);
    assert!("int8".parse::<Precision>().is_err());
    assert_eq!(Precision::Bf16.to_string(), "bf16");
    assert_eq!(Precision::default(), Precision::Fp32);
}

#[test]
fn test_precision_properties() {
    assert_eq!(Precision::Fp32.size_bytes(), 4);
    assert_eq!(Precision::Fp16.size_bytes(), 2);
    assert!(Precision::Fp16.is_reduced());
    assert!(!Precision::Fp32.is_reduced());
    assert_eq!(Precision::Fp16.max_finite(), 65504.0);
}

#[test]
fn test_config_presets() {
    let fp16 = MixedPrecisionConfig::fp16();
    assert!(fp16.is_mixed());
    assert!(fp16.dynamic_scaling);
    assert_eq!(fp16.initial_scale, 65536.0);

    let bf16 = MixedPrecisionConfig::bf16();
    assert!(bf16.is_mixed());
    assert!(!bf16.dynamic_scaling);

    assert!(!MixedPrecisionConfig::fp32().is_mixed());
}

#[test]
fn test_config_yaml_partial() {
    let config: MixedPrecisionConfig =
        serde_yaml::from_str("compute_precision: bf16\ninitial_scale: 8.0\n").unwrap();
    assert_eq!(config.compute_precision, Precision::Bf16);
    assert_eq!(config.initial_scale, 8.0);
    assert_eq!(config.scale_growth_interval, 2000);
}

#[test]
fn test_fp16_overflow_and_round_trip() {
    assert!(fp16_to_f32(f32_to_fp16(70000.0)).is_infinite());
    assert_eq!(fp16_to_f32(f32_to_fp16(0.5)), 0.5);
    assert_eq!(bf16_to_f32(f32_to_bf16(-2.0)), -2.0);
    assert!(round_trip(1e-8, Precision::Fp16) == 0.0);
    assert_eq!(round_trip(1e-8, Precision::Fp32), 1e-8);
}

#[test]
fn test_unscale_and_check() {
    let scaler = GradScaler::from_config(&MixedPrecisionConfig::fp16().with_initial_scale(100.0));
    let mut grads = vec![100.0, 200.0, 300.0];
    assert!(scaler.unscale_and_check(&mut grads));
    assert_eq!(grads, vec![1.0, 2.0, 3.0]);

    let mut overflow = vec![100.0, 1e6, 300.0];
    assert!(!scaler.unscale_and_check(&mut overflow));
}

#[test]
fn test_record_growth_and_backoff() {
    let mut scaler = GradScaler::new(1000.0);
    scaler.growth_interval = 2;
    scaler.record(true);
    scaler.record(true);
    assert_eq!(scaler.scale_factor(), 2000.0);
    assert_eq!(scaler.successful_steps(), 2);

    scaler.record(false);
    assert_eq!(scaler.scale_factor(), 1000.0);
    assert_eq!(scaler.overflow_count(), 1);
}

#[test]
fn test_scale_floor_and_static_mode() {
    let mut scaler = GradScaler::new(1.0);
    scaler.record(false);
    assert_eq!(scaler.scale_factor(), 1.0);

    let mut fixed = GradScaler::from_config(&MixedPrecisionConfig::bf16().with_initial_scale(1000.0).with_dynamic_scaling(false));
    fixed.record(false);
    assert_eq!(fixed.scale_factor(), 1000.0);
}

#[test]
fn test_scaled_step_recovers_true_gradient() {
    let mut param = Tensor::from_vec(vec![1.0, -1.0], true);
    let mut scaler = GradScaler::new(1024.0);
    let mut optimizer = Adam::new(0.1, 0.9, 0.999, 1e-8);

    let loss = scaler.scale(&sum(&param));
    assert_eq!(loss.item(), 0.0);
    backward(&loss, None);
    assert_eq!(param.grad().unwrap().iter().copied().collect::<Vec<f32>>(), vec![1024.0, 1024.0]);

    assert!(scaler.step(&mut optimizer, &mut [&mut param]));
    scaler.update();
    assert_eq!(param.grad().unwrap().iter().copied().collect::<Vec<f32>>(), vec![1.0, 1.0]);
    assert!(param.data()[0] < 1.0);
}

#[test]
fn test_overflow_skips_step_and_backs_off() {
    let mut param = Tensor::from_vec(vec![1.0], true);
    let mut scaler = GradScaler::default();
    let mut optimizer = Adam::new(0.1, 0.9, 0.999, 1e-8);

    // 2^16 × 2 exceeds the largest finite f16
    let loss = scaler.scale(&crate::autograd::scale(&param, 2.0));
    backward(&loss, None);

    assert!(!scaler.step(&mut optimizer, &mut [&mut param]));
    scaler.update();
    assert_eq!(param.to_vec(), vec![1.0]);
    assert_eq!(scaler.loss_scale(), 32768.0);
    assert_eq!(optimizer.lr(), 0.1);
}

#[test]
fn test_noop_scaler_steps_directly() {
    let mut param = Tensor::from_vec(vec![0.0], true);
    let mut scaler = scaler_from_config(&MixedPrecisionConfig::fp32());
    let mut optimizer = Adam::new(0.5, 0.9, 0.999, 1e-8);
    assert_eq!(scaler.loss_scale(), 1.0);

    backward(&scaler.scale(&sum(&param)), None);
    assert!(scaler.step(&mut optimizer, &mut [&mut param]));
    scaler.update();
    assert!(param.data()[0] < 0.0);
}
