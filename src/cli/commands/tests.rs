//! Tests for CLI command handlers

use super::run_command;
use crate::config::parse_args;
use crate::io::{decode_rgb, encode_png, save_checkpoint};
use crate::model::{DiscriminatorConfig, GeneratorConfig, PatchDiscriminator, UNetGenerator};
use crate::optim::Adam;
use image::{Rgb, RgbImage};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_tiny_checkpoints(dir: &Path) {
    let gen_config = GeneratorConfig { base_channels: 1, ..GeneratorConfig::default() };
    let disc_config = DiscriminatorConfig::scaled_down(64);
    let adam = Adam::new(2e-4, 0.5, 0.999, 1e-8);
    let generator = UNetGenerator::with_seed(gen_config.clone(), 1);
    let discriminator = PatchDiscriminator::with_seed(disc_config.clone(), 2);
    save_checkpoint(dir.join("gen.safetensors"), &generator, &adam, 4, &gen_config.architecture())
        .unwrap();
    save_checkpoint(
        dir.join("disc.safetensors"),
        &discriminator,
        &adam,
        4,
        &disc_config.architecture(),
    )
    .unwrap();
}

fn run(args: &[&str]) -> Result<(), String> {
    let mut argv = vec!["boceto", "--quiet"];
    argv.extend_from_slice(args);
    run_command(parse_args(argv).map_err(|e| e.to_string())?)
}

#[test]
fn test_info_text_and_json() {
    let dir = TempDir::new().unwrap();
    write_tiny_checkpoints(dir.path());
    let ckpt = dir.path().join("gen.safetensors");
    let ckpt = ckpt.to_str().unwrap();

    assert!(run(&["info", ckpt]).is_ok());
    assert!(run(&["info", ckpt, "--format", "json"]).is_ok());
    assert!(run(&["info", ckpt, "--format", "yaml"]).is_ok());
}

#[test]
fn test_info_missing_file() {
    let err = run(&["info", "/nonexistent/gen.safetensors"]).unwrap_err();
    assert!(err.starts_with("Checkpoint error"));
}

#[test]
fn test_generate_writes_png() {
    let dir = TempDir::new().unwrap();
    write_tiny_checkpoints(dir.path());
    let input = dir.path().join("sketch.png");
    fs::write(&input, encode_png(&RgbImage::from_pixel(300, 200, Rgb([255, 255, 255]))).unwrap())
        .unwrap();
    let output = dir.path().join("out/result.png");

    run(&[
        "generate",
        "--checkpoint-gen",
        dir.path().join("gen.safetensors").to_str().unwrap(),
        "--checkpoint-disc",
        dir.path().join("disc.safetensors").to_str().unwrap(),
        "--input",
        input.to_str().unwrap(),
        "--output",
        output.to_str().unwrap(),
        "-n",
        "2",
        "--seed",
        "1",
    ])
    .unwrap();

    let image = decode_rgb(&fs::read(&output).unwrap()).unwrap();
    assert_eq!(image.dimensions(), (256, 256));
}

#[test]
fn test_generate_rejects_zero_samples() {
    let dir = TempDir::new().unwrap();
    write_tiny_checkpoints(dir.path());
    let input = dir.path().join("sketch.png");
    fs::write(&input, encode_png(&RgbImage::new(8, 8)).unwrap()).unwrap();

    let err = run(&[
        "generate",
        "--checkpoint-gen",
        dir.path().join("gen.safetensors").to_str().unwrap(),
        "--checkpoint-disc",
        dir.path().join("disc.safetensors").to_str().unwrap(),
        "--input",
        input.to_str().unwrap(),
        "--output",
        dir.path().join("o.png").to_str().unwrap(),
        "-n",
        "0",
    ])
    .unwrap_err();
    assert!(err.starts_with("Generation error"));
}

#[test]
fn test_validate_and_dry_run() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("run.yaml");
    fs::write(&config, format!("data:\n  train: {}\n", dir.path().display())).unwrap();
    let config = config.to_str().unwrap();

    assert!(run(&["validate", config, "--detailed"]).is_ok());
    assert!(run(&["train", config, "--dry-run", "--epochs", "2"]).is_ok());
}

#[test]
fn test_train_override_is_validated() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("run.yaml");
    fs::write(&config, format!("data:\n  train: {}\n", dir.path().display())).unwrap();

    let err = run(&["train", config.to_str().unwrap(), "--dry-run", "--batch-size", "0"]).unwrap_err();
    assert!(err.contains("Invalid batch size"));
}

#[test]
fn test_evaluate_writes_triptychs() {
    let dir = TempDir::new().unwrap();
    write_tiny_checkpoints(dir.path());
    let val = dir.path().join("val");
    fs::create_dir_all(&val).unwrap();
    let pair = RgbImage::from_fn(64, 32, |x, _| if x < 32 { Rgb([0, 0, 0]) } else { Rgb([200, 10, 10]) });
    fs::write(val.join("a.png"), encode_png(&pair).unwrap()).unwrap();
    let out = dir.path().join("results");

    run(&[
        "evaluate",
        val.to_str().unwrap(),
        "--checkpoint-gen",
        dir.path().join("gen.safetensors").to_str().unwrap(),
        "--checkpoint-disc",
        dir.path().join("disc.safetensors").to_str().unwrap(),
        "--output-dir",
        out.to_str().unwrap(),
        "-n",
        "1",
    ])
    .unwrap();
    assert!(out.join("0000.png").exists());
}
