//! Model I/O: SafeTensors checkpoints and image conversion
//!
//! Checkpoints store weights, batch-norm buffers and Adam state of one
//! network together with the epoch to resume from.
//!
//! # Example
//!
//! ```no_run
//! use boceto::io::{load_checkpoint, save_checkpoint};
//! use boceto::model::{GeneratorConfig, UNetGenerator};
//! use boceto::optim::Adam;
//!
//! let mut generator = UNetGenerator::new(GeneratorConfig::default());
//! let mut optimizer = Adam::new(2e-4, 0.5, 0.999, 1e-8);
//! save_checkpoint("gen.safetensors", &generator, &optimizer, 1, "unet-3x64")?;
//! let epoch = load_checkpoint("gen.safetensors", &mut generator, &mut optimizer, 2e-4)?;
//! assert_eq!(epoch, 1);
//! # Ok::<(), boceto::Error>(())
//! ```

mod checkpoint;
mod images;

pub use checkpoint::{
    inspect_checkpoint, load_checkpoint, load_weights, save_checkpoint, CheckpointInfo,
    CHECKPOINT_FORMAT,
};
pub use images::{
    decode_rgb, encode_png, load_rgb, resize_square, rgb_to_array, save_triptych,
    tensor_from_rgb, tensor_to_rgb,
};
