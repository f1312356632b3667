//! Weight initialisation

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded generator, or OS entropy when `seed` is `None`
pub fn init_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// `len` samples from U(-1/√fan_in, 1/√fan_in)
pub fn kaiming_uniform(len: usize, fan_in: usize, rng: &mut impl Rng) -> Vec<f32> {
    let bound = 1.0 / (fan_in.max(1) as f32).sqrt();
    (0..len).map(|_| rng.random_range(-bound..bound)).collect()
}
