//! Execution context for forward passes

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::Cell;

/// How stochastic and statistics-dependent layers behave during a forward pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForwardMode {
    /// Batch statistics, dropout active, running statistics updated
    #[default]
    Training,
    /// Running statistics, no dropout: fully deterministic
    Inference,
    /// Running statistics with dropout active, used to draw diverse candidates
    Sampling,
}

impl ForwardMode {
    /// Normalization layers use batch statistics (and update running ones)
    pub fn uses_batch_statistics(self) -> bool {
        matches!(self, ForwardMode::Training)
    }

    /// Dropout layers zero activations
    pub fn is_stochastic(self) -> bool {
        matches!(self, ForwardMode::Training | ForwardMode::Sampling)
    }
}

/// Context threaded through every forward call
///
/// Owns the mode flag and the random source for stochastic layers, so a test
/// can pin both and get reproducible outputs.
#[derive(Debug, Clone)]
pub struct Context {
    mode: ForwardMode,
    rng: StdRng,
}

impl Context {
    /// Create a context seeded from the OS
    pub fn new(mode: ForwardMode) -> Self {
        Self { mode, rng: StdRng::from_os_rng() }
    }

    /// Create a context with a fixed seed
    pub fn with_seed(mode: ForwardMode, seed: u64) -> Self {
        Self { mode, rng: StdRng::seed_from_u64(seed) }
    }

    /// Set training mode
    pub fn train(&mut self) {
        self.mode = ForwardMode::Training;
    }

    /// Set deterministic evaluation mode
    pub fn eval(&mut self) {
        self.mode = ForwardMode::Inference;
    }

    /// Set sampling mode
    pub fn sampling(&mut self) {
        self.mode = ForwardMode::Sampling;
    }

    pub fn mode(&self) -> ForwardMode {
        self.mode
    }

    /// Check if in training mode
    pub fn is_training(&self) -> bool {
        self.mode == ForwardMode::Training
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(ForwardMode::Training)
    }
}

thread_local! {
    static GRAD_ENABLED: Cell<bool> = const { Cell::new(true) };
}

/// Whether ops currently record backward functions
pub fn is_grad_enabled() -> bool {
    GRAD_ENABLED.with(Cell::get)
}

struct GradModeGuard {
    previous: bool,
}

impl Drop for GradModeGuard {
    fn drop(&mut self) {
        GRAD_ENABLED.with(|flag| flag.set(self.previous));
    }
}

/// Run `f` without building a graph
pub fn no_grad<T>(f: impl FnOnce() -> T) -> T {
    let previous = GRAD_ENABLED.with(|flag| flag.replace(false));
    let _guard = GradModeGuard { previous };
    f()
}
