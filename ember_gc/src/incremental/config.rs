//! Tuning knobs of the incremental collector.

/// Default number of managed bytes above which allocation advances the collector (128 MiB)
pub const DEFAULT_BYTES_THRESHOLD: usize = 128 * 1024 * 1024;

/// Default number of objects processed per mark or sweep step for a given threshold.
///
/// A quarter of the number of pointer-sized words that fit under the threshold, and at least
/// one.
pub const fn default_step_for_threshold(bytes_threshold: usize) -> usize {
    let step = bytes_threshold / core::mem::size_of::<usize>() / 4;
    if step == 0 {
        1
    } else {
        step
    }
}

/// Tuning knobs of the incremental collector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IncrementalConfig {
    /// Allocation runs one collection step while more than this many bytes are managed
    pub bytes_threshold: usize,

    /// Maximum number of gray objects blackened per mark step. Never zero.
    pub mark_step: usize,

    /// Maximum number of objects visited per sweep step. Never zero.
    pub sweep_step: usize,
}

impl Default for IncrementalConfig {
    /// Create a new config with default values.
    fn default() -> Self {
        IncrementalConfigBuilder::new().build()
    }
}

pub struct IncrementalConfigBuilder {
    bytes_threshold: usize,
    mark_step: Option<usize>,
    sweep_step: Option<usize>,
}

impl IncrementalConfigBuilder {
    /// Create new config with default values.
    pub fn new() -> Self {
        Self {
            bytes_threshold: DEFAULT_BYTES_THRESHOLD,
            mark_step: None,
            sweep_step: None,
        }
    }

    /// Return the config that has been built, consuming the builder.
    ///
    /// Step sizes that were not set explicitly are derived from the threshold.
    pub fn build(self) -> IncrementalConfig {
        let default_step = default_step_for_threshold(self.bytes_threshold);
        IncrementalConfig {
            bytes_threshold: self.bytes_threshold,
            mark_step: self.mark_step.unwrap_or(default_step),
            sweep_step: self.sweep_step.unwrap_or(default_step),
        }
    }

    pub fn bytes_threshold(mut self, bytes_threshold: usize) -> Self {
        self.bytes_threshold = bytes_threshold;
        self
    }

    pub fn mark_step(mut self, mark_step: usize) -> Self {
        self.mark_step = Some(mark_step.max(1));
        self
    }

    pub fn sweep_step(mut self, sweep_step: usize) -> Self {
        self.sweep_step = Some(sweep_step.max(1));
        self
    }
}
