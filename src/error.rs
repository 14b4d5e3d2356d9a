//! Configuration errors.
//!
//! All errors are raised when a buffer or a tracker is created or
//! reconfigured. Processing a block never fails; degenerate input
//! shows up as an unpitched result instead.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("buffer capacity must be greater than 0")]
    ZeroCapacity,

    #[error("analysis window size {0} must be a power of two and at least 4 samples")]
    InvalidWindowSize(usize),

    #[error("analysis window size {size} exceeds the largest supported size {max}")]
    WindowTooLarge { size: usize, max: usize },

    #[error("downsampling factor {factor} must be greater than 0 and evenly divide the window size {window_size}")]
    InvalidDownsampling { factor: usize, window_size: usize },

    #[error("hop size {0} must be a non-zero multiple of the downsampling factor and not larger than the window size")]
    InvalidHopSize(usize),

    #[error("the maximum number of key maxima must be greater than 0")]
    InvalidKeyMaximaCount,

    #[error("key maxima threshold multiplier {0} must be in (0, 1]")]
    InvalidThresholdMultiplier(f32),

    #[error("clarity threshold {0} must be in (0, 1)")]
    InvalidClarityThreshold(f32),

    #[error("sample rate must be greater than 0")]
    InvalidSampleRate,

    #[error("unsupported FFT size {0}")]
    UnsupportedFftSize(usize),

    #[error("unknown smoothing curve id {0}")]
    UnknownSmoothingCurve(u32),
}
