//! Common building blocks: buffering, FFT and autocorrelation.

mod analysis_window;
mod audio_block;
mod autocorr;
mod conversion;
mod fft;
mod sliding_window;
mod window;

pub use analysis_window::AnalysisWindow;
pub use audio_block::AudioBlock;
pub use autocorr::{autocorr_direct, autocorr_fft_size, Autocorrelator};
pub use conversion::{freq_to_midi_note, lag_to_frequency};
pub use fft::{fft_in_place, is_supported_fft_size, MAX_FFT_SIZE, MIN_FFT_SIZE};
pub use sliding_window::SlidingWindowBuffer;
pub use window::Window;
