//! Real time [pitch](https://en.wikipedia.org/wiki/Pitch_%28music%29) tracking of monophonic audio,
//! primarily musical sounds, using the autocorrelation based peak picking of the MPM (McLeod Pitch Method)
//! algorithm described in the paper [A smarter way to find pitch](http://www.cs.otago.ac.nz/tartini/papers/A_Smarter_Way_to_Find_Pitch.pdf)
//! by Philip McLeod and Geoff Wyvill. Multiple simultaneous pitches, like in a musical chord, cannot be detected.
//!
//! Features
//! * FFT accelerated autocorrelation computation
//! * Octave error resistant pitch period selection with sub-sample precision
//! * Downsampling, increasing performance at the expense of frequency resolution
//! * Output gating, holding the most recent pitch during short unpitched gaps
//! * `no_std`. No memory is allocated apart from a modest amount on initialization.
//!
//! # Example
//!
//! ```
//! use micro_tuner::{Config, PitchTracker, PitchUpdate};
//!
//! // A pure tone at 440 Hz
//! let sample_rate = 44100;
//! let frequency = 440.0;
//! let input: Vec<f32> = (0..sample_rate)
//!     .map(|i| (2.0 * core::f32::consts::PI * frequency * (i as f32) / (sample_rate as f32)).sin())
//!     .collect();
//!
//! // Analyze 1024 samples, downsampled by 2, every 512 input samples
//! let config = Config::default().with_window_size(1024).with_hop_size(512);
//! let mut tracker = PitchTracker::new(sample_rate, config).unwrap();
//!
//! // Published values are handed to a sink, here a closure
//! let mut sink = |update: PitchUpdate| {
//!     assert!((update.value - frequency).abs() < 0.01 * frequency);
//! };
//! for block in input.chunks(256) {
//!     tracker.process(block, &mut sink);
//! }
//!
//! let analysis = tracker.analysis().unwrap();
//! println!("{} Hz, clarity {}", analysis.frequency, analysis.correlation);
//! ```
//!
//! # A note on clarity
//!
//! The correlation of the selected autocorrelation peak, a.k.a clarity, is a
//! number between zero and one telling to what degree the input is periodic.
//! It is compared to [Config::clarity_threshold] to decide whether the input
//! is pitched. The autocorrelation is not corrected for the shrinking overlap
//! at larger lags, so even a pure tone gets a clarity of roughly
//! `1 - period / window size`. Use windows spanning several periods of the
//! lowest pitch of interest.
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod common;
pub mod config;
pub mod error;
pub mod mpm;
pub mod pitch_gate;
mod tracker;

pub use config::{AutocorrelationMethod, Config, OutputSettings, PeakPickingMethod, SmoothingCurve};
pub use error::Error;
pub use pitch_gate::GateState;
pub use tracker::{Analysis, PitchSink, PitchTracker, PitchUpdate};
