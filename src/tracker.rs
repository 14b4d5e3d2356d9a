use alloc::{boxed::Box, vec};

use crate::common::{
    autocorr_direct, freq_to_midi_note, lag_to_frequency, AnalysisWindow, AudioBlock,
    Autocorrelator, Window,
};
use crate::config::{AutocorrelationMethod, Config, OutputSettings, PeakPickingMethod};
use crate::error::Error;
use crate::mpm::KeyMaxima;
use crate::pitch_gate::{GateState, PitchGate};

/// A value published by a [PitchTracker], along with the settings the host
/// should use to deliver it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PitchUpdate {
    /// A frequency in Hz, or 0 if there is no pitch.
    pub value: f32,
    pub output: OutputSettings,
}

/// Receives published pitch values. Implemented for any `FnMut(PitchUpdate)`.
pub trait PitchSink {
    fn publish(&mut self, update: PitchUpdate);
}

impl<F: FnMut(PitchUpdate)> PitchSink for F {
    fn publish(&mut self, update: PitchUpdate) {
        self(update)
    }
}

/// The outcome of the most recent analysis.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Analysis {
    /// The selected pitch period in downsampled samples, 0 if there was no candidate.
    pub lag: f32,
    /// The normalized autocorrelation at the selected lag, a.k.a clarity.
    pub correlation: f32,
    /// The frequency corresponding to `lag`, 0 if there was no candidate.
    /// Reported regardless of whether it passed the clarity threshold.
    pub frequency: f32,
    /// The MIDI note corresponding to `frequency`.
    pub midi_note: f32,
    /// The number of pitch period candidates that were found.
    pub key_maxima_count: usize,
    /// The RMS level of the analyzed window.
    pub window_rms: f32,
}

/// Tracks the pitch of a monophonic audio stream, one block at a time.
///
/// * Collects downsampled mono input into a sliding window
/// * Computes the normalized autocorrelation of the window once enough new samples have arrived
/// * Picks the autocorrelation peak corresponding to the pitch period
/// * Decides whether to publish a new frequency, 0 or nothing at all
///
/// All buffers are allocated on construction. Processing a block never
/// allocates and never fails.
pub struct PitchTracker {
    /// The input sample rate in Hz.
    sample_rate: u32,
    config: Config,
    window: AnalysisWindow,
    autocorrelator: Autocorrelator,
    coefficients: Box<[f32]>,
    key_maxima: KeyMaxima,
    gate: PitchGate,
    analysis: Option<Analysis>,
    /// Input frames processed since the gate was last updated.
    frames_since_gate_update: usize,
}

impl PitchTracker {
    pub fn new(sample_rate: u32, config: Config) -> Result<Self, Error> {
        if sample_rate == 0 {
            return Err(Error::InvalidSampleRate);
        }
        config.validate()?;

        let analysis_window_size = config.analysis_window_size();
        let tracker = PitchTracker {
            sample_rate,
            config,
            window: AnalysisWindow::new(
                analysis_window_size,
                config.analysis_hop_size(),
                config.downsampling_factor,
            )?,
            autocorrelator: Autocorrelator::new(analysis_window_size)?,
            coefficients: vec![0.0; analysis_window_size].into_boxed_slice(),
            key_maxima: KeyMaxima::new(config.max_key_maxima)?,
            gate: PitchGate::new(config.gate_settings()),
            analysis: None,
            frames_since_gate_update: 0,
        };

        log::info!(
            "pitch tracker at {} Hz: window {} (analyzed {}), hop {}, downsampling {}",
            sample_rate,
            config.window_size,
            analysis_window_size,
            config.hop_size,
            config.downsampling_factor
        );

        Ok(tracker)
    }

    /// Processes a block of audio and hands any published value to `sink`.
    ///
    /// Returns the published value, if any. See [PitchTracker::process_block].
    pub fn process<B, S>(&mut self, block: &B, sink: &mut S) -> Option<f32>
    where
        B: AudioBlock + ?Sized,
        S: PitchSink + ?Sized,
    {
        let published = self.process_block(block);
        if let Some(value) = published {
            sink.publish(PitchUpdate {
                value,
                output: self.config.output,
            });
        }
        published
    }

    /// Processes a block of audio.
    ///
    /// Returns a frequency in Hz if a pitch was detected, `Some(0.0)` if the
    /// input has been unpitched for longer than the cooldown time (and zeroing
    /// is enabled) or `None` if the output should be left unchanged. `None` is
    /// also returned for blocks that did not trigger an analysis.
    pub fn process_block<B: AudioBlock + ?Sized>(&mut self, block: &B) -> Option<f32> {
        self.frames_since_gate_update = self
            .frames_since_gate_update
            .saturating_add(block.frame_count());
        self.window.ingest(block);
        if !self.window.is_ready() {
            return None;
        }

        let analysis = self.analyze();
        self.window.mark_analyzed();
        self.analysis = Some(analysis);

        let elapsed_ms =
            1000.0 * (self.frames_since_gate_update as f32) / (self.sample_rate as f32);
        self.frames_since_gate_update = 0;
        self.gate.update(
            analysis.lag,
            analysis.correlation,
            self.analysis_sample_rate(),
            elapsed_ms,
        )
    }

    fn analyze(&mut self) -> Analysis {
        let has_energy = match self.config.autocorrelation {
            AutocorrelationMethod::Fft => self
                .autocorrelator
                .compute(&self.window, &mut self.coefficients),
            AutocorrelationMethod::Direct => autocorr_direct(&self.window, &mut self.coefficients),
        };

        let key_maxima_count = if has_energy {
            match self.config.peak_picking {
                PeakPickingMethod::KeyMaxima => self.key_maxima.find(&self.coefficients),
                PeakPickingMethod::HighestPeak => self.key_maxima.find_highest(&self.coefficients),
            }
        } else {
            log::debug!("silent analysis window");
            self.key_maxima.clear();
            0
        };

        let (lag, correlation) = self
            .key_maxima
            .pick_best(self.config.key_maxima_threshold_multiplier)
            .map_or((0.0, 0.0), |key_max| (key_max.lag, key_max.correlation));
        let frequency = lag_to_frequency(lag, self.analysis_sample_rate());

        let analysis = Analysis {
            lag,
            correlation,
            frequency,
            midi_note: freq_to_midi_note(frequency),
            key_maxima_count,
            window_rms: self.window.rms_level(),
        };
        log::trace!("{:?}", analysis);
        analysis
    }

    /// Publishes 0 to `sink` so that the host parameter is not left at a
    /// stale pitch, then resets the tracker.
    pub fn terminate<S: PitchSink + ?Sized>(&mut self, sink: &mut S) {
        sink.publish(PitchUpdate {
            value: 0.0,
            output: self.config.output,
        });
        self.reset();
    }

    /// Forgets all input and restores the initial gate state.
    pub fn reset(&mut self) {
        self.window.reset();
        self.coefficients.fill(0.0);
        self.key_maxima.clear();
        self.gate.reset();
        self.analysis = None;
        self.frames_since_gate_update = 0;
    }

    /// Replaces the configuration, resizing all buffers. On error, the
    /// tracker is left untouched.
    pub fn reconfigure(&mut self, config: Config) -> Result<(), Error> {
        *self = PitchTracker::new(self.sample_rate, config)?;
        Ok(())
    }

    /// The most recent analysis, if any window has been analyzed since
    /// construction or the last reset.
    pub fn analysis(&self) -> Option<&Analysis> {
        self.analysis.as_ref()
    }

    /// The normalized autocorrelation of the most recently analyzed window.
    pub fn coefficients(&self) -> &[f32] {
        &self.coefficients
    }

    /// The pitch period candidates of the most recently analyzed window.
    pub fn key_maxima(&self) -> &KeyMaxima {
        &self.key_maxima
    }

    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    /// The value the host parameter is held at, i.e the most recently
    /// published value since construction or the last reset.
    pub fn last_published(&self) -> Option<f32> {
        self.gate.last_published()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The sample rate of the analyzed, downsampled signal.
    pub fn analysis_sample_rate(&self) -> f32 {
        (self.sample_rate as f32) / (self.config.downsampling_factor as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn generate_sine(sample_rate: f32, frequency: f32, amplitude: f32, sample_count: usize) -> Vec<f32> {
        (0..sample_count)
            .map(|i| {
                amplitude * (2.0 * core::f32::consts::PI * frequency * (i as f32) / sample_rate).sin()
            })
            .collect()
    }

    /// Feeds `input` in blocks of `block_size` and returns what each block published.
    fn run(tracker: &mut PitchTracker, input: &[f32], block_size: usize) -> Vec<Option<f32>> {
        input
            .chunks(block_size)
            .map(|block| tracker.process_block(block))
            .collect()
    }

    fn assert_frequency(published: &[Option<f32>], frequency: f32, tolerance: f32) {
        let values: Vec<f32> = published.iter().flatten().copied().collect();
        assert!(!values.is_empty());
        for value in values {
            assert!(
                (value - frequency).abs() <= tolerance * frequency,
                "expected {} Hz, got {} Hz",
                frequency,
                value
            );
        }
    }

    #[test]
    fn test_invalid_settings() {
        assert!(matches!(
            PitchTracker::new(0, Config::default()),
            Err(Error::InvalidSampleRate)
        ));
        assert!(matches!(
            PitchTracker::new(48000, Config::default().with_window_size(1000)),
            Err(Error::InvalidWindowSize(500))
        ));
    }

    #[test]
    fn test_sine_detection() {
        let sample_rate = 48000;
        let frequency = 220.0;
        let config = Config::default()
            .with_window_size(2048)
            .with_downsampling_factor(1);
        let mut tracker = PitchTracker::new(sample_rate, config).unwrap();
        let input = generate_sine(sample_rate as f32, frequency, 1.0, sample_rate as usize);

        let published = run(&mut tracker, &input, 512);
        // Nothing is published until the first window is full
        assert_eq!(published[..3], [None, None, None]);
        assert_frequency(&published, frequency, 0.01);

        let analysis = tracker.analysis().unwrap();
        assert!((analysis.frequency - frequency).abs() <= 0.01 * frequency);
        assert!(analysis.correlation > 0.85);
        assert!(analysis.key_maxima_count >= 2);
        assert!((analysis.midi_note - 57.0).abs() < 0.2);
        assert!((analysis.window_rms - core::f32::consts::FRAC_1_SQRT_2).abs() < 0.05);
        assert_eq!(tracker.gate_state(), GateState::Pitched);
        assert!((tracker.coefficients()[0] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_downsampled_sine_detection() {
        let sample_rate = 44100;
        let frequency = 440.0;
        let config = Config::default().with_hop_size(512);
        let mut tracker = PitchTracker::new(sample_rate, config).unwrap();
        assert_eq!(tracker.coefficients().len(), 1024);
        assert_eq!(tracker.analysis_sample_rate(), 22050.0);

        let input = generate_sine(sample_rate as f32, frequency, 0.5, sample_rate as usize);
        // A block size that is not a multiple of the downsampling factor
        let published = run(&mut tracker, &input, 333);
        assert_frequency(&published, frequency, 0.01);
    }

    #[test]
    fn test_stereo_input() {
        let sample_rate = 48000;
        let frequency = 330.0;
        let config = Config::default().with_window_size(1024).with_hop_size(256);
        let mut tracker = PitchTracker::new(sample_rate, config).unwrap();

        let left = generate_sine(sample_rate as f32, frequency, 1.0, 24000);
        let right = generate_sine(sample_rate as f32, frequency, 0.5, 24000);
        let mut published = Vec::new();
        for (left, right) in left.chunks(256).zip(right.chunks(256)) {
            let block: [&[f32]; 2] = [left, right];
            published.push(tracker.process_block(&block[..]));
        }
        assert_frequency(&published, frequency, 0.01);
        assert!((tracker.analysis().unwrap().window_rms - 0.75 * core::f32::consts::FRAC_1_SQRT_2).abs() < 0.05);
    }

    #[test]
    fn test_silence_is_not_a_pitch() {
        let config = Config::default()
            .with_window_size(1024)
            .with_zero_out_unpitched(true)
            .with_unpitched_cooldown_ms(0);
        let mut tracker = PitchTracker::new(48000, config).unwrap();
        let silence = [0.0; 4096];

        // Each block fills the downsampled window
        for value in run(&mut tracker, &silence, 1024) {
            assert_eq!(value, Some(0.0));
        }

        let analysis = tracker.analysis().unwrap();
        assert_eq!(analysis.lag, 0.0);
        assert_eq!(analysis.correlation, 0.0);
        assert_eq!(analysis.frequency, 0.0);
        assert_eq!(analysis.midi_note, 0.0);
        assert_eq!(analysis.key_maxima_count, 0);
        assert!(tracker.coefficients().iter().all(|c| *c == 0.0));
    }

    #[test]
    fn test_silence_holds_without_zero_out() {
        let mut tracker = PitchTracker::new(48000, Config::default()).unwrap();
        let silence = [0.0; 8192];
        assert!(run(&mut tracker, &silence, 512).iter().all(|v| v.is_none()));
        assert_eq!(tracker.gate_state(), GateState::UnpitchedWithinCooldown);
    }

    #[test]
    fn test_noise_is_not_pitched() {
        let mut rng = StdRng::seed_from_u64(1234);
        let noise: Vec<f32> = (0..48000).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let config = Config::default()
            .with_window_size(1024)
            .with_downsampling_factor(1);
        let mut tracker = PitchTracker::new(48000, config).unwrap();

        assert!(run(&mut tracker, &noise, 512).iter().all(|v| v.is_none()));
        assert!(tracker.analysis().unwrap().correlation < 0.8);
    }

    #[test]
    fn test_cooldown_after_tone_ends() {
        let sample_rate = 48000;
        let hop_size = 256;
        let config = Config::default()
            .with_window_size(1024)
            .with_downsampling_factor(1)
            .with_hop_size(hop_size)
            .with_zero_out_unpitched(true)
            .with_unpitched_cooldown_ms(50);
        let mut tracker = PitchTracker::new(sample_rate, config).unwrap();

        let mut input = generate_sine(sample_rate as f32, 500.0, 1.0, 94 * hop_size);
        input.extend(core::iter::repeat(0.0).take(94 * hop_size));
        let published = run(&mut tracker, &input, hop_size);

        let last_pitched = published
            .iter()
            .rposition(|v| matches!(v, Some(f) if *f > 0.0))
            .unwrap();
        let first_zero = published.iter().position(|v| *v == Some(0.0)).unwrap();
        assert!(first_zero > last_pitched);

        // Each update adds 256 / 48 ms, so the 10th unpitched update is the first past 50 ms
        let holds = &published[last_pitched + 1..first_zero];
        assert!(holds.len() >= 9);
        assert!(holds.iter().all(|v| v.is_none()));
        assert!(published[first_zero..].iter().all(|v| *v == Some(0.0)));
        assert_eq!(tracker.gate_state(), GateState::UnpitchedPastCooldown);
    }

    #[test]
    fn test_fft_and_direct_autocorrelation_agree() {
        let sample_rate = 16000;
        let input = generate_sine(sample_rate as f32, 300.0, 1.0, 1024);
        let config = Config::default()
            .with_window_size(256)
            .with_downsampling_factor(1);

        let mut fft_tracker = PitchTracker::new(sample_rate, config).unwrap();
        let mut direct_tracker = PitchTracker::new(
            sample_rate,
            config.with_autocorrelation(AutocorrelationMethod::Direct),
        )
        .unwrap();
        run(&mut fft_tracker, &input, 256);
        run(&mut direct_tracker, &input, 256);

        for (a, b) in fft_tracker
            .coefficients()
            .iter()
            .zip(direct_tracker.coefficients().iter())
        {
            assert!((a - b).abs() < 1e-3);
        }
        let fft_analysis = fft_tracker.analysis().unwrap();
        let direct_analysis = direct_tracker.analysis().unwrap();
        assert!((fft_analysis.lag - direct_analysis.lag).abs() < 0.05);
        assert!((fft_analysis.frequency - 300.0).abs() < 6.0);
    }

    #[test]
    fn test_highest_peak_picking() {
        let sample_rate = 48000;
        let config = Config::default()
            .with_window_size(2048)
            .with_downsampling_factor(1)
            .with_peak_picking(PeakPickingMethod::HighestPeak);
        let mut tracker = PitchTracker::new(sample_rate, config).unwrap();
        let input = generate_sine(sample_rate as f32, 220.0, 1.0, 4096);

        let published = run(&mut tracker, &input, 1024);
        assert_frequency(&published, 220.0, 0.01);
        assert_eq!(tracker.key_maxima().len(), 1);
        let lag = tracker.analysis().unwrap().lag;
        assert_eq!(lag, lag.round());
    }

    #[test]
    fn test_sink_receives_output_settings() {
        let output = OutputSettings {
            parameter_id: 7,
            smoothing_ms: 20,
            curve: crate::config::SmoothingCurve::Linear,
        };
        let config = Config::default()
            .with_window_size(1024)
            .with_hop_size(512)
            .with_output(output);
        let mut tracker = PitchTracker::new(48000, config).unwrap();
        let input = generate_sine(48000.0, 440.0, 1.0, 4800);

        let mut updates: Vec<PitchUpdate> = Vec::new();
        let mut sink = |update: PitchUpdate| updates.push(update);
        let mut returned = Vec::new();
        for block in input.chunks(480) {
            returned.push(tracker.process(block, &mut sink));
        }
        tracker.terminate(&mut sink);

        let returned: Vec<f32> = returned.into_iter().flatten().collect();
        assert!(!returned.is_empty());
        assert_eq!(updates.len(), returned.len() + 1);
        for (update, value) in updates.iter().zip(returned.iter()) {
            assert_eq!(update.value, *value);
            assert_eq!(update.output, output);
        }

        // Terminating publishes 0 and starts over
        let last = updates.last().unwrap();
        assert_eq!(last.value, 0.0);
        assert_eq!(last.output, output);
        assert!(tracker.analysis().is_none());
        assert_eq!(tracker.gate_state(), GateState::UnpitchedWithinCooldown);
    }

    #[test]
    fn test_last_published_is_held_while_unpitched() {
        let config = Config::default().with_window_size(1024);
        let mut tracker = PitchTracker::new(48000, config).unwrap();
        assert_eq!(tracker.last_published(), None);

        let input = generate_sine(48000.0, 440.0, 1.0, 1024);
        let published = tracker.process_block(&input[..]);
        assert!(published.is_some());
        assert_eq!(tracker.last_published(), published);

        // Zeroing is off by default, so silence holds the last pitch
        let silence = [0.0; 4096];
        assert!(run(&mut tracker, &silence, 1024).iter().all(|v| v.is_none()));
        assert_eq!(tracker.last_published(), published);

        tracker.reset();
        assert_eq!(tracker.last_published(), None);
    }

    #[test]
    fn test_reset_requires_a_new_window() {
        let config = Config::default().with_window_size(1024);
        let mut tracker = PitchTracker::new(48000, config).unwrap();
        let input = generate_sine(48000.0, 440.0, 1.0, 1024);
        assert!(tracker.process_block(&input[..]).is_some());
        tracker.reset();
        assert!(tracker.analysis().is_none());
        assert_eq!(tracker.process_block(&input[..512]), None);
        assert!(tracker.process_block(&input[512..]).is_some());
    }

    #[test]
    fn test_reconfigure() {
        let mut tracker = PitchTracker::new(48000, Config::default()).unwrap();
        assert!(tracker
            .reconfigure(Config::default().with_clarity_threshold(0.0))
            .is_err());
        // A rejected configuration leaves the tracker as it was
        assert_eq!(tracker.config(), &Config::default());

        let config = Config::default()
            .with_window_size(512)
            .with_downsampling_factor(1);
        tracker.reconfigure(config).unwrap();
        assert_eq!(tracker.config(), &config);
        assert_eq!(tracker.coefficients().len(), 512);
        assert_eq!(tracker.sample_rate(), 48000);

        let input = generate_sine(48000.0, 1000.0, 1.0, 512);
        let published = tracker.process_block(&input[..]);
        assert_frequency(&[published], 1000.0, 0.01);
    }
}
