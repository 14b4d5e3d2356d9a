//! Pitch tracker configuration.

use core::convert::TryFrom;

use crate::common::{is_supported_fft_size, MAX_FFT_SIZE, MIN_FFT_SIZE};
use crate::error::Error;
use crate::pitch_gate::GateSettings;

/// How the autocorrelation of a window is computed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AutocorrelationMethod {
    /// Zero padded forward and inverse FFT. O(n log n).
    Fft,
    /// A sum of products per lag. O(n²), only practical for small windows.
    Direct,
}

/// How the pitch period is picked from the autocorrelation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PeakPickingMethod {
    /// MPM style key maxima with a relative threshold and parabolic interpolation.
    KeyMaxima,
    /// The highest value after the first zero crossing. Prone to octave errors.
    HighestPeak,
}

/// The interpolation curve a host uses when moving its parameter towards a
/// published value. Numeric ids match the host's curve enumeration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SmoothingCurve {
    Log3 = 0,
    Sine = 1,
    Log1 = 2,
    InvSCurve = 3,
    Linear = 4,
    SCurve = 5,
    Exp1 = 6,
    SineRecip = 7,
    Exp3 = 8,
    Constant = 9,
}

impl TryFrom<u32> for SmoothingCurve {
    type Error = Error;

    fn try_from(id: u32) -> Result<Self, Error> {
        Ok(match id {
            0 => SmoothingCurve::Log3,
            1 => SmoothingCurve::Sine,
            2 => SmoothingCurve::Log1,
            3 => SmoothingCurve::InvSCurve,
            4 => SmoothingCurve::Linear,
            5 => SmoothingCurve::SCurve,
            6 => SmoothingCurve::Exp1,
            7 => SmoothingCurve::SineRecip,
            8 => SmoothingCurve::Exp3,
            9 => SmoothingCurve::Constant,
            _ => return Err(Error::UnknownSmoothingCurve(id)),
        })
    }
}

/// Where and how published values are delivered. Passed through to the
/// [PitchSink](crate::PitchSink) unchanged.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutputSettings {
    /// The host id of the parameter driven by the published pitch.
    pub parameter_id: u32,
    /// The time over which the host should glide to a new value.
    pub smoothing_ms: u32,
    pub curve: SmoothingCurve,
}

impl Default for OutputSettings {
    fn default() -> Self {
        OutputSettings {
            parameter_id: 0,
            smoothing_ms: 0,
            curve: SmoothingCurve::Log3,
        }
    }
}

/// Pitch tracker settings. See [Config::validate] for the accepted ranges.
///
/// With the `serde` feature, missing fields take their default values,
/// except for a missing `hop_size`, which follows `window_size`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "ConfigPreset"))]
pub struct Config {
    /// The analysis window length in input samples, i.e before downsampling (default: 2048).
    pub window_size: usize,
    /// Only every n:th sample is analyzed (default: 2).
    pub downsampling_factor: usize,
    /// The number of input samples between consecutive analyses (default: the window size).
    /// Presets that leave it out get the preset's window size.
    pub hop_size: usize,
    /// The maximum number of key maxima considered per analysis (default: 8).
    pub max_key_maxima: usize,
    /// Key maxima with a correlation of at least this fraction of the highest
    /// one are pitch period candidates (default: 0.9).
    pub key_maxima_threshold_multiplier: f32,
    /// Correlations above this value count as pitched (default: 0.8).
    pub clarity_threshold: f32,
    /// How long the input must be unpitched before 0 is published (default: 50).
    pub unpitched_cooldown_ms: u32,
    /// Publish 0 after the cooldown. If false, the last pitch is held (default: false).
    pub zero_out_unpitched: bool,
    pub autocorrelation: AutocorrelationMethod,
    pub peak_picking: PeakPickingMethod,
    pub output: OutputSettings,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            window_size: 2048,
            downsampling_factor: 2,
            hop_size: 2048,
            max_key_maxima: 8,
            key_maxima_threshold_multiplier: 0.9,
            clarity_threshold: 0.8,
            unpitched_cooldown_ms: 50,
            zero_out_unpitched: false,
            autocorrelation: AutocorrelationMethod::Fft,
            peak_picking: PeakPickingMethod::KeyMaxima,
            output: OutputSettings::default(),
        }
    }
}

/// A possibly partial [Config] as stored in a preset.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
#[serde(default)]
struct ConfigPreset {
    window_size: usize,
    downsampling_factor: usize,
    hop_size: Option<usize>,
    max_key_maxima: usize,
    key_maxima_threshold_multiplier: f32,
    clarity_threshold: f32,
    unpitched_cooldown_ms: u32,
    zero_out_unpitched: bool,
    autocorrelation: AutocorrelationMethod,
    peak_picking: PeakPickingMethod,
    output: OutputSettings,
}

#[cfg(feature = "serde")]
impl Default for ConfigPreset {
    fn default() -> Self {
        let config = Config::default();
        ConfigPreset {
            window_size: config.window_size,
            downsampling_factor: config.downsampling_factor,
            hop_size: None,
            max_key_maxima: config.max_key_maxima,
            key_maxima_threshold_multiplier: config.key_maxima_threshold_multiplier,
            clarity_threshold: config.clarity_threshold,
            unpitched_cooldown_ms: config.unpitched_cooldown_ms,
            zero_out_unpitched: config.zero_out_unpitched,
            autocorrelation: config.autocorrelation,
            peak_picking: config.peak_picking,
            output: config.output,
        }
    }
}

#[cfg(feature = "serde")]
impl From<ConfigPreset> for Config {
    fn from(preset: ConfigPreset) -> Self {
        Config {
            window_size: preset.window_size,
            downsampling_factor: preset.downsampling_factor,
            hop_size: preset.hop_size.unwrap_or(preset.window_size),
            max_key_maxima: preset.max_key_maxima,
            key_maxima_threshold_multiplier: preset.key_maxima_threshold_multiplier,
            clarity_threshold: preset.clarity_threshold,
            unpitched_cooldown_ms: preset.unpitched_cooldown_ms,
            zero_out_unpitched: preset.zero_out_unpitched,
            autocorrelation: preset.autocorrelation,
            peak_picking: preset.peak_picking,
            output: preset.output,
        }
    }
}

impl Config {
    /// Sets the window size and makes the hop size equal to it.
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self.hop_size = window_size;
        self
    }

    pub fn with_downsampling_factor(mut self, downsampling_factor: usize) -> Self {
        self.downsampling_factor = downsampling_factor;
        self
    }

    pub fn with_hop_size(mut self, hop_size: usize) -> Self {
        self.hop_size = hop_size;
        self
    }

    pub fn with_max_key_maxima(mut self, max_key_maxima: usize) -> Self {
        self.max_key_maxima = max_key_maxima;
        self
    }

    pub fn with_key_maxima_threshold_multiplier(mut self, multiplier: f32) -> Self {
        self.key_maxima_threshold_multiplier = multiplier;
        self
    }

    pub fn with_clarity_threshold(mut self, clarity_threshold: f32) -> Self {
        self.clarity_threshold = clarity_threshold;
        self
    }

    pub fn with_unpitched_cooldown_ms(mut self, cooldown_ms: u32) -> Self {
        self.unpitched_cooldown_ms = cooldown_ms;
        self
    }

    pub fn with_zero_out_unpitched(mut self, zero_out_unpitched: bool) -> Self {
        self.zero_out_unpitched = zero_out_unpitched;
        self
    }

    pub fn with_autocorrelation(mut self, method: AutocorrelationMethod) -> Self {
        self.autocorrelation = method;
        self
    }

    pub fn with_peak_picking(mut self, method: PeakPickingMethod) -> Self {
        self.peak_picking = method;
        self
    }

    pub fn with_output(mut self, output: OutputSettings) -> Self {
        self.output = output;
        self
    }

    /// The number of samples in the downsampled window that is actually analyzed.
    pub fn analysis_window_size(&self) -> usize {
        self.window_size / self.downsampling_factor.max(1)
    }

    /// The number of downsampled samples between consecutive analyses.
    pub fn analysis_hop_size(&self) -> usize {
        self.hop_size / self.downsampling_factor.max(1)
    }

    pub(crate) fn gate_settings(&self) -> GateSettings {
        GateSettings {
            clarity_threshold: self.clarity_threshold,
            unpitched_cooldown_ms: self.unpitched_cooldown_ms as f32,
            zero_out_unpitched: self.zero_out_unpitched,
        }
    }

    /// Checks that the settings can be used for pitch tracking.
    pub fn validate(&self) -> Result<(), Error> {
        let factor = self.downsampling_factor;
        if factor == 0 || self.window_size % factor != 0 {
            return Err(Error::InvalidDownsampling {
                factor,
                window_size: self.window_size,
            });
        }

        // The autocorrelation FFT is twice as long as the analysis window
        let analysis_window_size = self.analysis_window_size();
        if !analysis_window_size.is_power_of_two() || 2 * analysis_window_size < MIN_FFT_SIZE {
            return Err(Error::InvalidWindowSize(analysis_window_size));
        }
        if !is_supported_fft_size(2 * analysis_window_size) {
            return Err(Error::WindowTooLarge {
                size: analysis_window_size,
                max: MAX_FFT_SIZE / 2,
            });
        }

        if self.hop_size < factor || self.hop_size > self.window_size || self.hop_size % factor != 0
        {
            return Err(Error::InvalidHopSize(self.hop_size));
        }

        if self.max_key_maxima == 0 {
            return Err(Error::InvalidKeyMaximaCount);
        }

        let multiplier = self.key_maxima_threshold_multiplier;
        if !(multiplier > 0.0 && multiplier <= 1.0) {
            return Err(Error::InvalidThresholdMultiplier(multiplier));
        }

        let clarity = self.clarity_threshold;
        if !(clarity > 0.0 && clarity < 1.0) {
            return Err(Error::InvalidClarityThreshold(clarity));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.analysis_window_size(), 1024);
        assert_eq!(config.analysis_hop_size(), 1024);
    }

    #[test]
    fn test_window_size() {
        let config = Config::default().with_downsampling_factor(1);
        assert_eq!(config.with_window_size(2048).validate(), Ok(()));
        assert_eq!(config.with_window_size(4).validate(), Ok(()));
        assert_eq!(
            config.with_window_size(1000).validate(),
            Err(Error::InvalidWindowSize(1000))
        );
        assert_eq!(
            config.with_window_size(2).validate(),
            Err(Error::InvalidWindowSize(2))
        );
        assert_eq!(
            config.with_window_size(4096).validate(),
            Err(Error::WindowTooLarge {
                size: 4096,
                max: 2048
            })
        );
        // Downsampling brings the analysis window within range
        assert_eq!(
            config
                .with_window_size(8192)
                .with_downsampling_factor(4)
                .validate(),
            Ok(())
        );
    }

    #[test]
    fn test_downsampling() {
        assert_eq!(
            Config::default().with_downsampling_factor(0).validate(),
            Err(Error::InvalidDownsampling {
                factor: 0,
                window_size: 2048
            })
        );
        assert_eq!(
            Config::default()
                .with_window_size(2040)
                .with_downsampling_factor(3)
                .validate(),
            Err(Error::InvalidWindowSize(680))
        );
        assert!(matches!(
            Config::default()
                .with_window_size(2048)
                .with_downsampling_factor(3)
                .validate(),
            Err(Error::InvalidDownsampling { factor: 3, .. })
        ));
    }

    #[test]
    fn test_hop_size() {
        let config = Config::default();
        assert_eq!(config.with_hop_size(2).validate(), Ok(()));
        assert_eq!(config.with_hop_size(0).validate(), Err(Error::InvalidHopSize(0)));
        assert_eq!(config.with_hop_size(3).validate(), Err(Error::InvalidHopSize(3)));
        assert_eq!(
            config.with_hop_size(4096).validate(),
            Err(Error::InvalidHopSize(4096))
        );
    }

    #[test]
    fn test_thresholds() {
        let config = Config::default();
        assert_eq!(
            config.with_max_key_maxima(0).validate(),
            Err(Error::InvalidKeyMaximaCount)
        );
        assert_eq!(config.with_key_maxima_threshold_multiplier(1.0).validate(), Ok(()));
        assert_eq!(
            config.with_key_maxima_threshold_multiplier(0.0).validate(),
            Err(Error::InvalidThresholdMultiplier(0.0))
        );
        assert!(config
            .with_key_maxima_threshold_multiplier(f32::NAN)
            .validate()
            .is_err());
        assert_eq!(
            config.with_clarity_threshold(1.0).validate(),
            Err(Error::InvalidClarityThreshold(1.0))
        );
    }

    #[test]
    fn test_smoothing_curve_ids() {
        assert_eq!(SmoothingCurve::try_from(4), Ok(SmoothingCurve::Linear));
        assert_eq!(SmoothingCurve::try_from(9), Ok(SmoothingCurve::Constant));
        assert_eq!(SmoothingCurve::Exp3 as u32, 8);
        assert_eq!(
            SmoothingCurve::try_from(10),
            Err(Error::UnknownSmoothingCurve(10))
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_partial_config() {
        let config: Config = serde_json::from_str(
            r#"{"window_size": 1024, "hop_size": 512, "zero_out_unpitched": true}"#,
        )
        .unwrap();
        assert_eq!(config.window_size, 1024);
        assert_eq!(config.hop_size, 512);
        assert!(config.zero_out_unpitched);
        assert_eq!(config.max_key_maxima, 8);
        assert_eq!(config.validate(), Ok(()));

        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<Config>(&json).unwrap(), config);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_hop_size_follows_window_size() {
        let config: Config = serde_json::from_str(r#"{"window_size": 1024}"#).unwrap();
        assert_eq!(config.hop_size, 1024);
        assert_eq!(config.validate(), Ok(()));

        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }
}
