use crate::common::lag_to_frequency;

/// The outcome of the most recent [PitchGate::update].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GateState {
    /// The clarity exceeded the threshold and a frequency was published.
    Pitched,
    /// Unpitched, but not for long enough to zero out the output.
    /// Nothing was published, the last value is held.
    UnpitchedWithinCooldown,
    /// Unpitched for at least the cooldown time with zeroing enabled. 0 was published.
    UnpitchedPastCooldown,
}

/// Settings controlling when [PitchGate] publishes values.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GateSettings {
    /// Correlations above this value are considered pitched.
    pub clarity_threshold: f32,
    /// How long the input must stay unpitched before 0 is published.
    pub unpitched_cooldown_ms: f32,
    /// If false, the last pitched value is held forever while unpitched.
    pub zero_out_unpitched: bool,
}

/// Decides, once per analysis, what (if anything) to publish.
///
/// A confident pitch estimate is published right away. Short unpitched gaps
/// hold the previously published value, and only after the input has been
/// unpitched for the cooldown time is 0 published (if enabled).
pub struct PitchGate {
    settings: GateSettings,
    unpitched_elapsed_ms: f32,
    state: GateState,
    last_published: Option<f32>,
}

impl PitchGate {
    pub fn new(settings: GateSettings) -> Self {
        PitchGate {
            settings,
            unpitched_elapsed_ms: 0.0,
            state: GateState::UnpitchedWithinCooldown,
            last_published: None,
        }
    }

    /// Feeds the best pitch candidate of an analysis to the gate.
    ///
    /// * `lag` - The pitch period in samples, 0 if there is no candidate.
    /// * `correlation` - The normalized autocorrelation at `lag`.
    /// * `sample_rate` - The sample rate `lag` is expressed in.
    /// * `elapsed_ms` - The time since the previous update.
    ///
    /// Returns the value to publish, or `None` if the output should be left unchanged.
    pub fn update(
        &mut self,
        lag: f32,
        correlation: f32,
        sample_rate: f32,
        elapsed_ms: f32,
    ) -> Option<f32> {
        let is_pitched = correlation > self.settings.clarity_threshold;

        let (state, published) = if is_pitched {
            self.unpitched_elapsed_ms = 0.0;
            (GateState::Pitched, Some(lag_to_frequency(lag, sample_rate)))
        } else {
            self.unpitched_elapsed_ms += elapsed_ms;
            if self.settings.zero_out_unpitched
                && self.unpitched_elapsed_ms >= self.settings.unpitched_cooldown_ms
            {
                (GateState::UnpitchedPastCooldown, Some(0.0))
            } else {
                (GateState::UnpitchedWithinCooldown, None)
            }
        };

        if state != self.state {
            log::debug!(
                "pitch gate {:?} -> {:?} (correlation {:.3}, unpitched for {:.1} ms)",
                self.state,
                state,
                correlation,
                self.unpitched_elapsed_ms
            );
        }
        self.state = state;
        if published.is_some() {
            self.last_published = published;
        }
        published
    }

    /// Restores the state the gate had on construction.
    pub fn reset(&mut self) {
        self.unpitched_elapsed_ms = 0.0;
        self.state = GateState::UnpitchedWithinCooldown;
        self.last_published = None;
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// The accumulated time since the last pitched update.
    pub fn unpitched_elapsed_ms(&self) -> f32 {
        self.unpitched_elapsed_ms
    }

    /// The most recently published value, if any.
    pub fn last_published(&self) -> Option<f32> {
        self.last_published
    }

    pub fn settings(&self) -> &GateSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: GateSettings) {
        self.settings = settings;
    }
}
