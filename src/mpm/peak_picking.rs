use alloc::{boxed::Box, vec};

use super::key_maximum::KeyMaximum;
use crate::error::Error;

/// Gathers key maxima from the first half of a normalized autocorrelation
/// function, ignoring the lobe around lag 0.
///
/// A key maximum is the largest value between a positive zero crossing and
/// the following negative zero crossing. A value of exactly 0 between
/// values of opposite sign counts as a crossing. Its lag is refined using parabolic
/// interpolation. A lobe that is still open at the end of the scanned range
/// is included as well. At most `out.len()` maxima are gathered, in order of
/// increasing lag.
///
/// Returns the number of maxima written to `out`.
pub fn find_key_maxima(coefficients: &[f32], out: &mut [KeyMaximum]) -> usize {
    let mut count = 0;
    if out.is_empty() {
        return count;
    }

    let mut is_inside_lobe = false;
    let mut lobe_max: Option<KeyMaximum> = None;
    let mut lobe_max_correlation: f32 = 0.0;

    for lag in 1..coefficients.len() / 2 {
        let prev = coefficients[lag - 1];
        let curr = coefficients[lag];
        let next = coefficients[lag + 1];

        if prev < 0.0 && curr >= 0.0 && next > 0.0 {
            // Positive zero crossing, going from - to +. A lobe that dipped
            // below zero without a negative crossing ends here.
            if is_inside_lobe {
                if let Some(key_max) = lobe_max {
                    out[count] = key_max;
                    count += 1;
                    if count == out.len() {
                        return count;
                    }
                }
            }
            // Start looking for a new key maximum.
            is_inside_lobe = true;
            lobe_max = None;
            lobe_max_correlation = 0.0;
        } else if prev > 0.0 && curr <= 0.0 && next < 0.0 {
            // Negative zero crossing, the lobe is complete.
            if is_inside_lobe {
                if let Some(key_max) = lobe_max.take() {
                    out[count] = key_max;
                    count += 1;
                    if count == out.len() {
                        return count;
                    }
                }
            }
            is_inside_lobe = false;
        }

        if is_inside_lobe && curr > lobe_max_correlation {
            lobe_max_correlation = curr;
            lobe_max = Some(KeyMaximum::new(coefficients, lag));
        }
    }

    if is_inside_lobe {
        if let Some(key_max) = lobe_max {
            out[count] = key_max;
            count += 1;
        }
    }

    count
}

/// Picks the key maximum assumed to correspond to the pitch period.
///
/// This is the first maximum, in order of increasing lag, whose correlation
/// is at least `threshold_multiplier` times the largest correlation among all
/// maxima. Preferring the smallest qualifying lag over the globally largest
/// correlation avoids reporting a sub-harmonic (an octave too low) when it
/// happens to correlate marginally better than the fundamental.
///
/// Returns `None` if `maxima` is empty.
pub fn pick_best_maximum(maxima: &[KeyMaximum], threshold_multiplier: f32) -> Option<usize> {
    if maxima.is_empty() {
        return None;
    }

    let mut highest_index = 0;
    let mut highest_correlation = maxima[0].correlation;
    for (index, key_max) in maxima.iter().enumerate().skip(1) {
        if key_max.correlation > highest_correlation {
            highest_index = index;
            highest_correlation = key_max.correlation;
        }
    }

    let threshold = threshold_multiplier * highest_correlation;
    maxima
        .iter()
        .position(|key_max| key_max.correlation >= threshold)
        .or(Some(highest_index))
}

/// Finds the lag with the largest autocorrelation value after the first zero
/// crossing, within the first half of the autocorrelation function. No
/// interpolation is performed. Returns `None` if there is no positive value
/// after the first zero crossing.
pub fn find_highest_peak_lag(coefficients: &[f32]) -> Option<usize> {
    let mut has_crossed_zero = false;
    let mut peak: Option<(usize, f32)> = None;
    for lag in 1..coefficients.len() / 2 {
        let prev = coefficients[lag - 1];
        let curr = coefficients[lag];
        if (prev > 0.0 && curr <= 0.0) || (prev < 0.0 && curr >= 0.0) {
            has_crossed_zero = true;
        }
        if has_crossed_zero && curr > peak.map_or(0.0, |(_, value)| value) {
            peak = Some((lag, curr));
        }
    }
    peak.map(|(lag, _)| lag)
}

/// A fixed capacity list of key maxima, reused between analyses.
pub struct KeyMaxima {
    maxima: Box<[KeyMaximum]>,
    count: usize,
}

impl KeyMaxima {
    pub fn new(max_count: usize) -> Result<Self, Error> {
        if max_count == 0 {
            return Err(Error::InvalidKeyMaximaCount);
        }
        Ok(KeyMaxima {
            maxima: vec![KeyMaximum::default(); max_count].into_boxed_slice(),
            count: 0,
        })
    }

    /// Replaces the current maxima with the ones found in `coefficients`.
    /// Returns the number of maxima found.
    pub fn find(&mut self, coefficients: &[f32]) -> usize {
        self.count = find_key_maxima(coefficients, &mut self.maxima);
        self.count
    }

    /// Replaces the current maxima with the single highest peak found in
    /// `coefficients` after the first zero crossing.
    pub fn find_highest(&mut self, coefficients: &[f32]) -> usize {
        self.count = match find_highest_peak_lag(coefficients) {
            Some(lag) => {
                self.maxima[0] = KeyMaximum::at_index(coefficients, lag);
                1
            }
            None => 0,
        };
        self.count
    }

    /// See [pick_best_maximum].
    pub fn pick_best(&self, threshold_multiplier: f32) -> Option<&KeyMaximum> {
        pick_best_maximum(self.as_slice(), threshold_multiplier).map(|index| &self.maxima[index])
    }

    pub fn clear(&mut self) {
        self.count = 0;
    }

    pub fn as_slice(&self) -> &[KeyMaximum] {
        &self.maxima[..self.count]
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The maximum number of key maxima gathered per analysis.
    pub fn capacity(&self) -> usize {
        self.maxima.len()
    }
}
