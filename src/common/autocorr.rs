use alloc::{boxed::Box, vec};

use microfft::Complex32;

use super::fft::{fft_in_place, is_supported_fft_size};
use super::Window;
use crate::error::Error;

/// The length of the zero padded FFT used to compute the autocorrelation
/// of a window of a given size without circular convolution effects.
pub fn autocorr_fft_size(window_size: usize) -> usize {
    2 * window_size
}

/// Computes the normalized [autocorrelation](https://en.wikipedia.org/wiki/Autocorrelation)
/// of fixed size windows using FFT.
///
/// Owns the complex scratch buffer the transforms run in, so no memory
/// is allocated after construction.
pub struct Autocorrelator {
    window_size: usize,
    fft_buffer: Box<[Complex32]>,
}

impl Autocorrelator {
    pub fn new(window_size: usize) -> Result<Self, Error> {
        let fft_size = autocorr_fft_size(window_size);
        if !is_supported_fft_size(fft_size) {
            return Err(Error::UnsupportedFftSize(fft_size));
        }
        Ok(Autocorrelator {
            window_size,
            fft_buffer: vec![Complex32::new(0.0, 0.0); fft_size].into_boxed_slice(),
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Writes the autocorrelation of the first `window_size` samples of `window`,
    /// divided by its value at lag 0, to `coefficients`.
    ///
    /// Returns false if the window has no energy. The coefficients are then
    /// all zero, since the normalization is undefined.
    pub fn compute<W: Window + ?Sized>(&mut self, window: &W, coefficients: &mut [f32]) -> bool {
        let window_size = self.window_size;
        assert!(window.window_len() >= window_size);
        assert_eq!(coefficients.len(), window_size);

        // Build FFT input signal
        for (i, value) in self.fft_buffer.iter_mut().enumerate() {
            value.re = if i < window_size { window.sample(i) } else { 0.0 };
            value.im = 0.0;
        }

        if fft_in_place(&mut self.fft_buffer).is_err() {
            // The size was checked on construction
            coefficients.fill(0.0);
            return false;
        }

        // Compute the power spectral density by point-wise multiplication by the complex conjugate.
        for value in self.fft_buffer.iter_mut() {
            value.re = value.norm_sqr();
            value.im = 0.0;
        }

        // The power spectrum is real, so its inverse FFT is the forward FFT of the
        // index reversed sequence, up to a scale.
        self.fft_buffer[1..].reverse();
        if fft_in_place(&mut self.fft_buffer).is_err() {
            coefficients.fill(0.0);
            return false;
        }

        let scale = 1.0 / (self.fft_buffer.len() as f32);
        let autocorr_at_lag_0 = scale * self.fft_buffer[0].re;
        normalize(
            self.fft_buffer.iter().map(|value| scale * value.re),
            autocorr_at_lag_0,
            coefficients,
        )
    }
}

/// Computes the normalized autocorrelation of the first `coefficients.len()` samples
/// of `window` as a sum of products for each lag. Equivalent to
/// [Autocorrelator::compute] but O(n²).
pub fn autocorr_direct<W: Window + ?Sized>(window: &W, coefficients: &mut [f32]) -> bool {
    let window_size = coefficients.len();
    assert!(window.window_len() >= window_size);

    for lag in 0..window_size {
        let mut sum: f32 = 0.0;
        for i in lag..window_size {
            sum += window.sample(i) * window.sample(i - lag);
        }
        coefficients[lag] = sum;
    }

    let autocorr_at_lag_0 = coefficients[0];
    if !(autocorr_at_lag_0 > 0.0) || !autocorr_at_lag_0.is_finite() {
        coefficients.fill(0.0);
        return false;
    }
    for value in coefficients.iter_mut() {
        *value /= autocorr_at_lag_0;
    }
    true
}

fn normalize<I: Iterator<Item = f32>>(
    autocorr: I,
    autocorr_at_lag_0: f32,
    coefficients: &mut [f32],
) -> bool {
    if !(autocorr_at_lag_0 > 0.0) || !autocorr_at_lag_0.is_finite() {
        coefficients.fill(0.0);
        return false;
    }
    for (coefficient, value) in coefficients.iter_mut().zip(autocorr) {
        *coefficient = value / autocorr_at_lag_0;
    }
    // Lag 0 is exactly 1 by definition
    coefficients[0] = 1.0;
    true
}
