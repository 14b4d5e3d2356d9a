/// A key maximum, i.e an autocorrelation maximum between a positive and a
/// negative zero crossing that may or may not correspond to the pitch period.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct KeyMaximum {
    /// The index into the autocorrelation array corresponding to this maximum
    pub lag_index: usize,
    /// The lag, in samples, for this maximum, approximated using parabolic interpolation.
    pub lag: f32,
    /// The autocorrelation value at `lag_index`.
    pub correlation: f32,
}

impl KeyMaximum {
    pub fn new(coefficients: &[f32], lag_index: usize) -> Self {
        KeyMaximum {
            lag_index,
            lag: interpolated_peak_lag(coefficients, lag_index),
            correlation: coefficients[lag_index],
        }
    }

    /// A maximum at `lag_index` without sub-sample refinement.
    pub fn at_index(coefficients: &[f32], lag_index: usize) -> Self {
        KeyMaximum {
            lag_index,
            lag: lag_index as f32,
            correlation: coefficients[lag_index],
        }
    }
}

/// Approximates the true location of a maximum at `lag_index` by fitting a
/// parabola through it and its left and right neighbors and returning the
/// lag of the vertex.
///
/// The first and last lags have no two-sided neighborhood and are returned
/// unmodified, as are points where the three values do not form a concave
/// parabola.
pub fn interpolated_peak_lag(coefficients: &[f32], lag_index: usize) -> f32 {
    let lag = lag_index as f32;
    if lag_index == 0 || lag_index + 1 >= coefficients.len() {
        return lag;
    }

    let left = coefficients[lag_index - 1];
    let center = coefficients[lag_index];
    let right = coefficients[lag_index + 1];

    // Parabola a x^2 + b x + c through (-1, left), (0, center), (1, right)
    let a = 0.5 * (right - 2.0 * center + left);
    let b = 0.5 * (right - left);
    if a >= 0.0 {
        return lag;
    }
    lag - b / (2.0 * a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolation() {
        {
            let coefficients: [f32; 4] = [0.0, 0.0, 3.0, 0.0];
            let key_max = KeyMaximum::new(&coefficients, 2);
            assert!((key_max.lag - 2.0).abs() <= f32::EPSILON);
            assert!((key_max.correlation - 3.0).abs() <= f32::EPSILON);
        }

        {
            let coefficients: [f32; 3] = [-2.0, 0.0, -1.0];
            let key_max = KeyMaximum::new(&coefficients, 1);
            assert!((key_max.lag - 1.1666666_f32).abs() <= 1e-6);
            assert_eq!(key_max.correlation, 0.0);
        }
    }

    #[test]
    fn test_interpolation_recovers_parabola_vertex() {
        // Samples of 1 - (x - 10.3)^2 / 100
        let mut coefficients = [0.0_f32; 20];
        for (x, value) in coefficients.iter_mut().enumerate() {
            let d = x as f32 - 10.3;
            *value = 1.0 - d * d / 100.0;
        }
        assert!((interpolated_peak_lag(&coefficients, 10) - 10.3).abs() < 1e-3);
    }

    #[test]
    fn test_no_interpolation_at_boundaries() {
        let coefficients: [f32; 4] = [1.0, 0.5, 0.2, 0.9];
        assert_eq!(interpolated_peak_lag(&coefficients, 0), 0.0);
        assert_eq!(interpolated_peak_lag(&coefficients, 3), 3.0);
    }

    #[test]
    fn test_no_interpolation_without_maximum() {
        // A straight line has no vertex
        let coefficients: [f32; 3] = [0.1, 0.2, 0.3];
        assert_eq!(interpolated_peak_lag(&coefficients, 1), 1.0);
    }
}
