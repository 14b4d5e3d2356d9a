use micromath::F32Ext;

/// Positional read access to a window of samples, oldest first.
///
/// Implemented for plain slices and for [SlidingWindowBuffer](super::SlidingWindowBuffer),
/// so the analysis stages can run directly on the ring buffer without
/// copying it into contiguous memory first.
pub trait Window {
    /// The number of samples in the window.
    fn window_len(&self) -> usize;

    /// The sample at `index`, where 0 is the oldest sample.
    fn sample(&self, index: usize) -> f32;

    /// The maximum absolute value of the window.
    fn peak_level(&self) -> f32 {
        let mut max: f32 = 0.0;
        for index in 0..self.window_len() {
            let value = F32Ext::abs(self.sample(index));
            if value > max {
                max = value
            }
        }
        max
    }

    /// The [root mean square](https://en.wikipedia.org/wiki/Root_mean_square) level
    /// of the window.
    fn rms_level(&self) -> f32 {
        let len = self.window_len();
        if len == 0 {
            return 0.0;
        }
        let mut rms: f32 = 0.;
        for index in 0..len {
            let sample = self.sample(index);
            rms += sample * sample
        }
        F32Ext::sqrt(rms / (len as f32))
    }
}

impl Window for [f32] {
    fn window_len(&self) -> usize {
        self.len()
    }

    fn sample(&self, index: usize) -> f32 {
        self[index]
    }
}
