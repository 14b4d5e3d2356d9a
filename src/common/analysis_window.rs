use super::{AudioBlock, SlidingWindowBuffer, Window};
use crate::error::Error;

/// Turns blocks of multichannel audio into a sliding window of downsampled
/// mono samples.
///
/// * Averages all channels of each frame
/// * Keeps every n:th frame, where n is the downsampling factor. The selection
///   continues seamlessly across blocks whose length is not a multiple of n.
/// * After each block, exposes the most recent `window_size` samples oldest
///   first through the [Window] trait
/// * Tells when enough new samples have arrived to analyze the window again
pub struct AnalysisWindow {
    buffer: SlidingWindowBuffer<f32>,
    window_size: usize,
    downsampling: usize,
    downsampled_hop_size: usize,
    // The index of the first frame to keep in the next block
    first_read_index: usize,
    has_filled_first_window: bool,
    sample_counter: usize,
    samples_since_analysis: usize,
}

fn validate_sizes(window_size: usize, downsampled_hop_size: usize, downsampling: usize) -> Result<(), Error> {
    if window_size == 0 {
        return Err(Error::ZeroCapacity);
    }
    if downsampling == 0 {
        return Err(Error::InvalidDownsampling {
            factor: downsampling,
            window_size,
        });
    }
    if downsampled_hop_size == 0 || downsampled_hop_size > window_size {
        return Err(Error::InvalidHopSize(downsampled_hop_size));
    }
    Ok(())
}

impl AnalysisWindow {
    /// * `window_size` - The number of downsampled samples in the window.
    /// * `downsampled_hop_size` - The number of new downsampled samples needed between analyses.
    /// * `downsampling` - Only every `downsampling`:th frame is kept.
    pub fn new(
        window_size: usize,
        downsampled_hop_size: usize,
        downsampling: usize,
    ) -> Result<Self, Error> {
        validate_sizes(window_size, downsampled_hop_size, downsampling)?;
        Ok(AnalysisWindow {
            buffer: SlidingWindowBuffer::new(window_size)?,
            window_size,
            downsampling,
            downsampled_hop_size,
            first_read_index: 0,
            has_filled_first_window: false,
            sample_counter: 0,
            samples_since_analysis: 0,
        })
    }

    /// Forgets all ingested samples.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.first_read_index = 0;
        self.has_filled_first_window = false;
        self.sample_counter = 0;
        self.samples_since_analysis = 0;
    }

    /// Adds the frames of `block` to the window.
    /// Returns the number of downsampled samples added.
    pub fn ingest<B: AudioBlock + ?Sized>(&mut self, block: &B) -> usize {
        // Only samples from this block are unread while ingesting, which
        // leaves room for a full window.
        self.buffer.align_cursors();

        let frame_count = block.frame_count();
        let mut pushed = 0;
        let mut dropped = 0;
        let mut frame = self.first_read_index;
        while frame < frame_count {
            if self.buffer.is_full() {
                // This block alone holds more than a window. Keep the newest samples.
                self.buffer.set_len(self.window_size - 1, false);
                dropped += 1;
            }
            pushed += self.buffer.push_sample(block.mono_sample_at(frame));
            frame += self.downsampling;
        }
        self.first_read_index = frame - frame_count;

        if dropped > 0 {
            log::warn!(
                "block of {} frames exceeds the analysis window, dropped {} samples",
                frame_count,
                dropped
            );
        }

        self.sample_counter = self.sample_counter.saturating_add(pushed);
        self.samples_since_analysis = self.samples_since_analysis.saturating_add(pushed);
        if self.sample_counter >= self.window_size {
            self.has_filled_first_window = true;
        }

        // Rewind the read cursor over the most recent window. The storage is
        // one slot larger than the window, so these are the samples written
        // during the last window_size pushes, oldest first.
        self.buffer.set_len(self.window_size, false);
        debug_assert_eq!(self.buffer.len(), self.window_size);

        pushed
    }

    /// Indicates if a full window has been collected and at least
    /// `downsampled_hop_size` samples have been added since the previous analysis.
    pub fn is_ready(&self) -> bool {
        self.has_filled_first_window && self.samples_since_analysis >= self.downsampled_hop_size
    }

    /// Restarts counting new samples towards the next analysis.
    pub fn mark_analyzed(&mut self) {
        self.samples_since_analysis = 0;
    }

    pub fn has_filled_first_window(&self) -> bool {
        self.has_filled_first_window
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn downsampling(&self) -> usize {
        self.downsampling
    }

    pub fn downsampled_hop_size(&self) -> usize {
        self.downsampled_hop_size
    }

    /// The underlying ring buffer.
    pub fn buffer(&self) -> &SlidingWindowBuffer<f32> {
        &self.buffer
    }
}

impl Window for AnalysisWindow {
    fn window_len(&self) -> usize {
        self.window_size
    }

    fn sample(&self, index: usize) -> f32 {
        self.buffer.at(index)
    }
}
