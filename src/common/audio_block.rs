/// Read access to one block of multichannel audio handed over by a host.
///
/// Hosts implement this for their own buffer type, so the tracker never
/// depends on a concrete buffer representation.
pub trait AudioBlock {
    fn channel_count(&self) -> usize;
    fn frame_count(&self) -> usize;
    fn sample_at(&self, channel: usize, frame: usize) -> f32;

    /// The average of all channels at a given frame.
    fn mono_sample_at(&self, frame: usize) -> f32 {
        let channel_count = self.channel_count();
        if channel_count == 0 {
            return 0.0;
        }
        let mut sum = 0.0;
        for channel in 0..channel_count {
            sum += self.sample_at(channel, frame);
        }
        sum / (channel_count as f32)
    }
}

/// A mono block.
impl AudioBlock for [f32] {
    fn channel_count(&self) -> usize {
        1
    }

    fn frame_count(&self) -> usize {
        self.len()
    }

    fn sample_at(&self, _: usize, frame: usize) -> f32 {
        self[frame]
    }
}

/// A planar block with one contiguous slice per channel.
/// Frames past the end of the shortest channel are ignored.
impl<'a> AudioBlock for [&'a [f32]] {
    fn channel_count(&self) -> usize {
        self.len()
    }

    fn frame_count(&self) -> usize {
        self.iter().map(|channel| channel.len()).min().unwrap_or(0)
    }

    fn sample_at(&self, channel: usize, frame: usize) -> f32 {
        self[channel][frame]
    }
}
