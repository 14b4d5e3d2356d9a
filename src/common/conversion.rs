use micromath::F32Ext;

/// Converts a period in samples to a frequency in Hz. A lag of zero has
/// no meaningful frequency and maps to 0.
pub fn lag_to_frequency(lag: f32, sample_rate: f32) -> f32 {
    if lag == 0.0 {
        return 0.0;
    }
    sample_rate / lag
}

/// Converts a frequency in Hz to a [MIDI](https://en.wikipedia.org/wiki/MIDI) note number (with a fractional part).
/// Returns 0 for non-positive frequencies.
pub fn freq_to_midi_note(freq: f32) -> f32 {
    if freq <= 0.0 {
        return 0.0;
    }
    12.0 * F32Ext::log2(freq) - 36.376316562295926
}
