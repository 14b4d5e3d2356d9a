use alloc::{boxed::Box, vec};

use crate::error::Error;

/// A fixed capacity ring buffer of samples.
///
/// Occupancy is derived from a read cursor and a write cursor only. The
/// backing storage has one slot more than the requested capacity, so a full
/// buffer (`len() == capacity()`) can be told apart from an empty one
/// (`len() == 0`) without extra state.
///
/// Writes never overwrite unread data and reads never block. Requests for
/// more samples than there is room for (or data to read) are truncated and
/// the number of samples actually moved is returned.
pub struct SlidingWindowBuffer<T> {
    storage: Box<[T]>,
    read_index: usize,
    write_index: usize,
}

impl<T: Copy + Default> SlidingWindowBuffer<T> {
    /// Creates a buffer that can hold `capacity` unread samples.
    pub fn new(capacity: usize) -> Result<Self, Error> {
        if capacity == 0 {
            return Err(Error::ZeroCapacity);
        }
        Ok(SlidingWindowBuffer {
            storage: vec![T::default(); capacity + 1].into_boxed_slice(),
            read_index: 0,
            write_index: 0,
        })
    }

    /// Discards all contents and changes the capacity. Must not be called
    /// while another party is reading from or writing to the buffer.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<(), Error> {
        *self = SlidingWindowBuffer::new(capacity)?;
        Ok(())
    }

    /// Zeroes the storage and empties the buffer, keeping the capacity.
    pub fn clear(&mut self) {
        self.storage.fill(T::default());
        self.read_index = 0;
        self.write_index = 0;
    }

    /// Copies as many of `samples` as there is free space for.
    /// Returns the number of samples written.
    pub fn push(&mut self, samples: &[T]) -> usize {
        let storage_len = self.storage.len();
        let count = samples.len().min(self.remaining());
        let write_index = self.write_index;

        // First span runs up to the end of the storage, the second
        // one (if any) starts over at index 0.
        let first_span = count.min(storage_len - write_index);
        self.storage[write_index..write_index + first_span]
            .copy_from_slice(&samples[..first_span]);
        let second_span = count - first_span;
        self.storage[..second_span].copy_from_slice(&samples[first_span..count]);

        self.write_index = (write_index + count) % storage_len;
        count
    }

    /// Writes a single sample. Returns 1 if the sample was written and 0 if the buffer is full.
    pub fn push_sample(&mut self, sample: T) -> usize {
        self.push(core::slice::from_ref(&sample))
    }

    /// Copies up to `out.len()` unread samples, oldest first, without consuming them.
    /// Returns the number of samples copied.
    pub fn peek(&self, out: &mut [T]) -> usize {
        let storage_len = self.storage.len();
        let count = out.len().min(self.len());
        let read_index = self.read_index;

        let first_span = count.min(storage_len - read_index);
        out[..first_span].copy_from_slice(&self.storage[read_index..read_index + first_span]);
        let second_span = count - first_span;
        out[first_span..count].copy_from_slice(&self.storage[..second_span]);

        count
    }

    /// Like [peek](Self::peek), but also consumes the copied samples.
    pub fn pop(&mut self, out: &mut [T]) -> usize {
        let count = self.peek(out);
        self.read_index = (self.read_index + count) % self.storage.len();
        count
    }

    /// Moves one of the cursors so that exactly `count` samples are unread,
    /// without touching the storage.
    ///
    /// If `retain_oldest` is false, the read cursor is placed `count` samples
    /// behind the write cursor, keeping the `count` most recently written
    /// samples. This may expose samples that were previously consumed, which
    /// is how a full window of history is recovered after
    /// [align_cursors](Self::align_cursors). If `retain_oldest` is true, the
    /// write cursor is placed `count` samples after the read cursor, dropping
    /// newer samples.
    ///
    /// `count` is clamped to [capacity](Self::capacity).
    pub fn set_len(&mut self, count: usize, retain_oldest: bool) {
        let storage_len = self.storage.len();
        let count = count.min(storage_len - 1);
        if retain_oldest {
            self.write_index = (self.read_index + count) % storage_len;
        } else {
            self.read_index = (self.write_index + storage_len - count) % storage_len;
        }
    }

    /// Marks all unread samples as consumed by moving the read cursor to the write cursor.
    pub fn align_cursors(&mut self) {
        self.set_len(0, false);
    }

    /// Returns the sample `offset` positions after the read cursor.
    /// The offset wraps around the backing storage.
    pub fn at(&self, offset: usize) -> T {
        self.storage[(self.read_index + offset) % self.storage.len()]
    }

    /// The number of unread samples.
    pub fn len(&self) -> usize {
        let storage_len = self.storage.len();
        (self.write_index + storage_len - self.read_index) % storage_len
    }

    pub fn is_empty(&self) -> bool {
        self.read_index == self.write_index
    }

    pub fn is_full(&self) -> bool {
        self.remaining() == 0
    }

    /// The maximum number of unread samples the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.storage.len() - 1
    }

    /// The number of samples that can be pushed before the buffer is full.
    pub fn remaining(&self) -> usize {
        self.capacity() - self.len()
    }
}

impl crate::common::Window for SlidingWindowBuffer<f32> {
    fn window_len(&self) -> usize {
        self.len()
    }

    fn sample(&self, index: usize) -> f32 {
        self.at(index)
    }
}
