use crate::audio::mpeg::{FrameSamples, MAX_SAMPLES_PER_FRAME};
use crate::audio::source::ByteSource;
use std::io;
use std::ops::Range;

/// Per-channel holding area for decoded samples not yet handed to the caller.
///
/// Capacity is one compressed frame's worth of samples. All channels always
/// hold the same number of valid samples.
#[derive(Debug, Clone)]
pub struct StagingBuffer {
    channels: Vec<Vec<f32>>,
    capacity: usize,
    len: usize,
}

impl StagingBuffer {
    pub fn new(channels: u16) -> Self {
        Self::with_capacity(channels, MAX_SAMPLES_PER_FRAME)
    }

    pub fn with_capacity(channels: u16, capacity: usize) -> Self {
        Self {
            channels: vec![vec![0.0; capacity]; channels.max(1) as usize],
            capacity,
            len: 0,
        }
    }

    /// Number of staged samples per channel
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    fn available_write(&self) -> usize {
        self.capacity - self.len
    }

    /// Staged samples of one channel
    pub fn channel(&self, ch: usize) -> &[f32] {
        &self.channels[ch][..self.len]
    }

    /// Append `range` of a decoded frame, returning the samples taken
    pub fn append(&mut self, frame: &FrameSamples, range: Range<usize>) -> usize {
        let count = range.len().min(self.available_write());
        let src = range.start..range.start + count;
        for (ch, staged) in self.channels.iter_mut().enumerate() {
            staged[self.len..self.len + count].copy_from_slice(&frame.channel(ch)[src.clone()]);
        }
        self.len += count;
        count
    }

    /// Move up to `max` samples into `out` starting at `offset` in every
    /// output channel, then shift the remainder to the front.
    pub fn drain_into(&mut self, out: &mut [&mut [f32]], offset: usize, max: usize) -> usize {
        let count = self.len.min(max);
        if count == 0 {
            return 0;
        }
        for (staged, dest) in self.channels.iter().zip(out.iter_mut()) {
            dest[offset..offset + count].copy_from_slice(&staged[..count]);
        }
        self.discard_front(count);
        count
    }

    /// Move up to `max` samples into an interleaved buffer with room for
    /// `max * channels` values.
    pub fn drain_interleaved(&mut self, out: &mut [f32], max: usize) -> usize {
        let channels = self.channels.len();
        let count = self.len.min(max).min(out.len() / channels);
        for i in 0..count {
            for (ch, staged) in self.channels.iter().enumerate() {
                out[i * channels + ch] = staged[i];
            }
        }
        self.discard_front(count);
        count
    }

    /// Drop the first `count` staged samples
    pub fn discard_front(&mut self, count: usize) {
        let count = count.min(self.len);
        if count == 0 {
            return;
        }
        for staged in self.channels.iter_mut() {
            staged.copy_within(count..self.len, 0);
        }
        self.len -= count;
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

/// Compressed bytes pulled from the byte source, waiting to be decoded
#[derive(Debug, Clone)]
pub struct InputBuffer {
    data: Vec<u8>,
    start: usize,
    end: usize,
    eof: bool,
    pending_skip: u64,
    /// Stream offset of `data[start]`
    front_offset: u64,
}

impl InputBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            start: 0,
            end: 0,
            eof: false,
            pending_skip: 0,
            front_offset: 0,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data[self.start..self.end]
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The source reported end of data
    pub fn at_eof(&self) -> bool {
        self.eof
    }

    /// Stream byte offset of the first buffered byte
    pub fn position(&self) -> u64 {
        self.front_offset
    }

    pub fn pending_skip(&self) -> u64 {
        self.pending_skip
    }

    pub fn consume(&mut self, count: usize) {
        let count = count.min(self.len());
        self.start += count;
        self.front_offset += count as u64;
    }

    /// Drop `count` bytes, including bytes not buffered yet
    pub fn skip(&mut self, count: u64) {
        let buffered = (self.len() as u64).min(count);
        self.consume(buffered as usize);
        self.pending_skip += count - buffered;
    }

    /// Read more bytes from `source`, first discarding any pending skip.
    /// Returns the number of bytes added; 0 with `at_eof()` false means the
    /// buffer is already full.
    pub fn refill<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> io::Result<usize> {
        self.compact();

        while self.pending_skip > 0 {
            let n = source.read(&mut self.data)?;
            if n == 0 {
                self.pending_skip = 0;
                self.eof = true;
                return Ok(0);
            }
            let dropped = (n as u64).min(self.pending_skip) as usize;
            self.pending_skip -= dropped as u64;
            self.front_offset += dropped as u64;
            self.start = dropped;
            self.end = n;
            self.compact();
        }

        if self.end == self.data.len() {
            return Ok(0);
        }

        let n = source.read(&mut self.data[self.end..])?;
        if n == 0 {
            self.eof = true;
        }
        self.end += n;
        Ok(n)
    }

    /// Forget everything buffered; the source now sits at `offset`
    pub fn reset_to(&mut self, offset: u64) {
        self.start = 0;
        self.end = 0;
        self.eof = false;
        self.pending_skip = 0;
        self.front_offset = offset;
    }

    fn compact(&mut self) {
        if self.start == 0 {
            return;
        }
        self.data.copy_within(self.start..self.end, 0);
        self.end -= self.start;
        self.start = 0;
    }
}
