//! MSB-first bit cursor over a borrowed byte slice.

use thiserror::Error;

/// Not enough bits left to satisfy a read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("bit underrun: needed {needed} bits, {available} available")]
pub struct Underrun {
    pub needed: usize,
    pub available: usize,
}

/// Cursor over a byte slice, reading big-endian bit fields.
///
/// A failed read leaves the cursor where it was, so callers can stop at the
/// first missing field and keep everything read before it.
#[derive(Debug, Clone)]
pub struct BitCursor<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    pub fn bits_remaining(&self) -> usize {
        self.data.len() * 8 - self.bit_pos
    }

    pub fn bit_position(&self) -> usize {
        self.bit_pos
    }

    /// Read `n` bits (at most 64) as an unsigned integer
    pub fn read_bits(&mut self, n: usize) -> Result<u64, Underrun> {
        debug_assert!(n <= 64);
        self.ensure(n)?;

        let mut value = 0u64;
        for _ in 0..n {
            let byte = self.data[self.bit_pos / 8];
            let bit = (byte >> (7 - (self.bit_pos % 8))) & 1;
            value = (value << 1) | bit as u64;
            self.bit_pos += 1;
        }
        Ok(value)
    }

    pub fn read_u32(&mut self) -> Result<u32, Underrun> {
        self.read_bits(32).map(|v| v as u32)
    }

    /// Read `N` whole bytes; the cursor need not be byte aligned
    pub fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N], Underrun> {
        self.ensure(N * 8)?;
        let mut out = [0u8; N];
        for byte in out.iter_mut() {
            *byte = self.read_bits(8)? as u8;
        }
        Ok(out)
    }

    pub fn skip_bits(&mut self, n: usize) -> Result<(), Underrun> {
        self.ensure(n)?;
        self.bit_pos += n;
        Ok(())
    }

    pub fn skip_bytes(&mut self, n: usize) -> Result<(), Underrun> {
        self.skip_bits(n * 8)
    }

    fn ensure(&self, needed: usize) -> Result<(), Underrun> {
        let available = self.bits_remaining();
        if needed > available {
            return Err(Underrun { needed, available });
        }
        Ok(())
    }
}
