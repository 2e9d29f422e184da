//! Streaming bit reader over any [`std::io::Read`].
//!
//! Bits are unpacked **LSB-first**: the first bit read is the least
//! significant unread bit of the current byte, and it becomes the least
//! significant bit of the result. A 3-bit read followed by a 5-bit read of
//! the byte `0b1011_0101` yields `0b101` and then `0b10110`.
//!
//! The source is borrowed for the lifetime of the reader and is never
//! closed by it.

use std::io::ErrorKind;
use std::io::Read;

use crate::bit_value::BitValue;
use crate::error::check_width;
use crate::error::Error;
use crate::error::Result;
use crate::DEFAULT_BUFFER_CAPACITY;
use crate::MAX_WIDTH_U128;
use crate::MAX_WIDTH_U64;

/// Reads variable-width fields from a byte source.
pub struct BitReader<'a, R: Read + ?Sized> {
    source: &'a mut R,
    buffer: Box<[u8]>,
    /// Number of valid bytes in `buffer`.
    len: usize,
    /// Index of the byte being consumed. `pos < len` whenever `bit_pos > 0`.
    pos: usize,
    /// Bits of `buffer[pos]` already consumed, always in `0..8`.
    bit_pos: u8,
    bits_read: u64,
}

impl<'a, R: Read + ?Sized> BitReader<'a, R> {
    /// Creates a reader with the default buffer capacity.
    pub fn new(source: &'a mut R) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY, source)
    }

    /// Creates a reader that pulls at most `capacity` bytes from the source
    /// per refill. A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize, source: &'a mut R) -> Self {
        Self {
            source,
            buffer: vec![0; capacity.max(1)].into_boxed_slice(),
            len: 0,
            pos: 0,
            bit_pos: 0,
            bits_read: 0,
        }
    }

    /// Borrows the underlying source.
    pub fn get_ref(&self) -> &R {
        self.source
    }

    /// Mutably borrows the underlying source. Reading from it directly
    /// skips over whatever the reader has not buffered yet.
    pub fn get_mut(&mut self) -> &mut R {
        self.source
    }

    /// The total number of bits consumed so far.
    pub fn bits_read(&self) -> u64 {
        self.bits_read
    }

    /// Refills the internal buffer, returning false when the source is
    /// exhausted.
    fn fill(&mut self) -> Result<bool> {
        loop {
            match self.source.read(&mut self.buffer) {
                Ok(read) => {
                    tracing::trace!(bytes = read, "refilled bit reader buffer");
                    self.len = read;
                    self.pos = 0;
                    return Ok(read > 0);
                }
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => return Err(Error::Io(error)),
            }
        }
    }

    /// Reads `bit_count` bits (1 to 64).
    ///
    /// ## Errors
    /// - `InvalidWidth` if `bit_count` is outside `1..=64`
    /// - `EndOfStream` if the source runs dry before `bit_count` bits were
    ///   read. Bits consumed by the failed read are not recoverable.
    /// - `Io` if the source fails
    pub fn read_bits(&mut self, bit_count: u8) -> Result<u64> {
        check_width(bit_count, MAX_WIDTH_U64)?;

        let total = bit_count as u32;
        let mut filled = 0u32;
        let mut result = 0u64;

        while filled < total {
            if self.pos == self.len && !self.fill()? {
                tracing::debug!(
                    requested = bit_count,
                    missing = total - filled,
                    bits_read = self.bits_read,
                    "bit reader source exhausted"
                );
                return Err(Error::EndOfStream);
            }

            let byte = self.buffer[self.pos];
            let available = 8 - self.bit_pos as u32;
            let take = (total - filled).min(available);

            let bits = (byte >> self.bit_pos) as u64 & ((1u64 << take) - 1);
            result |= bits << filled;

            filled += take;
            self.bits_read += take as u64;
            self.bit_pos += take as u8;
            if self.bit_pos == 8 {
                self.bit_pos = 0;
                self.pos += 1;
            }
        }

        Ok(result)
    }

    /// Reads `bit_count` bits (1 to 128). Fields wider than 64 bits are
    /// read as the low 64 bits followed by the remaining high bits.
    pub fn read_bits_u128(&mut self, bit_count: u8) -> Result<u128> {
        check_width(bit_count, MAX_WIDTH_U128)?;
        if bit_count <= MAX_WIDTH_U64 {
            return self.read_bits(bit_count).map(u128::from);
        }

        let low = self.read_bits(MAX_WIDTH_U64)? as u128;
        let high = self.read_bits(bit_count - MAX_WIDTH_U64)? as u128;

        Ok((high << 64) | low)
    }

    /// Reads `bit_count` bits (1 to 128) and wraps them in a [`BitValue`]
    /// of that width, sign-extending when `signed` is set.
    pub fn read_bit_value(&mut self, bit_count: u8, signed: bool) -> Result<BitValue> {
        let bits = self.read_bits_u128(bit_count)?;
        BitValue::from_bits(bits, bit_count, signed)
    }

    /// Whether every bit of the source has been consumed.
    ///
    /// When the internal buffer is drained this pulls the next chunk from
    /// the source to find out, so it can block and can fail.
    pub fn is_eof(&mut self) -> Result<bool> {
        if self.pos < self.len {
            return Ok(false);
        }
        Ok(!self.fill()?)
    }
}

impl<R: Read + ?Sized> std::fmt::Debug for BitReader<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitReader")
            .field("capacity", &self.buffer.len())
            .field("buffered", &(self.len - self.pos))
            .field("bit_pos", &self.bit_pos)
            .field("bits_read", &self.bits_read)
            .finish_non_exhaustive()
    }
}
