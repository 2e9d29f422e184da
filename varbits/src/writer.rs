//! Streaming bit writer over any [`std::io::Write`].
//!
//! Bits are packed **LSB-first**, mirroring [`BitReader`](crate::BitReader):
//! the low bit of a field goes into the least significant free bit of the
//! current byte. Writing `0b101` in 3 bits and then `0b10110` in 5 bits
//! produces the byte `0b1011_0101`.
//!
//! Complete bytes are buffered and handed to the sink once the buffer
//! reaches its capacity, on [`BitWriter::flush`], or when the writer is
//! dropped. A trailing partial byte is padded with zero bits on flush.
//!
//! The sink is borrowed for the lifetime of the writer and is never closed
//! by it.

use std::io::ErrorKind;
use std::io::Write;

use crate::bit_value::BitValue;
use crate::error::check_width;
use crate::error::Error;
use crate::error::Result;
use crate::DEFAULT_BUFFER_CAPACITY;
use crate::MAX_WIDTH_U128;
use crate::MAX_WIDTH_U64;

/// Writes variable-width fields to a byte sink.
pub struct BitWriter<'a, W: Write + ?Sized> {
    sink: &'a mut W,
    /// Completed bytes not yet handed to the sink.
    buffer: Vec<u8>,
    capacity: usize,
    /// The byte being assembled.
    current: u8,
    /// Bits of `current` already filled, always in `0..8`.
    bit_pos: u8,
    bits_written: u64,
}

impl<'a, W: Write + ?Sized> BitWriter<'a, W> {
    /// Creates a writer with the default buffer capacity.
    pub fn new(sink: &'a mut W) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY, sink)
    }

    /// Creates a writer that hands bytes to the sink in chunks of
    /// `capacity`. A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize, sink: &'a mut W) -> Self {
        let capacity = capacity.max(1);
        Self {
            sink,
            buffer: Vec::with_capacity(capacity),
            capacity,
            current: 0,
            bit_pos: 0,
            bits_written: 0,
        }
    }

    /// Borrows the underlying sink. Bytes still buffered by the writer are
    /// not visible through it until the next flush.
    pub fn get_ref(&self) -> &W {
        self.sink
    }

    /// The total number of bits accepted so far, not counting padding.
    pub fn bits_written(&self) -> u64 {
        self.bits_written
    }

    fn drain(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        tracing::trace!(bytes = self.buffer.len(), "draining bit writer buffer");
        let mut written = 0;
        let result = loop {
            if written == self.buffer.len() {
                break Ok(());
            }
            match self.sink.write(&self.buffer[written..]) {
                Ok(0) => break Err(ErrorKind::WriteZero.into()),
                Ok(n) => written += n,
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => break Err(error),
            }
        };

        // Only what the sink accepted is dropped; the rest is retried by the
        // next drain.
        self.buffer.drain(..written);
        result.map_err(Error::Io)
    }

    /// Writes the low `bit_count` bits (1 to 64) of `value`. Higher bits of
    /// `value` are ignored.
    ///
    /// ## Errors
    /// - `InvalidWidth` if `bit_count` is outside `1..=64`
    /// - `Io` if the buffer fills up and the sink fails
    pub fn write_bits(&mut self, value: u64, bit_count: u8) -> Result<()> {
        check_width(bit_count, MAX_WIDTH_U64)?;

        let total = bit_count as u32;
        let mut consumed = 0u32;

        while consumed < total {
            let available = 8 - self.bit_pos as u32;
            let take = (total - consumed).min(available);

            let chunk = ((value >> consumed) & ((1u64 << take) - 1)) as u8;
            self.current |= chunk << self.bit_pos;

            consumed += take;
            self.bits_written += take as u64;
            self.bit_pos += take as u8;

            if self.bit_pos == 8 {
                self.buffer.push(self.current);
                self.current = 0;
                self.bit_pos = 0;

                if self.buffer.len() >= self.capacity {
                    self.drain()?;
                }
            }
        }

        Ok(())
    }

    /// Writes the low `bit_count` bits (1 to 128) of `value`. Fields wider
    /// than 64 bits are written as the low 64 bits followed by the
    /// remaining high bits.
    pub fn write_bits_u128(&mut self, value: u128, bit_count: u8) -> Result<()> {
        check_width(bit_count, MAX_WIDTH_U128)?;
        if bit_count <= MAX_WIDTH_U64 {
            return self.write_bits(value as u64, bit_count);
        }

        self.write_bits(value as u64, MAX_WIDTH_U64)?;
        self.write_bits((value >> 64) as u64, bit_count - MAX_WIDTH_U64)
    }

    /// Writes `value` using `bit_count` bits, or the value's own width when
    /// `None`. Negative values are written as their two's-complement
    /// pattern, sign-extended or truncated to the requested width.
    pub fn write_bit_value(&mut self, value: &BitValue, bit_count: Option<u8>) -> Result<()> {
        let bit_count = bit_count.unwrap_or(value.bit_count());
        self.write_bits_u128(value.to_raw(), bit_count)
    }

    /// Pads any partial byte with zeros, hands every buffered byte to the
    /// sink, then flushes the sink. Calling this twice in a row writes
    /// nothing the second time.
    pub fn flush(&mut self) -> Result<()> {
        if self.bit_pos > 0 {
            self.buffer.push(self.current);
            self.current = 0;
            self.bit_pos = 0;
        }

        self.drain()?;
        self.sink.flush()?;
        Ok(())
    }
}

impl<W: Write + ?Sized> Drop for BitWriter<'_, W> {
    fn drop(&mut self) {
        if let Err(error) = self.flush() {
            tracing::warn!(%error, "could not flush bit writer on drop");
        }
    }
}

impl<W: Write + ?Sized> std::fmt::Debug for BitWriter<'_, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitWriter")
            .field("capacity", &self.capacity)
            .field("buffered", &self.buffer.len())
            .field("bit_pos", &self.bit_pos)
            .field("bits_written", &self.bits_written)
            .finish_non_exhaustive()
    }
}
