//! In-memory, random-access bit buffer.
//!
//! Bits are packed **MSB-first** within each byte: the first bit written
//! occupies the most significant free bit of the current byte. A field of
//! `n` bits is treated as a single big-endian bit string, so a field that
//! straddles a byte boundary keeps its high bits in the earlier byte.
//!
//! ```text
//!  write_bits(0b101, 3); write_bits(0b01010, 5)
//!
//!  byte 0:  1 0 1 0 1 0 1 0   = 0xAA
//!           └─┬─┘ └───┬───┘
//!          first     second
//! ```
//!
//! This is deliberately the opposite convention from
//! [`BitReader`](crate::BitReader) and [`BitWriter`](crate::BitWriter).
//!
//! # Invariants
//!
//! - `length() <= 8 * as_bytes().len()`
//! - `position() <= length()` after every successful operation
//! - `length()` only grows, except when the buffer is reloaded through
//!   [`BitBuffer::restore`]
//! - A failed read leaves the cursor where it was

use crate::bit_value::BitValue;
use crate::error::check_width;
use crate::error::Error;
use crate::error::Result;
use crate::MAX_WIDTH_U128;
use crate::MAX_WIDTH_U64;

/// A growable byte buffer addressed with a bit-granular cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitBuffer {
    bytes: Vec<u8>,
    /// Index of the byte holding the cursor.
    byte_pos: usize,
    /// Bits of `bytes[byte_pos]` already consumed, always in `0..8`.
    bit_pos: u8,
    /// High-water mark of bits ever written (or loaded).
    bit_length: usize,
}

impl BitBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty buffer with room for `capacity` bytes before it
    /// needs to reallocate.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Creates a buffer holding `data`, with the cursor at the start and a
    /// length of `8 * data.len()` bits.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        let bytes = data.into();
        let bit_length = bytes.len() * 8;
        Self {
            bytes,
            byte_pos: 0,
            bit_pos: 0,
            bit_length,
        }
    }

    /// Replaces the contents with `data`, moving the cursor to the start and
    /// setting the length to `8 * data.len()` bits.
    pub fn restore(&mut self, data: &[u8]) {
        *self = Self::from_bytes(data);
    }

    /// Returns a copy of the backing bytes. A trailing partial byte is
    /// included, with its unwritten bits set to zero.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// Borrows the backing bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the buffer, returning the backing bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// The cursor position in bits.
    pub fn position(&self) -> usize {
        self.byte_pos * 8 + self.bit_pos as usize
    }

    /// Moves the cursor to `position` bits from the start.
    ///
    /// ## Errors
    /// - `EndOfStream` if `position` is beyond [`BitBuffer::length`]
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.bit_length {
            return Err(Error::EndOfStream);
        }

        self.byte_pos = position / 8;
        self.bit_pos = (position % 8) as u8;
        Ok(())
    }

    /// The number of bits written to (or loaded into) the buffer, regardless
    /// of where the cursor is.
    pub fn length(&self) -> usize {
        self.bit_length
    }

    /// Whether the buffer holds no bits at all.
    pub fn is_empty(&self) -> bool {
        self.bit_length == 0
    }

    /// Whether the cursor sits at (or past) the last bit.
    pub fn is_eof(&self) -> bool {
        self.position() >= self.bit_length
    }

    /// Moves the cursor back to the start. The length is unchanged.
    pub fn reset(&mut self) {
        self.byte_pos = 0;
        self.bit_pos = 0;
    }

    fn advance(&mut self, bits: u32) {
        self.bit_pos += bits as u8;
        if self.bit_pos == 8 {
            self.byte_pos += 1;
            self.bit_pos = 0;
        }
    }

    fn ensure_available(&self, bit_count: usize) -> Result<()> {
        if self.position() + bit_count > self.bit_length {
            return Err(Error::EndOfStream);
        }
        Ok(())
    }

    /// Reads `bit_count` bits (1 to 64). The first bit read ends up as the
    /// most significant bit of the result.
    ///
    /// ## Errors
    /// - `InvalidWidth` if `bit_count` is outside `1..=64`
    /// - `EndOfStream` if fewer than `bit_count` bits remain; the cursor
    ///   does not move
    pub fn read_bits(&mut self, bit_count: u8) -> Result<u64> {
        check_width(bit_count, MAX_WIDTH_U64)?;
        self.ensure_available(bit_count as usize)?;

        let mut result = 0u64;
        let mut remaining = bit_count as u32;

        while remaining > 0 {
            // The length check above and `bit_length <= 8 * len`
            // keep `byte_pos` in bounds for every bit we consume.
            let byte = self.bytes[self.byte_pos];
            let available = 8 - self.bit_pos as u32;
            let take = remaining.min(available);

            let shift = available - take;
            let bits = (byte >> shift) as u64 & ((1u64 << take) - 1);
            result = (result << take) | bits;

            remaining -= take;
            self.advance(take);
        }

        Ok(result)
    }

    /// Reads `bit_count` bits (1 to 128). Fields wider than 64 bits are read
    /// as the high `bit_count - 64` bits followed by the low 64 bits.
    ///
    /// ## Errors
    /// - `InvalidWidth` if `bit_count` is outside `1..=128`
    /// - `EndOfStream` if fewer than `bit_count` bits remain; the cursor
    ///   does not move
    pub fn read_bits_u128(&mut self, bit_count: u8) -> Result<u128> {
        check_width(bit_count, MAX_WIDTH_U128)?;
        if bit_count <= MAX_WIDTH_U64 {
            return self.read_bits(bit_count).map(u128::from);
        }

        self.ensure_available(bit_count as usize)?;
        let high = self.read_bits(bit_count - MAX_WIDTH_U64)? as u128;
        let low = self.read_bits(MAX_WIDTH_U64)? as u128;

        Ok((high << 64) | low)
    }

    /// Reads `bit_count` bits (1 to 128) and wraps them in a [`BitValue`]
    /// of that width. With `signed` set, a pattern whose top bit is set is
    /// reinterpreted as a negative two's-complement value.
    pub fn read_bit_value(&mut self, bit_count: u8, signed: bool) -> Result<BitValue> {
        let bits = self.read_bits_u128(bit_count)?;
        BitValue::from_bits(bits, bit_count, signed)
    }

    /// Writes the low `bit_count` bits (1 to 64) of `value`, most
    /// significant first, growing the buffer as needed. Bits outside the
    /// target range are left untouched, so this can overwrite a field in
    /// the middle of existing data.
    ///
    /// ## Errors
    /// - `InvalidWidth` if `bit_count` is outside `1..=64`
    pub fn write_bits(&mut self, value: u64, bit_count: u8) -> Result<()> {
        check_width(bit_count, MAX_WIDTH_U64)?;

        let required_bytes = (self.position() + bit_count as usize).div_ceil(8);
        if required_bytes > self.bytes.len() {
            self.bytes.resize(required_bytes, 0);
        }

        let mut remaining = bit_count as u32;
        while remaining > 0 {
            let available = 8 - self.bit_pos as u32;
            let take = remaining.min(available);

            let chunk = ((value >> (remaining - take)) & ((1u64 << take) - 1)) as u8;
            let shift = available - take;
            let mask = ((((1u16 << take) - 1) << shift) & 0xFF) as u8;

            let byte = &mut self.bytes[self.byte_pos];
            *byte = (*byte & !mask) | (chunk << shift);

            remaining -= take;
            self.advance(take);
        }

        self.bit_length = self.bit_length.max(self.position());
        Ok(())
    }

    /// Writes the low `bit_count` bits (1 to 128) of `value`. Fields wider
    /// than 64 bits are written as the high `bit_count - 64` bits followed
    /// by the low 64 bits.
    pub fn write_bits_u128(&mut self, value: u128, bit_count: u8) -> Result<()> {
        check_width(bit_count, MAX_WIDTH_U128)?;
        if bit_count <= MAX_WIDTH_U64 {
            return self.write_bits(value as u64, bit_count);
        }

        self.write_bits((value >> 64) as u64, bit_count - MAX_WIDTH_U64)?;
        self.write_bits(value as u64, MAX_WIDTH_U64)
    }

    /// Writes `value` using `bit_count` bits, or the value's own width when
    /// `None`. Negative values are written as their two's-complement
    /// pattern, sign-extended or truncated to the requested width.
    pub fn write_bit_value(&mut self, value: &BitValue, bit_count: Option<u8>) -> Result<()> {
        let bit_count = bit_count.unwrap_or(value.bit_count());
        self.write_bits_u128(value.to_raw(), bit_count)
    }
}

impl From<Vec<u8>> for BitBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<&[u8]> for BitBuffer {
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes)
    }
}
