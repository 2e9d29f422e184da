#![deny(missing_docs)]

//! # Variable-width bit codec
//!
//! Packs and unpacks integers of arbitrary width (1 to 128 bits) into and
//! out of byte sequences, with no alignment between fields.
//!
//! Two independent bit orders are provided and they are not
//! interchangeable:
//!
//! - [`BitBuffer`] is an in-memory, random-access buffer that packs bits
//!   **MSB-first**: the first bit written lands in the most significant
//!   free bit of the current byte.
//! - [`BitReader`] and [`BitWriter`] stream over any [`std::io::Read`] or
//!   [`std::io::Write`] and pack bits **LSB-first**: the first bit written
//!   lands in the least significant free bit of the current byte.
//!
//! Data written with one family must be read back with the same family.
//!
//! ```
//! use varbits::{BitBuffer, BitValue};
//!
//! let mut buffer = BitBuffer::new();
//! buffer.write_bits(0b101, 3).unwrap();
//! buffer.write_bit_value(&BitValue::new(-6, 5).unwrap(), None).unwrap();
//! assert_eq!(buffer.as_bytes(), &[0b1011_1010]);
//!
//! buffer.reset();
//! assert_eq!(buffer.read_bits(3).unwrap(), 0b101);
//! assert_eq!(buffer.read_bit_value(5, true).unwrap(), -6i32);
//! ```

pub mod bit_buffer;
pub mod bit_value;
pub mod config;
pub mod error;
pub mod logging;
pub mod reader;
pub mod writer;

pub use bit_buffer::BitBuffer;
pub use bit_value::BitValue;
pub use error::Error;
pub use error::Result;
pub use reader::BitReader;
pub use writer::BitWriter;

/// The widest field accepted by the 64-bit read and write paths.
pub const MAX_WIDTH_U64: u8 = 64;

/// The widest field accepted anywhere in this crate.
pub const MAX_WIDTH_U128: u8 = 128;

/// The default size, in bytes, of the internal buffers held by
/// [`BitReader`] and [`BitWriter`].
pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;
