//! Top-level error type for the varbits library
//!

/// A convenience alias for results returned by this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested bit width is outside of the range supported by the
    /// operation, which is `1..=64` for the 64-bit paths and `1..=128`
    /// for the 128-bit paths and for [`BitValue`](crate::BitValue).
    #[error("bit count must be between 1 and {max}, got {width}")]
    InvalidWidth {
        /// The width that was requested.
        width: u8,
        /// The largest width accepted by the operation.
        max: u8,
    },

    /// The integer cannot be represented with the declared width and
    /// signedness.
    #[error("value {value} cannot be represented with {bit_count} bits as {}", signedness(.signed))]
    ValueOutOfRange {
        /// The decimal rendering of the rejected integer.
        value: String,
        /// The declared width.
        bit_count: u8,
        /// Whether the value was checked against the signed range.
        signed: bool,
    },

    /// A read went past the end of the available bits, or a position was
    /// set beyond the length of a [`BitBuffer`](crate::BitBuffer).
    #[error("end of stream reached")]
    EndOfStream,

    /// The underlying byte source or sink returned an error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn signedness(signed: &bool) -> &'static str {
    if *signed {
        "signed"
    } else {
        "unsigned"
    }
}

impl Error {
    /// Returns true if this error marks the normal end of a stream rather
    /// than a malformed request or an I/O failure.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Error::EndOfStream)
    }
}

/// Validates that `width` lies in `1..=max`.
pub(crate) fn check_width(width: u8, max: u8) -> Result<()> {
    if width == 0 || width > max {
        return Err(Error::InvalidWidth { width, max });
    }
    Ok(())
}
