//! Width- and signedness-tagged integers.
//!
//! # Invariants
//!
//! A [`BitValue`] is immutable and always satisfies:
//! - `1 <= bit_count <= 128`
//! - unsigned: `0 <= value <= 2^bit_count - 1`
//! - signed: `-2^(bit_count-1) <= value <= 2^(bit_count-1) - 1`
//!
//! Internally the integer is kept as its two's-complement pattern
//! sign-extended to 128 bits, so both a `u128::MAX` unsigned value and an
//! `i128::MIN` signed value fit in the same representation.

use std::fmt;

use crate::error::check_width;
use crate::error::Error;
use crate::error::Result;
use crate::MAX_WIDTH_U128;

/// Returns a mask with the low `width` bits set. Widths of 128 or more
/// yield a full mask.
pub(crate) fn low_mask(width: u8) -> u128 {
    if width as u32 >= u128::BITS {
        u128::MAX
    } else {
        (1u128 << width) - 1
    }
}

/// The number of bits needed to represent `value` as unsigned, never less
/// than one.
fn minimal_unsigned_width(value: u128) -> u32 {
    (u128::BITS - value.leading_zeros()).max(1)
}

/// The number of bits used for a negative `value`: the bit length of its
/// magnitude plus one sign bit.
fn minimal_signed_width(value: i128) -> u32 {
    u128::BITS - value.unsigned_abs().leading_zeros() + 1
}

/// An integer paired with the number of bits it occupies on the wire and
/// whether it should be interpreted as two's complement.
///
/// Equality between two `BitValue`s is structural: an unsigned 8-bit 42 is
/// not equal to a signed 16-bit 42. Compared against a bare integer only
/// the numeric value matters, so both of those are equal to `42`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitValue {
    /// Two's-complement pattern, sign-extended to 128 bits.
    value: u128,
    bit_count: u8,
    is_signed: bool,
}

impl BitValue {
    /// Creates a value of the given width. The value is tagged as signed
    /// when it is negative and as unsigned otherwise.
    ///
    /// ## Errors
    /// - `InvalidWidth` if `bit_count` is outside `1..=128`
    /// - `ValueOutOfRange` if `value` does not fit in `bit_count` bits
    pub fn new(value: i128, bit_count: u8) -> Result<Self> {
        if value < 0 {
            Self::new_signed(value, bit_count)
        } else {
            Self::new_unsigned(value as u128, bit_count)
        }
    }

    /// Creates an unsigned value of the given width.
    pub fn new_unsigned(value: u128, bit_count: u8) -> Result<Self> {
        check_width(bit_count, MAX_WIDTH_U128)?;

        if value & !low_mask(bit_count) != 0 {
            return Err(Error::ValueOutOfRange {
                value: value.to_string(),
                bit_count,
                signed: false,
            });
        }

        Ok(Self { value, bit_count, is_signed: false })
    }

    /// Creates a value that is tagged as signed regardless of its sign, and
    /// is therefore range-checked against the two's-complement range.
    pub fn new_signed(value: i128, bit_count: u8) -> Result<Self> {
        check_width(bit_count, MAX_WIDTH_U128)?;

        // An arithmetic shift leaves only copies of the sign bit when the
        // value fits in `bit_count` bits.
        let upper = value >> (bit_count - 1);
        if upper != 0 && upper != -1 {
            return Err(Error::ValueOutOfRange {
                value: value.to_string(),
                bit_count,
                signed: true,
            });
        }

        Ok(Self {
            value: value as u128,
            bit_count,
            is_signed: true,
        })
    }

    /// Reinterprets the low `bit_count` bits of `bits` as a value of that
    /// width. When `signed` is set the pattern is read as two's complement,
    /// so a set top bit yields a negative value.
    pub fn from_bits(bits: u128, bit_count: u8, signed: bool) -> Result<Self> {
        check_width(bit_count, MAX_WIDTH_U128)?;

        let mask = low_mask(bit_count);
        let mut value = bits & mask;
        if signed && (value >> (bit_count - 1)) & 1 == 1 {
            value |= !mask;
        }

        Ok(Self { value, bit_count, is_signed: signed })
    }

    fn minimal_unsigned(value: u128) -> Self {
        Self {
            value,
            bit_count: minimal_unsigned_width(value) as u8,
            is_signed: false,
        }
    }

    /// The number of bits this value occupies.
    pub fn bit_count(&self) -> u8 {
        self.bit_count
    }

    /// Whether this value is interpreted as two's complement.
    pub fn is_signed(&self) -> bool {
        self.is_signed
    }

    /// Whether the value is below zero.
    pub fn is_negative(&self) -> bool {
        self.is_signed && (self.value as i128) < 0
    }

    /// The two's-complement bit pattern, masked to `bit_count` bits. This is
    /// exactly what the writers put on the wire.
    pub fn to_bits(&self) -> u128 {
        self.value & low_mask(self.bit_count)
    }

    /// The pattern sign-extended to 128 bits.
    pub(crate) fn to_raw(self) -> u128 {
        self.value
    }

    /// The integer value, or `None` for unsigned values above `i128::MAX`.
    pub fn to_i128(&self) -> Option<i128> {
        if self.is_signed || self.value <= i128::MAX as u128 {
            Some(self.value as i128)
        } else {
            None
        }
    }

    /// The integer value, or `None` if it is negative.
    pub fn to_u128(&self) -> Option<u128> {
        if self.is_negative() {
            None
        } else {
            Some(self.value)
        }
    }

    /// The integer value, or `None` if it does not fit in an `i64`.
    pub fn to_i64(&self) -> Option<i64> {
        self.to_i128().and_then(|v| i64::try_from(v).ok())
    }

    /// The integer value, or `None` if it does not fit in a `u64`.
    pub fn to_u64(&self) -> Option<u64> {
        self.to_u128().and_then(|v| u64::try_from(v).ok())
    }
}

/// Infers the minimal width: the bit length of the value for non-negative
/// inputs, or the bit length of the magnitude plus a sign bit for negative
/// ones. Only `i128::MIN` is rejected, as it would need 129 bits.
impl TryFrom<i128> for BitValue {
    type Error = Error;

    fn try_from(value: i128) -> Result<Self> {
        if value >= 0 {
            return Ok(Self::minimal_unsigned(value as u128));
        }

        let width = minimal_signed_width(value);
        if width > MAX_WIDTH_U128 as u32 {
            return Err(Error::InvalidWidth {
                width: width as u8,
                max: MAX_WIDTH_U128,
            });
        }

        Ok(Self {
            value: value as u128,
            bit_count: width as u8,
            is_signed: true,
        })
    }
}

impl From<u128> for BitValue {
    fn from(value: u128) -> Self {
        Self::minimal_unsigned(value)
    }
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {$(
        impl From<$t> for BitValue {
            fn from(value: $t) -> Self {
                Self::minimal_unsigned(value as u128)
            }
        }
    )*};
}

// Values from these types need at most 65 bits, so the inference never fails.
macro_rules! impl_from_signed {
    ($($t:ty),*) => {$(
        impl From<$t> for BitValue {
            fn from(value: $t) -> Self {
                let value = value as i128;
                if value >= 0 {
                    return Self::minimal_unsigned(value as u128);
                }
                Self {
                    value: value as u128,
                    bit_count: minimal_signed_width(value) as u8,
                    is_signed: true,
                }
            }
        }
    )*};
}

impl_from_unsigned!(u8, u16, u32, u64);
impl_from_signed!(i8, i16, i32, i64);

macro_rules! impl_eq_unsigned {
    ($($t:ty),*) => {$(
        impl PartialEq<$t> for BitValue {
            fn eq(&self, other: &$t) -> bool {
                self.to_u128() == Some(*other as u128)
            }
        }

        impl PartialEq<BitValue> for $t {
            fn eq(&self, other: &BitValue) -> bool {
                other == self
            }
        }
    )*};
}

macro_rules! impl_eq_signed {
    ($($t:ty),*) => {$(
        impl PartialEq<$t> for BitValue {
            fn eq(&self, other: &$t) -> bool {
                self.to_i128() == Some(*other as i128)
            }
        }

        impl PartialEq<BitValue> for $t {
            fn eq(&self, other: &BitValue) -> bool {
                other == self
            }
        }
    )*};
}

impl_eq_unsigned!(u8, u16, u32, u64, u128);
impl_eq_signed!(i8, i16, i32, i64, i128);

/// Renders as `BitValue(<value>, <n> bits, <signed|unsigned>)`.
impl fmt::Display for BitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_signed { "signed" } else { "unsigned" };
        if self.is_negative() {
            write!(f, "BitValue({}, {} bits, {})", self.value as i128, self.bit_count, sign)
        } else {
            write!(f, "BitValue({}, {} bits, {})", self.value, self.bit_count, sign)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use test_case::test_case;

    #[test_case(42, 6; "positive value")]
    #[test_case(-42, 7; "negative value adds a sign bit")]
    #[test_case(0, 1; "zero still takes one bit")]
    #[test_case(1, 1; "one")]
    #[test_case(-1, 2; "minus one")]
    #[test_case(255, 8; "byte max")]
    #[test_case(-128, 9; "magnitude bit length plus one")]
    #[test_case(i128::MAX, 127; "i128 max")]
    fn minimal_width_inference(value: i128, expected: u8) {
        let bv = BitValue::try_from(value).expect("width should be inferred");
        assert_eq!(bv.bit_count(), expected);
        assert_eq!(bv.is_signed(), value < 0);
        assert_eq!(bv.to_i128(), Some(value));
    }

    #[test]
    fn minimal_width_of_i128_min_is_too_wide() {
        assert_matches!(
            BitValue::try_from(i128::MIN),
            Err(Error::InvalidWidth { width: 129, max: 128 })
        );
    }

    #[test]
    fn minimal_width_from_primitives() {
        assert_eq!(BitValue::from(42u8).bit_count(), 6);
        assert_eq!(BitValue::from(-42i32).bit_count(), 7);
        assert_eq!(BitValue::from(u64::MAX).bit_count(), 64);
        assert_eq!(BitValue::from(i64::MIN).bit_count(), 65);
        assert_eq!(BitValue::from(u128::MAX).bit_count(), 128);
        assert!(BitValue::from(i16::MIN).is_signed());
    }

    #[test_case(255, 8; "byte max")]
    #[test_case(-128, 8; "signed byte min")]
    #[test_case(127, 8; "signed byte max as unsigned")]
    #[test_case(0, 1; "zero in one bit")]
    #[test_case(-1, 1; "minus one in one bit")]
    #[test_case(i128::MIN, 128; "i128 min")]
    fn construct_in_range(value: i128, bit_count: u8) {
        let bv = BitValue::new(value, bit_count).expect("value should fit");
        assert_eq!(bv.to_i128(), Some(value));
        assert_eq!(bv.bit_count(), bit_count);
    }

    #[test_case(256, 8; "byte max plus one")]
    #[test_case(-129, 8; "signed byte min minus one")]
    #[test_case(2, 1; "two in one bit")]
    #[test_case(-2, 1; "minus two in one bit")]
    fn construct_out_of_range(value: i128, bit_count: u8) {
        assert_matches!(
            BitValue::new(value, bit_count),
            Err(Error::ValueOutOfRange { bit_count: b, .. }) if b == bit_count
        );
    }

    #[test_case(0; "zero")]
    #[test_case(129; "one past 128")]
    fn construct_with_invalid_width(bit_count: u8) {
        assert_matches!(BitValue::new(1, bit_count), Err(Error::InvalidWidth { .. }));
        assert_matches!(
            BitValue::new_unsigned(1, bit_count),
            Err(Error::InvalidWidth { .. })
        );
        assert_matches!(
            BitValue::new_signed(1, bit_count),
            Err(Error::InvalidWidth { .. })
        );
    }

    #[test]
    fn full_width_unsigned() {
        let bv = BitValue::new_unsigned(u128::MAX, 128).unwrap();
        assert_eq!(bv.to_u128(), Some(u128::MAX));
        assert_eq!(bv.to_i128(), None);
        assert_eq!(bv.to_bits(), u128::MAX);
        assert!(!bv.is_negative());
    }

    #[test]
    fn explicitly_signed_non_negative() {
        let bv = BitValue::new_signed(42, 8).unwrap();
        assert!(bv.is_signed());
        assert!(!bv.is_negative());
        assert_eq!(bv, 42i32);

        // 128 is outside the signed 8-bit range even though it is positive.
        assert_matches!(
            BitValue::new_signed(128, 8),
            Err(Error::ValueOutOfRange { signed: true, .. })
        );
    }

    #[test]
    fn equality_is_structural_between_values() {
        let unsigned_8 = BitValue::new(42, 8).unwrap();
        let signed_16 = BitValue::new_signed(42, 16).unwrap();
        let unsigned_16 = BitValue::new(42, 16).unwrap();

        assert_ne!(unsigned_8, signed_16);
        assert_ne!(unsigned_8, unsigned_16);
        assert_eq!(unsigned_8, BitValue::new(42, 8).unwrap());

        // Against bare integers only the value matters.
        assert_eq!(unsigned_8, 42u8);
        assert_eq!(signed_16, 42u64);
        assert_eq!(42i128, unsigned_8);
        assert_ne!(BitValue::new(-1, 8).unwrap(), u8::MAX);
    }

    #[test]
    fn copies_are_independent() {
        let original = BitValue::new(-42, 8).unwrap();
        let copy = original;
        assert_eq!(copy, original);
        assert_eq!(copy.bit_count(), 8);
        assert!(copy.is_signed());
        assert_eq!(copy.to_i64(), Some(-42));
    }

    #[test_case(0xFF, 8, true => Some(-1); "all ones signed")]
    #[test_case(0xFF, 8, false => Some(255); "all ones unsigned")]
    #[test_case(0x80, 8, true => Some(-128); "sign bit only")]
    #[test_case(0x7F, 8, true => Some(127); "sign bit clear")]
    #[test_case(0x1FF, 8, false => Some(255); "extra high bits are dropped")]
    #[test_case(1 << 127, 128, true => Some(i128::MIN); "full width sign bit")]
    fn from_bits_reinterprets(bits: u128, bit_count: u8, signed: bool) -> Option<i128> {
        let bv = BitValue::from_bits(bits, bit_count, signed).unwrap();
        assert_eq!(bv.is_signed(), signed);
        bv.to_i128()
    }

    #[test]
    fn to_bits_is_the_twos_complement_pattern() {
        assert_eq!(BitValue::new(-42, 8).unwrap().to_bits(), 0xD6);
        assert_eq!(BitValue::new(-1, 3).unwrap().to_bits(), 0b111);
        assert_eq!(BitValue::new(5, 3).unwrap().to_bits(), 0b101);
    }

    #[test]
    fn narrow_accessors() {
        let big = BitValue::new_unsigned(1 << 70, 72).unwrap();
        assert_eq!(big.to_u64(), None);
        assert_eq!(big.to_i64(), None);

        let neg = BitValue::new(-5, 8).unwrap();
        assert_eq!(neg.to_u64(), None);
        assert_eq!(neg.to_u128(), None);
        assert_eq!(neg.to_i64(), Some(-5));
    }

    #[test]
    fn display_includes_value_width_and_sign() {
        assert_eq!(
            BitValue::new(-42, 8).unwrap().to_string(),
            "BitValue(-42, 8 bits, signed)"
        );
        assert_eq!(
            BitValue::new(42, 6).unwrap().to_string(),
            "BitValue(42, 6 bits, unsigned)"
        );
        assert_eq!(
            BitValue::from(u128::MAX).to_string(),
            format!("BitValue({}, 128 bits, unsigned)", u128::MAX)
        );
    }
}
