use assert_matches::assert_matches;
use varbits::BitBuffer;
use varbits::BitValue;
use varbits::Error;

/// A record header laid out as `version:3 | flags:5 | length:12 | delta:i12`.
#[derive(Debug, PartialEq)]
struct Header {
    version: u8,
    flags: u8,
    length: u16,
    delta: i16,
}

impl Header {
    fn encode(&self, buffer: &mut BitBuffer) -> Result<(), Error> {
        buffer.write_bits(self.version as u64, 3)?;
        buffer.write_bits(self.flags as u64, 5)?;
        buffer.write_bits(self.length as u64, 12)?;
        buffer.write_bit_value(&BitValue::new_signed(self.delta as i128, 12)?, None)
    }

    fn decode(buffer: &mut BitBuffer) -> Result<Self, Error> {
        Ok(Self {
            version: buffer.read_bits(3)? as u8,
            flags: buffer.read_bits(5)? as u8,
            length: buffer.read_bits(12)? as u16,
            delta: buffer.read_bit_value(12, true)?.to_i64().unwrap_or_default() as i16,
        })
    }
}

#[test]
fn records_survive_a_byte_snapshot() {
    let headers = [
        Header { version: 1, flags: 0b10101, length: 4095, delta: -2048 },
        Header { version: 7, flags: 0, length: 0, delta: 2047 },
        Header { version: 0, flags: 31, length: 1234, delta: -1 },
    ];

    let mut buffer = BitBuffer::new();
    for header in &headers {
        header.encode(&mut buffer).unwrap();
    }
    assert_eq!(buffer.length(), 96);

    let mut restored = BitBuffer::from_bytes(buffer.to_bytes());
    for header in &headers {
        assert_eq!(&Header::decode(&mut restored).unwrap(), header);
    }
    assert!(restored.is_eof());
    assert_matches!(Header::decode(&mut restored), Err(Error::EndOfStream));
}

#[test]
fn patching_a_field_in_place() {
    let mut buffer = BitBuffer::new();
    let header = Header { version: 2, flags: 3, length: 0, delta: 0 };
    header.encode(&mut buffer).unwrap();
    buffer.write_bits(0xDEAD, 16).unwrap();

    // Go back and fill in the length once the payload size is known.
    buffer.set_position(8).unwrap();
    buffer.write_bits(2, 12).unwrap();
    assert_eq!(buffer.length(), 48);

    buffer.reset();
    let decoded = Header::decode(&mut buffer).unwrap();
    assert_eq!(decoded.length, 2);
    assert_eq!(decoded.version, 2);
    assert_eq!(decoded.flags, 3);
    assert_eq!(buffer.read_bits(16).unwrap(), 0xDEAD);
}

#[test]
fn restoring_discards_previous_contents() {
    let mut buffer = BitBuffer::new();
    buffer.write_bits_u128(u128::MAX, 100).unwrap();

    buffer.restore(&[0x80]);
    assert_eq!(buffer.length(), 8);
    assert_eq!(buffer.read_bit_value(1, true).unwrap(), -1i8);
    assert_eq!(buffer.read_bits(7).unwrap(), 0);
}
