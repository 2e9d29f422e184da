use std::fs::File;
use std::io::Cursor;
use std::io::Seek;
use std::io::SeekFrom;

use assert_matches::assert_matches;
use varbits::BitReader;
use varbits::BitValue;
use varbits::BitWriter;
use varbits::Error;

fn fields() -> Vec<BitValue> {
    vec![
        BitValue::new(1, 1).unwrap(),
        BitValue::new(-42, 8).unwrap(),
        BitValue::new(0x1F_FFFF, 21).unwrap(),
        BitValue::new_unsigned(u64::MAX as u128, 64).unwrap(),
        BitValue::new(-(1 << 80), 90).unwrap(),
        BitValue::new_unsigned(u128::MAX, 128).unwrap(),
        BitValue::new_signed(7, 4).unwrap(),
    ]
}

#[test]
fn mixed_fields_through_a_file() {
    let mut file = tempfile::tempfile().unwrap();

    {
        let mut writer = BitWriter::with_capacity(5, &mut file);
        for field in fields() {
            writer.write_bit_value(&field, None).unwrap();
        }
        writer.flush().unwrap();
        assert_eq!(writer.bits_written(), 316);
    }

    assert_eq!(file.metadata().unwrap().len(), 40);
    file.seek(SeekFrom::Start(0)).unwrap();

    let mut reader = BitReader::with_capacity(3, &mut file);
    for field in fields() {
        let read = reader
            .read_bit_value(field.bit_count(), field.is_signed())
            .unwrap();
        assert_eq!(read, field);
    }

    // Only the four padding bits of the last byte are left.
    assert!(!reader.is_eof().unwrap());
    assert_eq!(reader.read_bits(4).unwrap(), 0);
    assert!(reader.is_eof().unwrap());
    assert_matches!(reader.read_bits(1), Err(Error::EndOfStream));
}

#[test]
fn dropping_the_writer_flushes_to_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fields.bin");

    {
        let mut file = File::create(&path).unwrap();
        let mut writer = BitWriter::new(&mut file);
        writer.write_bits(0b101, 3).unwrap();
        writer.write_bits(0b10110, 5).unwrap();
        writer.write_bits(0x3, 2).unwrap();
    }

    assert_eq!(std::fs::read(&path).unwrap(), vec![0b1011_0101, 0b0000_0011]);

    let mut file = File::open(&path).unwrap();
    let mut reader = BitReader::new(&mut file);
    assert_eq!(reader.read_bits(3).unwrap(), 0b101);
    assert_eq!(reader.read_bits(5).unwrap(), 0b10110);
    assert_eq!(reader.read_bits(8).unwrap(), 0x3);
}

#[test]
fn reading_until_end_of_stream() {
    let mut bytes = Vec::new();
    {
        let mut writer = BitWriter::new(&mut bytes);
        for value in 0..100u64 {
            writer.write_bits(value, 7).unwrap();
        }
    }
    assert_eq!(bytes.len(), 88);

    let mut source = Cursor::new(bytes);
    let mut reader = BitReader::with_capacity(16, &mut source);

    let mut values = Vec::new();
    loop {
        match reader.read_bits(7) {
            Ok(value) => values.push(value),
            Err(err) if err.is_end_of_stream() => break,
            Err(err) => panic!("unexpected error: {err}"),
        }
    }

    // The last 4 bits are padding and do not make up a full field.
    assert_eq!(values, (0..100).collect::<Vec<u64>>());
    assert_eq!(reader.bits_read(), 704);
}

#[test]
fn the_two_bit_orders_differ() {
    let mut streamed = Vec::new();
    {
        let mut writer = BitWriter::new(&mut streamed);
        writer.write_bits(0b0001, 4).unwrap();
    }

    let mut buffer = varbits::BitBuffer::new();
    buffer.write_bits(0b0001, 4).unwrap();

    assert_eq!(streamed, vec![0x01]);
    assert_eq!(buffer.as_bytes(), &[0x10]);
}
