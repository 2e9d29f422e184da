use std::io::Write;

use varbits::config::BitOrder;
use varbits::config::Settings;
use varbits::BitReader;

#[test]
fn settings_drive_the_reader_capacity() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[stream]\nbuffer_capacity = 2\n\n[dump]\ndefault_width = 12\norder = \"lsb\"").unwrap();

    let settings = Settings::new(Some(file.path())).unwrap();
    assert_eq!(settings.dump.default_width, 12);
    assert_eq!(settings.dump.order, BitOrder::Lsb);

    let mut source: &[u8] = &[0xFF, 0x0F, 0x00];
    let mut reader = BitReader::with_capacity(settings.stream.buffer_capacity.get(), &mut source);
    assert_eq!(reader.read_bits(settings.dump.default_width).unwrap(), 0xFFF);
    assert_eq!(reader.read_bits(settings.dump.default_width).unwrap(), 0);
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.toml");
    assert!(Settings::new(Some(path)).is_err());
}
