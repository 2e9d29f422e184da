//! Configuration for the `varbits` command line tool.
//!
//! Values are layered, lowest precedence first: built-in defaults, an
//! optional TOML file, then environment variables.

use std::num::NonZeroUsize;
use std::path::Path;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::DEFAULT_BUFFER_CAPACITY;
use crate::MAX_WIDTH_U128;

/// Errors found while validating an otherwise well-formed configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    /// The default field width is not something the codec can read.
    #[error("dump.default_width must be between 1 and 128, got {0}")]
    InvalidDefaultWidth(u8),
}

/// Which bit order, and therefore which codec, to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BitOrder {
    /// Most significant bit first, through [`BitBuffer`](crate::BitBuffer).
    #[default]
    Msb,
    /// Least significant bit first, through [`BitReader`](crate::BitReader)
    /// and [`BitWriter`](crate::BitWriter).
    Lsb,
}

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Streaming codec settings.
    pub stream: StreamConfig,
    /// Defaults for the `dump` subcommand.
    pub dump: DumpConfig,
}

/// Settings for [`BitReader`](crate::BitReader) and
/// [`BitWriter`](crate::BitWriter).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamConfig {
    /// Size in bytes of the internal buffer.
    pub buffer_capacity: NonZeroUsize,
}

/// Defaults for decoding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DumpConfig {
    /// Field width used when none is given on the command line.
    pub default_width: u8,
    /// Bit order used when none is given on the command line.
    pub order: BitOrder,
}

impl Settings {
    /// Initializing the settings first with default values and then with
    /// the optional config file and any environment variables.
    ///
    /// Environment variables use `__` to separate nesting levels:
    ///
    /// ```text
    /// VARBITS_STREAM__BUFFER_CAPACITY
    /// ^^^^^^^ ^^^^^^  ^^^^^^^^^^^^^^^
    ///    │   ^  │   ^^       └ The `buffer_capacity` field of `stream`
    ///    │   │  │   └ separator("__")
    ///    │   │  └ The `stream` field of the root object (`Settings`)
    ///    │   └ prefix_separator("_")
    ///    └ with_prefix("VARBITS")
    /// ```
    pub fn new(config_path: Option<impl AsRef<Path>>) -> Result<Self, ConfigError> {
        let env = Environment::with_prefix("VARBITS")
            .separator("__")
            .prefix_separator("_")
            .try_parsing(true);

        let mut cfg_builder = Config::builder();
        cfg_builder =
            cfg_builder.set_default("stream.buffer_capacity", DEFAULT_BUFFER_CAPACITY as u64)?;
        cfg_builder = cfg_builder.set_default("dump.default_width", 8)?;
        cfg_builder = cfg_builder.set_default("dump.order", "msb")?;

        if let Some(path) = config_path {
            cfg_builder = cfg_builder.add_source(File::from(path.as_ref()));
        }
        cfg_builder = cfg_builder.add_source(env);

        let cfg = cfg_builder.build()?;

        let settings: Settings = cfg.try_deserialize()?;

        settings.validate()?;

        Ok(settings)
    }

    /// Perform validation on the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let width = self.dump.default_width;
        if width == 0 || width > MAX_WIDTH_U128 {
            let err = ConfigValidationError::InvalidDefaultWidth(width);
            return Err(ConfigError::Message(err.to_string()));
        }

        Ok(())
    }
}
