use std::fs::File;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use varbits::config::BitOrder;
use varbits::config::Settings;
use varbits::BitBuffer;
use varbits::BitReader;
use varbits::BitValue;
use varbits::BitWriter;
use varbits::Error;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogOutputFormat {
    Json,
    Pretty,
}

/// Encode and decode variable-width bit fields.
#[derive(Debug, Parser)]
#[clap(name = "varbits")]
struct Args {
    /// Optional path to the configuration file. If not provided, defaults
    /// and `VARBITS_` environment variables are used.
    #[clap(short = 'c', long, required = false, global = true)]
    config: Option<PathBuf>,

    #[clap(
        short = 'o',
        long = "output-format",
        default_value = "pretty",
        global = true
    )]
    output_format: Option<LogOutputFormat>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decode consecutive fields and print one `offset width value` line
    /// per field.
    Dump(DumpArgs),
    /// Encode `VALUE:WIDTH` fields into raw bytes.
    Pack(PackArgs),
}

#[derive(Debug, clap::Args)]
struct DumpArgs {
    /// File to decode. Reads stdin when omitted.
    file: Option<PathBuf>,

    /// Comma separated field widths, cycled until the input runs out.
    #[clap(
        short,
        long,
        value_delimiter = ',',
        value_parser = clap::value_parser!(u8).range(1..=128)
    )]
    widths: Vec<u8>,

    /// Bit order of the input.
    #[clap(long)]
    order: Option<BitOrder>,

    /// Interpret fields as two's complement.
    #[clap(long)]
    signed: bool,

    /// Stop after this many fields.
    #[clap(long)]
    count: Option<usize>,
}

#[derive(Debug, clap::Args)]
struct PackArgs {
    /// Fields as `VALUE:WIDTH`, or a bare `VALUE` for its minimal width.
    /// Negative values such as `-42:8` are accepted as they are.
    #[clap(required = true, allow_hyphen_values = true, value_parser = parse_field)]
    fields: Vec<BitValue>,

    /// Bit order of the output.
    #[clap(long)]
    order: Option<BitOrder>,

    /// File to write. Writes to stdout when omitted.
    #[clap(long)]
    output: Option<PathBuf>,
}

fn parse_field(field: &str) -> Result<BitValue, String> {
    let (value, width) = match field.split_once(':') {
        Some((value, width)) => (value, Some(width)),
        None => (field, None),
    };

    let value: i128 = value
        .trim()
        .parse()
        .map_err(|err| format!("invalid value {value:?}: {err}"))?;

    let Some(width) = width else {
        return BitValue::try_from(value).map_err(|err| err.to_string());
    };

    let width: u8 = width
        .trim()
        .parse()
        .map_err(|err| format!("invalid width {width:?}: {err}"))?;

    BitValue::new(value, width).map_err(|err| err.to_string())
}

/// What `dump` should decode.
#[derive(Debug)]
struct DumpPlan {
    widths: Vec<u8>,
    signed: bool,
    count: Option<usize>,
}

impl DumpPlan {
    fn fields(&self) -> impl Iterator<Item = u8> + '_ {
        let fields = self.widths.iter().copied().cycle();
        fields.take(self.count.unwrap_or(usize::MAX))
    }
}

fn render(value: &BitValue) -> String {
    match value.to_i128() {
        Some(value) => value.to_string(),
        None => value.to_bits().to_string(),
    }
}

/// Decodes MSB-first fields from the whole of `input`. Returns the number
/// of fields printed.
fn dump_msb<R, W>(input: &mut R, out: &mut W, plan: &DumpPlan) -> Result<usize, Error>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    let mut buffer = BitBuffer::from_bytes(bytes);

    let mut printed = 0;
    for width in plan.fields() {
        let offset = buffer.position();
        let value = match buffer.read_bit_value(width, plan.signed) {
            Ok(value) => value,
            Err(err) if err.is_end_of_stream() => break,
            Err(err) => return Err(err),
        };
        writeln!(out, "{offset} {width} {}", render(&value))?;
        printed += 1;
    }

    if buffer.position() < buffer.length() {
        tracing::debug!(
            trailing_bits = buffer.length() - buffer.position(),
            "input has bits left over"
        );
    }
    Ok(printed)
}

/// Decodes LSB-first fields by streaming `input`. Returns the number of
/// fields printed.
fn dump_lsb<R, W>(
    input: &mut R,
    out: &mut W,
    plan: &DumpPlan,
    capacity: NonZeroUsize,
) -> Result<usize, Error>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut reader = BitReader::with_capacity(capacity.get(), input);

    let mut printed = 0;
    for width in plan.fields() {
        let offset = reader.bits_read();
        let value = match reader.read_bit_value(width, plan.signed) {
            Ok(value) => value,
            Err(err) if err.is_end_of_stream() => break,
            Err(err) => return Err(err),
        };
        writeln!(out, "{offset} {width} {}", render(&value))?;
        printed += 1;
    }
    Ok(printed)
}

/// Encodes `fields` in the given order and writes the bytes to `out`.
fn pack<W>(
    fields: &[BitValue],
    order: BitOrder,
    capacity: NonZeroUsize,
    out: &mut W,
) -> Result<(), Error>
where
    W: Write + ?Sized,
{
    match order {
        BitOrder::Msb => {
            let mut buffer = BitBuffer::new();
            for field in fields {
                buffer.write_bit_value(field, None)?;
            }
            out.write_all(buffer.as_bytes())?;
            out.flush()?;
        }
        BitOrder::Lsb => {
            let mut writer = BitWriter::with_capacity(capacity.get(), out);
            for field in fields {
                writer.write_bit_value(field, None)?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}

#[tracing::instrument(skip_all)]
fn run_dump(args: DumpArgs, settings: &Settings) -> Result<(), Error> {
    let plan = DumpPlan {
        widths: if args.widths.is_empty() {
            vec![settings.dump.default_width]
        } else {
            args.widths
        },
        signed: args.signed,
        count: args.count,
    };
    let order = args.order.unwrap_or(settings.dump.order);
    tracing::debug!(?plan, ?order, "decoding fields");

    let mut input: Box<dyn Read> = match &args.file {
        Some(path) => Box::new(File::open(path)?),
        None => Box::new(std::io::stdin().lock()),
    };
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let printed = match order {
        BitOrder::Msb => dump_msb(&mut *input, &mut out, &plan)?,
        BitOrder::Lsb => {
            let capacity = settings.stream.buffer_capacity;
            dump_lsb(&mut *input, &mut out, &plan, capacity)?
        }
    };
    out.flush()?;

    tracing::info!(fields = printed, "finished decoding");
    Ok(())
}

#[tracing::instrument(skip_all)]
fn run_pack(args: PackArgs, settings: &Settings) -> Result<(), Error> {
    let order = args.order.unwrap_or(settings.dump.order);
    let capacity = settings.stream.buffer_capacity;
    let bits: u64 = args.fields.iter().map(|f| f.bit_count() as u64).sum();

    match &args.output {
        Some(path) => {
            let mut file = File::create(path)?;
            pack(&args.fields, order, capacity, &mut file)?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            pack(&args.fields, order, capacity, &mut out)?;
        }
    }

    tracing::info!(fields = args.fields.len(), bits, ?order, "finished encoding");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse the command line arguments.
    let args = Args::parse();

    // Configure the binary's stderr output based on the provided output format.
    let pretty = matches!(args.output_format, Some(LogOutputFormat::Pretty));
    varbits::logging::setup_logging("warn,varbits=info", pretty);

    // Load the configuration file and/or environment variables.
    let settings = Settings::new(args.config.as_ref())?;
    tracing::debug!(?settings, "loaded settings");

    match args.command {
        Command::Dump(dump_args) => run_dump(dump_args, &settings)?,
        Command::Pack(pack_args) => run_pack(pack_args, &settings)?,
    }

    Ok(())
}
