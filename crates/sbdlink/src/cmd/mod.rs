use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

use sbdlink_modem::AtModem;
use sbdlink_registry::DescriptorRegistry;

use crate::exit::{registry_error, CliError, CliResult};
use crate::output::OutputFormat;

pub mod contact;
pub mod decode;
pub mod encode;
pub mod float;
pub mod register;
pub mod registry;
pub mod status;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode or decode a single 3-byte float.
    #[command(subcommand)]
    Float(FloatCommand),
    /// Build downlink frames (or an uplink command) as hex.
    Encode(EncodeArgs),
    /// Decode a hex-encoded frame.
    Decode(DecodeArgs),
    /// Print a descriptor registry.
    Registry(RegistryArgs),
    /// Run contact cycles against a serial modem.
    Contact(ContactArgs),
    /// Query a serial modem's SBD status.
    Status(StatusArgs),
    /// Register a serial modem with the network.
    Register(RegisterArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Float(command) => float::run(command, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Registry(args) => registry::run(args, format),
        Command::Contact(args) => contact::run(args, format),
        Command::Status(args) => status::run(args, format),
        Command::Register(args) => register::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Subcommand, Debug)]
pub enum FloatCommand {
    /// Encode a value; prints the 3 bytes as hex.
    Encode {
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
    /// Decode 3 hex bytes (6 hex digits).
    Decode { hex: String },
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Registry JSON file.
    #[arg(long, short = 'r')]
    pub registry: PathBuf,
    /// Descriptor name.
    #[arg(long, short = 'd')]
    pub descriptor: String,
    /// Comma-separated numeric values.
    #[arg(
        long,
        value_delimiter = ',',
        allow_negative_numbers = true,
        conflicts_with = "text"
    )]
    pub values: Option<Vec<f64>>,
    /// ASCII text payload.
    #[arg(long, conflicts_with = "values")]
    pub text: Option<String>,
    /// Timestamp to stamp on the packet (RFC 3339). Default: now.
    #[arg(long, value_name = "TIME")]
    pub at: Option<String>,
    /// Build an uplink command body instead of downlink frames.
    #[arg(long, conflicts_with = "text")]
    pub uplink: bool,
    /// Maximum frame body size in bytes.
    #[arg(long, default_value_t = sbdlink_frame::DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Registry JSON file.
    #[arg(long, short = 'r')]
    pub registry: PathBuf,
    /// Wrapped message as hex.
    pub hex: String,
    /// Decode as an uplink command rather than a downlink frame.
    #[arg(long)]
    pub uplink: bool,
    /// Reference time for resolving frame timestamps (RFC 3339). Default: now.
    #[arg(long, value_name = "TIME")]
    pub reference: Option<String>,
}

#[derive(Args, Debug)]
pub struct RegistryArgs {
    /// Registry JSON file.
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct ContactArgs {
    /// Serial device the modem is attached to.
    pub device: PathBuf,
    /// Registry JSON file.
    #[arg(long, short = 'r')]
    pub registry: PathBuf,
    /// Telemetry to queue before the first contact, as DESCRIPTOR=v1,v2.
    #[arg(long, value_name = "DESCRIPTOR=VALUES")]
    pub telemetry: Vec<String>,
    /// Compare against network time and correct the system clock.
    #[arg(long)]
    pub sync_time: bool,
    /// Repeat the contact every interval (e.g. 30s, 500ms) until Ctrl-C.
    #[arg(long, value_name = "INTERVAL")]
    pub repeat: Option<String>,
    /// Stop a contact after this many SBD sessions.
    #[arg(long)]
    pub max_sessions: Option<u32>,
    /// Serial baud rate.
    #[arg(long, default_value_t = 19200)]
    pub baud: u32,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Serial device the modem is attached to.
    pub device: PathBuf,
    /// Measure signal quality actively (+CSQ, up to 10s) instead of +CSQF.
    #[arg(long)]
    pub active: bool,
    /// Serial baud rate.
    #[arg(long, default_value_t = 19200)]
    pub baud: u32,
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Serial device the modem is attached to.
    pub device: PathBuf,
    /// Location update as [+|-]DDMM.MMM,[+|-]dddmm.mmm.
    #[arg(long, allow_hyphen_values = true)]
    pub location: Option<String>,
    /// Soft-reset the modem (ATZ0) before registering.
    #[arg(long)]
    pub soft_reset: bool,
    /// Serial baud rate.
    #[arg(long, default_value_t = 19200)]
    pub baud: u32,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn load_registry(path: &Path) -> CliResult<DescriptorRegistry> {
    DescriptorRegistry::from_file(path)
        .map_err(|err| registry_error(&format!("failed to load {}", path.display()), err))
}

#[cfg(unix)]
pub(crate) fn open_modem(
    device: &Path,
    baud: u32,
) -> CliResult<AtModem<sbdlink_modem::SerialPort>> {
    use crate::exit::modem_error;

    let context = format!("failed to open modem on {}", device.display());
    let port = sbdlink_modem::SerialPort::open_with_baud(device, baud)
        .map_err(|err| modem_error(&context, err))?;
    AtModem::start(port, sbdlink_modem::ModemConfig::default())
        .map_err(|err| modem_error(&context, err))
}

#[cfg(not(unix))]
pub(crate) fn open_modem(
    device: &Path,
    _baud: u32,
) -> CliResult<AtModem<std::fs::File>> {
    Err(CliError::new(
        crate::exit::FAILURE,
        format!(
            "serial modems are only supported on unix ({})",
            device.display()
        ),
    ))
}

pub(crate) fn parse_time(raw: &str) -> CliResult<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&chrono::Utc))
        .map_err(|err| CliError::usage(format!("invalid time '{raw}': {err}")))
}

pub(crate) fn parse_interval(raw: &str) -> CliResult<Duration> {
    let value = raw.trim();
    if let Some(ms) = value.strip_suffix("ms") {
        let ms = ms
            .parse::<u64>()
            .map_err(|_| CliError::usage(format!("invalid interval: {raw}")))?;
        return Ok(Duration::from_millis(ms));
    }

    let secs = value.strip_suffix('s').unwrap_or(value);
    let secs = secs
        .parse::<u64>()
        .map_err(|_| CliError::usage(format!("invalid interval: {raw}")))?;
    Ok(Duration::from_secs(secs))
}

pub(crate) fn parse_hex(raw: &str) -> CliResult<Vec<u8>> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&cleaned).map_err(|err| CliError::usage(format!("invalid hex '{raw}': {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervals_accept_seconds_and_millis() {
        assert_eq!(parse_interval("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_interval("45").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_interval("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_interval("soon").unwrap_err().code, crate::exit::USAGE);
    }

    #[test]
    fn hex_ignores_whitespace() {
        assert_eq!(parse_hex("10 30 39").unwrap(), vec![0x10, 0x30, 0x39]);
        assert_eq!(parse_hex("1g").unwrap_err().code, crate::exit::USAGE);
    }

    #[test]
    fn times_parse_as_utc() {
        let at = parse_time("2024-03-09T14:30:00+02:00").unwrap();
        assert_eq!(at.to_rfc3339(), "2024-03-09T12:30:00+00:00");
        assert!(parse_time("yesterday").is_err());
    }
}
