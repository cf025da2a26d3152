use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use instrframe_client::ResponseShape;
use instrframe_frame::ProtocolVariant;

use crate::exit::{CliError, CliResult};
use crate::output::OutputFormat;

pub mod checksum;
pub mod codes;
pub mod decode;
pub mod encode;
pub mod poll;
pub mod query;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode one frame and print its bytes.
    Encode(EncodeArgs),
    /// Decode frame bytes given in hex.
    Decode(DecodeArgs),
    /// Compute a checksum over hex bytes.
    Checksum(ChecksumArgs),
    /// Send one request to an instrument and print the reply.
    Query(QueryArgs),
    /// Repeat a request until interrupted.
    Poll(PollArgs),
    /// List vendor status and error codes.
    Codes(CodesArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Checksum(args) => checksum::run(args, format),
        Command::Query(args) => query::run(args, format),
        Command::Poll(args) => poll::run(args, format),
        Command::Codes(args) => codes::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Request payload given on the command line.
#[derive(Args, Debug, Default)]
pub struct PayloadArgs {
    /// Payload as hex bytes (e.g. "01" or "0x01 0x02").
    #[arg(long, conflicts_with = "text")]
    pub hex: Option<String>,
    /// Payload as text, one byte per character.
    #[arg(long, conflicts_with = "hex")]
    pub text: Option<String>,
}

impl PayloadArgs {
    pub fn bytes(&self) -> CliResult<Vec<u8>> {
        if let Some(hex) = &self.hex {
            return parse_hex(hex);
        }
        if let Some(text) = &self.text {
            return instrframe_frame::value::encode_ascii(text)
                .map_err(|err| CliError::usage(format!("--text: {err}")));
        }
        Ok(Vec::new())
    }
}

/// Serial link and addressing shared by `query` and `poll`.
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Serial device path.
    #[arg(long, short = 'p')]
    pub port: String,
    /// Protocol variant (prevac, sqm160).
    #[arg(long, default_value = "prevac")]
    pub variant: ProtocolVariant,
    /// Baud rate. Default: 57600 for prevac, 19200 for sqm160.
    #[arg(long)]
    pub baud: Option<u32>,
    /// Device address (addressed variants only).
    #[arg(long, default_value = "0x01", value_parser = parse_u8)]
    pub dest: u8,
    /// Host address (addressed variants only).
    #[arg(long, default_value = "0xFF", value_parser = parse_u8)]
    pub source: u8,
    /// Reply deadline (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s", value_parser = parse_duration)]
    pub timeout: Duration,
}

impl LinkArgs {
    pub fn baud_rate(&self) -> u32 {
        self.baud.unwrap_or(match self.variant {
            ProtocolVariant::Prevac => 57_600,
            ProtocolVariant::Sqm160 => 19_200,
        })
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Protocol variant (prevac, sqm160).
    #[arg(long, default_value = "prevac")]
    pub variant: ProtocolVariant,
    /// Command code (decimal, 0x-hex, or a single character for sqm160).
    #[arg(long, short = 'c', value_parser = parse_command)]
    pub command: u16,
    /// Destination address.
    #[arg(long, default_value = "0x01", value_parser = parse_u8)]
    pub dest: u8,
    /// Source address.
    #[arg(long, default_value = "0xFF", value_parser = parse_u8)]
    pub source: u8,
    /// Encode as a device reply instead of a host request.
    #[arg(long)]
    pub reply: bool,
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame bytes in hex.
    pub bytes: String,
    /// Protocol variant (prevac, sqm160).
    #[arg(long, default_value = "prevac")]
    pub variant: ProtocolVariant,
    /// Decode as a host request instead of a device reply.
    #[arg(long)]
    pub request: bool,
    /// Accept frames whose checksum does not match.
    #[arg(long)]
    pub ignore_checksum: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ChecksumAlgorithm {
    Mod256,
    Crc14,
}

#[derive(Args, Debug)]
pub struct ChecksumArgs {
    /// Bytes in hex.
    pub bytes: String,
    /// Checksum algorithm.
    #[arg(long, short = 'a', default_value = "mod256")]
    pub algorithm: ChecksumAlgorithm,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Command code (decimal, 0x-hex, or a single character for sqm160).
    #[arg(long, short = 'c', value_parser = parse_command)]
    pub command: u16,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Reply interpretation (raw, ack, double:SKIP, uint:WIDTH:SKIP, ascii:SKIP, ...).
    #[arg(long, default_value = "raw")]
    pub shape: ResponseShape,
    /// Total attempts for transient failures.
    #[arg(long, default_value = "1")]
    pub attempts: u32,
    /// Pause between attempts.
    #[arg(long, default_value = "100ms", value_parser = parse_duration)]
    pub retry_delay: Duration,
}

#[derive(Args, Debug)]
pub struct PollArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Command code (decimal, 0x-hex, or a single character for sqm160).
    #[arg(long, short = 'c', value_parser = parse_command)]
    pub command: u16,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Reply interpretation.
    #[arg(long, default_value = "raw")]
    pub shape: ResponseShape,
    /// Time between requests.
    #[arg(long, default_value = "1s", value_parser = parse_duration)]
    pub interval: Duration,
    /// Exit after N successful readings.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum CodeTable {
    /// Codes carried in error replies.
    Results,
    /// Device status words.
    Status,
    All,
}

#[derive(Args, Debug)]
pub struct CodesArgs {
    /// Protocol variant (prevac, sqm160).
    #[arg(long, default_value = "prevac")]
    pub variant: ProtocolVariant,
    /// Which bundled table to list.
    #[arg(long, default_value = "all")]
    pub table: CodeTable,
    /// Validate and list a JSON table file instead.
    #[arg(long, value_name = "PATH", conflicts_with = "table")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Hex bytes, optionally separated by spaces, commas or colons, with or
/// without `0x` prefixes.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let mut digits = String::with_capacity(input.len());
    for token in input.split(|c: char| c.is_whitespace() || c == ',' || c == ':') {
        let token = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);
        if token.len() % 2 != 0 {
            return Err(CliError::usage(format!("odd number of hex digits in {token:?}")));
        }
        digits.push_str(token);
    }
    hex::decode(&digits)
        .map_err(|err| CliError::usage(format!("invalid hex input {input:?}: {err}")))
}

fn parse_number(input: &str) -> Result<u64, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => input.parse::<u64>(),
    };
    parsed.map_err(|_| format!("invalid number: {input}"))
}

pub fn parse_u8(input: &str) -> Result<u8, String> {
    let value = parse_number(input)?;
    u8::try_from(value).map_err(|_| format!("{input} does not fit in one byte"))
}

/// A command code; a single non-digit character stands for its byte value.
pub fn parse_command(input: &str) -> Result<u16, String> {
    let mut chars = input.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if !c.is_ascii_digit() && c.is_ascii() {
            return Ok(c as u16);
        }
    }
    let value = parse_number(input)?;
    u16::try_from(value).map_err(|_| format!("{input} does not fit in 16 bits"))
}

pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("duration must not be empty".to_string());
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration value: {input}"))?;
    if value == 0 {
        return Err("duration must be greater than zero".to_string());
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
