use clap::{Args, Subcommand, ValueEnum};
use idtp_frame::{Mode, PayloadType};
use std::path::PathBuf;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod inspect;
pub mod pack;
pub mod version;

/// Environment fallback for `--key-hex`.
pub const KEY_ENV: &str = "IDTP_HMAC_KEY";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a single frame.
    Pack(PackArgs),
    /// Decode frames from a captured byte stream.
    Inspect(InspectArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Pack(args) => pack::run(args),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Lite,
    Safety,
    Secure,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Lite => Mode::Lite,
            ModeArg::Safety => Mode::Safety,
            ModeArg::Secure => Mode::Secure,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Encoding {
    Raw,
    Hex,
}

#[derive(Args, Debug)]
pub struct PackArgs {
    /// Device identifier (decimal or 0x-prefixed hex).
    #[arg(long, default_value = "0", value_parser = parse_u16)]
    pub device_id: u16,
    /// Sequence number.
    #[arg(long, default_value = "0", value_parser = parse_u32)]
    pub sequence: u32,
    /// Device timestamp.
    #[arg(long, default_value = "0", value_parser = parse_u32)]
    pub timestamp: u32,
    /// Operating mode, selects the trailer.
    #[arg(long, value_enum, default_value = "safety")]
    pub mode: ModeArg,
    /// Payload type: a standard name (imu3-acc, imu6, imu-quat, ...) or a number.
    #[arg(long, default_value = "0", value_parser = parse_payload_type)]
    pub payload_type: u8,
    /// Payload bytes as hex.
    #[arg(long, conflicts_with = "floats")]
    pub hex: Option<String>,
    /// Payload as comma-separated floats, written little-endian.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, conflicts_with = "hex")]
    pub floats: Option<Vec<f32>>,
    /// HMAC-SHA256 key as hex (Secure mode).
    #[arg(long, env = KEY_ENV, hide_env_values = true)]
    pub key_hex: Option<String>,
    /// Output encoding.
    #[arg(long, value_enum, default_value = "hex")]
    pub encoding: Encoding,
    /// Write the frame to a file instead of stdout.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Capture file to read. Reads stdin when absent or `-`.
    pub input: Option<PathBuf>,
    /// Treat the input as hex text (whitespace ignored).
    #[arg(long)]
    pub hex_input: bool,
    /// HMAC-SHA256 key as hex (Secure mode).
    #[arg(long, env = KEY_ENV, hide_env_values = true)]
    pub key_hex: Option<String>,
    /// Reject frames whose sequence does not advance per device.
    #[arg(long)]
    pub replay_protection: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_number<T: TryFrom<u64>>(input: &str) -> Result<T, String> {
    let input = input.trim();
    let value = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(digits) => u64::from_str_radix(digits, 16),
        None => input.parse::<u64>(),
    }
    .map_err(|err| format!("invalid number {input:?}: {err}"))?;
    T::try_from(value).map_err(|_| format!("{input} is out of range"))
}

fn parse_u16(input: &str) -> Result<u16, String> {
    parse_number(input)
}

fn parse_u32(input: &str) -> Result<u32, String> {
    parse_number(input)
}

fn parse_payload_type(input: &str) -> Result<u8, String> {
    let named = (0u8..=0x06).find(|&id| PayloadType::classify(id).name() == input);
    match named {
        Some(id) => Ok(id),
        None => parse_number(input),
    }
}

/// Decode a hex key; an absent or empty value means "no key".
pub fn parse_key(key_hex: Option<&str>) -> CliResult<Option<Vec<u8>>> {
    match key_hex.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => hex::decode(text)
            .map(Some)
            .map_err(|err| CliError::new(USAGE, format!("--key-hex is not valid hex: {err}"))),
    }
}

/// Decode hex text, ignoring whitespace.
pub fn decode_hex_text(text: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(compact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_accept_decimal_and_hex() {
        assert_eq!(parse_u16("42"), Ok(42));
        assert_eq!(parse_u16("0xBEEF"), Ok(0xBEEF));
        assert!(parse_u16("0x10000").is_err());
        assert!(parse_u32("seven").is_err());
    }

    #[test]
    fn payload_type_accepts_names() {
        assert_eq!(parse_payload_type("imu6"), Ok(0x03));
        assert_eq!(parse_payload_type("imu-quat"), Ok(0x06));
        assert_eq!(parse_payload_type("0x80"), Ok(0x80));
        assert!(parse_payload_type("imu11").is_err());
    }

    #[test]
    fn keys_and_hex_text() {
        assert_eq!(parse_key(None).unwrap(), None);
        assert_eq!(parse_key(Some("  ")).unwrap(), None);
        assert_eq!(parse_key(Some("0a0b")).unwrap(), Some(vec![0x0A, 0x0B]));
        assert_eq!(parse_key(Some("xyz")).unwrap_err().code, USAGE);
        assert_eq!(
            decode_hex_text("49 44\n54 50").unwrap(),
            b"IDTP".to_vec()
        );
    }
}
