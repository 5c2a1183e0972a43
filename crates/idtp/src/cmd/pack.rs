use std::fs;
use std::io::Write;

use idtp_frame::{FrameCodec, Header, Mode, PayloadType, StandardPayload, FRAME_MAX_SIZE};

use crate::cmd::{decode_hex_text, parse_key, Encoding, PackArgs};
use crate::exit::{frame_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::print_raw;

pub fn run(args: PackArgs) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;
    check_standard_payload(args.payload_type, &payload)?;
    let key = parse_key(args.key_hex.as_deref())?;

    let header = Header {
        timestamp: args.timestamp,
        sequence: args.sequence,
        device_id: args.device_id,
        mode: Mode::from(args.mode).into(),
        payload_type: args.payload_type,
        ..Header::new()
    };

    let mut buf = [0u8; FRAME_MAX_SIZE];
    let size = FrameCodec::new()
        .with_optional_key(key.as_deref())
        .pack(&header, &payload, &mut buf)
        .map_err(|err| frame_error("pack failed", err))?;
    let wire = &buf[..size];
    tracing::debug!(
        device_id = header.device_id,
        sequence = header.sequence,
        size,
        "frame packed"
    );

    let encoded = match args.encoding {
        Encoding::Raw => wire.to_vec(),
        Encoding::Hex => format!("{}\n", hex::encode(wire)).into_bytes(),
    };
    match &args.output {
        Some(path) => {
            let mut file = fs::File::create(path).map_err(|err| {
                io_error(&format!("failed creating {}", path.display()), err)
            })?;
            file.write_all(&encoded).map_err(|err| {
                io_error(&format!("failed writing {}", path.display()), err)
            })?;
        }
        None => print_raw(&encoded),
    }

    Ok(SUCCESS)
}

fn resolve_payload(args: &PackArgs) -> CliResult<Vec<u8>> {
    if let Some(text) = &args.hex {
        return decode_hex_text(text)
            .map_err(|err| CliError::new(USAGE, format!("--hex is not valid hex: {err}")));
    }
    if let Some(values) = &args.floats {
        return Ok(values.iter().flat_map(|v| v.to_le_bytes()).collect());
    }
    Ok(Vec::new())
}

/// Standard payload types have a fixed layout; refuse to emit a frame that
/// receivers would fail to decode.
fn check_standard_payload(payload_type: u8, payload: &[u8]) -> CliResult<()> {
    if PayloadType::classify(payload_type).expected_size().is_none() {
        return Ok(());
    }
    StandardPayload::decode(payload_type, payload)
        .map(|_| ())
        .map_err(|err| frame_error("payload does not match its type", err))
}
