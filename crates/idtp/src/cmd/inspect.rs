use std::fs;
use std::io::Read;
use std::path::Path;

use bytes::BytesMut;
use idtp_frame::{FrameConfig, FrameDecoder, FrameError};

use crate::cmd::{decode_hex_text, parse_key, InspectArgs};
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_frames, print_summary, FrameOutput, InspectSummary, OutputFormat};

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let raw = read_input(args.input.as_deref())?;
    let data = if args.hex_input {
        decode_hex_text(&String::from_utf8_lossy(&raw))
            .map_err(|err| CliError::new(DATA_INVALID, format!("input is not valid hex: {err}")))?
    } else {
        raw
    };

    let mut config = FrameConfig::default().with_replay_protection(args.replay_protection);
    if let Some(key) = parse_key(args.key_hex.as_deref())? {
        config = config.with_hmac_key(key);
    }

    let (frames, summary) = inspect(&data, &config)?;
    print_frames(&frames, format);
    print_summary(&summary, format);

    if summary.failures() > 0 {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}

/// Decode every frame in `data`, tallying per-frame failures.
pub fn inspect(
    data: &[u8],
    config: &FrameConfig,
) -> CliResult<(Vec<FrameOutput>, InspectSummary)> {
    let mut decoder = FrameDecoder::with_config(config);
    let mut buf = BytesMut::from(data);
    let mut frames = Vec::new();
    let mut summary = InspectSummary {
        kind: "summary",
        bytes: data.len(),
        ..InspectSummary::default()
    };

    loop {
        match decoder.decode(&mut buf) {
            Ok(Some(frame)) => frames.push(FrameOutput::from_frame(&frame)),
            Ok(None) => break,
            Err(err) if err.is_recoverable() => {
                tracing::warn!(error = %err, "frame rejected");
                match err {
                    FrameError::InvalidCrc(_) => summary.trailer_failures += 1,
                    FrameError::InvalidHmac => summary.hmac_failures += 1,
                    FrameError::Replayed { .. } => summary.replayed += 1,
                    _ => summary.parse_errors += 1,
                }
            }
            Err(err) => return Err(frame_error("inspect failed", err)),
        }
    }

    let stats = decoder.sync_stats();
    summary.frames = frames.len();
    summary.resyncs = stats.resyncs;
    summary.bytes_discarded = stats.bytes_discarded;
    summary.trailing_bytes = buf.len();
    tracing::info!(
        frames = summary.frames,
        failures = summary.failures(),
        resyncs = summary.resyncs,
        "inspection complete"
    );
    Ok((frames, summary))
}

fn read_input(path: Option<&Path>) -> CliResult<Vec<u8>> {
    match path {
        Some(path) if path != Path::new("-") => fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err)),
        _ => {
            let mut data = Vec::new();
            std::io::stdin()
                .read_to_end(&mut data)
                .map_err(|err| io_error("failed reading stdin", err))?;
            Ok(data)
        }
    }
}
