use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use idtp_frame::{Frame, Mode, PayloadType, StandardPayload};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Printable view of one decoded frame.
#[derive(Debug, Serialize)]
pub struct FrameOutput {
    pub kind: &'static str,
    pub device_id: u16,
    pub sequence: u32,
    pub timestamp: u32,
    pub mode: String,
    pub payload_type: u8,
    pub payload_name: &'static str,
    pub payload_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_error: Option<String>,
    pub payload_hex: String,
    #[serde(skip)]
    pub payload: Vec<u8>,
}

impl FrameOutput {
    pub fn from_frame(frame: &Frame) -> Self {
        let header = frame.header();
        let (values, payload_error) =
            match StandardPayload::decode(header.payload_type, frame.payload()) {
                Ok(Some(decoded)) => (Some(decoded.values().collect()), None),
                Ok(None) => (None, None),
                Err(err) => (None, Some(err.to_string())),
            };
        let mode = Mode::try_from(header.mode)
            .map(|mode| mode.to_string())
            .unwrap_or_else(|_| format!("0x{:02x}", header.mode));

        Self {
            kind: "frame",
            device_id: header.device_id,
            sequence: header.sequence,
            timestamp: header.timestamp,
            mode,
            payload_type: header.payload_type,
            payload_name: PayloadType::classify(header.payload_type).name(),
            payload_size: frame.payload().len(),
            values,
            payload_error,
            payload_hex: hex::encode(frame.payload()),
            payload: frame.payload().to_vec(),
        }
    }

    fn content(&self) -> String {
        match (&self.values, &self.payload_error) {
            (Some(values), _) => join_values(values),
            (None, Some(err)) => format!("<{err}>"),
            (None, None) => self.payload_hex.clone(),
        }
    }
}

/// Totals for one inspected stream.
#[derive(Debug, Default, Serialize)]
pub struct InspectSummary {
    pub kind: &'static str,
    pub bytes: usize,
    pub frames: usize,
    pub trailer_failures: usize,
    pub hmac_failures: usize,
    pub parse_errors: usize,
    pub replayed: usize,
    pub resyncs: u64,
    pub bytes_discarded: u64,
    pub trailing_bytes: usize,
}

impl InspectSummary {
    pub fn failures(&self) -> usize {
        self.trailer_failures + self.hmac_failures + self.parse_errors + self.replayed
    }
}

pub fn print_frames(frames: &[FrameOutput], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for frame in frames {
                println!(
                    "{}",
                    serde_json::to_string(frame).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            if frames.is_empty() {
                return;
            }
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DEVICE", "SEQ", "TIMESTAMP", "MODE", "TYPE", "SIZE", "PAYLOAD"]);
            for frame in frames {
                table.add_row(vec![
                    format!("0x{:04x}", frame.device_id),
                    frame.sequence.to_string(),
                    frame.timestamp.to_string(),
                    frame.mode.clone(),
                    frame.payload_name.to_string(),
                    frame.payload_size.to_string(),
                    frame.content(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for frame in frames {
                println!(
                    "device=0x{:04x} seq={} ts={} mode={} type={} (0x{:02x}) size={} payload={}",
                    frame.device_id,
                    frame.sequence,
                    frame.timestamp,
                    frame.mode,
                    frame.payload_name,
                    frame.payload_type,
                    frame.payload_size,
                    frame.content()
                );
            }
        }
        OutputFormat::Raw => {
            for frame in frames {
                print_raw(&frame.payload);
            }
        }
    }
}

pub fn print_summary(summary: &InspectSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(summary).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["METRIC", "VALUE"]);
            for (name, value) in summary_rows(summary) {
                table.add_row(vec![name.to_string(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let line = summary_rows(summary)
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(" ");
            println!("{line}");
        }
        // Raw stdout carries payload bytes only.
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn summary_rows(summary: &InspectSummary) -> [(&'static str, u64); 9] {
    [
        ("bytes", summary.bytes as u64),
        ("frames", summary.frames as u64),
        ("trailer_failures", summary.trailer_failures as u64),
        ("hmac_failures", summary.hmac_failures as u64),
        ("parse_errors", summary.parse_errors as u64),
        ("replayed", summary.replayed as u64),
        ("resyncs", summary.resyncs),
        ("bytes_discarded", summary.bytes_discarded),
        ("trailing_bytes", summary.trailing_bytes as u64),
    ]
}

fn join_values(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
