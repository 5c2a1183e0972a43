#![cfg(feature = "cli")]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f";

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "idtpcli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn idtp() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_idtp"));
    cmd.env_remove("IDTP_HMAC_KEY")
        .env_remove("IDTP_LOG")
        .arg("--log-level")
        .arg("error");
    cmd
}

fn pack_hex(args: &[&str]) -> String {
    let output = idtp().arg("pack").args(args).output().expect("pack should run");
    assert!(
        output.status.success(),
        "pack failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout)
        .expect("hex output should be utf-8")
        .trim()
        .to_string()
}

fn inspect_stdin(args: &[&str], input: &[u8]) -> Output {
    let mut child = idtp()
        .arg("--format")
        .arg("json")
        .arg("inspect")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("inspect should start");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(input)
        .expect("stdin should accept input");
    child.wait_with_output().expect("inspect should finish")
}

#[test]
fn pack_emits_expected_frame_size() {
    let hex = pack_hex(&[
        "--device-id",
        "0x0042",
        "--sequence",
        "7",
        "--payload-type",
        "imu3-acc",
        "--floats",
        "0.5,-1,9.81",
    ]);
    // 20 header + 12 payload + 4 CRC-32
    assert_eq!(hex.len(), 36 * 2);
    assert!(hex.starts_with("49445450"));
}

#[test]
fn packed_file_inspects_cleanly() {
    let dir = unique_temp_dir("roundtrip");
    let path = dir.join("frame.bin");

    let output = idtp()
        .arg("pack")
        .arg("--sequence")
        .arg("3")
        .arg("--payload-type")
        .arg("imu-quat")
        .arg("--floats")
        .arg("1,0,0,0")
        .arg("--encoding")
        .arg("raw")
        .arg("--output")
        .arg(&path)
        .output()
        .expect("pack should run");
    assert!(output.status.success());

    let output = idtp()
        .arg("--format")
        .arg("json")
        .arg("inspect")
        .arg(&path)
        .output()
        .expect("inspect should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"payload_name\":\"imu-quat\""));
    assert!(stdout.contains("\"sequence\":3"));
    assert!(stdout.contains("\"frames\":1"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn corrupted_trailer_returns_60() {
    let mut hex = pack_hex(&["--hex", "cafe", "--payload-type", "0x80"]);
    let last = hex.len() - 1;
    let flipped = if &hex[last..] == "0" { "1" } else { "0" };
    hex.replace_range(last.., flipped);

    let output = inspect_stdin(&["--hex-input"], hex.as_bytes());
    assert_eq!(output.status.code(), Some(60));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"trailer_failures\":1"));
    assert!(stdout.contains("\"frames\":0"));
}

#[test]
fn replay_protection_flags_repeated_sequence() {
    let frame = pack_hex(&["--sequence", "9", "--mode", "lite", "--payload-type", "0x90"]);
    let input = format!("{frame}\n{frame}\n");

    let output = inspect_stdin(&["--hex-input"], input.as_bytes());
    assert!(output.status.success());

    let output = inspect_stdin(&["--hex-input", "--replay-protection"], input.as_bytes());
    assert_eq!(output.status.code(), Some(60));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"replayed\":1"));
}

#[test]
fn secure_mode_requires_key() {
    let output = idtp()
        .arg("pack")
        .arg("--mode")
        .arg("secure")
        .arg("--payload-type")
        .arg("0x80")
        .output()
        .expect("pack should run");
    assert_eq!(output.status.code(), Some(64));

    let output = idtp()
        .env("IDTP_HMAC_KEY", KEY_HEX)
        .arg("pack")
        .arg("--mode")
        .arg("secure")
        .arg("--payload-type")
        .arg("0x80")
        .output()
        .expect("pack should run");
    assert!(output.status.success());
    let frame = String::from_utf8_lossy(&output.stdout).trim().to_string();
    // 20 header + 32 HMAC tag
    assert_eq!(frame.len(), 52 * 2);

    let output = inspect_stdin(&["--hex-input"], frame.as_bytes());
    assert_eq!(output.status.code(), Some(64));

    let output = inspect_stdin(&["--hex-input", "--key-hex", KEY_HEX], frame.as_bytes());
    assert!(output.status.success());
}

#[test]
fn mismatched_standard_payload_is_rejected() {
    let output = idtp()
        .arg("pack")
        .arg("--payload-type")
        .arg("imu6")
        .arg("--floats")
        .arg("1,2,3")
        .output()
        .expect("pack should run");
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn version_reports_name() {
    let output = idtp().arg("version").output().expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("idtp "));
}

#[test]
fn extended_version_reports_build_target() {
    let output = idtp()
        .arg("version")
        .arg("--extended")
        .output()
        .expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let target = stdout
        .lines()
        .find_map(|line| line.strip_prefix("target: "))
        .expect("extended version should print a target line");
    assert_ne!(target, "unknown");
    assert!(stdout.contains("protocol: 2.1"));
}
