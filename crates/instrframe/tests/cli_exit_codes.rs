#![cfg(feature = "cli")]

use std::path::PathBuf;
use std::process::{Command, Output};

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_instrframe"))
        .args(["--log-level", "off", "--format", "json"])
        .args(args)
        .output()
        .expect("instrframe should run")
}

fn temp_file(tag: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "instrframe-cli-{tag}-{}-{}.json",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::write(&path, contents).expect("temp file should be writable");
    path
}

#[test]
fn checksum_mismatch_is_data_invalid() {
    let output = run(&["decode", "BB 01 FF 01 02 02 01 09"]);
    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("checksum"));
}

#[test]
fn truncated_frame_is_data_invalid() {
    let output = run(&["decode", "BB 05 FF 01 02"]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn bad_hex_is_usage_error() {
    let output = run(&["checksum", "BB0"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn oversized_payload_is_usage_error() {
    let payload = "00".repeat(256);
    let output = run(&["encode", "--command", "0x0101", "--hex", &payload]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn missing_serial_port_is_transport_error() {
    let output = run(&[
        "query",
        "--port",
        "/nonexistent/instrframe-tty",
        "--command",
        "0x0202",
        "--timeout",
        "100ms",
    ]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn invalid_table_file_is_data_invalid() {
    let path = temp_file(
        "dup",
        r#"{"name":"dup","width":"byte","entries":[{"code":1,"kind":"read_only"},{"code":1,"kind":"local_mode"}]}"#,
    );
    let output = run(&["codes", "--file", path.to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(60));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn table_file_is_listed() {
    let path = temp_file(
        "ok",
        r#"{"name":"site","width":"word","entries":[{"code":0},{"code":513,"kind":"out_of_range","severity":"warning","description":"clipped"}]}"#,
    );
    let output = run(&["codes", "--file", path.to_str().expect("utf-8 path")]);
    assert!(output.status.success());
    let listed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be json");
    assert_eq!(listed[1]["severity"], "warning");
    assert_eq!(listed[1]["table"], "site");
    let _ = std::fs::remove_file(&path);
}
