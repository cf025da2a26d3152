#![cfg(feature = "cli")]

use std::process::{Command, Output};

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_instrframe"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .output()
        .expect("instrframe should run")
}

fn json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be json")
}

#[test]
fn encode_prevac_channel_read() {
    let out = json(&run(&[
        "encode",
        "--variant",
        "prevac",
        "--command",
        "0x0202",
        "--hex",
        "01",
    ]));
    assert_eq!(out["bytes"], "BB 01 01 FF 02 02 01 06");
    assert_eq!(out["direction"], "request");
    assert_eq!(out["size"], 8);
}

#[test]
fn encode_sqm160_version_query() {
    let out = json(&run(&["encode", "--variant", "sqm160", "--command", "@"]));
    assert_eq!(out["bytes"], "21 23 40 4F 37");
}

#[test]
fn raw_format_writes_frame_bytes() {
    let output = Command::new(env!("CARGO_BIN_EXE_instrframe"))
        .args(["--format", "raw", "encode", "--variant", "sqm160", "--command", "@"])
        .output()
        .expect("instrframe should run");
    assert!(output.status.success());
    assert_eq!(output.stdout, b"!#@O7");
}

#[test]
fn decode_prevac_reply() {
    let out = json(&run(&["decode", "BB 01 FF 01 02 02 01 08"]));
    assert_eq!(out["command"], 0x0202);
    assert_eq!(out["destination"], 0xFF);
    assert_eq!(out["source"], 0x01);
    assert_eq!(out["payload"], "01");
    assert_eq!(out["checksum_valid"], true);
    assert_eq!(out["error_reply"], false);
}

#[test]
fn decode_reports_stray_bytes() {
    let out = json(&run(&["decode", "00 13 BB 01 FF 01 02 02 01 08"]));
    let warnings = out["warnings"].as_array().expect("warnings array");
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].as_str().unwrap_or_default().contains("skipped 2"));
}

#[test]
fn decode_ignoring_checksum_flags_mismatch() {
    let out = json(&run(&["decode", "--ignore-checksum", "BB 01 FF 01 02 02 01 09"]));
    assert_eq!(out["checksum_valid"], false);
}

#[test]
fn decode_sqm160_request() {
    let out = json(&run(&["decode", "--variant", "sqm160", "--request", "21 23 40 4F 37"]));
    assert_eq!(out["command"], 0x40);
    assert_eq!(out["payload_size"], 0);
    assert!(out.get("destination").is_none());
}

#[test]
fn checksum_algorithms() {
    let crc = json(&run(&["checksum", "--algorithm", "crc14", "23 40"]));
    assert_eq!(crc["value"], 2733);
    assert_eq!(crc["trailer"], "4F 37");

    let sum = json(&run(&["checksum", "01 01 FF 02 02 01"]));
    assert_eq!(sum["value"], 6);
    assert_eq!(sum["trailer"], "06");
}

#[test]
fn codes_lists_bundled_tables() {
    let results = json(&run(&["codes", "--variant", "prevac", "--table", "results"]));
    let results = results.as_array().expect("array of codes");
    assert_eq!(results.len(), 9);
    assert_eq!(results[7]["kind"], "local_mode");

    let all = json(&run(&["codes", "--variant", "prevac"]));
    assert_eq!(all.as_array().map(Vec::len), Some(39));

    let sqm = json(&run(&["codes", "--variant", "sqm160"]));
    assert_eq!(sqm.as_array().map(Vec::len), Some(3));
}

#[test]
fn version_prints_name() {
    let output = run(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("instrframe "));
}
