#![cfg(all(unix, feature = "cli"))]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/sbdlink-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn write_registry(dir: &Path) -> PathBuf {
    let path = dir.join("registry.json");
    std::fs::write(
        &path,
        r#"{"version": "fm-1", "descriptors": ["battery", "log", "set_mode"]}"#,
    )
    .expect("registry file should be writable");
    path
}

fn sbdlink(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sbdlink"))
        .arg("--log-level")
        .arg("error")
        .arg("--format")
        .arg("json")
        .args(args)
        .output()
        .expect("sbdlink should run")
}

fn json_lines(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("stdout line should be JSON"))
        .collect()
}

fn assert_close(actual: &Value, expected: f64) {
    let actual = actual.as_f64().expect("value should be a number");
    assert!(
        (actual - expected).abs() <= expected.abs() * 1e-4,
        "{actual} is not close to {expected}"
    );
}

#[test]
fn float_encode_prints_packed_bytes() {
    let output = sbdlink(&["float", "encode", "123.45"]);
    assert!(output.status.success(), "stderr: {:?}", output.stderr);

    let lines = json_lines(&output);
    assert_eq!(lines[0]["hex"], "103039");
    assert_close(&lines[0]["value"], 123.45);
}

#[test]
fn float_encode_accepts_negative_values() {
    let output = sbdlink(&["float", "encode", "-0.5"]);
    assert!(output.status.success());

    let lines = json_lines(&output);
    assert_close(&lines[0]["value"], -0.5);
}

#[test]
fn float_decode_reads_packed_bytes() {
    let output = sbdlink(&["float", "decode", "103039"]);
    assert!(output.status.success());

    let lines = json_lines(&output);
    assert_close(&lines[0]["value"], 123.45);
}

#[test]
fn float_decode_rejects_wrong_length() {
    let output = sbdlink(&["float", "decode", "1030"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn encode_then_decode_downlink_frame() {
    let dir = unique_temp_dir("roundtrip");
    let registry = write_registry(&dir);
    let registry = registry.to_str().expect("utf-8 path");

    let encoded = sbdlink(&[
        "encode",
        "--registry",
        registry,
        "--descriptor",
        "battery",
        "--values",
        "3.3,-1.5",
        "--at",
        "2024-03-09T12:30:00Z",
    ]);
    assert!(encoded.status.success(), "stderr: {:?}", encoded.stderr);
    let frames = json_lines(&encoded);
    assert_eq!(frames.len(), 1);
    let frame = frames[0]["frame"].as_str().expect("frame should be hex");

    let decoded = sbdlink(&[
        "decode",
        "--registry",
        registry,
        "--reference",
        "2024-03-10T00:00:00Z",
        frame,
    ]);
    assert!(decoded.status.success(), "stderr: {:?}", decoded.stderr);
    let packets = json_lines(&decoded);
    assert_eq!(packets[0]["descriptor"], "battery");
    assert_eq!(packets[0]["timestamp"], "2024-03-09T12:30:00Z");
    assert_eq!(packets[0]["numerical"], true);
    let values = packets[0]["values"].as_array().expect("values array");
    assert_eq!(values.len(), 2);
    assert_close(&values[0], 3.3);
    assert_close(&values[1], -1.5);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn encode_splits_large_payloads() {
    let dir = unique_temp_dir("split");
    let registry = write_registry(&dir);
    let values = (0..150).map(|v| v.to_string()).collect::<Vec<_>>().join(",");

    let output = sbdlink(&[
        "encode",
        "--registry",
        registry.to_str().expect("utf-8 path"),
        "--descriptor",
        "battery",
        "--values",
        &values,
        "--at",
        "2024-03-09T12:30:00Z",
    ]);
    assert!(output.status.success());
    let frames = json_lines(&output);
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0]["index"], 0);
    assert_eq!(frames[1]["index"], 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn uplink_command_round_trips() {
    let dir = unique_temp_dir("uplink");
    let registry = write_registry(&dir);
    let registry = registry.to_str().expect("utf-8 path");

    let encoded = sbdlink(&[
        "encode",
        "--registry",
        registry,
        "--descriptor",
        "set_mode",
        "--values",
        "2",
        "--uplink",
    ]);
    assert!(encoded.status.success());
    let frames = json_lines(&encoded);
    assert_eq!(frames[0]["body"], "03004e20");
    let frame = frames[0]["frame"].as_str().expect("frame should be hex");

    let decoded = sbdlink(&["decode", "--registry", registry, "--uplink", frame]);
    assert!(decoded.status.success(), "stderr: {:?}", decoded.stderr);
    let packets = json_lines(&decoded);
    assert_eq!(packets[0]["descriptor"], "set_mode");
    let args = packets[0]["args"].as_array().expect("args array");
    assert_eq!(args.len(), 1);
    assert_close(&args[0], 2.0);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn corrupted_frame_is_invalid_data() {
    let dir = unique_temp_dir("corrupt");
    let registry = write_registry(&dir);
    let registry = registry.to_str().expect("utf-8 path");

    let encoded = sbdlink(&[
        "encode",
        "--registry",
        registry,
        "--descriptor",
        "log",
        "--text",
        "ok",
        "--at",
        "2024-03-09T12:30:00Z",
    ]);
    assert!(encoded.status.success());
    let frames = json_lines(&encoded);
    let mut frame = frames[0]["frame"]
        .as_str()
        .expect("frame should be hex")
        .to_string();
    // Flip the last checksum nibble.
    let last = frame.pop().expect("frame should not be empty");
    frame.push(if last == '0' { '1' } else { '0' });

    let decoded = sbdlink(&["decode", "--registry", registry, &frame]);
    assert_eq!(decoded.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&decoded.stderr).contains("checksum mismatch"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn invalid_hex_is_usage_error() {
    let dir = unique_temp_dir("hex");
    let registry = write_registry(&dir);

    let output = sbdlink(&[
        "decode",
        "--registry",
        registry.to_str().expect("utf-8 path"),
        "zz",
    ]);
    assert_eq!(output.status.code(), Some(64));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn unregistered_descriptor_is_invalid_data() {
    let dir = unique_temp_dir("unregistered");
    let registry = write_registry(&dir);

    let output = sbdlink(&[
        "encode",
        "--registry",
        registry.to_str().expect("utf-8 path"),
        "--descriptor",
        "nope",
        "--values",
        "1",
    ]);
    assert_eq!(output.status.code(), Some(60));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn registry_lists_codes_and_fingerprint() {
    let dir = unique_temp_dir("registry");
    let registry = write_registry(&dir);

    let output = sbdlink(&["registry", registry.to_str().expect("utf-8 path")]);
    assert!(output.status.success());

    let lines = json_lines(&output);
    let doc = &lines[0];
    assert_eq!(doc["version"], "fm-1");
    assert_eq!(doc["fingerprint"].as_str().map(str::len), Some(8));
    let descriptors = doc["descriptors"].as_array().expect("descriptors array");
    assert_eq!(descriptors.len(), 4);
    assert_eq!(descriptors[0]["code"], 0);
    assert_eq!(descriptors[0]["name"], "filler");
    assert_eq!(descriptors[3]["code"], 3);
    assert_eq!(descriptors[3]["name"], "set_mode");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_registry_file_fails() {
    let output = sbdlink(&["registry", "/tmp/sbdlink-definitely-missing/registry.json"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn contact_on_missing_device_fails() {
    let dir = unique_temp_dir("contact");
    let registry = write_registry(&dir);

    let output = sbdlink(&[
        "contact",
        "/dev/sbdlink-no-such-modem",
        "--registry",
        registry.to_str().expect("utf-8 path"),
        "--telemetry",
        "battery=3.3",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to open modem"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_prints_package_version() {
    let output = sbdlink(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("sbdlink "));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}
