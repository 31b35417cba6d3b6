#![cfg(feature = "cli")]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use serde_json::Value;

fn chatlane(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_chatlane"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .output()
        .expect("chatlane should run")
}

fn json_lines(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout line should be JSON"))
        .collect()
}

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "chatlane-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

#[test]
fn encode_prints_compact_token() {
    let output = chatlane(&["encode", "move", r#"{ "x": 1, "y": 2 }"#]);
    assert!(output.status.success());

    let rows = json_lines(&output);
    assert_eq!(rows[0]["token"], r#"move###{"x":1,"y":2}"#);
    assert_eq!(rows[0]["chars"], 20);
    assert_eq!(rows[0]["headroom"], 460);
}

#[test]
fn encode_over_budget_returns_60() {
    let payload = format!("\"{}\"", "x".repeat(494));
    let output = chatlane(&["encode", "t", &payload]);
    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("too large"));
}

#[test]
fn decode_reports_each_token() {
    let output = chatlane(&[
        "decode",
        r#"@id=1 :alice!alice@host PRIVMSG #logic :move###{"x":1}%%broken%%say###"hi""#,
    ]);
    assert_eq!(output.status.code(), Some(60));

    let rows = json_lines(&output);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["status"], "ok");
    assert_eq!(rows[0]["sender"], "alice");
    assert_eq!(rows[0]["payload"]["x"], 1);
    assert_eq!(rows[1]["status"], "malformed");
    assert_eq!(rows[2]["tag"], "say");
}

#[test]
fn decode_reads_stdin() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_chatlane"))
        .args(["--log-level", "error", "--format", "json", "decode"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("decode should start");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(b":a!a@h PRIVMSG #logic :n###1\n\n:b!b@h PRIVMSG #logic :n###2\n")
        .expect("stdin should accept input");
    let output = child.wait_with_output().expect("decode should finish");

    assert!(output.status.success());
    let rows = json_lines(&output);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["line"], 2);
    assert_eq!(rows[1]["sender"], "b");
}

#[test]
fn decode_validates_against_schema_directory() {
    let dir = unique_temp_dir("schemas");
    std::fs::write(
        dir.join("move.schema.json"),
        r#"{"type":"object","properties":{"x":{"type":"integer","minimum":0}}}"#,
    )
    .expect("schema should be writable");

    let output = chatlane(&[
        "decode",
        "--schemas",
        dir.to_str().expect("temp path should be UTF-8"),
        r#":a!a@h PRIVMSG #logic :move###{"x":-4}"#,
    ]);
    assert_eq!(output.status.code(), Some(60));
    assert_eq!(json_lines(&output)[0]["status"], "invalid");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decode_require_schema_flags_unlisted_tags() {
    let dir = unique_temp_dir("required");
    std::fs::write(dir.join("move.schema.json"), r#"{"type":"object"}"#)
        .expect("schema should be writable");
    let dir_arg = dir.to_str().expect("temp path should be UTF-8");
    let line = r#":a!a@h PRIVMSG #logic :move###{"x":1}%%jump###{}"#;

    let open = chatlane(&["decode", "--schemas", dir_arg, line]);
    assert!(open.status.success());

    let closed = chatlane(&["decode", "--schemas", dir_arg, "--require-schema", line]);
    assert_eq!(closed.status.code(), Some(60));
    let rows = json_lines(&closed);
    assert_eq!(rows[0]["status"], "ok");
    assert_eq!(rows[1]["status"], "invalid");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn simulate_respects_cooldown() {
    let output = chatlane(&[
        "simulate",
        "--ticks",
        "100",
        "--messages-per-tick",
        "1",
        "--payload-size",
        "10",
    ]);
    assert!(output.status.success());

    let summary = json_lines(&output).pop().expect("summary line");
    assert_eq!(summary["frames_sent"], 4);
    assert_eq!(summary["min_send_gap"], 30);
    assert_eq!(summary["messages_produced"], 100);
    assert_eq!(summary["chat_lines_sent"], 1);
    assert!(summary["max_frame_chars"].as_u64().unwrap() <= 480);
}

#[test]
fn simulate_counts_viewers_and_records_traffic() {
    let dir = unique_temp_dir("record");
    let record = dir.join("traffic.jsonl");

    let output = chatlane(&[
        "simulate",
        "--ticks",
        "100",
        "--messages-per-tick",
        "0",
        "--viewers",
        "3",
        "--viewer-period",
        "50",
        "--show-sends",
        "--record",
        record.to_str().expect("temp path should be UTF-8"),
    ]);
    assert!(output.status.success());

    let mut lines = json_lines(&output);
    let summary = lines.pop().expect("summary line");
    assert_eq!(summary["chatters"], 3);
    assert_eq!(summary["votes"], 6);
    assert_eq!(summary["malformed"], 0);
    assert!(lines.iter().all(|send| send.get("lane").is_some()));

    let recorded = std::fs::read_to_string(&record).expect("record should exist");
    let inbound = recorded
        .lines()
        .map(|line| serde_json::from_str::<Value>(line).expect("record line should be JSON"))
        .filter(|entry| entry["direction"] == "inbound")
        .count();
    assert_eq!(inbound, 12);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn simulate_rejects_bad_config_with_usage() {
    let output = chatlane(&["simulate", "--cooldown", "0"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn version_prints_package_version() {
    let output = chatlane(&["version"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("chatlane {}", env!("CARGO_PKG_VERSION"))
    );
}
