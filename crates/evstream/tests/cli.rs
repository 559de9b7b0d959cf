#![cfg(all(unix, feature = "cli"))]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::thread;

use evstream::frame::{decode_message, FrameConfig, FramedTransport, Message};
use evstream::session::transcript_event_headers;
use evstream::transport::{Transport, TransportEvent, UnixSocketListener};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/evscli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn evstream(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_evstream"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .output()
        .expect("evstream should run")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be JSON"))
        .collect()
}

fn transcript_frame(id: &str, is_partial: bool, text: &str) -> Vec<u8> {
    let body = format!(
        r#"{{"Transcript":{{"Results":[{{"ResultId":"{id}","IsPartial":{is_partial},"Alternatives":[{{"Transcript":"{text}"}}]}}]}}}}"#
    );
    Message::new(transcript_event_headers(), body)
        .encode()
        .expect("frame should encode")
        .to_vec()
}

#[test]
fn encode_then_decode_lists_every_message() {
    let dir = unique_temp_dir("roundtrip");
    let audio_path = dir.join("audio.pcm");
    let frames_path = dir.join("audio.evs");
    std::fs::write(&audio_path, vec![0x11; 2500]).expect("write audio");

    let output = evstream(&[
        "--format",
        "json",
        "encode",
        "--input",
        path_arg(&audio_path),
        "--output",
        path_arg(&frames_path),
        "--chunk-size",
        "1000",
    ]);
    assert!(output.status.success());
    let summary = &json_lines(&output)[0];
    assert_eq!(summary["messages"], 4);
    assert_eq!(summary["audio_bytes"], 2500);
    assert_eq!(summary["end_stream"], true);

    let output = evstream(&["--format", "json", "decode", path_arg(&frames_path)]);
    assert!(output.status.success());
    let rows = json_lines(&output);
    let sizes: Vec<u64> = rows
        .iter()
        .map(|row| row["payload_size"].as_u64().expect("payload size"))
        .collect();
    assert_eq!(sizes, [1000, 1000, 500, 0]);
    assert_eq!(rows[0]["headers"]["event-type"], "AudioEvent");
    assert_eq!(rows[0]["headers"]["content-type"], "application/octet-stream");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn raw_decode_recovers_audio() {
    let dir = unique_temp_dir("raw");
    let audio_path = dir.join("audio.pcm");
    let frames_path = dir.join("audio.evs");
    let audio: Vec<u8> = (0..5000u32).map(|i| (i % 256) as u8).collect();
    std::fs::write(&audio_path, &audio).expect("write audio");

    let output = evstream(&[
        "encode",
        "-i",
        path_arg(&audio_path),
        "--chunk-size",
        "777",
        "--no-end-stream",
    ]);
    assert!(output.status.success());
    std::fs::write(&frames_path, &output.stdout).expect("write frames");

    let output = evstream(&["--format", "raw", "decode", path_arg(&frames_path)]);
    assert!(output.status.success());
    assert_eq!(output.stdout, audio);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decode_reports_corrupt_messages() {
    let dir = unique_temp_dir("corrupt");
    let frames_path = dir.join("frames.evs");

    let mut wire = transcript_frame("a", true, "hel");
    let mut corrupt = transcript_frame("a", false, "hello");
    let idx = corrupt.len() - 10;
    corrupt[idx] ^= 0x01;
    wire.extend_from_slice(&corrupt);
    std::fs::write(&frames_path, &wire).expect("write frames");

    let output = evstream(&["--format", "json", "decode", path_arg(&frames_path)]);
    assert_eq!(output.status.code(), Some(60));
    let rows = json_lines(&output);
    assert_eq!(rows.len(), 2);
    assert!(rows[0].get("error").is_none());
    assert!(rows[1]["error"]
        .as_str()
        .expect("error text")
        .contains("message checksum invalid"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decode_events_classifies_results() {
    let dir = unique_temp_dir("events");
    let frames_path = dir.join("results.evs");

    let mut wire = transcript_frame("u1", true, "hel");
    wire.extend_from_slice(&transcript_frame("u1", true, "hello"));
    wire.extend_from_slice(&transcript_frame("u1", false, "hello world"));
    std::fs::write(&frames_path, &wire).expect("write frames");

    let output = evstream(&[
        "--format",
        "json",
        "decode",
        "--events",
        path_arg(&frames_path),
    ]);
    assert!(output.status.success());
    let events = json_lines(&output);
    let names: Vec<&str> = events
        .iter()
        .map(|e| e["event"].as_str().expect("event name"))
        .collect();
    assert_eq!(names, ["partial", "partial", "final"]);
    assert_eq!(
        events[2]["transcript"]["Results"][0]["Alternatives"][0]["Transcript"],
        "hello world"
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decode_events_rejects_truncated_input() {
    let dir = unique_temp_dir("truncated");
    let frames_path = dir.join("results.evs");

    let mut wire = transcript_frame("t1", false, "complete");
    let cut = transcript_frame("t2", false, "cut short");
    wire.extend_from_slice(&cut[..cut.len() - 3]);
    std::fs::write(&frames_path, &wire).expect("write frames");

    let output = evstream(&[
        "--format",
        "json",
        "decode",
        "--events",
        path_arg(&frames_path),
    ]);
    assert_eq!(output.status.code(), Some(60));
    let events = json_lines(&output);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["event"], "final");
    assert_eq!(events[1]["event"], "error");
    assert!(events[1]["error_message"]
        .as_str()
        .expect("error message")
        .contains("input ends inside a message"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn stream_times_out_when_peer_stops_reading() {
    let dir = unique_temp_dir("stalled");
    let sock_path = dir.join("asr.sock");
    let audio_path = dir.join("audio.pcm");
    std::fs::write(&audio_path, vec![0x42; 8 * 1024 * 1024]).expect("write audio");

    let listener = UnixSocketListener::bind(&sock_path).expect("listener should bind");
    let (done_tx, done_rx) = std::sync::mpsc::channel::<()>();
    let peer = thread::spawn(move || {
        let stream = listener.accept().expect("listener should accept");
        // Hold the connection open without reading from it.
        let _ = done_rx.recv();
        drop(stream);
    });

    let output = evstream(&[
        "stream",
        path_arg(&sock_path),
        "--input",
        path_arg(&audio_path),
        "--timeout",
        "200ms",
    ]);
    let _ = done_tx.send(());
    peer.join().expect("peer thread");

    assert_eq!(output.status.code(), Some(124));
    assert!(String::from_utf8_lossy(&output.stderr).contains("send failed"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn stream_sends_audio_and_prints_results() {
    let dir = unique_temp_dir("stream");
    let sock_path = dir.join("asr.sock");
    let audio_path = dir.join("audio.pcm");
    std::fs::write(&audio_path, vec![0x42; 3000]).expect("write audio");

    let listener = UnixSocketListener::bind(&sock_path).expect("listener should bind");
    let peer = thread::spawn(move || {
        let stream = listener.accept().expect("listener should accept");
        let mut transport =
            FramedTransport::from_ipc(stream, FrameConfig::default()).expect("peer transport");
        assert_eq!(transport.next_event().expect("open"), TransportEvent::Open);

        let mut received = 0usize;
        loop {
            match transport.next_event().expect("peer event") {
                TransportEvent::Unit(unit) => {
                    let message = decode_message(&unit).expect("audio frame");
                    if message.payload.is_empty() {
                        break;
                    }
                    received += message.payload.len();
                }
                other => panic!("unexpected peer event {other:?}"),
            }
        }

        for frame in [
            transcript_frame("s1", true, "stream"),
            transcript_frame("s1", false, "streamed audio"),
        ] {
            transport
                .send_unit(frame.into())
                .expect("peer should send results");
        }
        transport.close().expect("peer close");
        received
    });

    let output = evstream(&[
        "--format",
        "json",
        "stream",
        path_arg(&sock_path),
        "--input",
        path_arg(&audio_path),
        "--chunk-size",
        "1024",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let names: Vec<String> = json_lines(&output)
        .iter()
        .map(|e| e["event"].as_str().expect("event name").to_string())
        .collect();
    assert_eq!(names, ["partial", "final", "closed"]);
    assert_eq!(peer.join().expect("peer thread"), 3000);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn stream_without_listener_fails() {
    let dir = unique_temp_dir("nolistener");
    let audio_path = dir.join("audio.pcm");
    std::fs::write(&audio_path, [0u8; 16]).expect("write audio");

    let output = evstream(&[
        "stream",
        path_arg(&dir.join("missing.sock")),
        "--input",
        path_arg(&audio_path),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("connect failed"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn zero_chunk_size_is_a_usage_error() {
    let dir = unique_temp_dir("usage");
    let audio_path = dir.join("audio.pcm");
    std::fs::write(&audio_path, [0u8; 4]).expect("write audio");

    let output = evstream(&["encode", "--input", path_arg(&audio_path), "--chunk-size", "0"]);
    assert_eq!(output.status.code(), Some(64));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_reports_package_version() {
    let output = evstream(&["version"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("evstream {}", env!("CARGO_PKG_VERSION"))
    );
}
