#![cfg(feature = "cli")]

use std::io::Read;
use std::net::UdpSocket;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use signalmesh::wire::{decode, encode, BUILD_STARTED, INSPECTION_PASSED, LESSON_EXTRACTED};

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_signalmesh"))
}

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "smcli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn receiver() -> (UdpSocket, u16) {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("receiver should bind");
    socket
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("read timeout should be settable");
    let port = socket.local_addr().expect("receiver should have an address").port();
    (socket, port)
}

fn free_port() -> u16 {
    receiver().1
}

#[test]
fn send_writes_one_datagram() {
    let (rx, port) = receiver();

    let output = bin()
        .args(["send", "--port", &port.to_string(), "--signal", "INSPECTION_PASSED"])
        .args(["--json", r#"{"build_id":"b-1"}"#])
        .output()
        .expect("send should run");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let mut buf = [0u8; 2048];
    let (n, _) = rx.recv_from(&mut buf).expect("datagram should arrive");
    let message = decode(&buf[..n]).expect("datagram should decode");
    assert_eq!(message.signal, INSPECTION_PASSED);
    assert_eq!(message.payload["build_id"], "b-1");
}

#[test]
fn send_with_invalid_json_is_usage_error() {
    let output = bin()
        .args(["send", "--port", "41001", "--signal", "0xC3", "--json", "{oops"])
        .output()
        .expect("send should run");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn signals_lists_the_table_as_json() {
    let output = bin()
        .args(["--format", "json", "signals"])
        .output()
        .expect("signals should run");
    assert!(output.status.success());

    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("signals should emit json");
    let signals = payload["signals"].as_array().expect("signals should be an array");
    assert!(signals
        .iter()
        .any(|row| row["name"] == "BUILD_STARTED" && row["code"] == 0xC3 && row["direction"] == "received"));
    assert!(signals
        .iter()
        .any(|row| row["name"] == "LESSON_EXTRACTED" && row["direction"] == "emitted"));
}

#[test]
fn version_reports_package_version() {
    let output = bin().arg("version").output().expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn broadcast_reaches_configured_peers() {
    let dir = unique_temp_dir("broadcast");
    let (rx_a, port_a) = receiver();
    let (rx_b, port_b) = receiver();
    let config = dir.join("mesh.json");
    std::fs::write(
        &config,
        format!(
            r#"{{ "port": {}, "peers": [{{"name":"a","port":{port_a}}},{{"name":"b","port":{port_b}}}] }}"#,
            free_port()
        ),
    )
    .expect("config should be writable");

    let output = bin()
        .args(["--format", "json", "broadcast", "--config"])
        .arg(&config)
        .args(["--signal", "LESSON_EXTRACTED", "--json", r#"{"lesson":"x"}"#])
        .output()
        .expect("broadcast should run");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("broadcast should emit json");
    assert_eq!(report["delivered"], serde_json::json!(["a", "b"]));
    assert_eq!(report["failed"], serde_json::json!([]));

    let mut buf = [0u8; 2048];
    for rx in [&rx_a, &rx_b] {
        let (n, _) = rx.recv_from(&mut buf).expect("peer should receive the broadcast");
        assert_eq!(decode(&buf[..n]).unwrap().signal, LESSON_EXTRACTED);
    }

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn listen_prints_received_message_and_exits_after_count() {
    let port = free_port();
    let mut child = bin()
        .args(["--format", "json", "--log-level", "off", "listen", "--port"])
        .arg(port.to_string())
        .args(["--count", "1"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("listen should spawn");

    let client = UdpSocket::bind("127.0.0.1:0").unwrap();
    let datagram = encode(BUILD_STARTED, &serde_json::json!({"build_id": "b-42"})).unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);

    // The listener binds asynchronously; resend until it has seen one.
    let status = loop {
        let _ = client.send_to(&datagram, ("127.0.0.1", port));
        if let Some(status) = child.try_wait().expect("child status should be readable") {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            panic!("listen did not exit after one message");
        }
        thread::sleep(Duration::from_millis(50));
    };
    assert!(status.success());

    let mut stdout = String::new();
    child
        .stdout
        .take()
        .expect("stdout should be piped")
        .read_to_string(&mut stdout)
        .unwrap();
    let line: serde_json::Value = serde_json::from_str(
        stdout.lines().next().expect("listen should print one line"),
    )
    .expect("listen output should be json");
    assert_eq!(line["signal_name"], "BUILD_STARTED");
    assert_eq!(line["payload"]["build_id"], "b-42");
}

#[test]
fn listen_on_occupied_port_is_transport_error() {
    let (_holder, port) = receiver();

    let output = bin()
        .args(["listen", "--port", &port.to_string()])
        .output()
        .expect("listen should run");
    assert_eq!(output.status.code(), Some(3));
}
