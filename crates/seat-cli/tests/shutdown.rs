//! Integration tests for clean shutdown of `seats serve` and `seats http`.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn seats_binary() -> std::path::PathBuf {
    assert_cmd::cargo::cargo_bin!("seats").into()
}

fn spawn(data_dir: &TempDir, args: &[&str]) -> Child {
    Command::new(seats_binary())
        .args(args)
        .env("SEATS_DATA_DIR", data_dir.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn seats")
}

/// Send the MCP initialize handshake so the server enters its main loop.
fn mcp_handshake(child: &mut Child) {
    let stdin = child.stdin.as_mut().expect("stdin pipe");

    let init_req = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": { "name": "test", "version": "0.1.0" }
        }
    });
    send_jsonrpc(stdin, &init_req);
    std::thread::sleep(Duration::from_millis(300));

    let initialized = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "notifications/initialized"
    });
    send_jsonrpc(stdin, &initialized);
    std::thread::sleep(Duration::from_millis(200));
}

/// Newline-delimited JSON-RPC, as the stdio transport expects.
fn send_jsonrpc(stdin: &mut impl Write, msg: &serde_json::Value) {
    let line = serde_json::to_string(msg).unwrap();
    writeln!(stdin, "{line}").unwrap();
    stdin.flush().unwrap();
}

#[test]
fn serve_exits_on_early_stdin_eof() {
    let dir = TempDir::new().unwrap();
    let mut child = spawn(&dir, &["serve"]);
    std::thread::sleep(Duration::from_millis(300));

    drop(child.stdin.take());

    let start = Instant::now();
    let output = child.wait_with_output().expect("wait");
    let elapsed = start.elapsed();

    assert!(
        output.status.success(),
        "early stdin EOF should exit 0, got {}",
        output.status
    );
    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
}

#[test]
fn serve_answers_tool_call_then_exits_on_eof() {
    let dir = TempDir::new().unwrap();
    let mut child = spawn(&dir, &["serve"]);
    mcp_handshake(&mut child);

    let stdin = child.stdin.as_mut().expect("stdin pipe");
    let call = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tools/call",
        "params": { "name": "seat_stats", "arguments": {} }
    });
    send_jsonrpc(stdin, &call);
    std::thread::sleep(Duration::from_millis(300));

    drop(child.stdin.take());

    let start = Instant::now();
    let output = child.wait_with_output().expect("wait");
    let elapsed = start.elapsed();

    assert!(
        output.status.success(),
        "seats serve should exit 0 on stdin EOF, got {}",
        output.status
    );
    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("available"), "missing stats in {stdout}");
}

/// Wait for the "listening on" line and return the bound address.
fn wait_for_listen(child: &mut Child) -> String {
    let stderr = child.stderr.take().expect("stderr pipe");
    let mut reader = BufReader::new(stderr);
    let mut line = String::new();
    loop {
        line.clear();
        let read = reader.read_line(&mut line).expect("read stderr");
        assert!(read > 0, "seats http exited before listening");
        if let Some(addr) = line.trim().strip_prefix("listening on http://") {
            return addr.to_string();
        }
    }
}

#[cfg(unix)]
#[test]
fn http_exits_on_sigterm() {
    let dir = TempDir::new().unwrap();
    let mut child = spawn(&dir, &["http", "--bind", "127.0.0.1:0"]);
    let addr = wait_for_listen(&mut child);
    assert!(addr.starts_with("127.0.0.1:"));

    let status = Command::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .expect("kill");
    assert!(status.success());

    let start = Instant::now();
    let exit = child.wait().expect("wait");
    let elapsed = start.elapsed();

    assert!(exit.success(), "graceful shutdown should exit 0, got {exit}");
    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
}
