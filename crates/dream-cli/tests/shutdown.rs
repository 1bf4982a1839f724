//! `dreamsig serve` must exit cleanly once its stdin closes, whether or
//! not an MCP session was ever initialized.

use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tempfile::TempDir;

const EXIT_DEADLINE: Duration = Duration::from_secs(2);

struct ServeProcess {
    child: Child,
    stdout: BufReader<ChildStdout>,
    data: TempDir,
}

impl ServeProcess {
    /// Spawn the server and return once it has opened its store.
    fn start() -> Self {
        let data = TempDir::new().unwrap();
        let mut child = Command::new(assert_cmd::cargo::cargo_bin!("dreamsig"))
            .arg("serve")
            .env("DREAMSIG_DATA_DIR", data.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();
        let stdout = BufReader::new(child.stdout.take().unwrap());
        let server = Self {
            child,
            stdout,
            data,
        };

        let ready_by = Instant::now() + Duration::from_secs(5);
        while !server.db_path().exists() {
            assert!(Instant::now() < ready_by, "store was never created");
            thread::sleep(Duration::from_millis(20));
        }
        server
    }

    fn db_path(&self) -> PathBuf {
        self.data.path().join("dreams.db")
    }

    /// One JSON-RPC message per line on stdin.
    fn send(&mut self, msg: &Value) {
        let stdin = self.child.stdin.as_mut().unwrap();
        writeln!(stdin, "{msg}").unwrap();
        stdin.flush().unwrap();
    }

    fn read_reply(&mut self) -> Value {
        let mut line = String::new();
        self.stdout.read_line(&mut line).unwrap();
        serde_json::from_str(&line).unwrap_or_else(|e| panic!("bad reply {line:?}: {e}"))
    }

    fn initialize_session(&mut self) {
        self.send(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "shutdown-test", "version": "0.0.0" }
            }
        }));
        let reply = self.read_reply();
        assert_eq!(reply["id"], 1);
        assert!(reply["result"].is_object(), "initialize failed: {reply}");

        self.send(&json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }));
    }

    /// Close stdin and time how long the process takes to exit.
    fn close_stdin(&mut self) -> (ExitStatus, Duration) {
        drop(self.child.stdin.take());
        let closed_at = Instant::now();
        let status = self.child.wait().unwrap();
        (status, closed_at.elapsed())
    }
}

#[test]
fn serve_exits_when_stdin_closes_before_initialize() {
    let mut server = ServeProcess::start();

    let (status, took) = server.close_stdin();

    assert!(status.success(), "exit status {status}");
    assert!(took < EXIT_DEADLINE, "exit took {took:?}");
}

#[test]
fn serve_exits_when_stdin_closes_mid_session() {
    let mut server = ServeProcess::start();
    server.initialize_session();

    let (status, took) = server.close_stdin();

    assert!(status.success(), "exit status {status}");
    assert!(took < EXIT_DEADLINE, "exit took {took:?}");
    assert!(server.db_path().exists());
}
