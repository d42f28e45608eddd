//! Session integration tests for stc-agent.
//!
//! Drive the real service loop over a Unix socket, with shell scripts
//! standing in for the wrapped statistics tools.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serial_test::serial;
use stc_agent::{CollectorRegistry, Listener, ListenerConfig, Server};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

// =============================================================================
// Test Helpers
// =============================================================================

/// Sampler stand-in: prints a header, then a sample per tick until SIGINT.
const SAMPLER: &str = "#!/bin/sh\n\
    trap 'echo summary; exit 0' INT TERM\n\
    echo \"Time_Of_Day_Seconds CPU Bzy_MHz\"\n\
    while :; do echo \"$(date +%s) 0 2400\"; sleep 0.05; done\n";

fn write_tool(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, body).expect("Failed to write tool script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to make tool executable");
    path.to_string_lossy().into_owned()
}

/// Minimal protocol client.
struct Client {
    stream: BufReader<UnixStream>,
}

impl Client {
    async fn connect(path: &Path) -> Self {
        let stream = UnixStream::connect(path)
            .await
            .expect("Failed to connect to agent");
        Self {
            stream: BufReader::new(stream),
        }
    }

    /// Send one command and return the reply without its delimiter line.
    async fn request(&mut self, command: &str) -> String {
        self.stream
            .get_mut()
            .write_all(format!("{command}\n--\n").as_bytes())
            .await
            .expect("Failed to send command");

        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            let n = self.stream.read_line(&mut line).await.expect("Failed to read reply");
            assert!(n > 0, "connection closed while waiting for reply to '{command}'");
            let line = line.trim_end_matches(['\r', '\n']).to_string();
            if line == "--" {
                break;
            }
            lines.push(line);
        }
        lines.join("\n")
    }
}

/// Bind a listener on a socket inside `dir`.
fn bind(dir: &Path) -> (Listener, PathBuf) {
    let path = dir.join("agent.sock");
    let config = ListenerConfig {
        unix_socket: Some(path.clone()),
        ..ListenerConfig::default()
    };
    let listener = Listener::bind(&config).expect("Failed to bind listener");
    (listener, path)
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
#[serial]
async fn test_end_to_end_collection() {
    let dir = tempfile::tempdir().unwrap();
    let tool = write_tool(dir.path(), "sampler.sh", SAMPLER);
    let outdir = dir.path().join("out");
    let (listener, socket) = bind(dir.path());
    let server = Server::new(listener, CollectorRegistry::new());

    let client = async {
        let mut client = Client::connect(&socket).await;
        assert_eq!(client.request("set-stats frequency-sampler").await, "OK");
        assert_eq!(
            client
                .request(&format!("set-collector-property * outdir {}", outdir.display()))
                .await,
            "OK"
        );
        assert_eq!(
            client
                .request(&format!("set-collector-property frequency-sampler toolpath {tool}"))
                .await,
            "OK"
        );
        assert_eq!(
            client
                .request("set-collector-property frequency-sampler interval 0.1")
                .await,
            "OK"
        );
        assert_eq!(client.request("configure").await, "OK");
        assert_eq!(client.request("start").await, "OK");
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(client.request("stop").await, "OK");
        assert_eq!(client.request("get-failed-collectors").await, "OK ");
        assert_eq!(client.request("exit").await, "OK");
    };

    let ((), ()) = tokio::join!(server.run(), client);

    let output = std::fs::read_to_string(outdir.join("frequency-sampler.raw.txt")).unwrap();
    assert!(output.starts_with("Time_Of_Day_Seconds CPU Bzy_MHz"));
    assert!(output.contains("summary"));

    let cmd_log = std::fs::read_to_string(outdir.join("logs/frequency-sampler.cmd.txt")).unwrap();
    assert!(cmd_log.contains("--quiet --show Time_Of_Day_Seconds,CPU,Bzy_MHz --interval 0.1"));

    assert!(!socket.exists());
}

#[tokio::test]
#[serial]
async fn test_partial_failures_over_protocol() {
    let dir = tempfile::tempdir().unwrap();
    let tool = write_tool(dir.path(), "sampler.sh", SAMPLER);
    let outdir = dir.path().join("out");
    let (listener, socket) = bind(dir.path());
    let server = Server::new(listener, CollectorRegistry::new());

    let client = async {
        let mut client = Client::connect(&socket).await;

        // A fallible collector that cannot launch is recorded and skipped.
        assert_eq!(
            client.request("set-stats ipmi-inband,frequency-sampler").await,
            "OK"
        );
        for command in [
            format!("set-collector-property * outdir {}", outdir.display()),
            "set-collector-property * interval 0.1".to_string(),
            format!("set-collector-property frequency-sampler toolpath {tool}"),
            "set-collector-property ipmi-inband toolpath /nonexistent/ipmi-helper".to_string(),
            "set-collector-property ipmi-inband fallible True".to_string(),
        ] {
            assert_eq!(client.request(&command).await, "OK", "{command}");
        }
        assert_eq!(client.request("configure").await, "OK");
        assert_eq!(client.request("start").await, "OK");
        assert_eq!(
            client.request("get-failed-collectors").await,
            "OK ipmi-inband"
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(client.request("stop").await, "OK");

        // Booleans only accept True/False.
        let reply = client
            .request("set-collector-property frequency-sampler fallible yes")
            .await;
        assert!(reply.starts_with("error: "), "{reply}");
        assert!(reply.contains("expected bool"), "{reply}");

        // A non-fallible collector that cannot launch fails the call.
        assert_eq!(client.request("set-stats frequency-sampler").await, "OK");
        assert_eq!(client.request("get-failed-collectors").await, "OK ");
        for command in [
            format!("set-collector-property * outdir {}", outdir.display()),
            "set-collector-property * interval 0.1".to_string(),
            "set-collector-property * toolpath /nonexistent/turbostat".to_string(),
        ] {
            assert_eq!(client.request(&command).await, "OK", "{command}");
        }
        assert_eq!(client.request("configure").await, "OK");
        let reply = client.request("start").await;
        assert!(
            reply.starts_with("error: frequency-sampler: start failed: failed to launch"),
            "{reply}"
        );

        // The registry is not stuck: stop reports it was never started.
        assert_eq!(
            client.request("stop").await,
            "error: collectors are not started"
        );
        assert_eq!(client.request("bogus-verb").await, "error: bad command: bogus-verb");
        assert_eq!(client.request("exit").await, "OK");
    };

    let ((), ()) = tokio::join!(server.run(), client);
}

#[tokio::test]
#[serial]
async fn test_disconnect_then_reconnect_keeps_registry() {
    let dir = tempfile::tempdir().unwrap();
    let (listener, socket) = bind(dir.path());
    let server = Server::new(listener, CollectorRegistry::new());

    let client = async {
        {
            let mut first = Client::connect(&socket).await;
            assert_eq!(first.request("set-stats acpower").await, "OK");
        }

        // The selection survives the first session.
        let mut second = Client::connect(&socket).await;
        assert_eq!(
            second
                .request("set-collector-property acpower devnode /dev/ttyUSB0")
                .await,
            "OK"
        );
        assert_eq!(second.request("exit").await, "OK");
    };

    let ((), ()) = tokio::join!(server.run(), client);
}
