//! Integration tests for the example-plugin binary.
//!
//! These tests launch the real binary the way a host does, discover its port
//! from the handshake line and drive it over gRPC.

use plugin_core::{LaunchConfig, PluginError, PluginProcess};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

const PLUGIN_BIN: &str = env!("CARGO_BIN_EXE_example-plugin");

fn launch_config(args: &[&str]) -> LaunchConfig {
    let mut config = LaunchConfig::new(PLUGIN_BIN);
    config.args = args.iter().map(|arg| arg.to_string()).collect();
    config.handshake_timeout = Duration::from_secs(20);
    config
}

async fn start_plugin() -> PluginProcess {
    PluginProcess::spawn(&launch_config(&[]))
        .await
        .expect("plugin should complete the handshake")
}

/// Run the binary to completion with the given launch flag and arguments.
async fn run_with_flag(flag: Option<&str>, args: &[&str]) -> std::process::Output {
    let mut cmd = tokio::process::Command::new(PLUGIN_BIN);
    cmd.args(args)
        .env_remove("PLUGIN_SERVER")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(value) = flag {
        cmd.env("PLUGIN_SERVER", value);
    }

    tokio::time::timeout(Duration::from_secs(20), cmd.output())
        .await
        .expect("plugin should exit promptly")
        .expect("failed to run plugin")
}

// =============================================================================
// Guard clause
// =============================================================================

#[tokio::test]
async fn test_refuses_to_run_without_flag() {
    let output = run_with_flag(None, &[]).await;

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("PORT="), "unexpected stdout: {}", stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("PLUGIN_SERVER"), "missing diagnostic: {}", stderr);
}

#[tokio::test]
async fn test_refuses_to_run_with_wrong_flag_value() {
    for value in ["false", "1", "TRUE", ""] {
        let output = run_with_flag(Some(value), &[]).await;
        assert!(!output.status.success(), "flag {:?} should be rejected", value);
        assert!(
            !String::from_utf8_lossy(&output.stdout).contains("PORT="),
            "flag {:?} printed a handshake line",
            value
        );
    }
}

#[tokio::test]
async fn test_flag_is_checked_before_arguments() {
    for args in [&["--help"][..], &["--version"], &["--port", "not-a-port"]] {
        let output = run_with_flag(None, args).await;
        assert!(!output.status.success(), "{:?} without flag exited 0", args);
        assert!(output.stdout.is_empty(), "{:?} wrote to stdout", args);
        assert!(
            String::from_utf8_lossy(&output.stderr).contains("PLUGIN_SERVER"),
            "{:?} skipped the launch check",
            args
        );
    }
}

// =============================================================================
// Handshake
// =============================================================================

#[tokio::test]
async fn test_announced_port_serves_calls() {
    let mut plugin = start_plugin().await;
    let client = plugin.client().await.unwrap();

    assert_eq!(client.addr().port(), plugin.port());
    let info = client.get_metadata().await.unwrap();
    assert_eq!(info.name, "example-plugin");

    plugin.terminate(Duration::from_secs(15)).await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn test_stdout_carries_only_the_handshake_line() {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    use plugin_core::handshake::parse_handshake_line;
    use plugin_core::PluginClient;
    use std::net::SocketAddr;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

    let mut child = tokio::process::Command::new(PLUGIN_BIN)
        .env("PLUGIN_SERVER", "true")
        .arg("--debug")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .unwrap();

    let mut stdout = BufReader::new(child.stdout.take().unwrap());
    let mut first = String::new();
    tokio::time::timeout(Duration::from_secs(20), stdout.read_line(&mut first))
        .await
        .expect("handshake line should arrive")
        .unwrap();
    assert!(first.ends_with('\n'));
    let port = parse_handshake_line(&first).expect("first line must be the handshake");

    let client = PluginClient::connect(SocketAddr::from(([127, 0, 0, 1], port)))
        .await
        .unwrap();
    client.execute("noop", b"quiet".to_vec()).await.unwrap();
    drop(client);

    let pid = Pid::from_raw(child.id().unwrap() as i32);
    kill(pid, Signal::SIGTERM).unwrap();

    let status = tokio::time::timeout(Duration::from_secs(20), child.wait())
        .await
        .expect("plugin should stop after SIGTERM")
        .unwrap();
    assert!(status.success());

    let mut rest = String::new();
    stdout.read_to_string(&mut rest).await.unwrap();
    assert!(rest.is_empty(), "unexpected extra stdout: {:?}", rest);
}

#[tokio::test]
async fn test_explicit_port_is_announced() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let port_arg = port.to_string();
    let mut plugin = PluginProcess::spawn(&launch_config(&["--port", &port_arg]))
        .await
        .unwrap();

    assert_eq!(plugin.port(), port);
    plugin.client().await.unwrap().get_metadata().await.unwrap();

    plugin.terminate(Duration::from_secs(15)).await.unwrap();
}

#[tokio::test]
async fn test_sequential_runs_each_announce_their_own_port() {
    for _ in 0..2 {
        let mut plugin = start_plugin().await;
        let client = plugin.client().await.unwrap();

        assert_eq!(client.addr().port(), plugin.port());
        client.get_metadata().await.unwrap();
        drop(client);

        let status = plugin.terminate(Duration::from_secs(15)).await.unwrap();
        assert!(status.success());
    }
}

// =============================================================================
// Operations
// =============================================================================

#[tokio::test]
async fn test_execute_echoes_payload_exactly() {
    let mut plugin = start_plugin().await;
    let client = plugin.client().await.unwrap();

    let binary: Vec<u8> = (0..=255).collect();
    for payload in [Vec::new(), b"hello plugin".to_vec(), binary] {
        let outcome = client.execute("noop", payload.clone()).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.result, payload);
    }

    plugin.terminate(Duration::from_secs(15)).await.unwrap();
}

#[tokio::test]
async fn test_metadata_is_stable_across_calls() {
    let mut plugin = start_plugin().await;
    let client = plugin.client().await.unwrap();

    let first = client.get_metadata().await.unwrap();
    assert!(!first.name.is_empty());
    assert!(!first.version.is_empty());
    assert!(first.description.starts_with("Example plugin (built from "));

    for i in 0..5 {
        client
            .execute(format!("action-{}", i), vec![i as u8; 16])
            .await
            .unwrap();
        assert_eq!(client.get_metadata().await.unwrap(), first);
    }

    plugin.terminate(Duration::from_secs(15)).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_calls() {
    let mut plugin = start_plugin().await;
    let client = Arc::new(plugin.client().await.unwrap());

    let calls: Vec<_> = (0..16u8)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move { client.execute("noop", vec![i; 64]).await })
        })
        .collect();

    for (i, call) in calls.into_iter().enumerate() {
        let outcome = call.await.unwrap().unwrap();
        assert_eq!(outcome.result, vec![i as u8; 64]);
    }

    plugin.terminate(Duration::from_secs(15)).await.unwrap();
}

// =============================================================================
// Shutdown
// =============================================================================

#[cfg(unix)]
#[tokio::test]
async fn test_sigterm_exits_cleanly() {
    let mut plugin = start_plugin().await;
    let addr = plugin.addr();
    let client = plugin.client().await.unwrap();
    client.execute("noop", b"before stop".to_vec()).await.unwrap();
    drop(client);

    let status = plugin.terminate(Duration::from_secs(15)).await.unwrap();
    assert!(status.success(), "expected exit 0, got {:?}", status);

    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}

#[cfg(unix)]
#[tokio::test]
async fn test_sigterm_lets_in_flight_call_finish() {
    let mut plugin = PluginProcess::spawn(&launch_config(&["--execute-delay-ms", "800"]))
        .await
        .unwrap();
    let client = plugin.client().await.unwrap();
    let payload = vec![0x5au8; 64 * 1024];

    let call = {
        let client = client.clone();
        let payload = payload.clone();
        tokio::spawn(async move { client.execute("noop", payload).await })
    };
    // Well inside the 800ms the plugin spends on the call.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let status = plugin.terminate(Duration::from_secs(15)).await.unwrap();
    assert!(status.success(), "expected exit 0, got {:?}", status);

    let outcome = call
        .await
        .unwrap()
        .expect("call in flight at SIGTERM must complete");
    assert!(outcome.success);
    assert_eq!(outcome.result, payload);
}

#[cfg(unix)]
#[tokio::test]
async fn test_sigterm_drain_is_bounded_by_grace_period() {
    let mut plugin = PluginProcess::spawn(&launch_config(&[
        "--execute-delay-ms",
        "60000",
        "--shutdown-grace-secs",
        "1",
    ]))
    .await
    .unwrap();
    let client = plugin.client().await.unwrap();

    let call = {
        let client = client.clone();
        tokio::spawn(async move { client.execute("noop", b"too slow".to_vec()).await })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = std::time::Instant::now();
    let status = plugin.terminate(Duration::from_secs(15)).await.unwrap();
    assert!(status.success(), "expected exit 0, got {:?}", status);
    assert!(started.elapsed() < Duration::from_secs(10));

    match call.await.unwrap() {
        Err(PluginError::Rpc { .. }) | Err(PluginError::Network { .. }) => {}
        other => panic!("abandoned call should fail, got: {:?}", other),
    }
}
