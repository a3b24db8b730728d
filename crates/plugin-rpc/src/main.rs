//! Example plugin - a gRPC server launched by a host application.
//!
//! The host spawns this binary with `PLUGIN_SERVER=true` and reads
//! `PORT=<port>` from stdout. Logs go to stderr so stdout carries nothing but
//! that line.

mod plugin;

use anyhow::{Context, Result};
use clap::Parser;
use plugin::ExamplePlugin;
use plugin_core::{handshake, port, shutdown, PluginServer};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "example-plugin")]
#[command(about = "Example out-of-process plugin served over gRPC")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Seconds to let in-flight calls finish after a stop signal
    #[arg(long, default_value = "10")]
    shutdown_grace_secs: u64,

    /// Milliseconds of artificial latency added to every Execute call
    #[arg(long, default_value = "0")]
    execute_delay_ms: u64,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn init_logging(debug: bool, json: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Nothing else may happen before this check, not even `--help`.
    handshake::ensure_launched_by_host()?;

    let args = Args::parse();
    init_logging(args.debug, args.log_json);

    let build = Arc::new(plugin::build_info());
    info!("Starting {} {}", build.name, build.version);

    let listener = port::open_listener(args.host, args.port)
        .await
        .context("failed to open plugin listener")?;

    let plugin = ExamplePlugin::new(build)
        .with_execute_delay(Duration::from_millis(args.execute_delay_ms));
    let server = PluginServer::new(listener, Arc::new(plugin))?
        .with_shutdown_grace(Duration::from_secs(args.shutdown_grace_secs));

    // Announce the port of the bound listener (intentional stdout for the host).
    handshake::announce_port(&mut std::io::stdout().lock(), server.port())?;

    let _signals = shutdown::spawn_signal_listener(server.shutdown_handle());

    server.serve().await.context("plugin server failed")?;

    info!("Plugin exited cleanly");
    Ok(())
}
