//! Plugin Core - handshake, transport and host support for out-of-process plugins.
//!
//! A host spawns a plugin binary with `PLUGIN_SERVER=true`. The plugin binds a
//! loopback listener on an ephemeral port, prints `PORT=<port>` on stdout and
//! serves the `plugin.Plugin` gRPC service until it receives SIGINT or
//! SIGTERM, at which point it drains in-flight calls and exits.
//!
//! # Plugin side
//!
//! ```rust,ignore
//! use plugin_core::{handshake, port, PluginServer, PluginService};
//!
//! handshake::ensure_launched_by_host()?;
//! let listener = port::open_listener(host, 0).await?;
//! let server = PluginServer::new(listener, Arc::new(MyPlugin))?;
//! handshake::announce_port(&mut std::io::stdout().lock(), server.port())?;
//! shutdown::spawn_signal_listener(server.shutdown_handle());
//! server.serve().await?;
//! ```
//!
//! # Host side
//!
//! ```rust,ignore
//! use plugin_core::{LaunchConfig, PluginProcess};
//!
//! let mut plugin = PluginProcess::spawn(&LaunchConfig::new("./example-plugin")).await?;
//! let info = plugin.client().await?.get_metadata().await?;
//! plugin.terminate(Duration::from_secs(10)).await?;
//! ```

pub mod build_info;
pub mod client;
pub mod config;
pub mod error;
pub mod handshake;
pub mod host;
pub mod port;
pub mod protocol;
pub mod server;
pub mod service;
pub mod shutdown;

pub use build_info::BuildInfo;
pub use client::PluginClient;
pub use error::{PluginError, Result};
pub use host::{LaunchConfig, PluginProcess};
pub use protocol::{ExecuteCommand, ExecuteOutcome, MetadataInfo, MetadataQuery};
pub use server::PluginServer;
pub use service::{PluginService, UnimplementedService};
pub use shutdown::{ServerState, ShutdownHandle};
