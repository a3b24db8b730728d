//! Ephemeral port allocation and listener binding.
//!
//! A port is picked by binding a probe socket to port 0, reading back the
//! port the OS chose and closing the probe. The real listener is then bound
//! on that port. Another process can claim the port between the two binds;
//! that surfaces as [`PluginError::Bind`] and the host is expected to retry.

use crate::{PluginError, Result};
use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpListener;
use tracing::debug;

/// Ask the OS for a free port on `host`.
pub fn allocate_ephemeral_port(host: IpAddr) -> Result<u16> {
    let probe = std::net::TcpListener::bind(SocketAddr::new(host, 0))
        .map_err(|source| PluginError::Allocation { source })?;
    let port = probe
        .local_addr()
        .map_err(|source| PluginError::Allocation { source })?
        .port();
    drop(probe);

    debug!("Allocated ephemeral port {} on {}", port, host);
    Ok(port)
}

/// Bind the service listener on `host:port`.
pub async fn bind_listener(host: IpAddr, port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::new(host, port);
    TcpListener::bind(addr)
        .await
        .map_err(|source| PluginError::Bind { addr, source })
}

/// Open the service listener.
///
/// A `requested_port` of 0 allocates an ephemeral port first; any other value
/// is bound directly. The port to announce must be read back from the
/// returned listener.
pub async fn open_listener(host: IpAddr, requested_port: u16) -> Result<TcpListener> {
    let port = match requested_port {
        0 => allocate_ephemeral_port(host)?,
        port => port,
    };
    bind_listener(host, port).await
}
