//! Centralized configuration for plugin processes and their hosts.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Process-level contract between a host and a plugin.
pub struct PluginConfig;

impl PluginConfig {
    /// Environment variable a host sets before spawning a plugin.
    pub const ENV_FLAG: &'static str = "PLUGIN_SERVER";
    /// The only value of [`Self::ENV_FLAG`] that lets a plugin start.
    pub const ENV_FLAG_VALUE: &'static str = "true";
    /// Prefix of the single stdout line announcing the bound port.
    pub const HANDSHAKE_PREFIX: &'static str = "PORT=";
}

/// Server-side configuration.
pub struct ServerConfig;

impl ServerConfig {
    pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
    /// How long in-flight calls may run once a stop has been requested.
    pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);
}

/// Host-side configuration.
pub struct HostConfig;

impl HostConfig {
    pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
}

/// Client-side configuration.
pub struct ClientConfig;

impl ClientConfig {
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
}
