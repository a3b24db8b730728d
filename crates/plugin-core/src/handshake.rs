//! Process handshake between a host and a plugin.
//!
//! The host spawns the plugin with `PLUGIN_SERVER=true`. The plugin binds its
//! listener and writes exactly one line to stdout:
//!
//! ```text
//! PORT=<port>\n
//! ```
//!
//! The host reads stdout line by line until it sees that line and connects to
//! `127.0.0.1:<port>`. Nothing else is exchanged.

use crate::config::PluginConfig;
use crate::{PluginError, Result};
use std::io::Write;
use tokio::io::{AsyncBufRead, Lines};
use tracing::debug;

/// Check the launch flag value taken from the environment.
pub fn check_launch_flag(value: Option<&str>) -> Result<()> {
    match value {
        Some(v) if v == PluginConfig::ENV_FLAG_VALUE => Ok(()),
        Some(v) => Err(PluginError::Configuration {
            message: format!(
                "{} is set to {:?}; this binary is a plugin and should not be run directly",
                PluginConfig::ENV_FLAG,
                v
            ),
        }),
        None => Err(PluginError::Configuration {
            message: format!(
                "{} is not set; this binary is a plugin and should not be run directly",
                PluginConfig::ENV_FLAG
            ),
        }),
    }
}

/// Refuse to start unless launched by a host.
///
/// Must run before anything else, including argument parsing, so a direct
/// invocation never gets past this point.
pub fn ensure_launched_by_host() -> Result<()> {
    let value = std::env::var(PluginConfig::ENV_FLAG).ok();
    check_launch_flag(value.as_deref())
}

/// Format the handshake line for `port`, including the trailing newline.
pub fn format_handshake_line(port: u16) -> String {
    format!("{}{}\n", PluginConfig::HANDSHAKE_PREFIX, port)
}

/// Write the handshake line and flush it.
pub fn announce_port<W: Write>(out: &mut W, port: u16) -> Result<()> {
    out.write_all(format_handshake_line(port).as_bytes())
        .and_then(|_| out.flush())
        .map_err(|e| PluginError::Handshake {
            message: format!("failed to announce port {}: {}", port, e),
        })
}

/// Parse a line of plugin stdout.
///
/// Matches `^PORT=(\d+)$` (a trailing `\r` or `\n` is ignored) and returns the
/// port if it is a valid, non-zero TCP port.
pub fn parse_handshake_line(line: &str) -> Option<u16> {
    let line = line.trim_end_matches(['\r', '\n']);
    let digits = line.strip_prefix(PluginConfig::HANDSHAKE_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match digits.parse::<u16>() {
        Ok(0) | Err(_) => None,
        Ok(port) => Some(port),
    }
}

/// Read lines until a handshake line appears and return its port.
///
/// Lines that are not handshake lines are skipped.
pub async fn read_handshake<R: AsyncBufRead + Unpin>(lines: &mut Lines<R>) -> Result<u16> {
    loop {
        match lines.next_line().await? {
            Some(line) => {
                if let Some(port) = parse_handshake_line(&line) {
                    debug!("Plugin announced port {}", port);
                    return Ok(port);
                }
                debug!("Skipping plugin stdout line: {}", line);
            }
            None => {
                return Err(PluginError::Handshake {
                    message: "plugin closed stdout before announcing its port".to_string(),
                });
            }
        }
    }
}
