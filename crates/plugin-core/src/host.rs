//! Host side of the plugin handshake: spawn, discover the port, terminate.

use crate::client::PluginClient;
use crate::config::{HostConfig, PluginConfig, ServerConfig};
use crate::handshake::read_handshake;
use crate::{PluginError, Result};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How to launch a plugin executable.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Path to the plugin executable.
    pub executable: PathBuf,
    /// Arguments to pass to the plugin.
    pub args: Vec<String>,
    /// Working directory for the plugin process.
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables. The launch flag is always set.
    pub env: Vec<(String, String)>,
    /// How long to wait for the handshake line.
    pub handshake_timeout: Duration,
    /// Address to dial on the announced port. Must match the address the
    /// plugin binds, e.g. `::1` for a plugin started with `--host ::1`.
    pub connect_host: IpAddr,
}

impl LaunchConfig {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
            handshake_timeout: HostConfig::HANDSHAKE_TIMEOUT,
            connect_host: ServerConfig::DEFAULT_HOST,
        }
    }
}

/// A running plugin whose port has been discovered.
pub struct PluginProcess {
    child: Child,
    addr: SocketAddr,
    stdout_drain: Option<JoinHandle<()>>,
}

impl PluginProcess {
    /// Spawn the plugin and wait for its handshake line.
    ///
    /// The process is killed if the handshake does not arrive in time or
    /// stdout closes first.
    pub async fn spawn(config: &LaunchConfig) -> Result<Self> {
        let mut cmd = Command::new(&config.executable);
        cmd.args(&config.args)
            .env(PluginConfig::ENV_FLAG, PluginConfig::ENV_FLAG_VALUE)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        if let Some(ref dir) = config.working_dir {
            cmd.current_dir(dir);
        }

        for (key, value) in &config.env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|e| PluginError::Process {
            message: format!(
                "failed to spawn plugin {}: {}",
                config.executable.display(),
                e
            ),
        })?;

        let stdout = child.stdout.take().ok_or_else(|| PluginError::Process {
            message: "plugin process has no stdout".to_string(),
        })?;
        let mut lines = BufReader::new(stdout).lines();

        let port = match tokio::time::timeout(config.handshake_timeout, read_handshake(&mut lines))
            .await
        {
            Ok(Ok(port)) => port,
            Ok(Err(e)) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(e);
            }
            Err(_) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(PluginError::Timeout(config.handshake_timeout));
            }
        };

        let addr = SocketAddr::new(config.connect_host, port);
        info!(
            "Plugin {} (PID {:?}) listening on {}",
            config.executable.display(),
            child.id(),
            addr
        );

        // Keep reading so the plugin never blocks on a full stdout pipe.
        let stdout_drain = tokio::spawn(async move {
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("plugin stdout: {}", line);
            }
        });

        Ok(Self {
            child,
            addr,
            stdout_drain: Some(stdout_drain),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// OS process id, if the process has not been reaped yet.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Connect a client to this plugin.
    pub async fn client(&self) -> Result<PluginClient> {
        PluginClient::connect(self.addr).await
    }

    /// Ask the plugin to stop and wait for it to exit.
    ///
    /// Sends SIGTERM on Unix. If the process is still running after `grace`
    /// it is killed. Elsewhere the process is killed immediately.
    pub async fn terminate(&mut self, grace: Duration) -> Result<ExitStatus> {
        if let Some(status) = self.child.try_wait()? {
            return Ok(status);
        }

        #[cfg(unix)]
        {
            if let Some(pid) = self.child.id() {
                send_sigterm(pid)?;
            }
        }

        #[cfg(not(unix))]
        {
            self.child.start_kill()?;
        }

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(status) => Ok(status?),
            Err(_) => {
                warn!(
                    "Plugin at {} did not exit within {:?}, killing it",
                    self.addr, grace
                );
                self.kill().await
            }
        }
    }

    /// Kill the plugin immediately and reap it.
    pub async fn kill(&mut self) -> Result<ExitStatus> {
        if let Some(status) = self.child.try_wait()? {
            return Ok(status);
        }
        self.child.start_kill()?;
        Ok(self.child.wait().await?)
    }
}

impl Drop for PluginProcess {
    fn drop(&mut self) {
        if let Some(drain) = self.stdout_drain.take() {
            drain.abort();
        }
        let _ = self.child.start_kill();
    }
}

#[cfg(unix)]
fn send_sigterm(pid: u32) -> Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    debug!("Sending SIGTERM to plugin process {}", pid);
    match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) => Ok(()),
        // Already gone; wait() will collect the status.
        Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(e) => Err(PluginError::Process {
            message: format!("failed to send SIGTERM to {}: {}", pid, e),
        }),
    }
}
