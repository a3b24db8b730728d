//! Serving/stopping state and termination signal handling.
//!
//! A [`ShutdownHandle`] wraps a `watch` channel holding the [`ServerState`].
//! It is created once at startup, cloned into the signal listener and the
//! server, and moves from `Serving` to `Stopping` exactly once.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Lifecycle of a plugin server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Serving,
    Stopping,
}

/// Cloneable trigger and observer for graceful stop.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<ServerState>>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ServerState::Serving);
        Self { tx: Arc::new(tx) }
    }

    /// Request a graceful stop.
    ///
    /// Returns `true` if this call moved the server to `Stopping`, `false` if a
    /// stop was already requested. Safe to call from any task.
    pub fn trigger(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == ServerState::Serving {
                *state = ServerState::Stopping;
                true
            } else {
                false
            }
        })
    }

    pub fn state(&self) -> ServerState {
        *self.tx.borrow()
    }

    pub fn is_stopping(&self) -> bool {
        self.state() == ServerState::Stopping
    }

    /// Resolve once a stop has been requested.
    pub async fn stopped(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on Stopping.
        let _ = rx.wait_for(|state| *state == ServerState::Stopping).await;
    }
}

/// Wait for SIGINT or SIGTERM (Ctrl-C on non-Unix platforms).
///
/// Returns the name of the signal that arrived.
pub async fn wait_for_termination_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = interrupt.recv() => Ok("SIGINT"),
            _ = terminate.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("Ctrl-C")
    }
}

/// Spawn a task that triggers `handle` when a termination signal arrives.
///
/// The task does nothing else. If signal handlers cannot be installed the
/// server keeps running until the host kills it.
pub fn spawn_signal_listener(handle: ShutdownHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        match wait_for_termination_signal().await {
            Ok(signal) => {
                info!("Received {}, stopping plugin server", signal);
                handle.trigger();
            }
            Err(e) => warn!("Failed to install signal handlers: {}", e),
        }
    })
}
