//! gRPC server shell for a plugin, built on tonic.
//!
//! The server owns the listener from bind to close. Each call runs on its own
//! task; the only shared state is the [`ShutdownHandle`] and an in-flight
//! counter used for logging.
//!
//! # Shutdown
//!
//! Once the handle moves to `Stopping` the listener stops accepting, in-flight
//! calls run to completion and [`PluginServer::serve`] returns `Ok(())`. Calls
//! still running after the grace period are abandoned.

use crate::config::ServerConfig;
use crate::protocol::rpc::plugin_server::{Plugin, PluginServer as PluginRpcServer};
use crate::protocol::{methods, ExecuteCommand, ExecuteOutcome, MetadataInfo, MetadataQuery};
use crate::service::PluginService;
use crate::shutdown::ShutdownHandle;
use crate::{PluginError, Result};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::{Code, Request, Response, Status};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

struct InFlightGuard<'a>(&'a AtomicUsize);

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Bridges a [`PluginService`] onto the generated gRPC service.
struct PluginRpc {
    service: Arc<dyn PluginService>,
    in_flight: Arc<AtomicUsize>,
}

fn into_status(method: &str, err: PluginError) -> Status {
    match err.status_code() {
        Code::Internal | Code::Unknown => error!("{} failed: {}", method, err),
        _ => warn!("{} failed: {}", method, err),
    }
    Status::from(err)
}

#[tonic::async_trait]
impl Plugin for PluginRpc {
    async fn get_metadata(
        &self,
        request: Request<MetadataQuery>,
    ) -> std::result::Result<Response<MetadataInfo>, Status> {
        let _guard = InFlightGuard::enter(&self.in_flight);
        debug!("RPC call: {}", methods::GET_METADATA);
        self.service
            .get_metadata(request.into_inner())
            .await
            .map(Response::new)
            .map_err(|e| into_status(methods::GET_METADATA, e))
    }

    async fn execute(
        &self,
        request: Request<ExecuteCommand>,
    ) -> std::result::Result<Response<ExecuteOutcome>, Status> {
        let _guard = InFlightGuard::enter(&self.in_flight);
        debug!("RPC call: {}", methods::EXECUTE);
        self.service
            .execute(request.into_inner())
            .await
            .map(Response::new)
            .map_err(|e| into_status(methods::EXECUTE, e))
    }
}

/// A plugin server bound to its listener, ready to serve.
pub struct PluginServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    service: Arc<dyn PluginService>,
    shutdown: ShutdownHandle,
    shutdown_grace: Duration,
}

impl PluginServer {
    pub fn new(listener: TcpListener, service: Arc<dyn PluginService>) -> Result<Self> {
        let local_addr = listener.local_addr().map_err(|e| PluginError::Serve {
            message: format!("failed to read listener address: {}", e),
        })?;

        Ok(Self {
            listener,
            local_addr,
            service,
            shutdown: ShutdownHandle::new(),
            shutdown_grace: ServerConfig::SHUTDOWN_GRACE,
        })
    }

    /// Upper bound on how long in-flight calls may run after a stop.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// The address the listener is bound to. This is the port to announce.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Serve until a stop is requested and in-flight calls have drained.
    pub async fn serve(self) -> Result<()> {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let rpc = PluginRpc {
            service: self.service,
            in_flight: in_flight.clone(),
        };
        let shutdown = self.shutdown;
        let grace = self.shutdown_grace;

        info!("Plugin server listening on {}", self.local_addr);

        let stop = {
            let shutdown = shutdown.clone();
            async move { shutdown.stopped().await }
        };
        let server = Server::builder()
            .layer(TraceLayer::new_for_grpc())
            .add_service(PluginRpcServer::new(rpc))
            .serve_with_incoming_shutdown(TcpListenerStream::new(self.listener), stop);

        let deadline = async {
            shutdown.stopped().await;
            info!(
                "Draining {} in-flight call(s)",
                in_flight.load(Ordering::SeqCst)
            );
            tokio::time::sleep(grace).await;
        };

        tokio::select! {
            result = server => {
                result.map_err(|e| PluginError::Serve {
                    message: e.to_string(),
                })?;
            }
            _ = deadline => {
                warn!(
                    "Shutdown grace period of {:?} elapsed with {} call(s) in flight",
                    grace,
                    in_flight.load(Ordering::SeqCst)
                );
            }
        }

        info!("Plugin server stopped");
        Ok(())
    }
}
