//! gRPC client for talking to a running plugin.
//!
//! Calls may be issued concurrently; they are multiplexed over one HTTP/2
//! connection.

use crate::config::ClientConfig;
use crate::protocol::rpc::plugin_client::PluginClient as PluginRpcClient;
use crate::protocol::{ExecuteCommand, ExecuteOutcome, MetadataInfo, MetadataQuery};
use crate::Result;
use std::net::SocketAddr;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

/// Client for a plugin's `plugin.Plugin` service.
#[derive(Debug, Clone)]
pub struct PluginClient {
    addr: SocketAddr,
    rpc: PluginRpcClient<Channel>,
}

impl PluginClient {
    /// Connect to the plugin listening on `addr`.
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let endpoint = Endpoint::from_shared(format!("http://{}", addr))?
            .connect_timeout(ClientConfig::CONNECT_TIMEOUT)
            .timeout(ClientConfig::REQUEST_TIMEOUT);

        debug!("Connecting to plugin at {}", addr);
        let channel = endpoint.connect().await?;

        Ok(Self {
            addr,
            rpc: PluginRpcClient::new(channel),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn get_metadata(&self) -> Result<MetadataInfo> {
        let mut rpc = self.rpc.clone();
        let response = rpc.get_metadata(MetadataQuery {}).await?;
        Ok(response.into_inner())
    }

    /// A non-OK status from the plugin is returned as [`crate::PluginError::Rpc`].
    pub async fn execute(
        &self,
        action: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Result<ExecuteOutcome> {
        let mut rpc = self.rpc.clone();
        let response = rpc.execute(ExecuteCommand::new(action, data)).await?;
        Ok(response.into_inner())
    }
}
