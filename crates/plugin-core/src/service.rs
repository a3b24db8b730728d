//! The operations a plugin exposes.

use crate::protocol::{methods, ExecuteCommand, ExecuteOutcome, MetadataInfo, MetadataQuery};
use crate::{PluginError, Result};

/// Operations served by a plugin.
///
/// Every method has a default that answers `Unimplemented`, so a plugin only
/// overrides what it supports and keeps compiling when operations are added.
/// Handlers may run concurrently and must not rely on call ordering.
#[async_trait::async_trait]
pub trait PluginService: Send + Sync + 'static {
    async fn get_metadata(&self, _query: MetadataQuery) -> Result<MetadataInfo> {
        Err(PluginError::Unimplemented {
            method: methods::GET_METADATA.to_string(),
        })
    }

    async fn execute(&self, _command: ExecuteCommand) -> Result<ExecuteOutcome> {
        Err(PluginError::Unimplemented {
            method: methods::EXECUTE.to_string(),
        })
    }
}

/// A service that implements nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnimplementedService;

#[async_trait::async_trait]
impl PluginService for UnimplementedService {}
