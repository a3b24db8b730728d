//! Error types for the plugin runtime.
//!
//! Startup failures (`Configuration`, `Allocation`, `Bind`, `Serve`) are fatal
//! for the plugin process. The remaining variants describe failed calls; on
//! the wire they travel as gRPC statuses.

use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tonic::{Code, Status};

/// Main error type for plugin servers, clients and hosts.
#[derive(Debug, Error)]
pub enum PluginError {
    // Startup errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Failed to allocate an ephemeral port: {source}")]
    Allocation {
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to bind listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Transport serve error: {message}")]
    Serve { message: String },

    #[error("Handshake error: {message}")]
    Handshake { message: String },

    // Call errors
    #[error("Method not implemented: {method}")]
    Unimplemented { method: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("RPC error {code:?}: {message}")]
    Rpc { code: Code, message: String },

    // Transport errors
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Process error: {message}")]
    Process { message: String },

    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for plugin operations.
pub type Result<T> = std::result::Result<T, PluginError>;

impl From<std::io::Error> for PluginError {
    fn from(err: std::io::Error) -> Self {
        PluginError::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<tonic::transport::Error> for PluginError {
    fn from(err: tonic::transport::Error) -> Self {
        PluginError::Network {
            message: err.to_string(),
        }
    }
}

impl From<Status> for PluginError {
    fn from(status: Status) -> Self {
        PluginError::Rpc {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}

impl PluginError {
    /// The gRPC status code this error is reported with.
    ///
    /// Statuses relayed from a remote plugin keep their original code.
    pub fn status_code(&self) -> Code {
        match self {
            PluginError::Unimplemented { .. } => Code::Unimplemented,
            PluginError::InvalidArgument { .. } => Code::InvalidArgument,
            PluginError::Rpc { code, .. } => *code,
            PluginError::Timeout(_) => Code::DeadlineExceeded,
            PluginError::Network { .. } => Code::Unavailable,
            _ => Code::Internal,
        }
    }
}

impl From<PluginError> for Status {
    fn from(err: PluginError) -> Self {
        let message = match &err {
            PluginError::Rpc { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Status::new(err.status_code(), message)
    }
}
