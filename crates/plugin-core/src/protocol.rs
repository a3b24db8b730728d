//! Wire types shared by plugin servers and hosts.
//!
//! The schema lives in `proto/plugin.proto`:
//!
//! ```text
//! service Plugin {
//!   rpc GetMetadata(MetadataQuery) returns (MetadataInfo);
//!   rpc Execute(ExecuteCommand) returns (ExecuteOutcome);
//! }
//! ```
//!
//! Messages are declared here with `prost` derives; the tonic server and
//! client for the service are generated at build time into [`rpc`].

/// Generated gRPC server (`rpc::plugin_server`) and client (`rpc::plugin_client`).
#[allow(clippy::all)]
#[allow(missing_docs)]
pub mod rpc {
    include!(concat!(env!("OUT_DIR"), "/plugin.Plugin.rs"));
}

/// Fully qualified gRPC service name.
pub const SERVICE_NAME: &str = "plugin.Plugin";

/// RPC names as they appear in the service definition.
pub mod methods {
    pub const GET_METADATA: &str = "GetMetadata";
    pub const EXECUTE: &str = "Execute";
}

/// Input of `GetMetadata`. Carries no fields today.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MetadataQuery {}

/// Output of `GetMetadata`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MetadataInfo {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub version: String,
    #[prost(string, tag = "3")]
    pub description: String,
}

/// Input of `Execute`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecuteCommand {
    #[prost(string, tag = "1")]
    pub action: String,
    #[prost(bytes = "vec", tag = "2")]
    pub data: Vec<u8>,
}

impl ExecuteCommand {
    pub fn new(action: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            action: action.into(),
            data: data.into(),
        }
    }
}

/// Output of `Execute`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecuteOutcome {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(bytes = "vec", tag = "2")]
    pub result: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    struct Nothing;

    #[tonic::async_trait]
    impl rpc::plugin_server::Plugin for Nothing {
        async fn get_metadata(
            &self,
            _request: tonic::Request<MetadataQuery>,
        ) -> Result<tonic::Response<MetadataInfo>, tonic::Status> {
            Err(tonic::Status::unimplemented("GetMetadata"))
        }

        async fn execute(
            &self,
            _request: tonic::Request<ExecuteCommand>,
        ) -> Result<tonic::Response<ExecuteOutcome>, tonic::Status> {
            Err(tonic::Status::unimplemented("Execute"))
        }
    }

    #[test]
    fn test_generated_service_name() {
        use tonic::server::NamedService;
        assert_eq!(
            <rpc::plugin_server::PluginServer<Nothing> as NamedService>::NAME,
            SERVICE_NAME
        );
    }

    #[test]
    fn test_execute_command_field_numbers() {
        let bytes = ExecuteCommand::new("noop", vec![0xff]).encode_to_vec();
        assert_eq!(bytes, [0x0a, 0x04, b'n', b'o', b'o', b'p', 0x12, 0x01, 0xff]);
    }

    #[test]
    fn test_execute_outcome_omits_empty_result() {
        let outcome = ExecuteOutcome {
            success: true,
            result: Vec::new(),
        };
        assert_eq!(outcome.encode_to_vec(), [0x08, 0x01]);

        let decoded = ExecuteOutcome::decode(&[0x08, 0x01][..]).unwrap();
        assert!(decoded.success);
        assert!(decoded.result.is_empty());
    }

    #[test]
    fn test_metadata_query_is_empty_on_the_wire() {
        assert!(MetadataQuery {}.encode_to_vec().is_empty());
    }

    #[test]
    fn test_metadata_info_ignores_unknown_fields() {
        // name = "p", version = "1.0", then an unknown field 9 = 42.
        let bytes = [0x0a, 0x01, b'p', 0x12, 0x03, b'1', b'.', b'0', 0x48, 0x2a];
        let info = MetadataInfo::decode(&bytes[..]).unwrap();
        assert_eq!(info.name, "p");
        assert_eq!(info.version, "1.0");
        assert!(info.description.is_empty());
    }
}
