//! Generates the gRPC server and client for `proto/plugin.proto`.
//!
//! Message types are declared with `prost` derives in `src/protocol.rs`, so
//! only the service glue is generated here and no `protoc` is needed.

use tonic_build::manual::{Builder, Method, Service};

fn unary(name: &str, route_name: &str, input_type: &str, output_type: &str) -> Method {
    Method::builder()
        .name(name)
        .route_name(route_name)
        .input_type(input_type)
        .output_type(output_type)
        .codec_path("tonic::codec::ProstCodec")
        .build()
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=proto/plugin.proto");

    let plugin = Service::builder()
        .name("Plugin")
        .package("plugin")
        .method(unary(
            "get_metadata",
            "GetMetadata",
            "crate::protocol::MetadataQuery",
            "crate::protocol::MetadataInfo",
        ))
        .method(unary(
            "execute",
            "Execute",
            "crate::protocol::ExecuteCommand",
            "crate::protocol::ExecuteOutcome",
        ))
        .build();

    Builder::new().compile(&[plugin]);
}
