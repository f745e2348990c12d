//! Protobuf types and conversions for the Todo service.
//!
//! - Generated protobuf types and gRPC service traits ([`proto`])
//! - Conversions between domain types and proto types ([`convert`])

#![deny(unsafe_code)]
// gRPC services return tonic::Status
#![allow(clippy::result_large_err)]

/// Generated protobuf types and service traits.
pub mod proto {
    #![allow(clippy::all)]
    #![allow(missing_docs)]

    tonic::include_proto!("todo.v1");
}

/// Serialized `FileDescriptorSet` for gRPC reflection.
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("todo_v1_descriptor");

pub mod convert;
