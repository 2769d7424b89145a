//! # Hotgate Core
//!
//! `hotgate-core` is the library behind the `hotgate` JSON gateway. It accepts flat JSON
//! requests addressed as `/{service}/{method}`, resolves them against an IDL schema that can
//! be replaced while the gateway runs, and relays them to a backend RPC service.
//!
//! ## Key Components
//!
//! * **[`idl`]:** A parser for the Thrift subset the gateway understands.
//! * **[`schema::Snapshot`]:** An immutable, validated view of one IDL document, including the
//!   protobuf descriptors used on the wire.
//! * **[`SchemaRegistry`]:** Holds the active snapshot and swaps it atomically on reload.
//! * **[`Dispatcher`]:** Resolves a method, maps the payload onto its fields and calls the
//!   [`Backend`].
//! * **[`GrpcBackend`]:** A [`Backend`] that speaks gRPC with dynamic messages.
//! * **[`Gateway`]:** Runs a whole request and produces a [`GatewayResponse`].
//!
//! ## Re-exports
//!
//! This crate re-exports `prost-reflect` and `tonic` to ensure that consumers
//! use compatible versions of these underlying dependencies.
pub mod decode;
pub mod dispatch;
pub mod gateway;
pub mod grpc;
pub mod idl;
pub mod registry;
pub mod response;
pub mod schema;

pub use dispatch::{Backend, Dispatcher};
pub use gateway::Gateway;
pub use grpc::backend::GrpcBackend;
pub use registry::SchemaRegistry;
pub use response::GatewayResponse;

// Re-exports
pub use prost_reflect;
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
