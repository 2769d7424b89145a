//! # Generic gRPC Transport
//!
//! The building blocks for calling a backend whose messages are only known at runtime.
//!
//! Every message crossing the wire is a `prost_reflect::DynamicMessage` shaped by the
//! active snapshot's descriptor pool, so a reloaded schema needs no code generation.
//!
//! * [`client::GrpcClient`] performs unary calls over any `GrpcService`.
//! * [`codec::DynamicCodec`] moves `DynamicMessage`s to and from Protobuf bytes.
//! * [`backend::GrpcBackend`] adapts the client to the dispatcher's [`crate::dispatch::Backend`].
pub mod backend;
pub mod client;
pub mod codec;
