//! # Generic Dispatch
//!
//! The [`Dispatcher`] turns a routed, decoded request into a backend call using nothing but
//! the method descriptors held by the [`SchemaRegistry`]. There is no per-method code: a
//! method published by a reload is callable as soon as the reload returns.
//!
//! A call goes through three steps, each of which can fail on its own:
//!
//! 1. [`Dispatcher::resolve`] finds the [`MethodDescriptor`] in the active snapshot.
//! 2. [`Dispatcher::build_envelope`] projects the flat payload onto the declared fields.
//! 3. [`Dispatcher::invoke`] hands the envelope to the [`Backend`].
//!
//! Steps 1 and 2 never reach the backend when they fail.
pub mod backend;
mod envelope;
mod value;

pub use backend::{Backend, BackendError, RpcResult};
pub use envelope::RpcEnvelope;
pub use value::Value;

use crate::{
    decode::FlatPayload,
    registry::SchemaRegistry,
    schema::{FieldType, MethodDescriptor},
};
use std::sync::Arc;
use tracing::debug;

/// The request does not address a known method.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    #[error("Path '{0}' does not name a service and a method")]
    MalformedPath(String),
    #[error("Service '{0}' not found")]
    UnknownService(String),
    #[error("Method '{method}' not found in service '{service}'")]
    UnknownMethod { service: String, method: String },
}

/// A payload value cannot be carried by the field it maps to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    #[error("field '{field}' expects a value of type {expected}, got '{value}'")]
    InvalidValue {
        field: String,
        expected: FieldType,
        value: String,
    },
}

/// Resolves requests against the registry and forwards them to a backend.
#[derive(Debug)]
pub struct Dispatcher<B> {
    registry: Arc<SchemaRegistry>,
    backend: B,
}

impl<B: Backend> Dispatcher<B> {
    pub fn new(registry: Arc<SchemaRegistry>, backend: B) -> Self {
        Self { registry, backend }
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Finds a method in the active snapshot.
    ///
    /// The returned descriptor is self-contained: it keeps working even if a reload
    /// replaces the snapshot it came from.
    pub fn resolve(&self, service: &str, method: &str) -> Result<MethodDescriptor, RoutingError> {
        self.registry.lookup(service, method)
    }

    /// Pairs the payload with the method's fields, in declaration order.
    ///
    /// Missing keys become the field type's empty value; keys that name no field are ignored.
    pub fn build_envelope(
        &self,
        method: &MethodDescriptor,
        payload: &FlatPayload,
    ) -> Result<RpcEnvelope, MappingError> {
        RpcEnvelope::build(method, payload)
    }

    /// Performs the backend call. There is exactly one attempt.
    pub async fn invoke(&self, envelope: RpcEnvelope) -> Result<RpcResult, BackendError> {
        debug!(
            service = envelope.service(),
            method = envelope.method().name(),
            fields = envelope.values().len(),
            "invoking backend"
        );
        self.backend.call(envelope).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records the envelopes it receives and echoes the first value back.
    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<Vec<Value>>>,
    }

    impl Backend for RecordingBackend {
        async fn call(&self, envelope: RpcEnvelope) -> Result<RpcResult, BackendError> {
            let mut result = RpcResult::new();
            if let Some(Value::String(first)) = envelope.values().first() {
                result.insert("message".into(), first.clone().into());
            }
            self.calls.lock().unwrap().push(envelope.values().to_vec());
            Ok(result)
        }
    }

    fn dispatcher() -> Dispatcher<RecordingBackend> {
        let registry = SchemaRegistry::new(
            r#"
            struct Request { 1: string userId 2: string message }
            service ServiceA {
                void methodA(1: Request req)
                void counted(1: string name, 2: i32 count, 3: bool loud)
            }
            "#,
        )
        .unwrap();
        Dispatcher::new(Arc::new(registry), RecordingBackend::default())
    }

    #[test]
    fn resolve_reports_unknown_service_and_method() {
        let dispatcher = dispatcher();

        assert_eq!(
            dispatcher.resolve("ServiceC", "methodA").unwrap_err(),
            RoutingError::UnknownService("ServiceC".into())
        );
        assert_eq!(
            dispatcher.resolve("ServiceA", "methodZ").unwrap_err(),
            RoutingError::UnknownMethod {
                service: "ServiceA".into(),
                method: "methodZ".into()
            }
        );
    }

    #[test]
    fn envelope_follows_declaration_order() {
        let dispatcher = dispatcher();
        let method = dispatcher.resolve("ServiceA", "methodA").unwrap();
        let payload = FlatPayload::from_iter([("message", "hi"), ("userId", "u1"), ("extra", "x")]);

        let envelope = dispatcher.build_envelope(&method, &payload).unwrap();

        assert_eq!(
            envelope.values(),
            [Value::String("u1".into()), Value::String("hi".into())]
        );
    }

    #[test]
    fn missing_fields_are_empty() {
        let dispatcher = dispatcher();
        let method = dispatcher.resolve("ServiceA", "counted").unwrap();

        let envelope = dispatcher
            .build_envelope(&method, &FlatPayload::default())
            .unwrap();

        assert_eq!(
            envelope.values(),
            [
                Value::String(String::new()),
                Value::I32(0),
                Value::Bool(false)
            ]
        );
    }

    #[test]
    fn typed_fields_are_converted() {
        let dispatcher = dispatcher();
        let method = dispatcher.resolve("ServiceA", "counted").unwrap();
        let payload = FlatPayload::from_iter([("name", "n"), ("count", "42"), ("loud", "true")]);

        let envelope = dispatcher.build_envelope(&method, &payload).unwrap();

        assert_eq!(envelope.values()[1], Value::I32(42));
        assert_eq!(envelope.values()[2], Value::Bool(true));
    }

    #[test]
    fn unparsable_values_are_mapping_errors() {
        let dispatcher = dispatcher();
        let method = dispatcher.resolve("ServiceA", "counted").unwrap();
        let payload = FlatPayload::from_iter([("count", "many")]);

        let err = dispatcher.build_envelope(&method, &payload).unwrap_err();

        assert_eq!(
            err.to_string(),
            "field 'count' expects a value of type i32, got 'many'"
        );
    }

    #[tokio::test]
    async fn invoke_calls_the_backend_once() {
        let dispatcher = dispatcher();
        let method = dispatcher.resolve("ServiceA", "methodA").unwrap();
        let payload = FlatPayload::from_iter([("userId", "u1")]);
        let envelope = dispatcher.build_envelope(&method, &payload).unwrap();

        let result = dispatcher.invoke(envelope).await.unwrap();

        assert_eq!(result["message"], "u1");
        assert_eq!(dispatcher.backend().calls.lock().unwrap().len(), 1);
    }
}
