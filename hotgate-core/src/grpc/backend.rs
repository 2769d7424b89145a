//! # gRPC Backend
//!
//! [`GrpcBackend`] relays dispatcher envelopes to a gRPC server. The request and response
//! messages are built from the wire descriptors of the snapshot the envelope was resolved
//! against, and the reply is flattened into an [`RpcResult`].
use super::client::{GrpcClient, GrpcRequestError};
use crate::{
    BoxError,
    dispatch::{Backend, BackendError, RpcEnvelope, RpcResult},
};
use http_body::Body as HttpBody;
use prost_reflect::{DynamicMessage, SerializeOptions};
use std::time::Duration;
use tonic::{
    Code, Status,
    client::GrpcService,
    transport::{Channel, Endpoint},
};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct GrpcBackend<S = Channel> {
    client: GrpcClient<S>,
    timeout: Option<Duration>,
}

impl GrpcBackend<Channel> {
    /// Builds a backend whose connection is established on the first call.
    ///
    /// A timeout, when given, bounds every call and is forwarded as `grpc-timeout`.
    pub fn connect_lazy(
        uri: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, tonic::transport::Error> {
        let mut endpoint = Endpoint::from_shared(uri.into())?;
        if let Some(timeout) = timeout {
            endpoint = endpoint.timeout(timeout);
        }

        Ok(Self::new(endpoint.connect_lazy()).with_timeout(timeout))
    }
}

impl<S> GrpcBackend<S>
where
    S: GrpcService<tonic::body::Body> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(service: S) -> Self {
        Self {
            client: GrpcClient::new(service),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn send(&self, envelope: RpcEnvelope) -> Result<RpcResult, BackendError> {
        let message = envelope
            .to_message()
            .map_err(|e| BackendError::CallFailed(format!("cannot encode request: {e}")))?;

        let mut client = self.client.clone();
        let reply = client
            .unary(envelope.method().wire(), message, self.timeout)
            .await
            .map_err(|e| match e {
                GrpcRequestError::ClientNotReady(source) => BackendError::Unreachable(source),
                other => BackendError::CallFailed(other.to_string()),
            })?;

        match reply {
            Ok(message) => to_result(&message),
            Err(status) => {
                warn!(
                    service = envelope.service(),
                    method = envelope.method().name(),
                    code = ?status.code(),
                    "backend returned an error status"
                );
                Err(classify(status))
            }
        }
    }
}

impl<S> Backend for GrpcBackend<S>
where
    S: GrpcService<tonic::body::Body> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    async fn call(&self, envelope: RpcEnvelope) -> Result<RpcResult, BackendError> {
        self.send(envelope).await
    }
}

/// Sorts a failed call into transport, protocol and application failures.
fn classify(status: Status) -> BackendError {
    match status.code() {
        Code::Unavailable => BackendError::Unreachable(Box::new(status)),
        Code::Unimplemented | Code::Internal | Code::Unknown | Code::DataLoss => {
            BackendError::CallFailed(status.message().to_string())
        }
        code => BackendError::Application {
            code,
            message: status.message().to_string(),
        },
    }
}

/// Every declared result field is present, including those holding the default value.
fn to_result(message: &DynamicMessage) -> Result<RpcResult, BackendError> {
    let options = SerializeOptions::new()
        .skip_default_fields(false)
        .stringify_64_bit_integers(false);

    let value = message
        .serialize_with_options(serde_json::value::Serializer, &options)
        .map_err(|e| BackendError::CallFailed(format!("cannot decode reply: {e}")))?;

    match value {
        serde_json::Value::Object(fields) => Ok(fields),
        other => Err(BackendError::CallFailed(format!(
            "reply is not an object: {other}"
        ))),
    }
}
