//! The seam between the gateway and whatever executes the call.
use super::RpcEnvelope;
use crate::BoxError;
use std::{future::Future, sync::Arc};

/// A backend reply: result field names mapped to their values.
pub type RpcResult = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Backend unreachable: '{0}'")]
    Unreachable(#[source] BoxError),
    #[error("Backend call failed: {0}")]
    CallFailed(String),
    #[error("Backend returned {code:?}: {message}")]
    Application { code: tonic::Code, message: String },
}

/// Executes a resolved call.
///
/// Implementations are shared between concurrent requests and must not retry on their own.
pub trait Backend: Send + Sync {
    fn call(
        &self,
        envelope: RpcEnvelope,
    ) -> impl Future<Output = Result<RpcResult, BackendError>> + Send;
}

impl<T: Backend> Backend for Arc<T> {
    fn call(
        &self,
        envelope: RpcEnvelope,
    ) -> impl Future<Output = Result<RpcResult, BackendError>> + Send {
        (**self).call(envelope)
    }
}
