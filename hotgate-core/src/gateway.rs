//! # Gateway
//!
//! Ties the pieces together for a single request:
//!
//! ```text
//! Received -> Validated -> Resolved -> Invoked -> Completed
//! ```
//!
//! A body carrying the reserved `file` key is a reload request and never reaches the
//! backend, whatever its path. Every other body is routed by path and relayed.
use crate::{
    decode::{self, InputError},
    dispatch::{Backend, BackendError, Dispatcher, MappingError, RoutingError, RpcResult},
    registry::SchemaRegistry,
    response::GatewayResponse,
    schema::SchemaError,
};
use http::{HeaderMap, Uri};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a successful request did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Called(RpcResult),
    Reloaded { generation: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error("Reload failed: {0}")]
    Reload(#[from] SchemaError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Debug)]
pub struct Gateway<B> {
    dispatcher: Dispatcher<B>,
}

impl<B: Backend> Gateway<B> {
    pub fn new(registry: Arc<SchemaRegistry>, backend: B) -> Self {
        Self {
            dispatcher: Dispatcher::new(registry, backend),
        }
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        self.dispatcher.registry()
    }

    pub fn dispatcher(&self) -> &Dispatcher<B> {
        &self.dispatcher
    }

    /// Handles one request and encodes the reply. Never fails: every error has a response.
    pub async fn handle(&self, headers: &HeaderMap, uri: &Uri, body: &[u8]) -> GatewayResponse {
        let result = self.process(headers, uri, body).await;

        if let Err(err) = &result {
            warn!(path = uri.path(), error = %err, "request rejected");
        }

        GatewayResponse::encode(result)
    }

    /// Runs a request through validation, resolution and invocation.
    pub async fn process(
        &self,
        headers: &HeaderMap,
        uri: &Uri,
        body: &[u8],
    ) -> Result<Outcome, GatewayError> {
        decode::require_json(headers)?;
        let payload = decode::parse_body(body)?;

        if let Some(path) = payload.reload_target() {
            let generation = self.registry().reload_from_path(path).await?;
            info!(file = path, generation, "schema reloaded on request");
            return Ok(Outcome::Reloaded { generation });
        }

        let route = decode::route(uri.path())?;
        let method = self.dispatcher.resolve(route.service, route.method)?;
        let envelope = self.dispatcher.build_envelope(&method, &payload)?;
        let result = self.dispatcher.invoke(envelope).await?;

        debug!(
            service = route.service,
            method = route.method,
            fields = result.len(),
            "call completed"
        );
        Ok(Outcome::Called(result))
    }
}
