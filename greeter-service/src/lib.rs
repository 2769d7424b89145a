//! # Greeter Service
//!
//! **INTERNAL USE ONLY**: This crate exists solely to provide a gRPC server for integration
//! testing the `hotgate` gateway. It is not intended for production use.
//!
//! The server has no generated code. It answers every method of the active snapshot in a
//! [`SchemaRegistry`], so it keeps up with reloads the same way the gateway does. Each call
//! replies with a greeting built from the request:
//!
//! ```text
//! User{first field} Connected to {service}, {method}.
//! Message content:{message field}
//! ```
use hotgate_core::{
    BoxError, SchemaRegistry,
    grpc::codec::DynamicCodec,
    schema::{DEFAULT_RESULT_FIELD, MethodDescriptor},
};
use prost_reflect::{DynamicMessage, Kind, Value};
use std::{
    convert::Infallible,
    future::{Ready, ready},
    sync::Arc,
    task::{Context, Poll},
};
use tonic::{Request, Response, Status, codegen::BoxFuture, server::UnaryService};

/// Input field echoed back as the message content.
const MESSAGE_FIELD: &str = "message";

#[derive(Debug, Clone)]
pub struct GreeterServer {
    registry: Arc<SchemaRegistry>,
}

impl GreeterServer {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    /// Finds the method addressed by a `/Service/method` path in the active snapshot.
    fn resolve(&self, path: &str) -> Option<MethodDescriptor> {
        let (service, method) = path.strip_prefix('/')?.split_once('/')?;
        self.registry.lookup(service, method).ok()
    }
}

impl<B> tonic::codegen::Service<http::Request<B>> for GreeterServer
where
    B: http_body::Body + Send + 'static,
    B::Error: Into<BoxError> + Send + 'static,
{
    type Response = http::Response<tonic::body::Body>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let Some(method) = self.resolve(req.uri().path()) else {
            let status = Status::unimplemented(format!("unknown method {}", req.uri().path()));
            return Box::pin(async move { Ok(status.into_http()) });
        };

        Box::pin(async move {
            let codec = DynamicCodec::new(method.wire().input());
            let mut grpc = tonic::server::Grpc::new(codec);
            Ok(grpc.unary(Greet(method), req).await)
        })
    }
}

struct Greet(MethodDescriptor);

impl UnaryService<DynamicMessage> for Greet {
    type Response = DynamicMessage;
    type Future = Ready<Result<Response<DynamicMessage>, Status>>;

    fn call(&mut self, request: Request<DynamicMessage>) -> Self::Future {
        ready(greet(&self.0, &request.into_inner()).map(Response::new))
    }
}

fn greet(method: &MethodDescriptor, input: &DynamicMessage) -> Result<DynamicMessage, Status> {
    let user = method
        .fields()
        .first()
        .and_then(|field| input.get_field_by_name(field.name()))
        .map(|value| text(&value))
        .unwrap_or_default();
    let content = input
        .get_field_by_name(MESSAGE_FIELD)
        .map(|value| text(&value))
        .unwrap_or_default();

    let greeting = format!(
        "User{user} Connected to {}, {}.\nMessage content:{content}",
        method.service(),
        method.name()
    );
    tracing::debug!(service = method.service(), method = method.name(), "greeting");

    let output = method.wire().output();
    let field = output
        .get_field_by_name(DEFAULT_RESULT_FIELD)
        .filter(|f| f.kind() == Kind::String)
        .or_else(|| output.fields().find(|f| f.kind() == Kind::String))
        .ok_or_else(|| Status::failed_precondition("result has no string field"))?;

    let mut reply = DynamicMessage::new(output);
    reply.set_field(&field, Value::String(greeting));
    Ok(reply)
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::I32(n) => n.to_string(),
        Value::I64(n) => n.to_string(),
        Value::F64(n) => n.to_string(),
        _ => String::new(),
    }
}
