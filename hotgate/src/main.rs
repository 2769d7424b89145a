//! # Hotgate Entry Point
//!
//! The gateway executable. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Parses options using [`cli::Cli`] and installs logging.
//! 2. **Schema**: Loads the startup IDL document, or the bundled one.
//! 3. **Backend**: Prepares a lazily connected gRPC channel to the backend.
//! 4. **Serving**: Runs the HTTP server until Ctrl-C.
mod cli;
mod server;
mod telemetry;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use hotgate_core::{Gateway, GrpcBackend, SchemaRegistry};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    telemetry::initialise(&args.log_filter, args.log_format)?;

    let registry = match &args.idl {
        Some(path) => {
            let source = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("cannot read IDL document '{}'", path.display()))?;
            SchemaRegistry::new(&source)
                .with_context(|| format!("invalid IDL document '{}'", path.display()))?
        }
        None => SchemaRegistry::bundled().context("invalid bundled IDL document")?,
    };
    info!(services = ?registry.services(), "IDL loaded");

    let backend = GrpcBackend::connect_lazy(args.backend.clone(), args.backend_timeout_ms)
        .with_context(|| format!("invalid backend URL '{}'", args.backend))?;

    let gateway = Arc::new(Gateway::new(Arc::new(registry), backend));
    server::serve(args.listen, gateway).await
}
