//! # HTTP Server
//!
//! Every path and every HTTP method lands in the same fallback handler, which hands the raw
//! request parts to the [`Gateway`].
use axum::{
    Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Uri},
    response::Response,
};
use hotgate_core::{Backend, Gateway};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

pub fn router<B: Backend + 'static>(gateway: Arc<Gateway<B>>) -> Router {
    Router::new().fallback(relay::<B>).with_state(gateway)
}

async fn relay<B: Backend + 'static>(
    State(gateway): State<Arc<Gateway<B>>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    gateway
        .handle(&headers, &uri, &body)
        .await
        .into_http()
        .map(Body::from)
}

/// Serves until Ctrl-C, then finishes in-flight requests.
pub async fn serve<B: Backend + 'static>(
    addr: SocketAddr,
    gateway: Arc<Gateway<B>>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "hotgate listening");

    axum::serve(listener, router(gateway))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("hotgate stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
