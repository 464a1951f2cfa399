//! ---
//! np_section: "12-metrics"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Prometheus scrape endpoint."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::net::SocketAddr;

use anyhow::{anyhow, Context, Result};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::TextEncoder;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::SharedRegistry;

/// Bind `addr` and serve `registry` at `/metrics` until [`MetricsServer::shutdown`].
pub async fn spawn_http_server(registry: SharedRegistry, addr: SocketAddr) -> Result<MetricsServer> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding metrics listener on {addr}"))?;
    let bound = listener.local_addr().context("reading metrics listener address")?;
    let router = Router::new()
        .route("/metrics", get(scrape))
        .with_state(registry);

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
            .context("metrics exporter failed")
    });
    info!(target: "netpulse::metrics", address = %bound, "metrics exporter listening");

    Ok(MetricsServer {
        addr: bound,
        stop: stop_tx,
        task,
    })
}

async fn scrape(State(registry): State<SharedRegistry>) -> Response {
    match TextEncoder::new().encode_to_string(&registry.gather()) {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(err) => {
            warn!(target: "netpulse::metrics", error = %err, "metrics encoding failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

/// Running exporter.
#[derive(Debug)]
pub struct MetricsServer {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<Result<()>>,
}

impl MetricsServer {
    /// Bound address; differs from the requested one when port 0 was asked for.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn shutdown(self) -> Result<()> {
        let _ = self.stop.send(());
        self.task
            .await
            .map_err(|err| anyhow!("metrics exporter task panicked: {err}"))?
    }
}
