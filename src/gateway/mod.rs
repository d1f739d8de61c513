//! HTTP request gateway.
//!
//! A [`Gateway`] owns the database worker and, while started, a background
//! accept loop serving HTTP/1.1 on the configured address. Connections are
//! handled concurrently; every database operation still goes through the one
//! worker thread.

pub mod routes;

use crate::db::{DbWorker, SharedDatabase};
use crate::error::GatewayError;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::thread::JoinHandle;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Address the gateway listens on unless configured otherwise.
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Gateway settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayConfig {
    pub bind: SocketAddr,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

struct Running {
    addr: SocketAddr,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

/// The request gateway session.
pub struct Gateway {
    config: GatewayConfig,
    worker: DbWorker,
    worker_thread: Option<JoinHandle<()>>,
    running: Option<Running>,
}

impl Gateway {
    /// Create a stopped gateway with its database worker started and no
    /// database attached.
    pub fn new(config: GatewayConfig) -> std::io::Result<Self> {
        let (worker, worker_thread) = DbWorker::spawn()?;
        Ok(Self {
            config,
            worker,
            worker_thread: Some(worker_thread),
            running: None,
        })
    }

    pub async fn attach(&self, db: SharedDatabase) -> Result<(), GatewayError> {
        self.worker.attach(db).await
    }

    pub async fn detach(&self) -> Result<(), GatewayError> {
        self.worker.detach().await
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Bound address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.addr)
    }

    /// Bind and start serving. Starting a running gateway returns the address
    /// it is already bound to.
    pub async fn start(&mut self) -> std::io::Result<SocketAddr> {
        if let Some(running) = &self.running {
            warn!(addr = %running.addr, "Gateway already running");
            return Ok(running.addr);
        }

        let listener = TcpListener::bind(self.config.bind).await?;
        let addr = listener.local_addr()?;
        let cancel = CancellationToken::new();
        let task = tokio::spawn(accept_loop(listener, self.worker.clone(), cancel.clone()));

        info!("Gateway listening on http://{addr}");
        self.running = Some(Running { addr, cancel, task });
        Ok(addr)
    }

    /// Stop accepting connections. Returns once the listening socket is
    /// closed; stopping a stopped gateway does nothing.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        running.cancel.cancel();
        if let Err(e) = running.task.await {
            error!(error = %e, "Accept loop ended abnormally");
        }
        info!(addr = %running.addr, "Gateway stopped");
    }

    /// Stop serving, then shut the database worker down and wait for it.
    pub async fn shutdown(mut self) {
        self.stop().await;
        if let Err(e) = self.worker.shutdown().await {
            debug!(error = %e, "Worker already closed");
        }
        if let Some(thread) = self.worker_thread.take() {
            match tokio::task::spawn_blocking(move || thread.join()).await {
                Ok(Ok(())) => info!("Database worker stopped"),
                _ => error!("Database worker thread panicked"),
            }
        }
    }
}

async fn accept_loop(listener: TcpListener, worker: DbWorker, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Accept loop cancelled");
                break;
            }
            res = listener.accept() => {
                let (stream, peer) = match res {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "Accept failed");
                        continue;
                    }
                };
                debug!(peer = %peer, "Connection accepted");
                tokio::spawn(serve_connection(stream, worker.clone(), cancel.clone()));
            }
        }
    }
}

async fn serve_connection(
    stream: tokio::net::TcpStream,
    worker: DbWorker,
    cancel: CancellationToken,
) {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req| {
        let worker = worker.clone();
        async move { Ok::<_, Infallible>(routes::handle(&worker, req).await) }
    });
    let conn = http1::Builder::new().serve_connection(io, service);
    tokio::pin!(conn);

    tokio::select! {
        res = conn.as_mut() => {
            if let Err(err) = res {
                debug!("http connection error: {err}");
            }
        }
        _ = cancel.cancelled() => {
            conn.as_mut().graceful_shutdown();
            if let Err(err) = conn.await {
                debug!("http connection error during shutdown: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ephemeral() -> GatewayConfig {
        GatewayConfig {
            bind: SocketAddr::from(([127, 0, 0, 1], 0)),
        }
    }

    #[test]
    fn default_bind_matches_constant() {
        assert_eq!(GatewayConfig::default().bind.to_string(), DEFAULT_BIND);
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let mut gateway = Gateway::new(ephemeral()).unwrap();
        let first = gateway.start().await.unwrap();
        let second = gateway.start().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(gateway.local_addr(), Some(first));
        gateway.shutdown().await;
    }

    #[tokio::test]
    async fn stop_releases_the_port() {
        let mut gateway = Gateway::new(ephemeral()).unwrap();
        let addr = gateway.start().await.unwrap();
        gateway.stop().await;
        assert!(!gateway.is_running());
        gateway.stop().await;

        // Rebinding the exact address must succeed once stop returned.
        let mut again = Gateway::new(GatewayConfig { bind: addr }).unwrap();
        assert_eq!(again.start().await.unwrap(), addr);
        again.shutdown().await;
        gateway.shutdown().await;
    }
}
