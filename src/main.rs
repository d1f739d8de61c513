//! Binary analysis gateway and MCP adapter
//!
//! `gateway` serves an analysis snapshot over HTTP; `bridge` runs the MCP
//! adapter against a running gateway over stdio or streamable HTTP.

use binja_mcp::bridge::{BinjaBridge, BridgeConfig, McpTransport, DEFAULT_SERVER_URL};
use binja_mcp::gateway::DEFAULT_BIND;
use binja_mcp::{Gateway, GatewayClient, GatewayConfig, SnapshotDatabase};
use bytes::Bytes;
use clap::{Args, Parser, Subcommand};
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::http::{header::ORIGIN, Request, Response, StatusCode};
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use rmcp::transport::stdio;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use rmcp::ServiceExt;
use std::collections::HashSet;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_service::Service;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "binja-mcp",
    version,
    about = "Binary analysis HTTP gateway and MCP adapter"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve an analysis snapshot over HTTP
    Gateway(GatewayArgs),
    /// Run the MCP adapter against a running gateway
    Bridge(BridgeArgs),
}

#[derive(Args)]
struct GatewayArgs {
    /// JSON analysis export to load (omit to start with no binary loaded)
    #[arg(long)]
    snapshot: Option<PathBuf>,
    /// Bind address
    #[arg(long, default_value = DEFAULT_BIND)]
    bind: SocketAddr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum TransportKind {
    Stdio,
    Http,
}

#[derive(Args)]
struct BridgeArgs {
    /// Gateway base URL
    #[arg(long, default_value = DEFAULT_SERVER_URL)]
    server: String,
    /// MCP transport
    #[arg(long, value_enum, default_value_t = TransportKind::Stdio)]
    transport: TransportKind,
    /// Host for the HTTP transport
    #[arg(long, default_value = "127.0.0.1")]
    mcp_host: IpAddr,
    /// Port for the HTTP transport
    #[arg(long, default_value_t = 8081)]
    mcp_port: u16,
    /// SSE keep-alive interval in seconds (0 disables)
    #[arg(long, default_value_t = 15)]
    sse_keep_alive_secs: u64,
    /// Use stateless mode (POST only; no sessions)
    #[arg(long)]
    stateless: bool,
    /// Allowed Origin values (comma-separated). Defaults to localhost only.
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "http://localhost,http://127.0.0.1"
    )]
    allow_origin: Vec<String>,
}

impl BridgeArgs {
    fn config(&self) -> BridgeConfig {
        let transport = match self.transport {
            TransportKind::Stdio => McpTransport::Stdio,
            TransportKind::Http => McpTransport::Http {
                bind: SocketAddr::new(self.mcp_host, self.mcp_port),
                stateless: self.stateless,
            },
        };
        BridgeConfig {
            server_url: self.server.clone(),
            transport,
        }
    }
}

/// Rejects browser requests from origins outside the allow list.
#[derive(Clone)]
struct OriginCheckService<S> {
    inner: S,
    allowed_origins: Arc<HashSet<String>>,
}

impl<S> OriginCheckService<S> {
    fn new(inner: S, allowed_origins: Arc<HashSet<String>>) -> Self {
        Self {
            inner,
            allowed_origins,
        }
    }
}

impl<B, S> Service<Request<B>> for OriginCheckService<S>
where
    B: http_body::Body + Send + 'static,
    B::Error: std::fmt::Display,
    S: Service<Request<B>, Response = Response<BoxBody<Bytes, Infallible>>, Error = Infallible>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<BoxBody<Bytes, Infallible>>;
    type Error = Infallible;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let allowed_origins = self.allowed_origins.clone();
        let mut inner = self.inner.clone();
        Box::pin(async move {
            if let Some(origin) = req.headers().get(ORIGIN).and_then(|v| v.to_str().ok()) {
                if !allowed_origins.contains(origin) {
                    warn!(origin, "Rejected request from disallowed origin");
                    let mut resp = Response::new(Full::new(Bytes::from("Forbidden")).boxed());
                    *resp.status_mut() = StatusCode::FORBIDDEN;
                    return Ok(resp);
                }
            }
            inner.call(req).await
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the MCP stdio transport.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("binja_mcp=info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Gateway(args) => run_gateway(args).await,
        Command::Bridge(args) => run_bridge(args).await,
    }
}

async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigquit = signal(SignalKind::quit())?;
        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
            _ = sigquit.recv() => {},
            _ = tokio::signal::ctrl_c() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }

    Ok(())
}

async fn run_gateway(args: GatewayArgs) -> anyhow::Result<()> {
    info!("Starting analysis gateway");
    let mut gateway = Gateway::new(GatewayConfig { bind: args.bind })?;

    if let Some(path) = args.snapshot.as_deref() {
        let db = SnapshotDatabase::load(path)
            .map_err(|e| anyhow::anyhow!("Failed to load snapshot {}: {e}", path.display()))?;
        gateway.attach(Arc::new(db)).await?;
    } else {
        info!("No snapshot given; requests will report that no binary is loaded");
    }

    gateway.start().await?;
    if let Err(e) = wait_for_shutdown_signal().await {
        error!("Shutdown signal handler failed: {e}");
    } else {
        info!("Shutdown signal received");
    }
    gateway.shutdown().await;
    info!("Gateway stopped");
    Ok(())
}

async fn run_bridge(args: BridgeArgs) -> anyhow::Result<()> {
    let config = args.config();
    let client = GatewayClient::http(&config.server_url)?;
    match config.transport {
        McpTransport::Stdio => run_bridge_stdio(client).await,
        McpTransport::Http { bind, stateless } => {
            run_bridge_http(client, bind, stateless, &args).await
        }
    }
}

async fn run_bridge_stdio(client: GatewayClient) -> anyhow::Result<()> {
    info!("MCP adapter listening on stdio");
    let service = BinjaBridge::new(client).serve(stdio()).await?;
    tokio::select! {
        res = service.waiting() => {
            res?;
            info!("MCP client disconnected");
        }
        _ = wait_for_shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }
    Ok(())
}

async fn run_bridge_http(
    client: GatewayClient,
    bind: SocketAddr,
    stateless: bool,
    args: &BridgeArgs,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let config = StreamableHttpServerConfig {
        sse_keep_alive: if args.sse_keep_alive_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(args.sse_keep_alive_secs))
        },
        stateful_mode: !stateless,
        cancellation_token: cancel.clone(),
    };

    let service = StreamableHttpService::new(
        move || Ok(BinjaBridge::new(client.clone())),
        Arc::new(LocalSessionManager::default()),
        config,
    );
    let allowed_origins: HashSet<String> = args
        .allow_origin
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let service = OriginCheckService::new(service, Arc::new(allowed_origins));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("bind failed: {e}"))?;
    info!("MCP HTTP adapter listening on http://{bind}");

    let cancel_for_shutdown = cancel.clone();
    tokio::spawn(async move {
        if wait_for_shutdown_signal().await.is_ok() {
            info!("Shutdown signal received");
            cancel_for_shutdown.cancel();
        }
    });

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("HTTP adapter shutting down");
                break;
            }
            res = listener.accept() => {
                let (stream, _) = match res {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("accept failed: {e}");
                        continue;
                    }
                };
                let svc = service.clone();
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let conn = http1::Builder::new()
                        .serve_connection(io, TowerToHyperService::new(svc));
                    if let Err(err) = conn.await {
                        error!("http connection error: {err}");
                    }
                });
            }
        }
    }
    Ok(())
}
