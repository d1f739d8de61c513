//! Outbound calls from the adapter to the gateway.
//!
//! [`GatewayClient`] never fails: every transport or HTTP failure is folded
//! into the value handed back to the agent, so a tool call always produces
//! a result.

use crate::tool_registry::{HttpMethod, ToolInfo, CHECK_CONNECTION};
use serde_json::{json, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Default gateway base URL.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080/";

/// Failure to obtain any HTTP response from the gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("{0}")]
    Timeout(String),
    #[error("{0}")]
    Connect(String),
    #[error("{0}")]
    Http(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Http(e.to_string())
        }
    }
}

/// One outbound gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    /// Sent as `text/plain; charset=utf-8`.
    pub body: Option<String>,
    pub timeout: Duration,
}

/// Status and body of a gateway response, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    /// Any status below 400.
    pub fn is_ok(&self) -> bool {
        self.status < 400
    }
}

pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + 'a>>;

/// Sends one request and returns the raw response.
pub trait Transport: Send + Sync {
    fn send(&self, request: GatewayRequest) -> TransportFuture<'_>;
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: GatewayRequest) -> TransportFuture<'_> {
        Box::pin(async move {
            let builder = match request.method {
                HttpMethod::Get => self.client.get(&request.url),
                HttpMethod::Post => self.client.post(&request.url),
            };
            let mut builder = builder.timeout(request.timeout).query(&request.query);
            if let Some(body) = request.body {
                builder = builder
                    .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
                    .body(body);
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok(TransportResponse { status, body })
        })
    }
}

/// Stateless forwarding client: a base URL plus a transport.
#[derive(Clone)]
pub struct GatewayClient {
    base_url: String,
    transport: Arc<dyn Transport>,
}

impl GatewayClient {
    pub fn new(base_url: &str, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
        }
    }

    /// Client over the reqwest transport.
    pub fn http(base_url: &str) -> Result<Self, TransportError> {
        Ok(Self::new(base_url, Arc::new(HttpTransport::new()?)))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(
        &self,
        tool: &ToolInfo,
        query: Vec<(String, String)>,
        body: Option<String>,
    ) -> GatewayRequest {
        GatewayRequest {
            method: tool.method,
            url: format!("{}/{}", self.base_url, tool.endpoint),
            query,
            body,
            timeout: tool.timeout.duration(),
        }
    }

    async fn send(&self, request: GatewayRequest) -> Result<TransportResponse, TransportError> {
        debug!(url = %request.url, method = ?request.method, "Forwarding to gateway");
        let result = self.transport.send(request).await;
        match &result {
            Ok(resp) => debug!(status = resp.status, "Gateway responded"),
            Err(e) => warn!(error = %e, "Gateway request failed"),
        }
        result
    }

    /// GET a listing-style endpoint and split the body into lines.
    pub async fn get_lines(&self, tool: &ToolInfo, query: Vec<(String, String)>) -> Vec<String> {
        match self.send(self.request(tool, query, None)).await {
            Ok(resp) if resp.is_ok() => resp.body.lines().map(str::to_string).collect(),
            Ok(resp) => vec![format!("Error {}: {}", resp.status, resp.body.trim())],
            Err(e) => vec![format!("Request failed: {e}")],
        }
    }

    /// POST to a text endpoint and return the trimmed body.
    pub async fn post_text(&self, tool: &ToolInfo, body: String) -> String {
        match self.send(self.request(tool, Vec::new(), Some(body))).await {
            Ok(resp) if resp.is_ok() => resp.body.trim().to_string(),
            Ok(resp) => format!("Error {}: {}", resp.status, resp.body.trim()),
            Err(e) => format!("Request failed: {e}"),
        }
    }

    /// Probe `/health`, returning the gateway's JSON or a synthetic error
    /// object.
    pub async fn health(&self) -> Value {
        match self.send(self.request(&CHECK_CONNECTION, Vec::new(), None)).await {
            Ok(resp) if resp.is_ok() => serde_json::from_str(&resp.body)
                .unwrap_or_else(|e| json!({ "status": "error", "message": e.to_string() })),
            Ok(resp) => json!({ "status": "error", "message": format!("HTTP {}", resp.status) }),
            Err(e) => json!({ "status": "error", "message": e.to_string() }),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::tool_registry::{DECOMPILE_FUNCTION, LIST_FUNCTIONS};
    use std::sync::Mutex;

    /// Transport that records requests and replays one canned outcome.
    pub(crate) struct FakeTransport {
        pub outcome: Result<TransportResponse, TransportError>,
        pub seen: Mutex<Vec<GatewayRequest>>,
    }

    impl FakeTransport {
        pub fn respond(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                outcome: Ok(TransportResponse {
                    status,
                    body: body.to_string(),
                }),
                seen: Mutex::new(Vec::new()),
            })
        }

        pub fn fail(err: TransportError) -> Arc<Self> {
            Arc::new(Self {
                outcome: Err(err),
                seen: Mutex::new(Vec::new()),
            })
        }

        pub fn requests(&self) -> Vec<GatewayRequest> {
            self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }
    }

    impl Transport for FakeTransport {
        fn send(&self, request: GatewayRequest) -> TransportFuture<'_> {
            self.seen
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(request);
            let outcome = self.outcome.clone();
            Box::pin(async move { outcome })
        }
    }

    fn client(fake: &Arc<FakeTransport>) -> GatewayClient {
        GatewayClient::new("http://127.0.0.1:8080/", fake.clone())
    }

    #[tokio::test]
    async fn lines_on_success() {
        let fake = FakeTransport::respond(200, "main\nhelper");
        let lines = client(&fake)
            .get_lines(&LIST_FUNCTIONS, vec![("offset".into(), "0".into())])
            .await;
        assert_eq!(lines, vec!["main", "helper"]);

        let req = &fake.requests()[0];
        assert_eq!(req.url, "http://127.0.0.1:8080/functions");
        assert_eq!(req.timeout, Duration::from_secs(10));
        assert_eq!(req.method, HttpMethod::Get);
    }

    #[tokio::test]
    async fn empty_body_is_empty_list() {
        let fake = FakeTransport::respond(200, "");
        assert!(client(&fake).get_lines(&LIST_FUNCTIONS, Vec::new()).await.is_empty());
    }

    #[tokio::test]
    async fn http_error_becomes_single_line() {
        let fake = FakeTransport::respond(400, "{\"error\":\"No binary loaded\"}\n");
        let lines = client(&fake).get_lines(&LIST_FUNCTIONS, Vec::new()).await;
        assert_eq!(lines, vec![r#"Error 400: {"error":"No binary loaded"}"#]);
    }

    #[tokio::test]
    async fn transport_failure_is_reported() {
        let fake = FakeTransport::fail(TransportError::Connect("connection refused".into()));
        assert_eq!(
            client(&fake).get_lines(&LIST_FUNCTIONS, Vec::new()).await,
            vec!["Request failed: connection refused"]
        );
        assert_eq!(
            client(&fake)
                .post_text(&DECOMPILE_FUNCTION, "main".to_string())
                .await,
            "Request failed: connection refused"
        );
    }

    #[tokio::test]
    async fn post_text_trims_and_uses_long_timeout() {
        let fake = FakeTransport::respond(200, "  int main() {}\n");
        let text = client(&fake)
            .post_text(&DECOMPILE_FUNCTION, "main".to_string())
            .await;
        assert_eq!(text, "int main() {}");
        let req = &fake.requests()[0];
        assert_eq!(req.timeout, Duration::from_secs(30));
        assert_eq!(req.body.as_deref(), Some("main"));

        let fake = FakeTransport::respond(500, "Error: boom\n");
        assert_eq!(
            client(&fake)
                .post_text(&DECOMPILE_FUNCTION, "main".to_string())
                .await,
            "Error 500: Error: boom"
        );
    }

    #[tokio::test]
    async fn health_outcomes() {
        let fake = FakeTransport::respond(200, r#"{"status":"ok","binary":"/bins/a"}"#);
        assert_eq!(
            client(&fake).health().await,
            json!({"status": "ok", "binary": "/bins/a"})
        );
        assert_eq!(fake.requests()[0].timeout, Duration::from_secs(5));

        let fake = FakeTransport::respond(503, "down");
        assert_eq!(
            client(&fake).health().await,
            json!({"status": "error", "message": "HTTP 503"})
        );

        let fake = FakeTransport::fail(TransportError::Timeout("timed out".into()));
        assert_eq!(
            client(&fake).health().await,
            json!({"status": "error", "message": "timed out"})
        );
    }

    #[test]
    fn base_url_trailing_slash_stripped() {
        let fake = FakeTransport::respond(200, "");
        assert_eq!(client(&fake).base_url(), "http://127.0.0.1:8080");
    }
}
