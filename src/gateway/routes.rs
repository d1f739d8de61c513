//! Request routing and response envelopes.
//!
//! GET endpoints report failures as `{"error": ...}` JSON; POST endpoints
//! report them as plain text. Every response allows any origin.

use crate::db::handlers::PageWindow;
use crate::db::{DbWorker, HostError, ListingKind};
use crate::error::GatewayError;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, error, instrument};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

/// Route one request and always produce a response.
#[instrument(skip_all, fields(method = %req.method(), path = %req.uri().path()))]
pub async fn handle<B>(worker: &DbWorker, req: Request<B>) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = if method == Method::GET {
        let query = parse_query(req.uri().query());
        get(worker, &path, &query).await.unwrap_or_else(|e| get_error(&e))
    } else if method == Method::POST {
        match read_body(req).await {
            Ok(body) => post(worker, &path, &body).await,
            Err(e) => Err(e),
        }
        .unwrap_or_else(|e| post_error(&e))
    } else {
        post_error(&GatewayError::UnknownEndpoint(path.clone()))
    };

    debug!(status = response.status().as_u16(), "Request handled");
    response
}

async fn get(
    worker: &DbWorker,
    path: &str,
    query: &HashMap<String, String>,
) -> Result<Response<Full<Bytes>>, GatewayError> {
    match path {
        "/health" => {
            let info = worker.health().await?;
            let body = serde_json::to_string(&info)
                .map_err(|e| GatewayError::Host(HostError::new(e.to_string())))?;
            Ok(respond(StatusCode::OK, APPLICATION_JSON, body))
        }
        "/functions" | "/methods" => listing(worker, ListingKind::Functions, query).await,
        "/types" | "/classes" => listing(worker, ListingKind::Types, query).await,
        "/imports" => listing(worker, ListingKind::Imports, query).await,
        "/exports" => listing(worker, ListingKind::Exports, query).await,
        "/strings" => listing(worker, ListingKind::Strings, query).await,
        "/xrefs" => {
            // Attachment is checked before parameters.
            worker.require_database().await?;
            let name = query
                .get("name")
                .filter(|n| !n.is_empty())
                .ok_or_else(|| GatewayError::malformed("Missing name parameter"))?;
            let lookup = worker.xrefs(name).await?;
            Ok(text(StatusCode::OK, lookup.to_string()))
        }
        _ => Err(GatewayError::UnknownEndpoint(path.to_string())),
    }
}

async fn listing(
    worker: &DbWorker,
    kind: ListingKind,
    query: &HashMap<String, String>,
) -> Result<Response<Full<Bytes>>, GatewayError> {
    let window = PageWindow::parse(
        query.get("offset").map(String::as_str),
        query.get("limit").map(String::as_str),
    )?;
    let items = worker.listing(kind, window).await?;
    Ok(text(StatusCode::OK, items.join("\n")))
}

#[derive(Debug, Deserialize)]
struct RenameBody {
    #[serde(default)]
    old_name: Option<String>,
    #[serde(default)]
    new_name: Option<String>,
}

async fn post(
    worker: &DbWorker,
    path: &str,
    body: &str,
) -> Result<Response<Full<Bytes>>, GatewayError> {
    match path {
        "/decompile" => {
            worker.require_database().await?;
            let name = body.trim();
            if name.is_empty() {
                return Err(GatewayError::malformed("Missing function name in body"));
            }
            let outcome = worker.decompile(name).await?;
            Ok(text(StatusCode::OK, outcome.to_string()))
        }
        "/rename" => {
            worker.require_database().await?;
            let parsed: RenameBody = serde_json::from_str(body)
                .map_err(|_| GatewayError::malformed("Invalid JSON in request body"))?;
            let old_name = parsed.old_name.unwrap_or_default();
            let new_name = parsed.new_name.unwrap_or_default();
            let outcome = worker.rename(&old_name, &new_name).await?;
            Ok(text(StatusCode::OK, outcome.to_string()))
        }
        "/analyze" => {
            let status = worker.update_analysis().await?;
            Ok(text(StatusCode::OK, status))
        }
        _ => Err(GatewayError::UnknownEndpoint(path.to_string())),
    }
}

async fn read_body<B>(req: Request<B>) -> Result<String, GatewayError>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let bytes = req
        .into_body()
        .collect()
        .await
        .map_err(|e| GatewayError::malformed(format!("Failed to read request body: {e}")))?
        .to_bytes();
    String::from_utf8(bytes.to_vec())
        .map_err(|_| GatewayError::malformed("Request body is not valid UTF-8"))
}

/// Decoded query parameters; the first occurrence of a key wins.
fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    let mut params = HashMap::new();
    if let Some(query) = query {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            params
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
    }
    params
}

fn respond(status: StatusCode, content_type: &'static str, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

fn text(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    respond(status, TEXT_PLAIN, body)
}

fn status_of(err: &GatewayError) -> StatusCode {
    if err.is_internal() {
        error!(error = %err, "Internal failure");
    }
    StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn get_error(err: &GatewayError) -> Response<Full<Bytes>> {
    let body = json!({ "error": err.to_string() }).to_string();
    respond(status_of(err), APPLICATION_JSON, body)
}

fn post_error(err: &GatewayError) -> Response<Full<Bytes>> {
    let status = status_of(err);
    let body = if err.is_internal() {
        format!("Error: {err}")
    } else {
        err.to_string()
    };
    text(status, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::{Address, Function, StringEntry, Symbol};
    use crate::db::{ProgramDatabase, SnapshotDatabase};
    use std::sync::Arc;

    const SNAPSHOT: &str = r#"{
        "filename": "/bins/routes",
        "functions": [
            {"name": "main", "start": "0x1000", "size": 16, "hlil": "int main() {}"},
            {"name": "helper", "start": "0x1010", "size": 16}
        ],
        "symbols": [
            {"name": "main", "address": "0x1000", "kind": "function", "binding": "global"}
        ],
        "references": [{"from": "0x1005", "to": "0x1010"}]
    }"#;

    async fn worker(attached: bool) -> DbWorker {
        let (worker, _handle) = DbWorker::spawn().unwrap();
        if attached {
            let db = SnapshotDatabase::from_json_str(SNAPSHOT).unwrap();
            worker.attach(Arc::new(db)).await.unwrap();
        }
        worker
    }

    fn request(method: Method, uri: &str, body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    async fn call(worker: &DbWorker, method: Method, uri: &str, body: &str) -> (u16, String) {
        let response = handle(worker, request(method, uri, body)).await;
        assert_eq!(
            response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
        let status = response.status().as_u16();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn query_is_decoded() {
        let q = parse_query(Some("name=foo%3A%3Abar&name=second&limit=5"));
        assert_eq!(q.get("name").unwrap(), "foo::bar");
        assert_eq!(q.get("limit").unwrap(), "5");
        assert!(parse_query(None).is_empty());
    }

    #[tokio::test]
    async fn listing_and_aliases() {
        let w = worker(true).await;
        assert_eq!(
            call(&w, Method::GET, "/functions", "").await,
            (200, "main\nhelper".to_string())
        );
        assert_eq!(
            call(&w, Method::GET, "/methods?offset=1&limit=5", "").await,
            (200, "helper".to_string())
        );
        assert_eq!(
            call(&w, Method::GET, "/functions?offset=9", "").await,
            (200, String::new())
        );
    }

    #[tokio::test]
    async fn bad_pagination_is_json_400() {
        let w = worker(true).await;
        let (status, body) = call(&w, Method::GET, "/functions?limit=abc", "").await;
        assert_eq!(status, 400);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["error"], "Invalid limit parameter: abc");
    }

    #[tokio::test]
    async fn xrefs_requires_name() {
        let w = worker(true).await;
        let (status, body) = call(&w, Method::GET, "/xrefs?name=", "").await;
        assert_eq!(status, 400);
        assert!(body.contains("Missing name parameter"));

        assert_eq!(
            call(&w, Method::GET, "/xrefs?name=helper", "").await,
            (200, "0x1005 (in main)".to_string())
        );
    }

    #[tokio::test]
    async fn no_database_on_every_data_endpoint() {
        let w = worker(false).await;
        for path in ["/functions", "/types", "/imports", "/exports", "/strings", "/xrefs"] {
            let (status, body) = call(&w, Method::GET, path, "").await;
            assert_eq!(status, 400, "{path}");
            assert_eq!(body, r#"{"error":"No binary loaded"}"#, "{path}");
        }
        for path in ["/decompile", "/rename", "/analyze"] {
            assert_eq!(
                call(&w, Method::POST, path, "").await,
                (400, "No binary loaded".to_string()),
                "{path}"
            );
        }
        let (status, body) = call(&w, Method::GET, "/health", "").await;
        assert_eq!(status, 200);
        assert_eq!(body, r#"{"status":"ok","binary":null}"#);
    }

    #[tokio::test]
    async fn post_errors_are_plain_text() {
        let w = worker(true).await;
        assert_eq!(
            call(&w, Method::POST, "/decompile", "   ").await,
            (400, "Missing function name in body".to_string())
        );
        assert_eq!(
            call(&w, Method::POST, "/rename", "{not json").await,
            (400, "Invalid JSON in request body".to_string())
        );
        assert_eq!(
            call(&w, Method::POST, "/rename", r#"{"old_name": "main"}"#).await,
            (400, "Missing old_name or new_name".to_string())
        );
    }

    #[tokio::test]
    async fn decompile_trims_body() {
        let w = worker(true).await;
        assert_eq!(
            call(&w, Method::POST, "/decompile", "main\n").await,
            (200, "int main() {}".to_string())
        );
        assert_eq!(
            call(&w, Method::POST, "/decompile", "nope").await,
            (200, "Function 'nope' not found".to_string())
        );
    }

    #[tokio::test]
    async fn unknown_endpoints() {
        let w = worker(true).await;
        let (status, body) = call(&w, Method::GET, "/nope", "").await;
        assert_eq!(status, 404);
        assert_eq!(body, r#"{"error":"Unknown endpoint: /nope"}"#);
        assert_eq!(
            call(&w, Method::POST, "/nope", "").await,
            (404, "Unknown endpoint: /nope".to_string())
        );
    }

    #[tokio::test]
    async fn worker_gone_is_500() {
        let w = worker(true).await;
        w.shutdown().await.unwrap();
        let (status, body) = call(&w, Method::POST, "/analyze", "").await;
        assert_eq!(status, 500);
        assert_eq!(body, "Error: Database worker closed");
    }

    /// Host whose every query fails.
    struct UnreadableHost;

    impl ProgramDatabase for UnreadableHost {
        fn filename(&self) -> Option<String> {
            None
        }
        fn functions(&self) -> Result<Vec<Function>, HostError> {
            Err(HostError::new("database is locked"))
        }
        fn function_containing(&self, _: Address) -> Result<Option<Function>, HostError> {
            Err(HostError::new("database is locked"))
        }
        fn type_names(&self) -> Result<Vec<String>, HostError> {
            Err(HostError::new("database is locked"))
        }
        fn symbols(&self) -> Result<Vec<Symbol>, HostError> {
            Err(HostError::new("database is locked"))
        }
        fn symbol_at(&self, _: Address) -> Result<Option<Symbol>, HostError> {
            Err(HostError::new("database is locked"))
        }
        fn strings(&self) -> Result<Vec<StringEntry>, HostError> {
            Err(HostError::new("database is locked"))
        }
        fn data_vars(&self) -> Result<Vec<Address>, HostError> {
            Err(HostError::new("database is locked"))
        }
        fn code_refs(&self, _: Address) -> Result<Vec<Address>, HostError> {
            Err(HostError::new("database is locked"))
        }
        fn high_level_il(&self, _: Address) -> Result<Option<String>, HostError> {
            Err(HostError::new("database is locked"))
        }
        fn mid_level_il(&self, _: Address) -> Result<Option<String>, HostError> {
            Err(HostError::new("database is locked"))
        }
        fn rename_function(&self, _: Address, _: &str) -> Result<(), HostError> {
            Err(HostError::new("database is locked"))
        }
        fn define_user_symbol(&self, _: Symbol) -> Result<(), HostError> {
            Err(HostError::new("database is locked"))
        }
        fn update_analysis_and_wait(&self) -> Result<(), HostError> {
            Err(HostError::new("database is locked"))
        }
    }

    #[tokio::test]
    async fn host_failure_on_get_is_json_500() {
        let (w, _handle) = DbWorker::spawn().unwrap();
        w.attach(Arc::new(UnreadableHost)).await.unwrap();

        let (status, body) = call(&w, Method::GET, "/functions", "").await;
        assert_eq!(status, 500);
        assert_eq!(body, r#"{"error":"database is locked"}"#);

        let (status, body) = call(&w, Method::GET, "/xrefs?name=main", "").await;
        assert_eq!(status, 500);
        assert_eq!(body, r#"{"error":"database is locked"}"#);

        assert_eq!(
            call(&w, Method::POST, "/decompile", "main").await,
            (500, "Error: database is locked".to_string())
        );
    }
}
