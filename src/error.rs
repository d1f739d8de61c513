//! Error types for the gateway and the tool adapter.
//!
//! Gateway failures map onto HTTP-equivalent status codes in one place
//! ([`GatewayError::status_code`]). "Not found" is not an error: the engines
//! report it through their outcome types so callers can show it directly.

use crate::db::HostError;
use rmcp::model::{CallToolResult, Content};
use thiserror::Error;

/// Failures surfaced by the request gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("No binary loaded")]
    NoDatabase,

    #[error("{0}")]
    MalformedRequest(String),

    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("{0}")]
    Host(#[from] HostError),

    #[error("internal panic: {0}")]
    WorkerPanic(String),

    #[error("Database worker closed")]
    WorkerClosed,
}

impl GatewayError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRequest(message.into())
    }

    /// HTTP-equivalent status code.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NoDatabase | Self::MalformedRequest(_) => 400,
            Self::UnknownEndpoint(_) => 404,
            Self::Host(_) | Self::WorkerPanic(_) | Self::WorkerClosed => 500,
        }
    }

    /// True for faults the gateway did not anticipate.
    pub fn is_internal(&self) -> bool {
        self.status_code() >= 500
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for GatewayError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        GatewayError::WorkerClosed
    }
}

/// Adapter-side failures returned with `is_error: true` in CallToolResult.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Failed to encode tool result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ToolError {
    /// Convert to MCP CallToolResult with is_error: true
    pub fn to_tool_result(&self) -> CallToolResult {
        CallToolResult::error(vec![Content::text(self.to_string())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(GatewayError::NoDatabase.status_code(), 400);
        assert_eq!(GatewayError::malformed("Missing name parameter").status_code(), 400);
        assert_eq!(GatewayError::UnknownEndpoint("/x".into()).status_code(), 404);
        assert_eq!(GatewayError::Host(HostError::new("boom")).status_code(), 500);
        assert_eq!(GatewayError::WorkerClosed.status_code(), 500);
        assert!(GatewayError::WorkerPanic("oops".into()).is_internal());
        assert!(!GatewayError::NoDatabase.is_internal());
    }

    #[test]
    fn messages_match_wire_text() {
        assert_eq!(GatewayError::NoDatabase.to_string(), "No binary loaded");
        assert_eq!(
            GatewayError::UnknownEndpoint("/nope".into()).to_string(),
            "Unknown endpoint: /nope"
        );
        assert_eq!(GatewayError::Host(HostError::new("disk gone")).to_string(), "disk gone");
    }
}
