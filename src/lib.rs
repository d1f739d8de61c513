//! Binary analysis gateway and MCP adapter
//!
//! This library exposes a loaded binary analysis session over a small HTTP
//! API, and adapts that API to MCP tools so that LLM agents can list
//! functions, decompile, follow cross-references and rename symbols.
//!
//! # Architecture
//!
//! - **Database worker**: One thread owns the attached [`db::ProgramDatabase`]
//!   and executes every request against it in arrival order
//!   ([`db::run_db_loop`]). A panic inside the host API is caught and turned
//!   into an error response.
//!
//! - **[`db::DbWorker`]**: Cloneable async handle for sending requests to the
//!   worker thread.
//!
//! - **[`gateway::Gateway`]**: HTTP/1.1 server with a start/stop lifecycle.
//!   Routes map onto the engines in [`db::handlers`].
//!
//! - **[`bridge::BinjaBridge`]**: Stateless MCP server that turns each tool
//!   call into one gateway request. Uses the `rmcp` crate for MCP protocol
//!   handling.
//!
//! # Endpoints
//!
//! ## GET
//! - `/health`: Status and loaded binary
//! - `/functions` (`/methods`): Function names, paginated
//! - `/types` (`/classes`): Type names, paginated
//! - `/imports`, `/exports`, `/strings`: Symbol and string listings, paginated
//! - `/xrefs?name=`: Code references to a function or data symbol
//!
//! ## POST
//! - `/decompile`: Body is the function name
//! - `/rename`: Body is `{"old_name": .., "new_name": ..}`
//! - `/analyze`: Re-run analysis

pub mod bridge;
pub mod db;
pub mod error;
pub mod gateway;
pub mod tool_registry;

pub use bridge::{BinjaBridge, BridgeConfig, GatewayClient, McpTransport};
pub use db::{DbWorker, ProgramDatabase, SharedDatabase, SnapshotDatabase};
pub use error::{GatewayError, ToolError};
pub use gateway::{Gateway, GatewayConfig};
pub use tool_registry::{ToolCategory, ToolInfo, TOOL_REGISTRY};
