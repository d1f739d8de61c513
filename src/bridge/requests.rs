//! MCP tool request types.
//!
//! These structs define the parameters for each MCP tool exposed by the adapter.

use rmcp::schemars::JsonSchema;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListRequest {
    #[schemars(description = "Offset for pagination (default: 0)")]
    pub offset: Option<usize>,
    #[schemars(description = "Maximum items to return (1-10000, default: 100)")]
    #[serde(alias = "count")]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DecompileFunctionRequest {
    #[schemars(description = "Exact function name; the first function with this name is used")]
    #[serde(alias = "function_name")]
    pub name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RenameFunctionRequest {
    #[schemars(description = "Current name of the function or data variable")]
    pub old_name: String,
    #[schemars(description = "New name")]
    pub new_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CrossReferencesRequest {
    #[schemars(description = "Function or data variable name to find references to")]
    #[serde(alias = "symbol")]
    pub name: String,
}
