//! Tool registry for the adapter.
//!
//! Each tool maps onto exactly one gateway endpoint. The registry is the
//! single source for that mapping, the HTTP method, the timeout class, and the
//! text shown to MCP clients.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeout for read-only listing calls.
pub const READ_TIMEOUT_SECS: u64 = 10;
/// Timeout for mutating and decompile calls.
pub const POST_TIMEOUT_SECS: u64 = 30;
/// Timeout for the health probe.
pub const HEALTH_TIMEOUT_SECS: u64 = 5;

/// Tool category for grouping related tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    /// Paginated listings
    Listings,
    /// Decompilation, cross-references and re-analysis
    Analysis,
    /// Renaming
    Editing,
    /// Gateway reachability
    Connection,
}

impl ToolCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listings => "listings",
            Self::Analysis => "analysis",
            Self::Editing => "editing",
            Self::Connection => "connection",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Listings => "Functions, types, imports, exports and strings (paginated)",
            Self::Analysis => "Decompile, cross-references, re-run analysis",
            Self::Editing => "Rename functions and data symbols",
            Self::Connection => "Check that the gateway is reachable",
        }
    }

    pub fn all() -> &'static [ToolCategory] {
        &[
            Self::Listings,
            Self::Analysis,
            Self::Editing,
            Self::Connection,
        ]
    }
}

/// HTTP method a tool uses against the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Timeout bucket a tool call falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutClass {
    Read,
    Mutate,
    Health,
}

impl TimeoutClass {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(match self {
            Self::Read => READ_TIMEOUT_SECS,
            Self::Mutate => POST_TIMEOUT_SECS,
            Self::Health => HEALTH_TIMEOUT_SECS,
        })
    }
}

/// Metadata for a single tool
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: &'static str,
    pub category: ToolCategory,
    /// Gateway path without the leading slash
    pub endpoint: &'static str,
    pub method: HttpMethod,
    pub timeout: TimeoutClass,
    /// Short description (1 line) used in server instructions
    pub short_desc: &'static str,
    /// Example invocation (JSON)
    pub example: &'static str,
}

pub const LIST_FUNCTIONS: ToolInfo = ToolInfo {
    name: "list_functions",
    category: ToolCategory::Listings,
    endpoint: "functions",
    method: HttpMethod::Get,
    timeout: TimeoutClass::Read,
    short_desc: "List function names in enumeration order",
    example: r#"{"offset": 0, "limit": 100}"#,
};

pub const LIST_TYPES: ToolInfo = ToolInfo {
    name: "list_types",
    category: ToolCategory::Listings,
    endpoint: "types",
    method: HttpMethod::Get,
    timeout: TimeoutClass::Read,
    short_desc: "List defined type names",
    example: r#"{"offset": 0, "limit": 100}"#,
};

pub const LIST_IMPORTS: ToolInfo = ToolInfo {
    name: "list_imports",
    category: ToolCategory::Listings,
    endpoint: "imports",
    method: HttpMethod::Get,
    timeout: TimeoutClass::Read,
    short_desc: "List imported function symbols",
    example: r#"{"offset": 0, "limit": 100}"#,
};

pub const LIST_EXPORTS: ToolInfo = ToolInfo {
    name: "list_exports",
    category: ToolCategory::Listings,
    endpoint: "exports",
    method: HttpMethod::Get,
    timeout: TimeoutClass::Read,
    short_desc: "List global function and data symbols",
    example: r#"{"offset": 0, "limit": 100}"#,
};

pub const LIST_STRINGS: ToolInfo = ToolInfo {
    name: "list_strings",
    category: ToolCategory::Listings,
    endpoint: "strings",
    method: HttpMethod::Get,
    timeout: TimeoutClass::Read,
    short_desc: "List strings as 0x<addr>: <value>",
    example: r#"{"offset": 0, "limit": 100}"#,
};

pub const DECOMPILE_FUNCTION: ToolInfo = ToolInfo {
    name: "decompile_function",
    category: ToolCategory::Analysis,
    endpoint: "decompile",
    method: HttpMethod::Post,
    timeout: TimeoutClass::Mutate,
    short_desc: "Decompile a function by name (HLIL, falling back to MLIL)",
    example: r#"{"name": "main"}"#,
};

pub const GET_CROSS_REFERENCES: ToolInfo = ToolInfo {
    name: "get_cross_references",
    category: ToolCategory::Analysis,
    endpoint: "xrefs",
    method: HttpMethod::Get,
    timeout: TimeoutClass::Read,
    short_desc: "Code references to a function or data variable",
    example: r#"{"name": "helper"}"#,
};

pub const UPDATE_ANALYSIS: ToolInfo = ToolInfo {
    name: "update_analysis",
    category: ToolCategory::Analysis,
    endpoint: "analyze",
    method: HttpMethod::Post,
    timeout: TimeoutClass::Mutate,
    short_desc: "Re-run analysis and wait for it to finish",
    example: r#"{}"#,
};

pub const RENAME_FUNCTION: ToolInfo = ToolInfo {
    name: "rename_function",
    category: ToolCategory::Editing,
    endpoint: "rename",
    method: HttpMethod::Post,
    timeout: TimeoutClass::Mutate,
    short_desc: "Rename a function, or a data variable if no function matches",
    example: r#"{"old_name": "sub_401000", "new_name": "parse_header"}"#,
};

pub const CHECK_CONNECTION: ToolInfo = ToolInfo {
    name: "check_connection",
    category: ToolCategory::Connection,
    endpoint: "health",
    method: HttpMethod::Get,
    timeout: TimeoutClass::Health,
    short_desc: "Check gateway health and the loaded binary",
    example: r#"{}"#,
};

/// Static registry of all tools
pub static TOOL_REGISTRY: &[ToolInfo] = &[
    LIST_FUNCTIONS,
    LIST_TYPES,
    LIST_IMPORTS,
    LIST_EXPORTS,
    LIST_STRINGS,
    DECOMPILE_FUNCTION,
    GET_CROSS_REFERENCES,
    UPDATE_ANALYSIS,
    RENAME_FUNCTION,
    CHECK_CONNECTION,
];

/// Get all tools
pub fn all_tools() -> impl Iterator<Item = &'static ToolInfo> {
    TOOL_REGISTRY.iter()
}

/// Get tools by category
pub fn tools_by_category(category: ToolCategory) -> impl Iterator<Item = &'static ToolInfo> {
    TOOL_REGISTRY.iter().filter(move |t| t.category == category)
}

#[cfg(test)]
mod tests {
    use crate::tool_registry::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_and_endpoints_unique() {
        let names: HashSet<_> = all_tools().map(|t| t.name).collect();
        let endpoints: HashSet<_> = all_tools().map(|t| t.endpoint).collect();
        assert_eq!(names.len(), 10);
        assert_eq!(endpoints.len(), 10);
    }

    #[test]
    fn test_timeouts_follow_method() {
        for tool in all_tools() {
            match (tool.method, tool.timeout) {
                (HttpMethod::Post, TimeoutClass::Mutate) => {}
                (HttpMethod::Get, TimeoutClass::Read | TimeoutClass::Health) => {}
                other => panic!("{} has unexpected {other:?}", tool.name),
            }
        }
        assert_eq!(TimeoutClass::Read.duration(), Duration::from_secs(10));
        assert_eq!(TimeoutClass::Mutate.duration(), Duration::from_secs(30));
        assert_eq!(TimeoutClass::Health.duration(), Duration::from_secs(5));
    }

    #[test]
    fn test_endpoints() {
        let endpoint = |name: &str| all_tools().find(|t| t.name == name).map(|t| t.endpoint);
        assert_eq!(endpoint("get_cross_references"), Some("xrefs"));
        assert_eq!(endpoint("update_analysis"), Some("analyze"));
        assert_eq!(endpoint("nonexistent"), None);
    }

    #[test]
    fn test_every_category_populated() {
        for category in ToolCategory::all() {
            assert!(tools_by_category(*category).next().is_some(), "{}", category.as_str());
        }
    }
}
