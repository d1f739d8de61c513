//! Database operation handlers organized by domain.
//!
//! Every handler takes the worker's `Option<SharedDatabase>` and fails with
//! [`GatewayError::NoDatabase`] before touching anything when no database is
//! attached.

pub mod analysis;
pub mod decompile;
pub mod listings;
pub mod rename;
pub mod resolve;
pub mod xrefs;

use crate::db::{ProgramDatabase, SharedDatabase};
use crate::error::GatewayError;

pub const DEFAULT_OFFSET: usize = 0;
pub const DEFAULT_LIMIT: usize = 100;

/// Borrow the attached database or fail with `NoDatabase`.
pub(crate) fn attached(db: &Option<SharedDatabase>) -> Result<&dyn ProgramDatabase, GatewayError> {
    db.as_deref().ok_or(GatewayError::NoDatabase)
}

/// Offset/limit window applied to an ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: usize,
    pub limit: usize,
}

impl Default for PageWindow {
    fn default() -> Self {
        Self {
            offset: DEFAULT_OFFSET,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageWindow {
    pub fn new(offset: usize, limit: usize) -> Result<Self, GatewayError> {
        if limit == 0 {
            return Err(GatewayError::malformed("limit must be greater than zero"));
        }
        Ok(Self { offset, limit })
    }

    /// Build a window from raw query values, applying defaults for absent ones.
    pub fn parse(offset: Option<&str>, limit: Option<&str>) -> Result<Self, GatewayError> {
        let offset = match offset {
            Some(raw) => parse_count("offset", raw)?,
            None => DEFAULT_OFFSET,
        };
        let limit = match limit {
            Some(raw) => parse_count("limit", raw)?,
            None => DEFAULT_LIMIT,
        };
        Self::new(offset, limit)
    }

    /// Contiguous slice `[offset, offset + limit)` clamped to the sequence.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect()
    }
}

fn parse_count(field: &str, raw: &str) -> Result<usize, GatewayError> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| GatewayError::malformed(format!("Invalid {field} parameter: {raw}")))
}

/// Small database shared by the handler tests.
#[cfg(test)]
pub(crate) fn fixture() -> Option<SharedDatabase> {
    use crate::db::SnapshotDatabase;
    use std::sync::Arc;

    const FIXTURE: &str = r#"{
        "filename": "/bins/fixture",
        "functions": [
            {"name": "main", "start": "0x1000", "size": 16,
             "hlil": "int32_t main()\n{\n    return helper();\n}"},
            {"name": "helper", "start": "0x1010", "size": 16,
             "mlil": "0 @ 00001010  return 0"},
            {"name": "dup", "start": "0x1020", "size": 16},
            {"name": "dup", "start": "0x1030", "size": 16}
        ],
        "types": ["point", "rect", "node"],
        "symbols": [
            {"name": "main", "address": "0x1000", "kind": "function", "binding": "global"},
            {"name": "helper", "address": "0x1010", "kind": "function", "binding": "local"},
            {"name": "helper", "address": "0x2000", "kind": "data", "binding": "global"},
            {"name": "counter", "address": "0x2008", "kind": "data", "binding": "global"},
            {"name": "scratch", "address": "0x2010", "kind": "data", "binding": "local"},
            {"name": "printf", "address": "0x5000", "kind": "imported_function", "binding": "global"},
            {"name": "malloc", "address": "0x5008", "kind": "imported_function", "binding": "global"}
        ],
        "strings": [
            {"address": "0x3000", "value": "hello"},
            {"address": "0x3010", "value": "world"}
        ],
        "data_vars": ["0x2000", "0x2008", "0x2010"],
        "references": [
            {"from": "0x1005", "to": "0x1010"},
            {"from": "0x4000", "to": "0x1010"},
            {"from": "0x1005", "to": "0x1010"},
            {"from": "0x1014", "to": "0x2008"}
        ]
    }"#;

    let db = SnapshotDatabase::from_json_str(FIXTURE).expect("fixture snapshot");
    Some(Arc::new(db))
}
