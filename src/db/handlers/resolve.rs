//! Name-to-address resolution.
//!
//! Resolution is first-match-wins in the database's enumeration order:
//! functions are scanned before data variables, and duplicate names are
//! neither detected nor reported. Rename and xref correctness depend on this
//! exact order, so the scans stay linear.

use crate::db::types::{Address, Function, Symbol};
use crate::db::{HostError, ProgramDatabase};

/// First function whose name equals `name`.
pub fn find_function(db: &dyn ProgramDatabase, name: &str) -> Result<Option<Function>, HostError> {
    Ok(db.functions()?.into_iter().find(|f| f.name == name))
}

/// First data variable whose symbol's name equals `name`.
pub fn find_data_symbol(db: &dyn ProgramDatabase, name: &str) -> Result<Option<Symbol>, HostError> {
    for addr in db.data_vars()? {
        if let Some(symbol) = db.symbol_at(addr)? {
            if symbol.name == name {
                return Ok(Some(symbol));
            }
        }
    }
    Ok(None)
}

/// Resolve a function or data-variable name to its address.
pub fn resolve(db: &dyn ProgramDatabase, name: &str) -> Result<Option<Address>, HostError> {
    if let Some(func) = find_function(db, name)? {
        return Ok(Some(func.start));
    }
    Ok(find_data_symbol(db, name)?.map(|s| s.address))
}
