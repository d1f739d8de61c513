//! Rename handler for functions and data symbols.

use crate::db::handlers::{attached, resolve};
use crate::db::types::RenameOutcome;
use crate::db::SharedDatabase;
use crate::error::GatewayError;
use tracing::debug;

/// Rename the first function, or failing that the first data symbol, named
/// `old_name`. Name collisions are left to the host.
pub fn handle_rename(
    db: &Option<SharedDatabase>,
    old_name: &str,
    new_name: &str,
) -> Result<RenameOutcome, GatewayError> {
    let db = attached(db)?;

    if old_name.is_empty() || new_name.is_empty() {
        return Err(GatewayError::malformed("Missing old_name or new_name"));
    }

    if let Some(func) = resolve::find_function(db, old_name)? {
        db.rename_function(func.start, new_name)?;
        debug!(address = func.start, old_name, new_name, "Renamed function");
        return Ok(RenameOutcome::Function {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
            address: func.start,
        });
    }

    if let Some(symbol) = resolve::find_data_symbol(db, old_name)? {
        let address = symbol.address;
        db.define_user_symbol(symbol.renamed(new_name))?;
        debug!(address, old_name, new_name, "Renamed data symbol");
        return Ok(RenameOutcome::DataSymbol {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
            address,
        });
    }

    Ok(RenameOutcome::Missing {
        old_name: old_name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::fixture;
    use crate::db::types::{SymbolBinding, SymbolKind};

    #[test]
    fn renames_function_in_place() {
        let db = fixture();
        let out = handle_rename(&db, "helper", "do_work").unwrap();
        assert_eq!(out.to_string(), "Renamed 'helper' to 'do_work'");
        assert!(matches!(out, RenameOutcome::Function { address: 0x1010, .. }));

        let db_ref = db.as_deref().unwrap();
        assert_eq!(resolve::resolve(db_ref, "do_work").unwrap(), Some(0x1010));
        // The data symbol sharing the old name is untouched.
        assert_eq!(resolve::resolve(db_ref, "helper").unwrap(), Some(0x2000));
    }

    #[test]
    fn renames_data_symbol_keeping_kind_and_binding() {
        let db = fixture();
        let out = handle_rename(&db, "scratch", "tmp_buf").unwrap();
        assert!(matches!(out, RenameOutcome::DataSymbol { address: 0x2010, .. }));

        let db_ref = db.as_deref().unwrap();
        let sym = db_ref.symbol_at(0x2010).unwrap().unwrap();
        assert_eq!(sym.name, "tmp_buf");
        assert_eq!(sym.kind, SymbolKind::Data);
        assert_eq!(sym.binding, SymbolBinding::Local);
        assert_eq!(resolve::resolve(db_ref, "scratch").unwrap(), None);
    }

    #[test]
    fn only_first_duplicate_is_renamed() {
        let db = fixture();
        handle_rename(&db, "dup", "dup_a").unwrap();
        let names: Vec<_> = db
            .as_deref()
            .unwrap()
            .functions()
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["main", "helper", "dup_a", "dup"]);
    }

    #[test]
    fn unknown_name_is_not_an_error() {
        let out = handle_rename(&fixture(), "ghost", "x").unwrap();
        assert_eq!(out.to_string(), "Could not find 'ghost'");
    }

    #[test]
    fn empty_names_are_malformed() {
        let err = handle_rename(&fixture(), "", "x").unwrap_err();
        assert_eq!(err, GatewayError::malformed("Missing old_name or new_name"));
        assert!(handle_rename(&fixture(), "main", "").is_err());
    }

    #[test]
    fn database_checked_first() {
        assert_eq!(
            handle_rename(&None, "", "").unwrap_err(),
            GatewayError::NoDatabase
        );
    }
}
