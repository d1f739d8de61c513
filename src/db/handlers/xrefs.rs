//! Cross-reference handler.

use crate::db::handlers::{attached, resolve};
use crate::db::types::{XrefEntry, XrefLookup};
use crate::db::SharedDatabase;
use crate::error::GatewayError;

/// Code references to the function or data variable called `name`.
///
/// References come back in the host's native order, duplicates included.
pub fn handle_xrefs(db: &Option<SharedDatabase>, name: &str) -> Result<XrefLookup, GatewayError> {
    let db = attached(db)?;

    let Some(target) = resolve::resolve(db, name)? else {
        return Ok(XrefLookup::Unresolved {
            name: name.to_string(),
        });
    };

    let refs = db
        .code_refs(target)?
        .into_iter()
        .map(|address| {
            Ok(XrefEntry {
                address,
                function: db.function_containing(address)?.map(|f| f.name),
            })
        })
        .collect::<Result<Vec<_>, GatewayError>>()?;

    Ok(XrefLookup::Resolved {
        name: name.to_string(),
        target,
        refs,
    })
}
