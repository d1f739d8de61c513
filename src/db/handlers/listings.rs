//! Paginated listing handlers: functions, types, imports, exports, strings.

use crate::db::handlers::{attached, PageWindow};
use crate::db::types::ListingKind;
use crate::db::SharedDatabase;
use crate::error::GatewayError;

pub fn handle_listing(
    db: &Option<SharedDatabase>,
    kind: ListingKind,
    window: PageWindow,
) -> Result<Vec<String>, GatewayError> {
    let db = attached(db)?;

    let items: Vec<String> = match kind {
        ListingKind::Functions => db.functions()?.into_iter().map(|f| f.name).collect(),
        ListingKind::Types => db.type_names()?,
        ListingKind::Imports => db
            .symbols()?
            .into_iter()
            .filter(|s| s.is_import())
            .map(|s| s.name)
            .collect(),
        ListingKind::Exports => db
            .symbols()?
            .into_iter()
            .filter(|s| s.is_export())
            .map(|s| s.name)
            .collect(),
        ListingKind::Strings => db.strings()?.iter().map(ToString::to_string).collect(),
    };

    Ok(window.apply(items))
}
