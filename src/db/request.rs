//! Request types for the database worker.

use crate::db::handlers::PageWindow;
use crate::db::types::*;
use crate::db::SharedDatabase;
use crate::error::GatewayError;
use tokio::sync::oneshot;

/// Request types for the database worker
pub enum DbRequest {
    Attach {
        db: SharedDatabase,
        resp: oneshot::Sender<()>,
    },
    Detach {
        resp: oneshot::Sender<()>,
    },
    Health {
        resp: oneshot::Sender<HealthInfo>,
    },
    RequireDatabase {
        resp: oneshot::Sender<Result<(), GatewayError>>,
    },
    Listing {
        kind: ListingKind,
        window: PageWindow,
        resp: oneshot::Sender<Result<Vec<String>, GatewayError>>,
    },
    Xrefs {
        name: String,
        resp: oneshot::Sender<Result<XrefLookup, GatewayError>>,
    },
    Decompile {
        name: String,
        resp: oneshot::Sender<Result<DecompileOutcome, GatewayError>>,
    },
    Rename {
        old_name: String,
        new_name: String,
        resp: oneshot::Sender<Result<RenameOutcome, GatewayError>>,
    },
    UpdateAnalysis {
        resp: oneshot::Sender<Result<String, GatewayError>>,
    },
    Shutdown,
}
