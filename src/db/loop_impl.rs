//! Database worker loop.

use crate::db::handlers::{analysis, attached, decompile, listings, rename, xrefs};
use crate::db::request::DbRequest;
use crate::db::SharedDatabase;
use crate::error::GatewayError;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Log result with debug on success and warn on error.
macro_rules! log_result {
    ($result:expr, $ok_msg:literal, $err_msg:literal) => {
        match &$result {
            Ok(_) => debug!($ok_msg),
            Err(e) => warn!(error = %e, $err_msg),
        }
    };
}

/// Run a handler, turning a panic into a `WorkerPanic` error so that one bad
/// request cannot take the worker thread down.
fn guarded<T>(f: impl FnOnce() -> Result<T, GatewayError>) -> Result<T, GatewayError> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        error!(panic = %message, "Handler panicked");
        Err(GatewayError::WorkerPanic(message))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run the database worker loop on the current thread.
/// This function blocks until Shutdown is received or every sender is gone.
pub fn run_db_loop(rx: mpsc::Receiver<DbRequest>) {
    let mut db: Option<SharedDatabase> = None;

    while let Ok(req) = rx.recv() {
        match req {
            DbRequest::Attach { db: new_db, resp } => {
                info!(binary = ?new_db.filename(), "Attaching database");
                db = Some(new_db);
                let _ = resp.send(());
            }
            DbRequest::Detach { resp } => {
                if db.take().is_some() {
                    info!("Database detached");
                }
                let _ = resp.send(());
            }
            DbRequest::Health { resp } => {
                let _ = resp.send(analysis::handle_health(&db));
            }
            DbRequest::RequireDatabase { resp } => {
                let _ = resp.send(attached(&db).map(|_| ()));
            }
            DbRequest::Listing { kind, window, resp } => {
                debug!(
                    kind = kind.as_str(),
                    offset = window.offset,
                    limit = window.limit,
                    "Listing"
                );
                let result = guarded(|| listings::handle_listing(&db, kind, window));
                match &result {
                    Ok(items) => debug!(count = items.len(), "Listed items"),
                    Err(e) => warn!(error = %e, kind = kind.as_str(), "Failed to list"),
                }
                let _ = resp.send(result);
            }
            DbRequest::Xrefs { name, resp } => {
                debug!(name = %name, "Resolving cross-references");
                let result = guarded(|| xrefs::handle_xrefs(&db, &name));
                log_result!(result, "Resolved cross-references", "Failed to resolve cross-references");
                let _ = resp.send(result);
            }
            DbRequest::Decompile { name, resp } => {
                debug!(name = %name, "Decompiling function");
                let result = guarded(|| decompile::handle_decompile(&db, &name));
                log_result!(result, "Decompiled function", "Failed to decompile function");
                let _ = resp.send(result);
            }
            DbRequest::Rename {
                old_name,
                new_name,
                resp,
            } => {
                debug!(old_name = %old_name, new_name = %new_name, "Renaming");
                let result = guarded(|| rename::handle_rename(&db, &old_name, &new_name));
                log_result!(result, "Rename handled", "Failed to rename");
                let _ = resp.send(result);
            }
            DbRequest::UpdateAnalysis { resp } => {
                debug!("Updating analysis");
                let result = guarded(|| analysis::handle_update_analysis(&db));
                log_result!(result, "Analysis update finished", "Failed to update analysis");
                let _ = resp.send(result);
            }
            DbRequest::Shutdown => {
                info!("Worker shutting down");
                db.take();
                break;
            }
        }
    }
}
