//! Health and re-analysis handlers.

use crate::db::handlers::attached;
use crate::db::types::HealthInfo;
use crate::db::SharedDatabase;
use crate::error::GatewayError;
use tracing::info;

/// Liveness report. Never requires a database.
pub fn handle_health(db: &Option<SharedDatabase>) -> HealthInfo {
    HealthInfo {
        status: "ok".to_string(),
        binary: db.as_ref().and_then(|db| db.filename()),
    }
}

/// Recompute analysis, blocking until the host finishes.
pub fn handle_update_analysis(db: &Option<SharedDatabase>) -> Result<String, GatewayError> {
    let db = attached(db)?;
    db.update_analysis_and_wait()?;
    info!(binary = ?db.filename(), "Analysis updated");
    Ok("Analysis updated".to_string())
}
