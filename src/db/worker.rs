//! Database worker handle for async requests.

use crate::db::handlers::PageWindow;
use crate::db::request::DbRequest;
use crate::db::run_db_loop;
use crate::db::types::*;
use crate::db::SharedDatabase;
use crate::error::GatewayError;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::oneshot;

/// Pending requests the worker queue holds before senders back off.
pub const REQUEST_QUEUE_CAPACITY: usize = 64;
/// Backoff between enqueue retries while the queue is full (milliseconds).
const SEND_BACKOFF_MS: u64 = 5;

/// Handle for sending requests to the database worker thread.
///
/// Cloning the handle is cheap; every clone feeds the same thread, which
/// processes one request at a time.
#[derive(Clone)]
pub struct DbWorker {
    tx: mpsc::SyncSender<DbRequest>,
}

impl DbWorker {
    /// Create a new worker handle with the given sender.
    pub fn new(tx: mpsc::SyncSender<DbRequest>) -> Self {
        Self { tx }
    }

    /// Start the worker loop on a dedicated thread.
    pub fn spawn() -> std::io::Result<(Self, JoinHandle<()>)> {
        let (tx, rx) = mpsc::sync_channel(REQUEST_QUEUE_CAPACITY);
        let handle = std::thread::Builder::new()
            .name("db-worker".to_string())
            .spawn(move || run_db_loop(rx))?;
        Ok((Self::new(tx), handle))
    }

    async fn send_with_retry(&self, req: DbRequest) -> Result<(), GatewayError> {
        let mut pending = req;
        loop {
            match self.tx.try_send(pending) {
                Ok(()) => return Ok(()),
                Err(mpsc::TrySendError::Full(req)) => {
                    pending = req;
                    tokio::time::sleep(Duration::from_millis(SEND_BACKOFF_MS)).await;
                }
                Err(mpsc::TrySendError::Disconnected(_)) => {
                    return Err(GatewayError::WorkerClosed)
                }
            }
        }
    }

    /// Attach the host database, replacing any previous one.
    pub async fn attach(&self, db: SharedDatabase) -> Result<(), GatewayError> {
        let (tx, rx) = oneshot::channel();
        self.send_with_retry(DbRequest::Attach { db, resp: tx }).await?;
        Ok(rx.await?)
    }

    /// Drop the worker's database reference.
    pub async fn detach(&self) -> Result<(), GatewayError> {
        let (tx, rx) = oneshot::channel();
        self.send_with_retry(DbRequest::Detach { resp: tx }).await?;
        Ok(rx.await?)
    }

    pub async fn health(&self) -> Result<HealthInfo, GatewayError> {
        let (tx, rx) = oneshot::channel();
        self.send_with_retry(DbRequest::Health { resp: tx }).await?;
        Ok(rx.await?)
    }

    /// Fail with `NoDatabase` unless a database is attached.
    pub async fn require_database(&self) -> Result<(), GatewayError> {
        let (tx, rx) = oneshot::channel();
        self.send_with_retry(DbRequest::RequireDatabase { resp: tx })
            .await?;
        rx.await?
    }

    /// Paginated listing of the given kind.
    pub async fn listing(
        &self,
        kind: ListingKind,
        window: PageWindow,
    ) -> Result<Vec<String>, GatewayError> {
        let (tx, rx) = oneshot::channel();
        self.send_with_retry(DbRequest::Listing {
            kind,
            window,
            resp: tx,
        })
        .await?;
        rx.await?
    }

    pub async fn xrefs(&self, name: &str) -> Result<XrefLookup, GatewayError> {
        let (tx, rx) = oneshot::channel();
        self.send_with_retry(DbRequest::Xrefs {
            name: name.to_string(),
            resp: tx,
        })
        .await?;
        rx.await?
    }

    pub async fn decompile(&self, name: &str) -> Result<DecompileOutcome, GatewayError> {
        let (tx, rx) = oneshot::channel();
        self.send_with_retry(DbRequest::Decompile {
            name: name.to_string(),
            resp: tx,
        })
        .await?;
        rx.await?
    }

    pub async fn rename(
        &self,
        old_name: &str,
        new_name: &str,
    ) -> Result<RenameOutcome, GatewayError> {
        let (tx, rx) = oneshot::channel();
        self.send_with_retry(DbRequest::Rename {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
            resp: tx,
        })
        .await?;
        rx.await?
    }

    /// Re-run analysis. Resolves only once the host has finished.
    pub async fn update_analysis(&self) -> Result<String, GatewayError> {
        let (tx, rx) = oneshot::channel();
        self.send_with_retry(DbRequest::UpdateAnalysis { resp: tx })
            .await?;
        rx.await?
    }

    /// Ask the worker loop to exit after the requests already queued.
    pub async fn shutdown(&self) -> Result<(), GatewayError> {
        self.send_with_retry(DbRequest::Shutdown).await
    }
}
