//! Analysis database integration.
//!
//! The host application owns the analysis database; this crate reaches it
//! only through the [`ProgramDatabase`] trait. All database work is funneled
//! through a single worker thread ([`DbWorker`] / [`run_db_loop`]) so that
//! reads and mutations coming from concurrent gateway connections are
//! serialized against each other.

pub mod handlers;
mod loop_impl;
pub mod request;
pub mod snapshot;
pub mod types;
pub mod worker;

pub use loop_impl::run_db_loop;
pub use request::DbRequest;
pub use snapshot::SnapshotDatabase;
pub use types::*;
pub use worker::DbWorker;

use std::sync::Arc;
use thiserror::Error;

/// Shared handle to the host database.
pub type SharedDatabase = Arc<dyn ProgramDatabase>;

/// Failure reported by the host database API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The host-provided analysis session for one loaded binary.
///
/// Implementations use interior mutability: the gateway only ever holds a
/// shared reference (`Arc<dyn ProgramDatabase>`). Enumeration methods return
/// snapshots in the host's native order, which the resolution engines rely on
/// for first-match semantics.
pub trait ProgramDatabase: Send + Sync {
    /// Path or display name of the loaded binary, when the host knows one.
    fn filename(&self) -> Option<String>;

    /// Functions in enumeration order.
    fn functions(&self) -> Result<Vec<Function>, HostError>;

    /// Function whose extent contains `addr`.
    fn function_containing(&self, addr: Address) -> Result<Option<Function>, HostError>;

    /// Names of all defined types.
    fn type_names(&self) -> Result<Vec<String>, HostError>;

    /// Symbols in ascending address order.
    fn symbols(&self) -> Result<Vec<Symbol>, HostError>;

    fn symbol_at(&self, addr: Address) -> Result<Option<Symbol>, HostError>;

    fn strings(&self) -> Result<Vec<StringEntry>, HostError>;

    /// Addresses of data variables in ascending order.
    fn data_vars(&self) -> Result<Vec<Address>, HostError>;

    /// Addresses of code that references `addr`, in the host's native order.
    fn code_refs(&self, addr: Address) -> Result<Vec<Address>, HostError>;

    /// High-level IR of the function starting at `start`, rendered as text.
    fn high_level_il(&self, start: Address) -> Result<Option<String>, HostError>;

    /// Mid-level IR of the function starting at `start`, rendered as text.
    fn mid_level_il(&self, start: Address) -> Result<Option<String>, HostError>;

    /// Rename the function starting at `start` in place.
    fn rename_function(&self, start: Address, new_name: &str) -> Result<(), HostError>;

    /// Define (or replace) the user symbol at `symbol.address`.
    fn define_user_symbol(&self, symbol: Symbol) -> Result<(), HostError>;

    /// Recompute analysis and block until it completes.
    fn update_analysis_and_wait(&self) -> Result<(), HostError>;
}
