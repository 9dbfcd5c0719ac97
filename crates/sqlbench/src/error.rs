//! Error types for the benchmark harness.
//!
//! Errors are layered: adapters report [`BackendError`], the execution engine
//! classifies them into a [`ScenarioError`] by the phase they occurred in, and
//! the driver only fails outright with [`Error`] on bad configuration.

use thiserror::Error;

/// Errors raised by a backend adapter while talking to its storage client.
#[derive(Debug, Error)]
pub enum BackendError {
    /// SQLite error surfaced through rusqlite.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Error surfaced through the sqlx driver.
    #[cfg(feature = "sqlx")]
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// The async runtime backing a connection could not be started.
    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),

    /// Failure injected by the recording `ref` backend.
    #[error("injected {0} failure")]
    Injected(&'static str),

    /// The connection was already released.
    #[error("connection is closed")]
    Closed,

    /// A prepared handle was used on a connection that did not create it.
    #[error("prepared handle belongs to another connection")]
    ForeignHandle,

    /// An insert touched an unexpected number of rows.
    #[error("expected 1 row affected, got {0}")]
    RowsAffected(u64),
}

/// Why a single scenario repetition failed.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// The backend could not open a connection.
    #[error("connection failed: {0}")]
    Connection(#[source] BackendError),

    /// Dropping or recreating the target table failed.
    #[error("schema reset failed: {0}")]
    Schema(#[source] BackendError),

    /// The insert statement could not be compiled.
    #[error("prepare failed: {0}")]
    Prepare(#[source] BackendError),

    /// The batch transaction could not be started.
    #[error("begin transaction failed: {0}")]
    Begin(#[source] BackendError),

    /// A row insert failed.
    #[error("insert of row {row} failed: {source}")]
    Insert {
        row: u64,
        #[source]
        source: BackendError,
    },

    /// The batch transaction could not be committed.
    #[error("commit failed: {0}")]
    Commit(#[source] BackendError),

    /// Releasing the connection failed after an otherwise successful run.
    #[error("close failed: {0}")]
    Close(#[source] BackendError),

    /// The table contents did not match what was inserted.
    #[error("verification failed: {0}")]
    Verification(String),

    /// Not attempted because the backend failed to open earlier in the run.
    #[error("backend '{0}' is unavailable")]
    BackendUnavailable(String),
}

impl ScenarioError {
    /// Row index of a failed insert, if this is an insert failure.
    pub fn failed_row(&self) -> Option<u64> {
        match self {
            ScenarioError::Insert { row, .. } => Some(*row),
            _ => None,
        }
    }

    /// True when the failure means the backend itself cannot be used.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, ScenarioError::Connection(_))
    }
}

/// Errors that stop a benchmark run before any scenario executes.
#[derive(Debug, Error)]
pub enum Error {
    /// A requested backend id has no registered adapter.
    #[error("unknown backend '{id}' (available: {available})")]
    UnknownBackend { id: String, available: String },

    /// The configuration is not usable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias for adapter operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Result alias for driver-level operations.
pub type Result<T> = std::result::Result<T, Error>;
