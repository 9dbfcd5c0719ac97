//! Storage client backends under test.
//!
//! Every client is adapted to the same [`Backend`]/[`Connection`] surface so
//! the execution engine never branches on which client it is driving.

pub mod reference;
pub mod sqlite;

#[cfg(feature = "sqlx")]
pub mod sqlx_sqlite;

pub use reference::{Fault, RefBackend, RefCounts, RefProbe};
pub use sqlite::SqliteBackend;

#[cfg(feature = "sqlx")]
pub use sqlx_sqlite::SqlxBackend;

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{BackendError, BackendResult, Error, Result};

/// A storage client that can open fresh, empty in-memory databases.
pub trait Backend {
    /// Stable identifier used in scenarios and reports.
    fn id(&self) -> &str;

    /// Open a new connection to an empty storage instance.
    fn open(&self) -> BackendResult<Box<dyn Connection>>;
}

/// One open connection, owned by a single scenario repetition.
///
/// Dropping a connection releases its resources; [`Connection::close`] does the
/// same but reports failures.
pub trait Connection {
    /// Drop the target table if present, then create it empty.
    fn reset_schema(&mut self) -> BackendResult<()>;

    /// Compile a parameterized statement once.
    fn prepare(&mut self, sql: &str) -> BackendResult<PreparedHandle>;

    /// Bind `@Key`/`@Value` and execute a compiled insert.
    fn bind_and_execute(&mut self, handle: &PreparedHandle, key: i64, value: f64)
        -> BackendResult<()>;

    /// Parse, plan and execute a fully interpolated statement.
    fn execute_raw(&mut self, sql: &str) -> BackendResult<()>;

    fn begin_transaction(&mut self) -> BackendResult<()>;

    fn commit_transaction(&mut self) -> BackendResult<()>;

    /// Read the target table in key order.
    fn snapshot_rows(&mut self) -> BackendResult<Vec<(i64, f64)>>;

    /// Release the connection and every statement prepared on it.
    fn close(self: Box<Self>) -> BackendResult<()>;
}

/// Identity of one open connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocate a process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Opaque token for a statement compiled on a specific connection.
///
/// Handles are not `Clone`; they are only meaningful to the connection that
/// issued them and become useless once it is closed.
#[derive(Debug, PartialEq, Eq)]
pub struct PreparedHandle {
    owner: ConnectionId,
    slot: usize,
}

impl PreparedHandle {
    /// Create a handle for the statement at `slot` on connection `owner`.
    pub fn new(owner: ConnectionId, slot: usize) -> Self {
        Self { owner, slot }
    }

    /// Resolve the statement slot, rejecting handles from other connections.
    pub fn slot_for(&self, conn: ConnectionId) -> BackendResult<usize> {
        if self.owner == conn {
            Ok(self.slot)
        } else {
            Err(BackendError::ForeignHandle)
        }
    }
}

/// Backends available to a benchmark run, in registration order.
#[derive(Default)]
pub struct BackendRegistry {
    backends: Vec<Box<dyn Backend>>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in backend.
    pub fn with_defaults() -> Self {
        let registry = Self::new()
            .with_backend(RefBackend::new())
            .with_backend(SqliteBackend::new());

        #[cfg(feature = "sqlx")]
        let registry = registry.with_backend(SqlxBackend::new());

        registry
    }

    /// Register a backend, replacing any existing backend with the same id.
    pub fn with_backend(mut self, backend: impl Backend + 'static) -> Self {
        self.register(Box::new(backend));
        self
    }

    /// Register a boxed backend, replacing any existing backend with the same id.
    pub fn register(&mut self, backend: Box<dyn Backend>) {
        match self.backends.iter_mut().find(|b| b.id() == backend.id()) {
            Some(existing) => *existing = backend,
            None => self.backends.push(backend),
        }
    }

    /// Look up a backend by id.
    pub fn get(&self, id: &str) -> Option<&dyn Backend> {
        self.backends.iter().find(|b| b.id() == id).map(|b| b.as_ref())
    }

    /// Look up a backend by id, failing with the list of known ids.
    pub fn require(&self, id: &str) -> Result<&dyn Backend> {
        self.get(id).ok_or_else(|| Error::UnknownBackend {
            id: id.to_string(),
            available: self.ids().join(", "),
        })
    }

    /// Ids of all registered backends.
    pub fn ids(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.id().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_rejects_other_connection() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        let handle = PreparedHandle::new(a, 3);

        assert_eq!(handle.slot_for(a).unwrap(), 3);
        assert!(matches!(
            handle.slot_for(b),
            Err(BackendError::ForeignHandle)
        ));
    }

    #[test]
    fn test_registry_defaults() {
        let registry = BackendRegistry::with_defaults();
        let ids = registry.ids();

        assert_eq!(ids[0], "ref");
        assert_eq!(ids[1], "rusqlite");
        #[cfg(feature = "sqlx")]
        assert_eq!(ids[2], "sqlx");
    }

    #[test]
    fn test_registry_replaces_same_id() {
        let registry = BackendRegistry::new()
            .with_backend(RefBackend::new())
            .with_backend(RefBackend::with_fault(Fault::Open));

        assert_eq!(registry.ids(), vec!["ref".to_string()]);
        assert!(registry.require("ref").unwrap().open().is_err());
    }

    #[test]
    fn test_registry_unknown_backend() {
        let registry = BackendRegistry::new().with_backend(RefBackend::new());
        let err = registry.require("oracle").err().unwrap();

        assert!(matches!(err, Error::UnknownBackend { ref id, .. } if id == "oracle"));
        assert!(err.to_string().contains("ref"));
    }
}
