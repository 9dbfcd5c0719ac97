//! Recording reference backend.
//!
//! Forwards every call to a real in-memory rusqlite connection while counting
//! it in a shared [`RefProbe`]. The committed rows are recorded when a
//! connection is released, and an optional [`Fault`] makes failure paths
//! reproducible.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{BackendError, BackendResult};

use super::sqlite::{SqliteBackend, SqliteConnection};
use super::{Backend, Connection, PreparedHandle};

/// A failure injected by a [`RefBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// `open` fails.
    Open,
    /// `reset_schema` fails.
    Schema,
    /// `prepare` fails.
    Prepare,
    /// `begin_transaction` fails.
    Begin,
    /// The insert attempt with this zero-based index fails.
    Insert(u64),
    /// `commit_transaction` fails and the transaction is rolled back.
    Commit,
}

/// Per-operation call counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RefCounts {
    pub opens: u64,
    pub schema_resets: u64,
    pub prepares: u64,
    pub bound_executes: u64,
    pub raw_executes: u64,
    pub begins: u64,
    pub commits: u64,
    pub closes: u64,
    /// Connections released, by `close` or by drop.
    pub releases: u64,
}

#[derive(Debug, Default)]
struct ProbeState {
    counts: RefCounts,
    last_rows: Vec<(i64, f64)>,
}

/// Observation point shared between a [`RefBackend`] and its connections.
#[derive(Debug, Default)]
pub struct RefProbe {
    state: Mutex<ProbeState>,
}

impl RefProbe {
    /// Snapshot of the call counters.
    pub fn counts(&self) -> RefCounts {
        self.state.lock().counts.clone()
    }

    /// Committed rows of the most recently released connection.
    pub fn last_rows(&self) -> Vec<(i64, f64)> {
        self.state.lock().last_rows.clone()
    }

    /// Zero the counters and forget recorded rows.
    pub fn reset(&self) {
        *self.state.lock() = ProbeState::default();
    }

    fn record(&self, bump: impl FnOnce(&mut RefCounts)) {
        bump(&mut self.state.lock().counts);
    }

    /// Count an open and return its zero-based index.
    fn record_open(&self) -> u64 {
        let mut state = self.state.lock();
        state.counts.opens += 1;
        state.counts.opens - 1
    }

    fn record_release(&self, rows: Vec<(i64, f64)>) {
        let mut state = self.state.lock();
        state.counts.releases += 1;
        state.last_rows = rows;
    }
}

/// Reference backend, registered as `ref` by default.
#[derive(Debug, Clone)]
pub struct RefBackend {
    id: String,
    fault: Option<Fault>,
    /// Restricts `fault` to the connection from this zero-based open.
    fault_on_open: Option<u64>,
    probe: Arc<RefProbe>,
    inner: SqliteBackend,
}

impl RefBackend {
    pub fn new() -> Self {
        Self {
            id: "ref".to_string(),
            fault: None,
            fault_on_open: None,
            probe: Arc::new(RefProbe::default()),
            inner: SqliteBackend::new(),
        }
    }

    /// A backend whose connections all suffer `fault`.
    pub fn with_fault(fault: Fault) -> Self {
        Self {
            fault: Some(fault),
            ..Self::new()
        }
    }

    /// Only the connection from the `nth` open (zero-based) suffers the fault.
    pub fn only_on_open(mut self, nth: u64) -> Self {
        self.fault_on_open = Some(nth);
        self
    }

    /// Register under a different id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Probe observing every connection opened by this backend.
    pub fn probe(&self) -> Arc<RefProbe> {
        Arc::clone(&self.probe)
    }
}

impl Default for RefBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for RefBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn open(&self) -> BackendResult<Box<dyn Connection>> {
        let nth = self.probe.record_open();
        let fault = self
            .fault
            .filter(|_| self.fault_on_open.map_or(true, |n| n == nth));
        if fault == Some(Fault::Open) {
            return Err(BackendError::Injected("open"));
        }

        Ok(Box::new(RefConnection {
            inner: Some(self.inner.open_connection()?),
            probe: Arc::clone(&self.probe),
            fault,
            insert_attempts: 0,
        }))
    }
}

/// Open reference connection.
pub struct RefConnection {
    /// Taken on release.
    inner: Option<SqliteConnection>,
    probe: Arc<RefProbe>,
    fault: Option<Fault>,
    insert_attempts: u64,
}

impl RefConnection {
    fn inner(&mut self) -> BackendResult<&mut SqliteConnection> {
        self.inner.as_mut().ok_or(BackendError::Closed)
    }

    fn inject(&self, fault: Fault, what: &'static str) -> BackendResult<()> {
        if self.fault == Some(fault) {
            return Err(BackendError::Injected(what));
        }
        Ok(())
    }

    fn before_insert(&mut self) -> BackendResult<()> {
        let attempt = self.insert_attempts;
        self.insert_attempts += 1;
        self.inject(Fault::Insert(attempt), "insert")
    }

    /// Record the committed rows and hand back the connection, once.
    fn release(&mut self) -> Option<SqliteConnection> {
        let mut inner = self.inner.take()?;
        // A table that was never created reads as empty.
        let rows = inner
            .rollback()
            .and_then(|()| inner.snapshot_rows())
            .unwrap_or_default();
        self.probe.record_release(rows);
        Some(inner)
    }
}

impl Connection for RefConnection {
    fn reset_schema(&mut self) -> BackendResult<()> {
        self.probe.record(|c| c.schema_resets += 1);
        self.inject(Fault::Schema, "schema")?;
        self.inner()?.reset_schema()
    }

    fn prepare(&mut self, sql: &str) -> BackendResult<PreparedHandle> {
        self.probe.record(|c| c.prepares += 1);
        self.inject(Fault::Prepare, "prepare")?;
        self.inner()?.prepare(sql)
    }

    fn bind_and_execute(
        &mut self,
        handle: &PreparedHandle,
        key: i64,
        value: f64,
    ) -> BackendResult<()> {
        self.probe.record(|c| c.bound_executes += 1);
        self.before_insert()?;
        self.inner()?.bind_and_execute(handle, key, value)
    }

    fn execute_raw(&mut self, sql: &str) -> BackendResult<()> {
        self.probe.record(|c| c.raw_executes += 1);
        self.before_insert()?;
        self.inner()?.execute_raw(sql)
    }

    fn begin_transaction(&mut self) -> BackendResult<()> {
        self.probe.record(|c| c.begins += 1);
        self.inject(Fault::Begin, "begin")?;
        self.inner()?.begin_transaction()
    }

    fn commit_transaction(&mut self) -> BackendResult<()> {
        self.probe.record(|c| c.commits += 1);
        if self.fault == Some(Fault::Commit) {
            self.inner()?.rollback()?;
            return Err(BackendError::Injected("commit"));
        }
        self.inner()?.commit_transaction()
    }

    fn snapshot_rows(&mut self) -> BackendResult<Vec<(i64, f64)>> {
        self.inner()?.snapshot_rows()
    }

    fn close(mut self: Box<Self>) -> BackendResult<()> {
        self.probe.record(|c| c.closes += 1);
        match self.release() {
            Some(inner) => Box::new(inner).close(),
            None => Ok(()),
        }
    }
}

impl Drop for RefConnection {
    fn drop(&mut self) {
        self.release();
    }
}
