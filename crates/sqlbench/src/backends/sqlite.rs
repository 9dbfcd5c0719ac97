//! rusqlite backend.
//!
//! Handle-based client: a `Connection` plus its prepared statement cache.
//! Compiled statements live in the connection's cache, so a handle only records
//! the SQL text used as the cache key.

use rusqlite::{named_params, Connection as RawConnection};

use crate::error::{BackendError, BackendResult};
use crate::sql;

use super::{Backend, Connection, ConnectionId, PreparedHandle};

/// Statement cache capacity; the harness compiles a single statement per connection.
const STATEMENT_CACHE_CAPACITY: usize = 8;

/// In-memory SQLite through rusqlite.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteBackend;

impl SqliteBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for SqliteBackend {
    fn id(&self) -> &str {
        "rusqlite"
    }

    fn open(&self) -> BackendResult<Box<dyn Connection>> {
        Ok(Box::new(self.open_connection()?))
    }
}

impl SqliteBackend {
    pub(crate) fn open_connection(&self) -> BackendResult<SqliteConnection> {
        let conn = RawConnection::open_in_memory()?;
        conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);

        Ok(SqliteConnection {
            id: ConnectionId::next(),
            conn,
            statements: Vec::new(),
        })
    }
}

/// Open rusqlite connection.
pub struct SqliteConnection {
    id: ConnectionId,
    conn: RawConnection,
    /// SQL text of each prepared statement, indexed by handle slot.
    statements: Vec<String>,
}

impl SqliteConnection {
    /// Abandon the open transaction, if any.
    pub(crate) fn rollback(&mut self) -> BackendResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }
}

impl Connection for SqliteConnection {
    fn reset_schema(&mut self) -> BackendResult<()> {
        self.conn.execute(sql::DROP_TABLE, [])?;
        self.conn.execute(sql::CREATE_TABLE, [])?;
        Ok(())
    }

    fn prepare(&mut self, sql: &str) -> BackendResult<PreparedHandle> {
        // Compiles now and parks the statement in the cache for later lookups.
        self.conn.prepare_cached(sql)?;
        self.statements.push(sql.to_string());
        Ok(PreparedHandle::new(self.id, self.statements.len() - 1))
    }

    fn bind_and_execute(
        &mut self,
        handle: &PreparedHandle,
        key: i64,
        value: f64,
    ) -> BackendResult<()> {
        let slot = handle.slot_for(self.id)?;
        let mut stmt = self.conn.prepare_cached(&self.statements[slot])?;
        let affected = stmt.execute(named_params! { "@Key": key, "@Value": value })?;
        expect_one_row(affected)
    }

    fn execute_raw(&mut self, sql: &str) -> BackendResult<()> {
        let affected = self.conn.execute(sql, [])?;
        expect_one_row(affected)
    }

    fn begin_transaction(&mut self) -> BackendResult<()> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit_transaction(&mut self) -> BackendResult<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn snapshot_rows(&mut self) -> BackendResult<Vec<(i64, f64)>> {
        let mut stmt = self.conn.prepare(sql::SELECT_ROWS)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn close(self: Box<Self>) -> BackendResult<()> {
        let SqliteConnection { conn, .. } = *self;
        conn.flush_prepared_statement_cache();
        conn.close().map_err(|(_, err)| BackendError::Sqlite(err))
    }
}

fn expect_one_row(affected: usize) -> BackendResult<()> {
    if affected == 1 {
        Ok(())
    } else {
        Err(BackendError::RowsAffected(affected as u64))
    }
}
