//! sqlx SQLite backend.
//!
//! Builder-based async client (`query().bind().execute()`). Each connection owns
//! a current-thread tokio runtime and blocks on it, keeping the harness
//! synchronous. sqlx binds by index, so `@Key`/`@Value` are rewritten to `?1`/`?2`.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteStatement};
use sqlx::{ConnectOptions, Connection as _, Executor, Statement};
use tokio::runtime::{Builder, Runtime};

use crate::error::{BackendError, BackendResult};
use crate::sql;

use super::{Backend, Connection, ConnectionId, PreparedHandle};

/// In-memory SQLite through sqlx.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlxBackend;

impl SqlxBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for SqlxBackend {
    fn id(&self) -> &str {
        "sqlx"
    }

    fn open(&self) -> BackendResult<Box<dyn Connection>> {
        let rt = Builder::new_current_thread().enable_all().build()?;

        let options =
            SqliteConnectOptions::from_str("sqlite::memory:")?.disable_statement_logging();
        let conn = rt.block_on(options.connect())?;

        Ok(Box::new(SqlxConnection {
            id: ConnectionId::next(),
            rt,
            conn,
            statements: Vec::new(),
        }))
    }
}

/// Open sqlx connection with its private runtime.
pub struct SqlxConnection {
    id: ConnectionId,
    rt: Runtime,
    conn: SqliteConnection,
    statements: Vec<SqliteStatement<'static>>,
}

impl SqlxConnection {
    fn raw(&mut self, sql: &str) -> BackendResult<u64> {
        let result = self.rt.block_on(sqlx::raw_sql(sql).execute(&mut self.conn))?;
        Ok(result.rows_affected())
    }
}

impl Connection for SqlxConnection {
    fn reset_schema(&mut self) -> BackendResult<()> {
        self.raw(sql::DROP_TABLE)?;
        self.raw(sql::CREATE_TABLE)?;
        Ok(())
    }

    fn prepare(&mut self, sql: &str) -> BackendResult<PreparedHandle> {
        let native = sql::positional_slots(sql);
        let stmt = self
            .rt
            .block_on(Executor::prepare(&mut self.conn, native.as_str()))?;
        self.statements.push(Statement::to_owned(&stmt));
        Ok(PreparedHandle::new(self.id, self.statements.len() - 1))
    }

    fn bind_and_execute(
        &mut self,
        handle: &PreparedHandle,
        key: i64,
        value: f64,
    ) -> BackendResult<()> {
        let slot = handle.slot_for(self.id)?;
        let query = self.statements[slot].query().bind(key).bind(value);
        let result = self.rt.block_on(query.execute(&mut self.conn))?;
        expect_one_row(result.rows_affected())
    }

    fn execute_raw(&mut self, sql: &str) -> BackendResult<()> {
        let affected = self.raw(sql)?;
        expect_one_row(affected)
    }

    fn begin_transaction(&mut self) -> BackendResult<()> {
        self.raw("BEGIN")?;
        Ok(())
    }

    fn commit_transaction(&mut self) -> BackendResult<()> {
        self.raw("COMMIT")?;
        Ok(())
    }

    fn snapshot_rows(&mut self) -> BackendResult<Vec<(i64, f64)>> {
        let query = sqlx::query_as::<_, (i64, f64)>(sql::SELECT_ROWS);
        let rows = self.rt.block_on(query.fetch_all(&mut self.conn))?;
        Ok(rows)
    }

    fn close(self: Box<Self>) -> BackendResult<()> {
        let SqlxConnection {
            rt,
            conn,
            statements,
            ..
        } = *self;
        drop(statements);
        rt.block_on(conn.close())?;
        Ok(())
    }
}

fn expect_one_row(affected: u64) -> BackendResult<()> {
    if affected == 1 {
        Ok(())
    } else {
        Err(BackendError::RowsAffected(affected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> Box<dyn Connection> {
        let mut conn = SqlxBackend::new().open().unwrap();
        conn.reset_schema().unwrap();
        conn
    }

    #[test]
    fn test_prepared_and_raw_inserts() {
        let mut conn = open();
        let handle = conn.prepare(sql::INSERT_PREPARED).unwrap();
        conn.bind_and_execute(&handle, 0, 0.0).unwrap();
        conn.bind_and_execute(&handle, 1, 1.0).unwrap();
        conn.execute_raw(&sql::insert_literal(2)).unwrap();

        assert_eq!(
            conn.snapshot_rows().unwrap(),
            vec![(0, 0.0), (1, 1.0), (2, 2.0)]
        );
        conn.close().unwrap();
    }

    #[test]
    fn test_reset_schema_clears_rows() {
        let mut conn = open();
        conn.execute_raw(&sql::insert_literal(3)).unwrap();
        conn.reset_schema().unwrap();

        assert!(conn.snapshot_rows().unwrap().is_empty());
    }

    #[test]
    fn test_transaction_round_trip() {
        let mut conn = open();
        let handle = conn.prepare(sql::INSERT_PREPARED).unwrap();
        conn.begin_transaction().unwrap();
        for i in 0..4 {
            conn.bind_and_execute(&handle, i, i as f64).unwrap();
        }
        conn.commit_transaction().unwrap();

        assert_eq!(conn.snapshot_rows().unwrap().len(), 4);
    }

    #[test]
    fn test_duplicate_key_is_rejected() {
        let mut conn = open();
        conn.execute_raw(&sql::insert_literal(5)).unwrap();
        assert!(conn.execute_raw(&sql::insert_literal(5)).is_err());
    }

    #[test]
    fn test_named_slots_are_rejected_without_rewrite() {
        let rt = Builder::new_current_thread().enable_all().build().unwrap();
        let result = rt.block_on(async {
            let mut conn = SqliteConnectOptions::from_str("sqlite::memory:")?
                .connect()
                .await?;
            sqlx::raw_sql(sql::CREATE_TABLE).execute(&mut conn).await?;
            sqlx::query(sql::INSERT_PREPARED)
                .bind(1_i64)
                .bind(1.0_f64)
                .execute(&mut conn)
                .await?;
            Ok::<_, sqlx::Error>(())
        });

        assert!(result.is_err());
    }
}
