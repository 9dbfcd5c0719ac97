//! Scenario execution engine.
//!
//! Runs one scenario repetition against a backend and times the insert loop.
//! Each repetition walks the lifecycle
//! `Created -> SchemaReset -> Prepared|Unprepared -> Running -> Committed|AutoCommitted -> Closed`;
//! a failure jumps straight to `Closed` and there is no retry.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};

use crate::backends::{Backend, Connection, PreparedHandle};
use crate::error::ScenarioError;
use crate::scenario::{Scenario, ScenarioKey};
use crate::sql;

/// Lifecycle phase of one scenario repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    SchemaReset,
    Prepared,
    Unprepared,
    Running,
    Committed,
    AutoCommitted,
    Closed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Timing of one successful repetition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingSample {
    pub scenario_key: ScenarioKey,
    pub duration: Duration,
    pub row_count: u64,
}

impl TimingSample {
    /// Rows per second, or `None` when the duration is too small to measure.
    pub fn throughput(&self) -> Option<f64> {
        rows_per_second(self.row_count, self.duration)
    }
}

/// `None` when `duration` is zero.
pub(crate) fn rows_per_second(rows: u64, duration: Duration) -> Option<f64> {
    let secs = duration.as_secs_f64();
    (secs > 0.0).then(|| rows as f64 / secs)
}

/// Executes scenarios; stateless apart from its options.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine {
    verify: bool,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the table contents after each run, outside the timed region.
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Run one repetition of `scenario` on a fresh connection from `backend`.
    ///
    /// The connection is closed on every exit path. Statement preparation and
    /// `BEGIN` happen before the clock starts; `COMMIT` is inside the timed region.
    pub fn run(
        &self,
        backend: &dyn Backend,
        scenario: &Scenario,
    ) -> Result<TimingSample, ScenarioError> {
        // Every connection releases its resources on drop, so an early return
        // or panic below still frees it; the explicit close reports failures.
        let mut conn = backend.open().map_err(ScenarioError::Connection)?;

        let mut run = Run {
            conn: conn.as_mut(),
            scenario,
            phase: Phase::Created,
        };
        let outcome = run.execute(self.verify);
        let reached = run.phase;

        let closed = conn.close();
        debug!(scenario = %scenario.label(), from = %reached, to = %Phase::Closed, "phase");

        match (outcome, closed) {
            (Ok(sample), Ok(())) => Ok(sample),
            (Ok(_), Err(err)) => Err(ScenarioError::Close(err)),
            (Err(err), closed) => {
                if let Err(close_err) = closed {
                    warn!(
                        scenario = %scenario.label(),
                        error = %close_err,
                        "close failed after scenario error"
                    );
                }
                warn!(scenario = %scenario.label(), phase = %reached, error = %err, "scenario failed");
                Err(err)
            }
        }
    }
}

/// State of a single repetition.
struct Run<'a> {
    conn: &'a mut dyn Connection,
    scenario: &'a Scenario,
    phase: Phase,
}

impl Run<'_> {
    fn advance(&mut self, next: Phase) {
        debug!(scenario = %self.scenario.label(), from = %self.phase, to = %next, "phase");
        self.phase = next;
    }

    fn execute(&mut self, verify: bool) -> Result<TimingSample, ScenarioError> {
        let scenario = self.scenario;

        self.conn.reset_schema().map_err(ScenarioError::Schema)?;
        self.advance(Phase::SchemaReset);

        let handle = if scenario.prepared() {
            let handle = self
                .conn
                .prepare(sql::INSERT_PREPARED)
                .map_err(ScenarioError::Prepare)?;
            self.advance(Phase::Prepared);
            Some(handle)
        } else {
            self.advance(Phase::Unprepared);
            None
        };

        if scenario.transactional() {
            self.conn.begin_transaction().map_err(ScenarioError::Begin)?;
        }
        self.advance(Phase::Running);

        let start = Instant::now();
        self.insert_rows(handle.as_ref())?;
        if scenario.transactional() {
            self.conn.commit_transaction().map_err(ScenarioError::Commit)?;
        }
        let duration = start.elapsed();

        self.advance(if scenario.transactional() {
            Phase::Committed
        } else {
            Phase::AutoCommitted
        });

        if verify {
            verify_rows(self.conn, scenario.row_count())?;
        }

        Ok(TimingSample {
            scenario_key: scenario.key(),
            duration,
            row_count: scenario.row_count(),
        })
    }

    fn insert_rows(&mut self, handle: Option<&PreparedHandle>) -> Result<(), ScenarioError> {
        for row in 0..self.scenario.row_count() {
            let result = match handle {
                Some(handle) => self.conn.bind_and_execute(handle, row as i64, row as f64),
                None => self.conn.execute_raw(&sql::insert_literal(row)),
            };
            result.map_err(|source| ScenarioError::Insert { row, source })?;
        }
        Ok(())
    }
}

/// The table must hold keys `0..row_count` with `value == key`.
fn verify_rows(conn: &mut dyn Connection, row_count: u64) -> Result<(), ScenarioError> {
    let rows = conn
        .snapshot_rows()
        .map_err(|err| ScenarioError::Verification(format!("could not read rows: {err}")))?;

    if rows.len() as u64 != row_count {
        return Err(ScenarioError::Verification(format!(
            "expected {row_count} rows, found {}",
            rows.len()
        )));
    }
    for (expected, (key, value)) in rows.into_iter().enumerate() {
        if key != expected as i64 || value != key as f64 {
            return Err(ScenarioError::Verification(format!(
                "row {expected} is ({key}, {value})"
            )));
        }
    }
    Ok(())
}
