//! SQL insert throughput benchmark harness.
//!
//! Measures how fast interchangeable SQL client backends insert rows under
//! every combination of two strategies:
//!
//! - **Prepared vs. not prepared**: one compiled statement rebound per row, or a
//!   freshly interpolated statement parsed for every row.
//! - **Transaction vs. autocommit**: all rows inside one explicit transaction,
//!   or each row committed on its own.
//!
//! # Components
//!
//! - [`backends`]: the [`Backend`]/[`Connection`] adapter surface and the
//!   rusqlite, sqlx and in-process reference adapters
//! - [`matrix`]: expands backends into the ordered scenario matrix
//! - [`harness`]: runs and times a single scenario repetition
//! - [`driver`]: runs the whole matrix with warmup and repetitions
//! - [`report`]: per-scenario statistics and status

pub mod backends;
pub mod config;
pub mod driver;
pub mod error;
pub mod harness;
pub mod matrix;
pub mod report;
pub mod scenario;
pub mod sql;

pub use backends::{Backend, BackendRegistry, Connection, PreparedHandle};
pub use config::BenchConfig;
pub use driver::BenchmarkDriver;
pub use error::{BackendError, Error, ScenarioError};
pub use harness::{Engine, Phase, TimingSample};
pub use report::{Report, ScenarioSummary, Status};
pub use scenario::{Scenario, ScenarioKey};
