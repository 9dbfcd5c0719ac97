//! Benchmark scenario model.

use std::fmt;

use serde::Serialize;

/// Reporting key of a scenario: which backend, which strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScenarioKey {
    pub backend_id: String,
    pub prepared: bool,
    pub transactional: bool,
}

impl fmt::Display for ScenarioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.backend_id,
            if self.prepared { "Prepared" } else { "NotPrepared" },
            if self.transactional {
                "InTransaction"
            } else {
                "NoTransaction"
            }
        )
    }
}

/// One point of the benchmark matrix.
///
/// Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Scenario {
    backend_id: String,
    prepared: bool,
    transactional: bool,
    row_count: u64,
}

impl Scenario {
    pub fn new(
        backend_id: impl Into<String>,
        prepared: bool,
        transactional: bool,
        row_count: u64,
    ) -> Self {
        Self {
            backend_id: backend_id.into(),
            prepared,
            transactional,
            row_count,
        }
    }

    pub fn backend_id(&self) -> &str {
        &self.backend_id
    }

    /// Whether inserts reuse one compiled statement.
    pub fn prepared(&self) -> bool {
        self.prepared
    }

    /// Whether all inserts run inside one explicit transaction.
    pub fn transactional(&self) -> bool {
        self.transactional
    }

    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    pub fn key(&self) -> ScenarioKey {
        ScenarioKey {
            backend_id: self.backend_id.clone(),
            prepared: self.prepared,
            transactional: self.transactional,
        }
    }

    /// Label such as `rusqlite/Prepared/InTransaction`.
    pub fn label(&self) -> String {
        self.key().to_string()
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x{}", self.key(), self.row_count)
    }
}
