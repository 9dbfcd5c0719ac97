//! Aggregated benchmark results.
//!
//! A [`Report`] holds one [`ScenarioSummary`] per scenario, in matrix order.
//! Durations serialize as fractional milliseconds.

use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::error::ScenarioError;
use crate::harness::{rows_per_second, TimingSample};
use crate::scenario::{Scenario, ScenarioKey};

/// Outcome of all repetitions of one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Every repetition succeeded.
    Ok,
    /// Some repetitions failed.
    Partial,
    /// No repetition succeeded.
    Failed,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Ok => write!(f, "ok"),
            Status::Partial => write!(f, "partial"),
            Status::Failed => write!(f, "failed"),
        }
    }
}

/// Timing statistics and failure count for one scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioSummary {
    #[serde(flatten)]
    pub key: ScenarioKey,
    pub row_count: u64,
    pub samples: usize,
    pub failures: usize,
    #[serde(rename = "mean_ms", serialize_with = "as_millis")]
    pub mean: Option<Duration>,
    #[serde(rename = "median_ms", serialize_with = "as_millis")]
    pub median: Option<Duration>,
    #[serde(rename = "min_ms", serialize_with = "as_millis")]
    pub min: Option<Duration>,
    #[serde(rename = "max_ms", serialize_with = "as_millis")]
    pub max: Option<Duration>,
    /// Rows per second derived from the mean duration.
    pub throughput: Option<f64>,
    pub status: Status,
    /// Message of the most recent failure.
    pub last_error: Option<String>,
}

impl ScenarioSummary {
    fn from_entry(entry: Entry) -> Self {
        let mut durations: Vec<Duration> = entry.samples.iter().map(|s| s.duration).collect();
        durations.sort_unstable();

        let mean = mean(&durations);
        let throughput = mean.and_then(|mean| rows_per_second(entry.scenario.row_count(), mean));
        let status = match (durations.len(), entry.failures.len()) {
            (0, _) => Status::Failed,
            (_, 0) => Status::Ok,
            _ => Status::Partial,
        };

        Self {
            key: entry.scenario.key(),
            row_count: entry.scenario.row_count(),
            samples: durations.len(),
            failures: entry.failures.len(),
            mean,
            median: median(&durations),
            min: durations.first().copied(),
            max: durations.last().copied(),
            throughput,
            status,
            last_error: entry.failures.last().cloned(),
        }
    }
}

/// Final, read-only benchmark report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    scenarios: Vec<ScenarioSummary>,
}

impl Report {
    /// Summaries in matrix order.
    pub fn scenarios(&self) -> &[ScenarioSummary] {
        &self.scenarios
    }

    /// Summary for a scenario key.
    pub fn get(&self, key: &ScenarioKey) -> Option<&ScenarioSummary> {
        self.scenarios.iter().find(|s| &s.key == key)
    }

    /// Total failed repetitions across all scenarios.
    pub fn total_failures(&self) -> usize {
        self.scenarios.iter().map(|s| s.failures).sum()
    }

    pub fn has_failures(&self) -> bool {
        self.total_failures() > 0
    }
}

#[derive(Debug)]
struct Entry {
    scenario: Scenario,
    samples: Vec<TimingSample>,
    failures: Vec<String>,
}

/// Collects samples and failures while a run is in progress.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    entries: Vec<Entry>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `scenario` appears in the report even if nothing is recorded.
    pub fn track(&mut self, scenario: &Scenario) {
        self.entry(scenario);
    }

    pub fn record_sample(&mut self, scenario: &Scenario, sample: TimingSample) {
        self.entry(scenario).samples.push(sample);
    }

    pub fn record_failure(&mut self, scenario: &Scenario, error: &ScenarioError) {
        self.entry(scenario).failures.push(error.to_string());
    }

    pub fn build(self) -> Report {
        Report {
            scenarios: self
                .entries
                .into_iter()
                .map(ScenarioSummary::from_entry)
                .collect(),
        }
    }

    fn entry(&mut self, scenario: &Scenario) -> &mut Entry {
        let idx = match self.entries.iter().position(|e| &e.scenario == scenario) {
            Some(idx) => idx,
            None => {
                self.entries.push(Entry {
                    scenario: scenario.clone(),
                    samples: Vec::new(),
                    failures: Vec::new(),
                });
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx]
    }
}

fn mean(sorted: &[Duration]) -> Option<Duration> {
    if sorted.is_empty() {
        return None;
    }
    let total: Duration = sorted.iter().sum();
    Some(total / sorted.len() as u32)
}

fn median(sorted: &[Duration]) -> Option<Duration> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2),
    }
}

fn as_millis<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(d) => serializer.serialize_some(&(d.as_secs_f64() * 1000.0)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;

    fn sample(scenario: &Scenario, millis: u64) -> TimingSample {
        TimingSample {
            scenario_key: scenario.key(),
            duration: Duration::from_millis(millis),
            row_count: scenario.row_count(),
        }
    }

    fn insert_error(row: u64) -> ScenarioError {
        ScenarioError::Insert {
            row,
            source: BackendError::Injected("insert"),
        }
    }

    #[test]
    fn test_statistics() {
        let scenario = Scenario::new("ref", true, true, 1000);
        let mut builder = ReportBuilder::new();
        for millis in [40, 10, 20, 30] {
            builder.record_sample(&scenario, sample(&scenario, millis));
        }
        let report = builder.build();
        let summary = report.get(&scenario.key()).unwrap();

        assert_eq!(summary.samples, 4);
        assert_eq!(summary.mean, Some(Duration::from_millis(25)));
        assert_eq!(summary.median, Some(Duration::from_millis(25)));
        assert_eq!(summary.min, Some(Duration::from_millis(10)));
        assert_eq!(summary.max, Some(Duration::from_millis(40)));
        assert!((summary.throughput.unwrap() - 40_000.0).abs() < 1e-6);
        assert_eq!(summary.status, Status::Ok);
        assert!(!report.has_failures());
    }

    #[test]
    fn test_odd_median() {
        let sorted = [1, 5, 9].map(Duration::from_millis);
        assert_eq!(median(&sorted), Some(Duration::from_millis(5)));
        assert_eq!(median(&[]), None);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_partial_and_failed_status() {
        let partial = Scenario::new("ref", true, false, 10);
        let failed = Scenario::new("ref", false, false, 10);
        let mut builder = ReportBuilder::new();

        builder.record_sample(&partial, sample(&partial, 5));
        builder.record_failure(&partial, &insert_error(2));
        builder.record_failure(&failed, &insert_error(7));
        builder.record_failure(&failed, &insert_error(8));
        let report = builder.build();

        let summary = report.get(&partial.key()).unwrap();
        assert_eq!(summary.status, Status::Partial);
        assert_eq!(summary.samples, 1);
        assert_eq!(summary.failures, 1);

        let summary = report.get(&failed.key()).unwrap();
        assert_eq!(summary.status, Status::Failed);
        assert_eq!(summary.mean, None);
        assert_eq!(summary.throughput, None);
        assert!(summary.last_error.as_deref().unwrap().contains("row 8"));

        assert_eq!(report.total_failures(), 3);
    }

    #[test]
    fn test_order_follows_first_record() {
        let a = Scenario::new("b", true, true, 1);
        let b = Scenario::new("a", true, true, 1);
        let mut builder = ReportBuilder::new();
        builder.track(&a);
        builder.record_sample(&b, sample(&b, 1));
        builder.record_sample(&a, sample(&a, 1));

        let report = builder.build();
        let ids: Vec<_> = report
            .scenarios()
            .iter()
            .map(|s| s.key.backend_id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_serializes_millis() {
        let scenario = Scenario::new("ref", true, true, 10);
        let mut builder = ReportBuilder::new();
        builder.record_sample(&scenario, sample(&scenario, 500));
        let json = serde_json::to_value(builder.build()).unwrap();

        let row = &json["scenarios"][0];
        assert_eq!(row["backend_id"], "ref");
        assert_eq!(row["prepared"], true);
        assert_eq!(row["mean_ms"], 500.0);
        assert_eq!(row["status"], "ok");
    }
}
