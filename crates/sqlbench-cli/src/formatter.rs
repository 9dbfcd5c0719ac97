//! Output formatters for benchmark reports.

use std::time::Duration;

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use sqlbench::{Report, ScenarioSummary};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format a benchmark report.
    fn format_report(&self, report: &Report) -> String;

    /// Format the list of registered backends.
    fn format_backends(&self, ids: &[String]) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

const COLUMNS: [&str; 11] = [
    "backend",
    "prepared",
    "transaction",
    "rows",
    "samples",
    "failures",
    "mean_ms",
    "median_ms",
    "min_ms",
    "rows_per_sec",
    "status",
];

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_report(&self, report: &Report) -> String {
        if report.scenarios().is_empty() {
            return "No scenarios".to_string();
        }

        let mut table = Table::new();
        table.set_header(COLUMNS.iter().map(Cell::new).collect::<Vec<_>>());

        for summary in report.scenarios() {
            table.add_row(summary_cells(summary).into_iter().map(Cell::new).collect::<Vec<_>>());
        }

        let mut output = format!("{}\n{} scenario(s)", table, report.scenarios().len());

        let errors: Vec<String> = report
            .scenarios()
            .iter()
            .filter_map(|s| s.last_error.as_ref().map(|e| format!("  {}: {}", s.key, e)))
            .collect();
        if !errors.is_empty() {
            output.push_str(&format!(
                ", {} failed repetition(s)\n{}",
                report.total_failures(),
                errors.join("\n")
            ));
        }

        output
    }

    fn format_backends(&self, ids: &[String]) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Backend"]);

        for id in ids {
            table.add_row(vec![id]);
        }

        table.to_string()
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_report(&self, report: &Report) -> String {
        serde_json::to_string_pretty(report).unwrap_or_else(|e| {
            serde_json::json!({
                "error": e.to_string()
            })
            .to_string()
        })
    }

    fn format_backends(&self, ids: &[String]) -> String {
        serde_json::to_string_pretty(ids).unwrap_or_else(|_| "[]".to_string())
    }
}

/// CSV formatter.
pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format_report(&self, report: &Report) -> String {
        let mut output = COLUMNS.join(",");
        output.push_str(",last_error\n");

        for summary in report.scenarios() {
            let mut cells = summary_cells(summary);
            cells.push(match &summary.last_error {
                Some(error) => format!("\"{}\"", escape_csv(error)),
                None => String::new(),
            });
            output.push_str(&cells.join(","));
            output.push('\n');
        }

        output
    }

    fn format_backends(&self, ids: &[String]) -> String {
        let mut output = String::from("backend\n");
        for id in ids {
            output.push_str(&format!("{}\n", id));
        }
        output
    }
}

/// Cells in [`COLUMNS`] order.
fn summary_cells(summary: &ScenarioSummary) -> Vec<String> {
    vec![
        summary.key.backend_id.clone(),
        summary.key.prepared.to_string(),
        summary.key.transactional.to_string(),
        summary.row_count.to_string(),
        summary.samples.to_string(),
        summary.failures.to_string(),
        format_millis(summary.mean),
        format_millis(summary.median),
        format_millis(summary.min),
        summary
            .throughput
            .map(|t| format!("{:.0}", t))
            .unwrap_or_default(),
        summary.status.to_string(),
    ]
}

fn format_millis(duration: Option<Duration>) -> String {
    duration
        .map(|d| format!("{:.3}", d.as_secs_f64() * 1000.0))
        .unwrap_or_default()
}

/// Escape a string for CSV.
fn escape_csv(s: &str) -> String {
    s.replace('"', "\"\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlbench::backends::{Fault, RefBackend};
    use sqlbench::{BackendRegistry, BenchConfig, BenchmarkDriver};

    fn report(backend: RefBackend) -> Report {
        let config = BenchConfig::new().with_row_count(2);
        BenchmarkDriver::new(config, BackendRegistry::new().with_backend(backend))
            .run()
            .unwrap()
    }

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(Some(Duration::from_micros(1500))), "1.500");
        assert_eq!(format_millis(None), "");
    }

    #[test]
    fn test_escape_csv() {
        assert_eq!(escape_csv("hello"), "hello");
        assert_eq!(escape_csv("say \"hi\""), "say \"\"hi\"\"");
    }

    #[test]
    fn test_csv_report() {
        let output = CsvFormatter.format_report(&report(RefBackend::new()));
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("backend,prepared,transaction,rows"));
        assert!(lines[1].starts_with("ref,true,true,2,1,0,"));
        assert!(lines[4].starts_with("ref,false,false,2,1,0,"));
        assert!(lines[1].ends_with(",ok,"));
    }

    #[test]
    fn test_csv_report_quotes_errors() {
        let output = CsvFormatter.format_report(&report(RefBackend::with_fault(Fault::Insert(1))));
        let row = output.lines().nth(1).unwrap();

        assert!(row.contains(",failed,\""));
        assert!(row.contains("row 1"));
    }

    #[test]
    fn test_json_report() {
        let output = JsonFormatter.format_report(&report(RefBackend::new()));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        let scenarios = value["scenarios"].as_array().unwrap();
        assert_eq!(scenarios.len(), 4);
        assert_eq!(scenarios[0]["backend_id"], "ref");
        assert_eq!(scenarios[0]["status"], "ok");
    }

    #[test]
    fn test_table_report_lists_failures() {
        let output =
            TableFormatter.format_report(&report(RefBackend::with_fault(Fault::Insert(0))));

        assert!(output.contains("4 scenario(s), 4 failed repetition(s)"));
        assert!(output.contains("ref/Prepared/InTransaction: "));
    }

    #[test]
    fn test_backend_listing() {
        let ids = vec!["ref".to_string(), "rusqlite".to_string()];

        assert_eq!(CsvFormatter.format_backends(&ids), "backend\nref\nrusqlite\n");
        assert!(TableFormatter.format_backends(&ids).contains("rusqlite"));
        assert_eq!(
            JsonFormatter.format_backends(&ids),
            "[\n  \"ref\",\n  \"rusqlite\"\n]"
        );
    }
}
