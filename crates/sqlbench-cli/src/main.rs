//! SQL insert benchmark runner.
//!
//! Runs the prepared/transaction scenario matrix against the selected
//! backends and prints the report.

mod formatter;

use clap::Parser;
use formatter::OutputFormat;
use sqlbench::config::{DEFAULT_REPETITIONS, DEFAULT_ROW_COUNT};
use sqlbench::{BackendRegistry, BenchConfig, BenchmarkDriver};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// SQL insert throughput benchmark
#[derive(Parser, Debug)]
#[command(name = "sqlbench")]
#[command(version, about = "Measure SQL insert throughput across client backends")]
pub struct Args {
    /// Rows inserted per scenario repetition
    #[arg(short = 'n', long = "rows", default_value_t = DEFAULT_ROW_COUNT)]
    pub row_count: u64,

    /// Measured repetitions per scenario
    #[arg(short = 'r', long, default_value_t = DEFAULT_REPETITIONS)]
    pub repetitions: u32,

    /// Untimed warmup repetitions per scenario
    #[arg(short = 'w', long, default_value_t = 0)]
    pub warmup: u32,

    /// Backend to benchmark (repeatable; defaults to all)
    #[arg(short = 'b', long = "backend")]
    pub backends: Vec<String>,

    /// Verify table contents after every repetition
    #[arg(long)]
    pub verify: bool,

    /// Output format
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// List registered backends and exit
    #[arg(long)]
    pub list_backends: bool,

    /// Exit with a non-zero status if any repetition failed
    #[arg(long)]
    pub fail_on_error: bool,
}

impl Args {
    pub fn into_config(self) -> BenchConfig {
        BenchConfig::new()
            .with_row_count(self.row_count)
            .with_repetitions(self.repetitions)
            .with_warmup(self.warmup)
            .with_backends(self.backends)
            .with_verification(self.verify)
    }
}

fn main() {
    // Logs go to stderr so report output stays machine-readable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sqlbench=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when failures should be reflected in the exit status.
fn run(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    let registry = BackendRegistry::with_defaults();
    let formatter = formatter::create_formatter(args.format);

    if args.list_backends {
        println!("{}", formatter.format_backends(&registry.ids()));
        return Ok(true);
    }

    let fail_on_error = args.fail_on_error;
    let config = args.into_config();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        row_count = config.row_count,
        repetitions = config.repetitions,
        warmup = config.warmup,
        backends = ?config.backend_ids,
        "configuration loaded"
    );

    let driver = BenchmarkDriver::new(config, registry);
    let report = driver.run()?;

    println!("{}", formatter.format_report(&report));

    if report.has_failures() {
        tracing::warn!(failures = report.total_failures(), "some repetitions failed");
        return Ok(!fail_on_error);
    }
    Ok(true)
}
