//! Benchmark driver.
//!
//! Expands the run matrix, executes every scenario for the configured warmup
//! and measured repetitions, and aggregates the results into a [`Report`].

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::backends::{Backend, BackendRegistry};
use crate::config::BenchConfig;
use crate::error::{Result, ScenarioError};
use crate::harness::Engine;
use crate::matrix;
use crate::report::{Report, ReportBuilder};
use crate::scenario::Scenario;

/// Runs the full scenario matrix sequentially.
pub struct BenchmarkDriver {
    config: BenchConfig,
    registry: BackendRegistry,
    engine: Engine,
}

impl BenchmarkDriver {
    pub fn new(config: BenchConfig, registry: BackendRegistry) -> Self {
        let engine = Engine::new().with_verification(config.verify);
        Self {
            config,
            registry,
            engine,
        }
    }

    /// Scenarios this driver will run, in execution order.
    ///
    /// Fails if the configuration is invalid or names an unregistered backend.
    pub fn scenarios(&self) -> Result<Vec<Scenario>> {
        self.config.validate()?;

        let ids = if self.config.backend_ids.is_empty() {
            self.registry.ids()
        } else {
            self.config.backend_ids.clone()
        };
        for id in &ids {
            self.registry.require(id)?;
        }

        Ok(matrix::generate(&ids, self.config.row_count))
    }

    /// Run every scenario and build the report.
    ///
    /// Scenario failures are recorded in the report rather than returned. A
    /// backend that fails to open is not attempted again for the rest of the run.
    pub fn run(&self) -> Result<Report> {
        let scenarios = self.scenarios()?;
        info!(
            scenarios = scenarios.len(),
            row_count = self.config.row_count,
            repetitions = self.config.repetitions,
            warmup = self.config.warmup,
            "starting benchmark run"
        );

        let mut builder = ReportBuilder::new();
        let mut unavailable = HashSet::new();

        for scenario in &scenarios {
            builder.track(scenario);
            let backend = self.registry.require(scenario.backend_id())?;
            self.run_scenario(backend, scenario, &mut builder, &mut unavailable);
        }

        let report = builder.build();
        info!(
            scenarios = report.scenarios().len(),
            failures = report.total_failures(),
            "benchmark run complete"
        );
        Ok(report)
    }

    fn run_scenario(
        &self,
        backend: &dyn Backend,
        scenario: &Scenario,
        builder: &mut ReportBuilder,
        unavailable: &mut HashSet<String>,
    ) {
        let label = scenario.label();

        if !unavailable.contains(backend.id()) {
            for round in 0..self.config.warmup {
                if let Err(err) = self.engine.run(backend, scenario) {
                    debug!(scenario = %label, round, error = %err, "warmup failed");
                }
            }
        }

        for repetition in 0..self.config.repetitions {
            if unavailable.contains(backend.id()) {
                let err = ScenarioError::BackendUnavailable(backend.id().to_string());
                builder.record_failure(scenario, &err);
                continue;
            }

            match self.engine.run(backend, scenario) {
                Ok(sample) => {
                    debug!(
                        scenario = %label,
                        repetition,
                        duration_us = sample.duration.as_micros() as u64,
                        "repetition complete"
                    );
                    builder.record_sample(scenario, sample);
                }
                Err(err) => {
                    if err.is_connection_failure() {
                        warn!(backend = backend.id(), error = %err, "backend unavailable, skipping its scenarios");
                        unavailable.insert(backend.id().to_string());
                    }
                    builder.record_failure(scenario, &err);
                }
            }
        }

        info!(scenario = %label, "scenario finished");
    }
}
