//! Contract runner
//!
//! Executes loaded contracts against the service with bounded concurrency and
//! turns each into a [`TestOutcome`]. Every contract is attempted: load
//! errors, connectivity failures and violations all become FAIL outcomes.

use contract_verify_core::{LoadedContract, ValidationContext, ValidationEngine, ValidationOptions};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::Instrument;

use crate::client::{ExecutorError, HttpExecutor};
use crate::config::RunnerConfig;

/// Verdict for one contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestResult {
    Pass,
    Fail,
}

impl std::fmt::Display for TestResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestResult::Pass => write!(f, "PASS"),
            TestResult::Fail => write!(f, "FAIL"),
        }
    }
}

/// Result of running one contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    /// Contract name
    pub test_name: String,
    /// Overall verdict
    pub result: TestResult,
    /// Violation texts, or the error that prevented validation
    pub report: Vec<String>,
    /// Wall time spent on the contract
    pub duration_ms: u64,
}

impl TestOutcome {
    pub fn pass(test_name: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            test_name: test_name.into(),
            result: TestResult::Pass,
            report: Vec::new(),
            duration_ms,
        }
    }

    pub fn fail(test_name: impl Into<String>, report: Vec<String>, duration_ms: u64) -> Self {
        Self {
            test_name: test_name.into(),
            result: TestResult::Fail,
            report,
            duration_ms,
        }
    }

    pub fn is_pass(&self) -> bool {
        self.result == TestResult::Pass
    }
}

/// Aggregate of a whole run, outcomes in contract order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub outcomes: Vec<TestOutcome>,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: Vec<TestOutcome>, duration_ms: u64) -> Self {
        let passed = outcomes.iter().filter(|o| o.is_pass()).count();
        let failed = outcomes.len() - passed;
        Self {
            outcomes,
            passed,
            failed,
            duration_ms,
        }
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// True when no contract failed
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Runs contracts through the executor and the validation engine
pub struct Runner {
    config: RunnerConfig,
    executor: HttpExecutor,
    engine: ValidationEngine,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Result<Self, ExecutorError> {
        let executor = HttpExecutor::new(&config)?;
        Ok(Self {
            config,
            executor,
            engine: ValidationEngine::new(),
        })
    }

    /// Run every contract; outcomes keep the input order
    pub async fn run(&self, contracts: Vec<LoadedContract>) -> RunSummary {
        let start = Instant::now();
        tracing::info!(
            contracts = contracts.len(),
            base_url = %self.config.base_url,
            concurrency = self.config.concurrency,
            "starting contract run"
        );

        let outcomes: Vec<TestOutcome> = stream::iter(contracts)
            .map(|loaded| {
                let span = tracing::info_span!("contract", name = %loaded.name);
                self.run_one(loaded, span.clone()).instrument(span)
            })
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let summary = RunSummary::from_outcomes(outcomes, elapsed_ms(start));
        tracing::info!(
            passed = summary.passed,
            failed = summary.failed,
            duration_ms = summary.duration_ms,
            "contract run finished"
        );
        summary
    }

    async fn run_one(&self, loaded: LoadedContract, span: tracing::Span) -> TestOutcome {
        let start = Instant::now();
        let name = loaded.name;

        let contract = match loaded.contract {
            Ok(contract) => contract,
            Err(err) => {
                tracing::warn!(error = %err, "contract could not be loaded");
                return TestOutcome::fail(name, vec![err.to_string()], elapsed_ms(start));
            }
        };

        let actual = match self.executor.execute(&contract.request).await {
            Ok(actual) => actual,
            Err(err) => {
                tracing::warn!(error = %err, "request failed");
                return TestOutcome::fail(name, vec![err.to_string()], elapsed_ms(start));
            }
        };

        let options =
            ValidationOptions::new().with_ignore_header_case(self.config.ignore_header_case);
        let ctx = ValidationContext::new(name.as_str())
            .with_options(options)
            .with_span(span);
        let report = self.engine.validate_with(&ctx, &contract.response, &actual);

        if report.has_violations() {
            tracing::info!(violations = report.count(), "contract failed");
            TestOutcome::fail(name, report.texts(), elapsed_ms(start))
        } else {
            tracing::debug!("contract passed");
            TestOutcome::pass(name, elapsed_ms(start))
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use contract_verify_core::ContractError;

    #[test]
    fn test_summary_counts() {
        let summary = RunSummary::from_outcomes(
            vec![
                TestOutcome::pass("a", 1),
                TestOutcome::fail("b", vec!["boom".into()], 2),
                TestOutcome::pass("c", 3),
            ],
            6,
        );
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 3);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_empty_run_is_success() {
        assert!(RunSummary::default().is_success());
    }

    #[test]
    fn test_result_serializes_uppercase() {
        let json = serde_json::to_string(&TestOutcome::pass("a", 0)).unwrap();
        assert!(json.contains("\"result\":\"PASS\""));
    }

    #[tokio::test]
    async fn test_load_errors_become_failures() {
        let runner = Runner::new(RunnerConfig::default()).unwrap();
        let loaded = LoadedContract {
            name: "broken".into(),
            source: "broken.yaml".into(),
            contract: Err(ContractError::missing("broken", "contract.response")),
        };

        let summary = runner.run(vec![loaded]).await;
        assert_eq!(summary.failed, 1);
        assert_eq!(
            summary.outcomes[0].report,
            vec!["Contract 'broken' is missing required field 'contract.response'".to_string()]
        );
    }
}
