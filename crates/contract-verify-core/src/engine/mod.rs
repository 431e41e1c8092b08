//! Validation pipeline
//!
//! Applies an ordered list of independent rules to one (expected response,
//! actual response) pair and merges everything they find into a single
//! [`ViolationReport`]. Every rule is attempted; a rule may decline to run
//! based on what earlier rules already recorded.
//!
//! Validation never fails. A rule that errors or panics contributes one
//! synthetic violation describing the failure.

mod rules;

pub use rules::*;

use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};

use crate::comparator::MAX_DEPTH;
use crate::error::RuleError;
use crate::model::{ActualResponse, ContractResponse};
use crate::violation::{Violation, ViolationReport};

/// Knobs that change how rules compare values
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Match expected header names against actual ones ignoring ASCII case
    pub ignore_header_case: bool,
    /// Maximum body nesting followed by the structural rule
    pub max_depth: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            ignore_header_case: false,
            max_depth: MAX_DEPTH,
        }
    }
}

impl ValidationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ignore_header_case(mut self, ignore: bool) -> Self {
        self.ignore_header_case = ignore;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Per-run configuration handed to the engine by the caller
///
/// The span is the logging capability for this run: the engine records its
/// events inside it and never reaches for ambient logger state. Without a
/// span the engine opens a `validate` span carrying the contract name.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    /// Name of the contract under validation
    pub contract: String,
    /// Comparison options
    pub options: ValidationOptions,
    /// Span the engine enters while validating
    pub span: tracing::Span,
}

impl Default for ValidationContext {
    fn default() -> Self {
        Self {
            contract: String::new(),
            options: ValidationOptions::default(),
            span: tracing::Span::none(),
        }
    }
}

impl ValidationContext {
    pub fn new(contract: impl Into<String>) -> Self {
        Self {
            contract: contract.into(),
            ..Default::default()
        }
    }

    pub fn with_options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }
}

/// What a rule can see about the run so far
pub struct RuleContext<'a> {
    pub options: &'a ValidationOptions,
    /// Violations recorded by earlier rules in this run
    pub prior: &'a ViolationReport,
}

/// One independent check over an expected/actual response pair
pub trait ResponseRule: Send + Sync {
    /// Rule identifier
    fn id(&self) -> &str;

    /// Rule name
    fn name(&self) -> &str;

    /// Whether the rule runs for this expectation given earlier findings
    fn applies_to(&self, expected: &ContractResponse, ctx: &RuleContext<'_>) -> bool;

    /// Evaluate the rule and return its violations
    fn evaluate(
        &self,
        expected: &ContractResponse,
        actual: &ActualResponse,
        ctx: &RuleContext<'_>,
    ) -> Result<Vec<Violation>, RuleError>;
}

/// Ordered rule pipeline
pub struct ValidationEngine {
    rules: Vec<Box<dyn ResponseRule>>,
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationEngine {
    /// Create an engine with the standard rules in their fixed order
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(StatusCodeRule),
                Box::new(BodyTypeRule),
                Box::new(BodyStructureRule),
                Box::new(HeaderRule),
            ],
        }
    }

    /// Create an engine with no rules
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule after the existing ones
    pub fn register(&mut self, rule: Box<dyn ResponseRule>) {
        self.rules.push(rule);
    }

    /// Identifiers of the registered rules, in evaluation order
    pub fn rule_ids(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    /// Validate with default options and no logging span
    pub fn validate(
        &self,
        expected: &ContractResponse,
        actual: &ActualResponse,
    ) -> ViolationReport {
        self.validate_with(&ValidationContext::default(), expected, actual)
    }

    /// Validate one response pair
    pub fn validate_with(
        &self,
        ctx: &ValidationContext,
        expected: &ContractResponse,
        actual: &ActualResponse,
    ) -> ViolationReport {
        let span = if ctx.span.is_disabled() {
            tracing::debug_span!("validate", contract = %ctx.contract)
        } else {
            ctx.span.clone()
        };
        let _entered = span.enter();
        let mut report = ViolationReport::new();

        for rule in &self.rules {
            let violations = {
                let rule_ctx = RuleContext {
                    options: &ctx.options,
                    prior: &report,
                };

                if !rule.applies_to(expected, &rule_ctx) {
                    tracing::debug!(rule = rule.id(), rule_name = rule.name(), "rule skipped");
                    continue;
                }

                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    rule.evaluate(expected, actual, &rule_ctx)
                }));

                match outcome {
                    Ok(Ok(violations)) => violations,
                    Ok(Err(err)) => {
                        tracing::warn!(
                            contract = %ctx.contract,
                            rule = rule.id(),
                            error = %err,
                            "rule failed"
                        );
                        vec![rule_failure(rule.id(), err.to_string())]
                    }
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        tracing::warn!(
                            contract = %ctx.contract,
                            rule = rule.id(),
                            error = %message,
                            "rule panicked"
                        );
                        vec![rule_failure(rule.id(), message)]
                    }
                }
            };

            tracing::debug!(
                rule = rule.id(),
                rule_name = rule.name(),
                violations = violations.len(),
                "rule evaluated"
            );
            report.extend(violations);
        }

        report
    }
}

/// Validate with the standard engine and default options
pub fn validate(expected: &ContractResponse, actual: &ActualResponse) -> ViolationReport {
    ValidationEngine::new().validate(expected, actual)
}

fn rule_failure(rule_id: &str, message: String) -> Violation {
    Violation::new(
        format!("rule '{}'", rule_id),
        Value::String("rule to complete".to_string()),
        Value::String(message),
    )
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "rule panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn logged(f: impl FnOnce()) -> String {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        capture.text()
    }

    struct FailingRule;

    impl ResponseRule for FailingRule {
        fn id(&self) -> &str {
            "failing"
        }

        fn name(&self) -> &str {
            "Always Fails"
        }

        fn applies_to(&self, _expected: &ContractResponse, _ctx: &RuleContext<'_>) -> bool {
            true
        }

        fn evaluate(
            &self,
            _expected: &ContractResponse,
            _actual: &ActualResponse,
            _ctx: &RuleContext<'_>,
        ) -> Result<Vec<Violation>, RuleError> {
            Err(RuleError::Internal("boom".to_string()))
        }
    }

    struct PanickingRule;

    impl ResponseRule for PanickingRule {
        fn id(&self) -> &str {
            "panicking"
        }

        fn name(&self) -> &str {
            "Always Panics"
        }

        fn applies_to(&self, _expected: &ContractResponse, _ctx: &RuleContext<'_>) -> bool {
            true
        }

        fn evaluate(
            &self,
            _expected: &ContractResponse,
            _actual: &ActualResponse,
            _ctx: &RuleContext<'_>,
        ) -> Result<Vec<Violation>, RuleError> {
            panic!("rule exploded");
        }
    }

    #[test]
    fn test_default_rule_order() {
        let engine = ValidationEngine::new();
        assert_eq!(
            engine.rule_ids(),
            vec!["status-code", "body-type", "body-structure", "headers"]
        );
    }

    #[test]
    fn test_failing_rule_becomes_violation() {
        let mut engine = ValidationEngine::new();
        engine.register(Box::new(FailingRule));

        let report = engine.validate(&ContractResponse::new(200), &ActualResponse::new(200));
        assert_eq!(report.count(), 1);
        assert_eq!(
            report.texts()[0],
            "Expected rule 'failing' to be 'rule to complete' but it was 'boom'"
        );
    }

    #[test]
    fn test_panicking_rule_becomes_violation() {
        let mut engine = ValidationEngine::empty();
        engine.register(Box::new(PanickingRule));
        engine.register(Box::new(StatusCodeRule));

        let report = engine.validate(&ContractResponse::new(200), &ActualResponse::new(500));
        assert_eq!(report.count(), 2);
        assert_eq!(report.violations()[0].key, "rule 'panicking'");
        assert_eq!(report.violations()[0].actual.value(), Some(&json!("rule exploded")));
        assert_eq!(report.violations()[1].key, "statusCode");
    }

    #[test]
    fn test_depth_failure_is_reported_not_raised() {
        let expected = ContractResponse::new(200).with_body(json!({"a": {"b": {"c": 1}}}));
        let actual = ActualResponse::new(200).with_body(json!({"a": {"b": {"c": 1}}}));
        let ctx = ValidationContext::new("deep")
            .with_options(ValidationOptions::new().with_max_depth(1));

        let report = ValidationEngine::new().validate_with(&ctx, &expected, &actual);
        assert_eq!(report.count(), 1);
        assert_eq!(report.violations()[0].key, "rule 'body-structure'");
    }

    #[test]
    fn test_events_carry_contract_and_rule_names() {
        let mut engine = ValidationEngine::empty();
        engine.register(Box::new(StatusCodeRule));
        engine.register(Box::new(FailingRule));
        let ctx = ValidationContext::new("users/get");

        let logs = logged(|| {
            engine.validate_with(&ctx, &ContractResponse::new(200), &ActualResponse::new(200));
        });

        assert!(logs.contains("validate{contract=users/get}"), "{}", logs);
        assert!(logs.contains("Status Code"), "{}", logs);
        let failure = logs.lines().find(|l| l.contains("rule failed")).unwrap();
        assert!(failure.contains("contract=users/get"), "{}", failure);
        assert!(failure.contains("failing"), "{}", failure);
    }
}
