//! Response validation rules
//!
//! Deterministic rules evaluated by the pipeline in this order: status code,
//! body type, body structure, headers.

use serde_json::Value;

use super::{ResponseRule, RuleContext};
use crate::comparator::Comparator;
use crate::error::RuleError;
use crate::model::{ActualResponse, ContractResponse, NamedValue};
use crate::placeholder::{escaped_literal, Wildcard, WildcardKind};
use crate::violation::{render_value, Violation};

/// Key used for status code violations
pub const STATUS_CODE_KEY: &str = "statusCode";

/// Key used for body type violations
pub const BODY_TYPE_KEY: &str = "type of 'body'";

/// Compares the response status code
pub struct StatusCodeRule;

impl ResponseRule for StatusCodeRule {
    fn id(&self) -> &str {
        "status-code"
    }

    fn name(&self) -> &str {
        "Status Code"
    }

    fn applies_to(&self, _expected: &ContractResponse, _ctx: &RuleContext<'_>) -> bool {
        true
    }

    fn evaluate(
        &self,
        expected: &ContractResponse,
        actual: &ActualResponse,
        _ctx: &RuleContext<'_>,
    ) -> Result<Vec<Violation>, RuleError> {
        if expected.status_code == actual.status_code {
            return Ok(Vec::new());
        }
        Ok(vec![Violation::new(
            STATUS_CODE_KEY,
            Value::from(expected.status_code),
            Value::from(actual.status_code),
        )])
    }
}

/// Checks that expected and actual bodies have the same shape
pub struct BodyTypeRule;

impl ResponseRule for BodyTypeRule {
    fn id(&self) -> &str {
        "body-type"
    }

    fn name(&self) -> &str {
        "Body Type"
    }

    fn applies_to(&self, expected: &ContractResponse, _ctx: &RuleContext<'_>) -> bool {
        expected.body.is_some()
    }

    fn evaluate(
        &self,
        expected: &ContractResponse,
        actual: &ActualResponse,
        _ctx: &RuleContext<'_>,
    ) -> Result<Vec<Violation>, RuleError> {
        let Some(body) = &expected.body else {
            return Ok(Vec::new());
        };

        let expected_shape = expected_shape_name(body);
        let actual_shape = shape_name(&actual.body);
        if expected_shape == actual_shape {
            return Ok(Vec::new());
        }

        Ok(vec![Violation::new(
            BODY_TYPE_KEY,
            Value::String(expected_shape.to_string()),
            Value::String(actual_shape.to_string()),
        )])
    }
}

/// Structural diff of the bodies
///
/// Only runs when earlier rules recorded nothing: with a wrong status code or
/// body shape, field-level differences are noise.
pub struct BodyStructureRule;

impl ResponseRule for BodyStructureRule {
    fn id(&self) -> &str {
        "body-structure"
    }

    fn name(&self) -> &str {
        "Body Structure"
    }

    fn applies_to(&self, expected: &ContractResponse, ctx: &RuleContext<'_>) -> bool {
        expected.body.is_some() && !ctx.prior.has_violations()
    }

    fn evaluate(
        &self,
        expected: &ContractResponse,
        actual: &ActualResponse,
        ctx: &RuleContext<'_>,
    ) -> Result<Vec<Violation>, RuleError> {
        match &expected.body {
            Some(body) => Comparator::new()
                .with_max_depth(ctx.options.max_depth)
                .compare(body, &actual.body),
            None => Ok(Vec::new()),
        }
    }
}

/// Compares declared headers against the received ones
pub struct HeaderRule;

impl HeaderRule {
    fn check(entry: &NamedValue, actual: &ActualResponse, ignore_case: bool) -> Option<Violation> {
        let key = format!("header '{}'", entry.name);
        let received = if ignore_case {
            actual.header_ignore_case(&entry.name)
        } else {
            actual.header(&entry.name)
        };

        let Some(received) = received else {
            return Some(Violation::missing(key, entry.value.clone()));
        };

        if header_matches(&entry.value, received) {
            None
        } else {
            Some(Violation::new(
                key,
                entry.value.clone(),
                Value::String(received.to_string()),
            ))
        }
    }
}

impl ResponseRule for HeaderRule {
    fn id(&self) -> &str {
        "headers"
    }

    fn name(&self) -> &str {
        "Headers"
    }

    fn applies_to(&self, expected: &ContractResponse, _ctx: &RuleContext<'_>) -> bool {
        expected.headers.is_some()
    }

    fn evaluate(
        &self,
        expected: &ContractResponse,
        actual: &ActualResponse,
        ctx: &RuleContext<'_>,
    ) -> Result<Vec<Violation>, RuleError> {
        let Some(headers) = &expected.headers else {
            return Ok(Vec::new());
        };

        Ok(headers
            .iter()
            .filter_map(|entry| Self::check(entry, actual, ctx.options.ignore_header_case))
            .collect())
    }
}

/// Header values are text on the wire, so wildcards check what the text parses as
fn header_matches(expected: &Value, received: &str) -> bool {
    if let Some(wildcard) = Wildcard::from_value(expected) {
        return match wildcard.kind() {
            WildcardKind::String => true,
            WildcardKind::Number => received
                .trim()
                .parse::<f64>()
                .map(f64::is_finite)
                .unwrap_or(false),
            WildcardKind::Bool => matches!(received.trim(), "true" | "false"),
        };
    }

    match expected {
        Value::String(s) => escaped_literal(s).unwrap_or(s) == received,
        other => render_value(other) == received,
    }
}

/// Shape name of a JSON value
pub fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Shape an expected value demands; a wildcard demands its kind
fn expected_shape_name(value: &Value) -> &'static str {
    match Wildcard::from_value(value).map(|w| w.kind()) {
        Some(WildcardKind::String) => "string",
        Some(WildcardKind::Number) => "number",
        Some(WildcardKind::Bool) => "boolean",
        None => shape_name(value),
    }
}
