//! Violation and report types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Rendering used for values absent from the actual response
pub const MISSING: &str = "<missing>";

/// The actual side of a violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum Observed {
    /// The actual response carried this value
    Present(Value),
    /// The actual response had nothing at this location
    Missing,
}

impl Observed {
    /// Whether nothing was observed
    pub fn is_missing(&self) -> bool {
        matches!(self, Observed::Missing)
    }

    /// The observed value, if any
    pub fn value(&self) -> Option<&Value> {
        match self {
            Observed::Present(v) => Some(v),
            Observed::Missing => None,
        }
    }
}

impl From<Value> for Observed {
    fn from(value: Value) -> Self {
        Observed::Present(value)
    }
}

impl From<Option<&Value>> for Observed {
    fn from(value: Option<&Value>) -> Self {
        value.cloned().map_or(Observed::Missing, Observed::Present)
    }
}

impl fmt::Display for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observed::Present(v) => f.write_str(&render_value(v)),
            Observed::Missing => f.write_str(MISSING),
        }
    }
}

/// One mismatch between expected and actual
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Dotted/indexed path or field label
    pub key: String,
    /// What the contract expected
    pub expected: Value,
    /// What the service returned
    pub actual: Observed,
}

impl Violation {
    /// Create a new violation
    pub fn new(key: impl Into<String>, expected: Value, actual: impl Into<Observed>) -> Self {
        Self {
            key: key.into(),
            expected,
            actual: actual.into(),
        }
    }

    /// Create a violation for a value the actual response does not carry
    pub fn missing(key: impl Into<String>, expected: Value) -> Self {
        Self::new(key, expected, Observed::Missing)
    }

    /// Human-readable rendering
    pub fn text(&self) -> String {
        format!(
            "Expected {} to be '{}' but it was '{}'",
            self.key,
            render_value(&self.expected),
            self.actual
        )
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Strings render bare, everything else as compact JSON
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Ordered violations from one validation run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViolationReport {
    violations: Vec<Violation>,
}

impl ViolationReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a violation
    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// Append several violations, keeping their order
    pub fn extend(&mut self, violations: impl IntoIterator<Item = Violation>) {
        self.violations.extend(violations);
    }

    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    pub fn count(&self) -> usize {
        self.violations.len()
    }

    /// One rendered line per violation, in discovery order
    pub fn texts(&self) -> Vec<String> {
        self.violations.iter().map(Violation::text).collect()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.violations.iter()
    }
}

impl From<Vec<Violation>> for ViolationReport {
    fn from(violations: Vec<Violation>) -> Self {
        Self { violations }
    }
}

impl IntoIterator for ViolationReport {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.into_iter()
    }
}

impl<'a> IntoIterator for &'a ViolationReport {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_rendering() {
        let v = Violation::new("statusCode", json!(200), json!(404));
        assert_eq!(v.text(), "Expected statusCode to be '200' but it was '404'");

        let v = Violation::missing("name", json!("Alice"));
        assert_eq!(v.text(), "Expected name to be 'Alice' but it was '<missing>'");

        let v = Violation::new("tags", json!(["a", 1]), json!({"k": true}));
        assert_eq!(
            v.text(),
            r#"Expected tags to be '["a",1]' but it was '{"k":true}'"#
        );
    }

    #[test]
    fn test_report_accessors() {
        let mut report = ViolationReport::new();
        assert!(!report.has_violations());

        report.push(Violation::missing("a", json!(1)));
        report.extend(vec![Violation::new("b", json!(true), json!(false))]);

        assert!(report.has_violations());
        assert_eq!(report.count(), 2);
        assert_eq!(
            report.texts(),
            vec![
                "Expected a to be '1' but it was '<missing>'".to_string(),
                "Expected b to be 'true' but it was 'false'".to_string(),
            ]
        );
    }

    #[test]
    fn test_observed_from_option() {
        let present = json!("x");
        assert_eq!(Observed::from(Some(&present)), Observed::Present(json!("x")));
        assert!(Observed::from(None::<&Value>).is_missing());
    }

    #[test]
    fn test_report_serializes_missing_distinctly() {
        let report = ViolationReport::from(vec![Violation::missing("id", json!(7))]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["violations"][0]["actual"], json!({"state": "missing"}));
    }
}
