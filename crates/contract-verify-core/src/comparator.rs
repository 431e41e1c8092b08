//! Structural comparator
//!
//! Recursively diffs an expected value tree against an actual one. The walk is
//! keyed by the expected tree: keys and trailing array elements that only the
//! actual value carries are never reported (open-world comparison).
//!
//! Every mismatch surfaces as its own violation. Nested results are appended
//! to a single accumulator in discovery order.
//!
//! Key paths use `.` between object keys and `[i]` for array indexes, e.g.
//! `orders[1].items[0].sku`. A mismatch at the root itself is reported under
//! the root label (`body` by default).

use serde_json::{Number, Value};

use crate::error::RuleError;
use crate::placeholder::{escaped_literal, Wildcard};
use crate::violation::{Observed, Violation};

/// Maximum nesting the comparator follows before giving up
pub const MAX_DEPTH: usize = 128;

/// Key reported for mismatches at the root of the compared trees
pub const ROOT_LABEL: &str = "body";

/// Wildcard-aware recursive differ
#[derive(Debug, Clone)]
pub struct Comparator {
    root_label: String,
    max_depth: usize,
}

impl Default for Comparator {
    fn default() -> Self {
        Self {
            root_label: ROOT_LABEL.to_string(),
            max_depth: MAX_DEPTH,
        }
    }
}

impl Comparator {
    /// Create a comparator with the default root label and depth limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key reported for root-level mismatches
    pub fn with_root_label(mut self, label: impl Into<String>) -> Self {
        self.root_label = label.into();
        self
    }

    /// Set the maximum nesting depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Diff `expected` against `actual`
    ///
    /// Fails only when the expected tree nests deeper than the depth limit.
    pub fn compare(&self, expected: &Value, actual: &Value) -> Result<Vec<Violation>, RuleError> {
        let mut out = Vec::new();
        self.compare_node("", expected, actual, 0, &mut out)?;
        Ok(out)
    }

    fn compare_node(
        &self,
        path: &str,
        expected: &Value,
        actual: &Value,
        depth: usize,
        out: &mut Vec<Violation>,
    ) -> Result<(), RuleError> {
        if depth > self.max_depth {
            return Err(RuleError::DepthExceeded {
                path: self.label(path),
                max: self.max_depth,
            });
        }

        if let Some(wildcard) = Wildcard::from_value(expected) {
            if !wildcard.matches(actual) {
                out.push(self.violation(path, expected.clone(), actual.clone()));
            }
            return Ok(());
        }

        match (expected, actual) {
            (Value::Object(expected_map), Value::Object(actual_map)) => {
                for (key, expected_child) in expected_map {
                    let child = object_path(path, key);
                    match actual_map.get(key) {
                        Some(actual_child) => {
                            self.compare_node(&child, expected_child, actual_child, depth + 1, out)?
                        }
                        None => out.push(Violation::missing(child, expected_child.clone())),
                    }
                }
            }
            (Value::Array(expected_items), Value::Array(actual_items)) => {
                for (i, (expected_item, actual_item)) in
                    expected_items.iter().zip(actual_items).enumerate()
                {
                    let child = index_path(path, i);
                    self.compare_node(&child, expected_item, actual_item, depth + 1, out)?;
                }
                let unmatched = expected_items.iter().enumerate().skip(actual_items.len());
                for (i, expected_item) in unmatched {
                    out.push(Violation::missing(index_path(path, i), expected_item.clone()));
                }
            }
            (Value::Object(_), _) | (Value::Array(_), _) => {
                out.push(self.violation(path, expected.clone(), actual.clone()));
            }
            _ => {
                if !leaf_matches(expected, actual) {
                    out.push(self.violation(path, expected.clone(), actual.clone()));
                }
            }
        }
        Ok(())
    }

    fn violation(&self, path: &str, expected: Value, actual: Value) -> Violation {
        Violation::new(self.label(path), expected, Observed::Present(actual))
    }

    fn label(&self, path: &str) -> String {
        if path.is_empty() {
            self.root_label.clone()
        } else {
            path.to_string()
        }
    }
}

/// Diff `expected` against `actual` with default settings
///
/// A tree nested beyond [`MAX_DEPTH`] yields a single violation describing
/// the failure instead of a partial diff.
pub fn compare(expected: &Value, actual: &Value) -> Vec<Violation> {
    match Comparator::default().compare(expected, actual) {
        Ok(violations) => violations,
        Err(err) => vec![depth_violation(&err)],
    }
}

fn depth_violation(err: &RuleError) -> Violation {
    let key = match err {
        RuleError::DepthExceeded { path, .. } => path.clone(),
        RuleError::Internal(_) => ROOT_LABEL.to_string(),
    };
    Violation::new(
        key,
        Value::String(format!("nesting within {} levels", MAX_DEPTH)),
        Value::String(err.to_string()),
    )
}

fn object_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

/// Compare two non-container values
///
/// An escaped token matches the literal token text. Numbers compare by
/// numeric value, so `1` and `1.0` are equal.
fn leaf_matches(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::String(e), Value::String(a)) => match escaped_literal(e) {
            Some(literal) => literal == a,
            None => e == a,
        },
        (Value::Number(e), Value::Number(a)) => numbers_equal(e, a),
        _ => expected == actual,
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}
