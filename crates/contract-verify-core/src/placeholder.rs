//! Placeholder grammar
//!
//! Two token families share the angle-bracket syntax:
//!
//! - **Generator tokens** (`<generate[string(length=64)]>`) are resolved once,
//!   when a contract body is loaded, into a concrete random value.
//! - **Wildcard tokens** (`<anyString>`, `<anyNumber>`, `<anyBool>`) are never
//!   resolved. The comparator reads them as "any value of this shape".
//!
//! A token is only recognized when it is the entire string. A backslash in
//! front of a complete token (`\<anyString>`) escapes it: the value then
//! denotes the literal token text.

use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Default length of generated strings
pub const DEFAULT_STRING_LENGTH: usize = 10;

/// Longest string a generator token may ask for
pub const MAX_STRING_LENGTH: usize = 65_536;

/// Default lower bound of generated numbers
pub const DEFAULT_NUMBER_MIN: i64 = 1;

/// Default upper bound of generated numbers
pub const DEFAULT_NUMBER_MAX: i64 = 9_999_999;

const ESCAPE: char = '\\';

static GENERATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<generate\[(string|number|bool|uuid)(?:\(([^()]*)\))?\]>$")
        .expect("generator token pattern is valid")
});

/// A parsed `<generate[...]>` token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorToken {
    /// Random alphanumeric string of the given length
    String { length: usize },
    /// Random integer within inclusive bounds, `min <= max` always holds
    Number { min: i64, max: i64 },
    /// Random boolean
    Bool,
    /// Random hyphenated v4 UUID
    Uuid,
}

impl GeneratorToken {
    /// Parse a generator token, returning `None` for anything else
    ///
    /// Unknown kinds, unknown or duplicated parameters, non-integer parameter
    /// values and lengths above [`MAX_STRING_LENGTH`] all yield `None`,
    /// leaving the literal untouched.
    pub fn parse(value: &str) -> Option<Self> {
        let caps = GENERATOR_RE.captures(value)?;
        let kind = caps.get(1)?.as_str();
        let params = parse_params(caps.get(2).map(|m| m.as_str()).unwrap_or(""))?;

        match kind {
            "string" => {
                let mut length = DEFAULT_STRING_LENGTH;
                for (key, raw) in params {
                    match key {
                        "length" => length = raw.parse().ok()?,
                        _ => return None,
                    }
                }
                (length <= MAX_STRING_LENGTH).then_some(GeneratorToken::String { length })
            }
            "number" => {
                let mut min = DEFAULT_NUMBER_MIN;
                let mut max = DEFAULT_NUMBER_MAX;
                for (key, raw) in params {
                    match key {
                        "min" => min = raw.parse().ok()?,
                        "max" => max = raw.parse().ok()?,
                        _ => return None,
                    }
                }
                if min > max {
                    std::mem::swap(&mut min, &mut max);
                }
                Some(GeneratorToken::Number { min, max })
            }
            "bool" if params.is_empty() => Some(GeneratorToken::Bool),
            "uuid" if params.is_empty() => Some(GeneratorToken::Uuid),
            _ => None,
        }
    }

    /// Produce a fresh random value for this token
    pub fn generate(&self) -> Value {
        let mut rng = rand::thread_rng();
        match *self {
            GeneratorToken::String { length } => Value::String(
                (&mut rng)
                    .sample_iter(&Alphanumeric)
                    .take(length)
                    .map(char::from)
                    .collect(),
            ),
            GeneratorToken::Number { min, max } => Value::from(rng.gen_range(min..=max)),
            GeneratorToken::Bool => Value::Bool(rng.gen()),
            GeneratorToken::Uuid => Value::String(uuid::Uuid::new_v4().to_string()),
        }
    }
}

/// Split `key=value;key=value` into pairs, rejecting malformed or duplicate keys
fn parse_params(raw: &str) -> Option<Vec<(&str, &str)>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(Vec::new());
    }

    let mut pairs: Vec<(&str, &str)> = Vec::new();
    for segment in raw.split(';') {
        let (key, value) = segment.split_once('=')?;
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() || pairs.iter().any(|(k, _)| *k == key) {
            return None;
        }
        pairs.push((key, value));
    }
    Some(pairs)
}

/// Whether `value` is a well-formed generator token
pub fn is_generator_token(value: &str) -> bool {
    GeneratorToken::parse(value).is_some()
}

/// Resolve a generator token to a random value
///
/// Returns `None` when `value` is not a generator token.
pub fn resolve_generator_token(value: &str) -> Option<Value> {
    GeneratorToken::parse(value).map(|token| token.generate())
}

/// A wildcard placeholder accepted in expected values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wildcard {
    AnyString,
    AnyNumber,
    AnyBool,
}

/// Shape a wildcard accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WildcardKind {
    String,
    Number,
    Bool,
}

impl Wildcard {
    /// Parse an exact wildcard token
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "<anyString>" => Some(Wildcard::AnyString),
            "<anyNumber>" => Some(Wildcard::AnyNumber),
            "<anyBool>" => Some(Wildcard::AnyBool),
            _ => None,
        }
    }

    /// Parse a JSON value that is a wildcard token string
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_str().and_then(Self::parse)
    }

    /// The token text, used as the expected value in violations
    pub fn label(&self) -> &'static str {
        match self {
            Wildcard::AnyString => "<anyString>",
            Wildcard::AnyNumber => "<anyNumber>",
            Wildcard::AnyBool => "<anyBool>",
        }
    }

    /// The shape this wildcard accepts
    pub fn kind(&self) -> WildcardKind {
        match self {
            Wildcard::AnyString => WildcardKind::String,
            Wildcard::AnyNumber => WildcardKind::Number,
            Wildcard::AnyBool => WildcardKind::Bool,
        }
    }

    /// Whether `actual` has the shape this wildcard accepts
    pub fn matches(&self, actual: &Value) -> bool {
        match self.kind() {
            WildcardKind::String => actual.is_string(),
            WildcardKind::Number => actual.is_number(),
            WildcardKind::Bool => actual.is_boolean(),
        }
    }
}

impl std::fmt::Display for Wildcard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::fmt::Display for WildcardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WildcardKind::String => write!(f, "string"),
            WildcardKind::Number => write!(f, "number"),
            WildcardKind::Bool => write!(f, "boolean"),
        }
    }
}

/// Whether `value` is exactly one of the wildcard tokens
pub fn is_wildcard_token(value: &str) -> bool {
    Wildcard::parse(value).is_some()
}

/// The kind of a wildcard token, if `value` is one
pub fn wildcard_kind(value: &str) -> Option<WildcardKind> {
    Wildcard::parse(value).map(|w| w.kind())
}

/// If `value` is an escaped token (`\` + complete token), the literal token text
pub fn escaped_literal(value: &str) -> Option<&str> {
    let rest = value.strip_prefix(ESCAPE)?;
    if is_wildcard_token(rest) || is_generator_token(rest) {
        Some(rest)
    } else {
        None
    }
}

/// Which side of a contract a body tree belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyRole {
    /// Sent to the service; every escaped token is unescaped
    Request,
    /// Compared against the service; escaped wildcards stay escaped for the comparator
    Response,
}

/// Resolve every generator token in a value tree
///
/// Walks objects and arrays at any depth. Wildcard tokens are left in place.
pub fn materialize(value: Value, role: BodyRole) -> Value {
    match value {
        Value::String(s) => materialize_string(s, role),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| materialize(item, role))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, item)| (key, materialize(item, role)))
                .collect(),
        ),
        other => other,
    }
}

fn materialize_string(s: String, role: BodyRole) -> Value {
    if let Some(generated) = resolve_generator_token(&s) {
        return generated;
    }
    if let Some(literal) = escaped_literal(&s) {
        let keep_escaped = role == BodyRole::Response && is_wildcard_token(literal);
        if !keep_escaped {
            return Value::String(literal.to_string());
        }
    }
    Value::String(s)
}
