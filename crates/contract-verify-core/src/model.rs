//! Contract data model
//!
//! A [`Contract`] is built once per contract file and is read-only afterwards.
//! Header and param collections are always ordered lists of single-key
//! entries, whatever form the source document used.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// HTTP method of a contract request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
    Connect,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Connect => "CONNECT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            "TRACE" => Ok(Method::Trace),
            "CONNECT" => Ok(Method::Connect),
            _ => Err(format!("Unknown HTTP method: {}", s)),
        }
    }
}

/// A single-key mapping from a header or param name to its value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
    pub name: String,
    pub value: Value,
}

impl NamedValue {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The value as sent over the wire: strings bare, other scalars as JSON text
    pub fn value_text(&self) -> String {
        crate::violation::render_value(&self.value)
    }
}

/// Request half of a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRequest {
    pub path: String,
    #[serde(default)]
    pub method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<NamedValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<NamedValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl ContractRequest {
    /// Create a GET request for `path`
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Method::Get,
            headers: None,
            params: None,
            body: None,
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers
            .get_or_insert_with(Vec::new)
            .push(NamedValue::new(name, value));
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params
            .get_or_insert_with(Vec::new)
            .push(NamedValue::new(name, value));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Expected response half of a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractResponse {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<NamedValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl ContractResponse {
    /// Expect `status_code` with no header or body expectations
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            headers: None,
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers
            .get_or_insert_with(Vec::new)
            .push(NamedValue::new(name, value));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Declarative expectation of one HTTP interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub name: String,
    pub request: ContractRequest,
    pub response: ContractResponse,
}

impl Contract {
    pub fn new(
        name: impl Into<String>,
        request: ContractRequest,
        response: ContractResponse,
    ) -> Self {
        Self {
            name: name.into(),
            request,
            response,
        }
    }

    /// Render the contract in the contract file layout
    ///
    /// Headers and params are written as lists of single-key mappings so the
    /// document loads back with the same order.
    pub fn to_document(&self) -> Value {
        let mut request = Map::new();
        request.insert("path".into(), Value::String(self.request.path.clone()));
        request.insert("method".into(), Value::String(self.request.method.to_string()));
        if let Some(headers) = &self.request.headers {
            request.insert("headers".into(), named_list(headers));
        }
        if let Some(params) = &self.request.params {
            request.insert("params".into(), named_list(params));
        }
        if let Some(body) = &self.request.body {
            request.insert("body".into(), body.clone());
        }

        let mut response = Map::new();
        response.insert("statusCode".into(), Value::from(self.response.status_code));
        if let Some(headers) = &self.response.headers {
            response.insert("headers".into(), named_list(headers));
        }
        if let Some(body) = &self.response.body {
            response.insert("body".into(), body.clone());
        }

        let mut contract = Map::new();
        contract.insert("request".into(), Value::Object(request));
        contract.insert("response".into(), Value::Object(response));

        let mut root = Map::new();
        root.insert("contract".into(), Value::Object(contract));
        Value::Object(root)
    }
}

fn named_list(entries: &[NamedValue]) -> Value {
    Value::Array(
        entries
            .iter()
            .map(|entry| {
                let mut map = Map::new();
                map.insert(entry.name.clone(), entry.value.clone());
                Value::Object(map)
            })
            .collect(),
    )
}

/// Response observed from the service under test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualResponse {
    pub status_code: u16,
    /// Header name/value pairs in received order
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// Parsed JSON body, a raw string when the body is not JSON, null when empty
    #[serde(default)]
    pub body: Value,
}

impl ActualResponse {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            headers: Vec::new(),
            body: Value::Null,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Interpret raw body text: JSON when it parses, a string otherwise
    pub fn with_raw_body(self, raw: &str) -> Self {
        let body = if raw.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
        };
        self.with_body(body)
    }

    /// First header value with exactly this name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// First header value whose name matches ignoring ASCII case
    pub fn header_ignore_case(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_parsing_is_case_insensitive() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("Patch".parse::<Method>().unwrap(), Method::Patch);
        assert_eq!(" delete ".parse::<Method>().unwrap(), Method::Delete);
        assert!("FETCH".parse::<Method>().is_err());
        assert_eq!(Method::default(), Method::Get);
    }

    #[test]
    fn test_raw_body_interpretation() {
        let r = ActualResponse::new(200).with_raw_body(r#"{"id": 1}"#);
        assert_eq!(r.body, json!({"id": 1}));

        let r = ActualResponse::new(200).with_raw_body("plain text");
        assert_eq!(r.body, json!("plain text"));

        let r = ActualResponse::new(204).with_raw_body("  ");
        assert_eq!(r.body, Value::Null);
    }

    #[test]
    fn test_header_lookup() {
        let r = ActualResponse::new(200).with_header("content-type", "application/json");
        assert_eq!(r.header("content-type"), Some("application/json"));
        assert_eq!(r.header("Content-Type"), None);
        assert_eq!(r.header_ignore_case("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_to_document_layout() {
        let contract = Contract::new(
            "users/create",
            ContractRequest::new("/users")
                .with_method(Method::Post)
                .with_header("X-B", "2")
                .with_header("X-A", "1")
                .with_body(json!({"name": "n"})),
            ContractResponse::new(201).with_body(json!({"id": "<anyNumber>"})),
        );

        let doc = contract.to_document();
        assert_eq!(doc["contract"]["request"]["method"], json!("POST"));
        assert_eq!(
            doc["contract"]["request"]["headers"],
            json!([{"X-B": "2"}, {"X-A": "1"}])
        );
        assert_eq!(doc["contract"]["response"]["statusCode"], json!(201));
        assert!(doc["contract"]["request"].get("params").is_none());
    }

    #[test]
    fn test_named_value_text() {
        assert_eq!(NamedValue::new("n", 42).value_text(), "42");
        assert_eq!(NamedValue::new("n", "abc").value_text(), "abc");
    }
}
