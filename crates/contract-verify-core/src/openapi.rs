//! Contracts from OpenAPI 3 and Swagger 2 documents
//!
//! Produces one contract per operation. Request bodies, path parameters and
//! required query/header parameters get concrete generated values; expected
//! response bodies get wildcard tokens for every scalar, so the contract
//! checks shape rather than data.

use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::error::{ContractError, Result};
use crate::model::{Contract, ContractRequest, ContractResponse, Method, NamedValue};
use crate::placeholder::{
    GeneratorToken, Wildcard, DEFAULT_NUMBER_MAX, DEFAULT_NUMBER_MIN, DEFAULT_STRING_LENGTH,
    MAX_STRING_LENGTH,
};
use crate::violation::render_value;

const DOCUMENT: &str = "openapi document";
const METHODS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch", "trace"];

/// How scalar leaves are filled in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExampleMode {
    /// Concrete random values, for requests
    Generated,
    /// Wildcard tokens, for expected responses
    Wildcard,
}

/// Build contracts for every operation in the document, in document order
pub fn contracts_from_openapi(doc: &Value) -> Result<Vec<Contract>> {
    let paths = doc
        .get("paths")
        .and_then(Value::as_object)
        .ok_or_else(|| ContractError::missing(DOCUMENT, "paths"))?;

    let builder = ExampleBuilder::new(doc);
    let mut names = HashSet::new();
    let mut contracts = Vec::new();

    for (path, item) in paths {
        let item = builder.deref(item)?;
        let shared_params = item.get("parameters").and_then(Value::as_array);

        for (method_name, operation) in item.as_object().into_iter().flatten() {
            if !METHODS.contains(&method_name.as_str()) {
                continue;
            }
            let method: Method = method_name
                .parse()
                .map_err(|e: String| ContractError::invalid(DOCUMENT, path, e))?;

            let name = unique_name(&mut names, operation_name(operation, method_name, path));
            let request = builder.request(path, method, shared_params, operation)?;
            let response = builder.response(operation)?;
            tracing::debug!(contract = %name, "generated contract from operation");
            contracts.push(Contract::new(name, request, response));
        }
    }

    Ok(contracts)
}

fn operation_name(operation: &Value, method: &str, path: &str) -> String {
    if let Some(id) = operation.get("operationId").and_then(Value::as_str) {
        return id.to_string();
    }
    let sanitized: String = path
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let sanitized = sanitized.trim_matches('_');
    let sanitized = if sanitized.is_empty() { "root" } else { sanitized };
    format!("{}_{}", method, sanitized)
}

fn unique_name(names: &mut HashSet<String>, base: String) -> String {
    let mut candidate = base.clone();
    let mut n = 2;
    while !names.insert(candidate.clone()) {
        candidate = format!("{}_{}", base, n);
        n += 1;
    }
    candidate
}

/// Walks schemas against one document, resolving local `$ref`s
pub struct ExampleBuilder<'a> {
    doc: &'a Value,
}

impl<'a> ExampleBuilder<'a> {
    pub fn new(doc: &'a Value) -> Self {
        Self { doc }
    }

    /// Follow `$ref` chains to the referenced value
    pub fn deref(&self, value: &'a Value) -> Result<&'a Value> {
        let mut current = value;
        let mut seen = HashSet::new();
        while let Some(reference) = current.get("$ref").and_then(Value::as_str) {
            if !seen.insert(reference) {
                return Err(ContractError::invalid(DOCUMENT, reference, "circular reference"));
            }
            current = self.lookup(reference)?;
        }
        Ok(current)
    }

    fn lookup(&self, reference: &str) -> Result<&'a Value> {
        let pointer = reference.strip_prefix('#').ok_or_else(|| {
            ContractError::invalid(DOCUMENT, reference, "only local references are supported")
        })?;
        self.doc.pointer(pointer).ok_or_else(|| {
            ContractError::invalid(DOCUMENT, reference, "reference target not found")
        })
    }

    /// Example value for a schema, `None` when its shape is undeterminable
    pub fn example(&self, schema: &'a Value, mode: ExampleMode) -> Result<Option<Value>> {
        self.example_inner(schema, mode, &mut Vec::new())
    }

    fn example_inner(
        &self,
        schema: &'a Value,
        mode: ExampleMode,
        refs: &mut Vec<&'a str>,
    ) -> Result<Option<Value>> {
        if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            if refs.contains(&reference) {
                return Ok(None);
            }
            refs.push(reference);
            let target = self.lookup(reference)?;
            let result = self.example_inner(target, mode, refs);
            refs.pop();
            return result;
        }

        if let Some(parts) = schema.get("allOf").and_then(Value::as_array) {
            let mut merged = Map::new();
            for part in parts {
                if let Some(Value::Object(map)) = self.example_inner(part, mode, refs)? {
                    merged.extend(map);
                }
            }
            return Ok(Some(Value::Object(merged)));
        }

        for key in ["oneOf", "anyOf"] {
            if let Some(first) = schema.get(key).and_then(Value::as_array).and_then(|a| a.first()) {
                return self.example_inner(first, mode, refs);
            }
        }

        match schema_type(schema) {
            Some("object") => {
                let mut map = Map::new();
                if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
                    for (name, property) in properties {
                        if let Some(value) = self.example_inner(property, mode, refs)? {
                            map.insert(name.clone(), value);
                        }
                    }
                }
                Ok(Some(Value::Object(map)))
            }
            Some("array") => {
                let item = match schema.get("items") {
                    Some(items) => self.example_inner(items, mode, refs)?,
                    None => None,
                };
                Ok(Some(Value::Array(item.into_iter().collect())))
            }
            Some(kind) => Ok(scalar_example(kind, schema, mode)),
            None => Ok(None),
        }
    }

    fn request(
        &self,
        path: &str,
        method: Method,
        shared_params: Option<&'a Vec<Value>>,
        operation: &'a Value,
    ) -> Result<ContractRequest> {
        let mut request = ContractRequest::new(path).with_method(method);
        let own_params = operation.get("parameters").and_then(Value::as_array);
        let mut resolved_path = path.to_string();

        for param in shared_params.into_iter().chain(own_params).flatten() {
            let param = self.deref(param)?;
            let Some(name) = param.get("name").and_then(Value::as_str) else {
                continue;
            };
            let location = param.get("in").and_then(Value::as_str).unwrap_or("");
            let required = param.get("required").and_then(Value::as_bool).unwrap_or(false);
            // Swagger 2 puts the type on the parameter itself
            let schema = param.get("schema").unwrap_or(param);

            match location {
                "body" => {
                    request.body = self.example(schema, ExampleMode::Generated)?;
                }
                "path" => {
                    let value = self
                        .example(schema, ExampleMode::Generated)?
                        .unwrap_or_else(|| {
                            GeneratorToken::String {
                                length: DEFAULT_STRING_LENGTH,
                            }
                            .generate()
                        });
                    let segment = format!("{{{}}}", name);
                    resolved_path = resolved_path.replace(&segment, &render_value(&value));
                }
                "query" if required => {
                    if let Some(value) = self.example(schema, ExampleMode::Generated)? {
                        let params = request.params.get_or_insert_with(Vec::new);
                        params.push(NamedValue::new(name, value));
                    }
                }
                "header" if required => {
                    if let Some(value) = self.example(schema, ExampleMode::Generated)? {
                        let headers = request.headers.get_or_insert_with(Vec::new);
                        headers.push(NamedValue::new(name, value));
                    }
                }
                _ => {}
            }
        }

        if let Some(body) = operation.get("requestBody") {
            let body = self.deref(body)?;
            if let Some(schema) = json_schema(body) {
                request.body = self.example(schema, ExampleMode::Generated)?;
            }
        }

        request.path = resolved_path;
        Ok(request)
    }

    fn response(&self, operation: &'a Value) -> Result<ContractResponse> {
        let responses = operation.get("responses").and_then(Value::as_object);
        let Some((status_code, response)) = responses.and_then(pick_response) else {
            return Ok(ContractResponse::new(200));
        };

        let response = self.deref(response)?;
        // OpenAPI 3 nests the schema under content, Swagger 2 does not
        let schema = json_schema(response).or_else(|| response.get("schema"));
        let body = match schema {
            Some(schema) => self.example(schema, ExampleMode::Wildcard)?,
            None => None,
        };

        let mut expected = ContractResponse::new(status_code);
        expected.body = body;
        Ok(expected)
    }
}

/// Lowest declared 2xx response, else `default` as 200, else the lowest code
fn pick_response(responses: &Map<String, Value>) -> Option<(u16, &Value)> {
    let mut codes: Vec<(u16, &Value)> = responses
        .iter()
        .filter_map(|(code, value)| code.parse::<u16>().ok().map(|c| (c, value)))
        .collect();
    codes.sort_by_key(|(code, _)| *code);

    codes
        .iter()
        .find(|(code, _)| (200..300).contains(code))
        .copied()
        .or_else(|| responses.get("default").map(|v| (200, v)))
        .or_else(|| codes.first().copied())
}

/// The JSON media type schema of a request body or response
fn json_schema(value: &Value) -> Option<&Value> {
    let content = value.get("content")?.as_object()?;
    content
        .get("application/json")
        .or_else(|| {
            content
                .iter()
                .find(|(media, _)| media.contains("json"))
                .map(|(_, v)| v)
        })
        .and_then(|media| media.get("schema"))
}

fn schema_type(schema: &Value) -> Option<&str> {
    match schema.get("type") {
        Some(Value::String(t)) => Some(t.as_str()),
        // OpenAPI 3.1 allows a list of types; take the first non-null one
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).find(|t| *t != "null"),
        _ if schema.get("properties").is_some() => Some("object"),
        _ if schema.get("items").is_some() => Some("array"),
        _ => None,
    }
}

fn scalar_example(kind: &str, schema: &Value, mode: ExampleMode) -> Option<Value> {
    let wildcard = match kind {
        "string" => Wildcard::AnyString,
        "integer" | "number" => Wildcard::AnyNumber,
        "boolean" => Wildcard::AnyBool,
        _ => return None,
    };

    if mode == ExampleMode::Wildcard {
        return Some(Value::String(wildcard.label().to_string()));
    }

    if let Some(first) = schema.get("enum").and_then(Value::as_array).and_then(|e| e.first()) {
        return Some(first.clone());
    }

    let token = match wildcard {
        Wildcard::AnyString if schema.get("format").and_then(Value::as_str) == Some("uuid") => {
            GeneratorToken::Uuid
        }
        Wildcard::AnyString => {
            let min = schema.get("minLength").and_then(Value::as_u64);
            let max = schema.get("maxLength").and_then(Value::as_u64);
            let length = min
                .unwrap_or(DEFAULT_STRING_LENGTH as u64)
                .min(max.unwrap_or(u64::MAX))
                .max(min.unwrap_or(0))
                .min(MAX_STRING_LENGTH as u64);
            GeneratorToken::String { length: length as usize }
        }
        Wildcard::AnyNumber => {
            let bound = |key: &str, default: i64| {
                schema.get(key).and_then(Value::as_i64).unwrap_or(default)
            };
            let mut min = bound("minimum", DEFAULT_NUMBER_MIN);
            let mut max = bound("maximum", DEFAULT_NUMBER_MAX);
            if min > max {
                std::mem::swap(&mut min, &mut max);
            }
            GeneratorToken::Number { min, max }
        }
        Wildcard::AnyBool => GeneratorToken::Bool,
    };
    Some(token.generate())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn petstore() -> Value {
        json!({
            "openapi": "3.0.0",
            "paths": {
                "/pets/{petId}": {
                    "parameters": [
                        {"name": "petId", "in": "path", "required": true,
                         "schema": {"type": "integer", "minimum": 5, "maximum": 5}}
                    ],
                    "get": {
                        "operationId": "getPet",
                        "parameters": [
                            {"name": "verbose", "in": "query", "required": true,
                             "schema": {"type": "boolean"}},
                            {"name": "page", "in": "query", "schema": {"type": "integer"}}
                        ],
                        "responses": {
                            "404": {"description": "missing"},
                            "200": {
                                "description": "ok",
                                "content": {"application/json": {
                                    "schema": {"$ref": "#/components/schemas/Pet"}
                                }}
                            }
                        }
                    }
                },
                "/pets": {
                    "post": {
                        "requestBody": {"content": {"application/json": {
                            "schema": {"$ref": "#/components/schemas/NewPet"}
                        }}},
                        "responses": {"201": {"$ref": "#/components/responses/Created"}}
                    }
                }
            },
            "components": {
                "schemas": {
                    "Pet": {
                        "allOf": [
                            {"$ref": "#/components/schemas/NewPet"},
                            {"type": "object", "properties": {
                                "id": {"type": "integer"},
                                "owner": {"$ref": "#/components/schemas/Owner"}
                            }}
                        ]
                    },
                    "NewPet": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string", "minLength": 4, "maxLength": 4},
                            "kind": {"type": "string", "enum": ["cat", "dog"]},
                            "tags": {"type": "array", "items": {"type": "string"}},
                            "vaccinated": {"type": "boolean"}
                        }
                    },
                    "Owner": {
                        "type": "object",
                        "properties": {
                            "id": {"type": "string", "format": "uuid"},
                            "pets": {"type": "array", "items": {"$ref": "#/components/schemas/Pet"}}
                        }
                    }
                },
                "responses": {
                    "Created": {
                        "description": "created",
                        "content": {"application/json": {
                            "schema": {"$ref": "#/components/schemas/Pet"}
                        }}
                    }
                }
            }
        })
    }

    #[test]
    fn test_operations_become_contracts() {
        let contracts = contracts_from_openapi(&petstore()).unwrap();
        assert_eq!(contracts.len(), 2);
        assert_eq!(contracts[0].name, "getPet");
        assert_eq!(contracts[1].name, "post_pets");
        assert_eq!(contracts[1].request.method, Method::Post);
    }

    #[test]
    fn test_request_side_uses_generated_values() {
        let contracts = contracts_from_openapi(&petstore()).unwrap();

        let get = &contracts[0].request;
        assert_eq!(get.path, "/pets/5");
        let params = get.params.as_ref().unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "verbose");
        assert!(params[0].value.is_boolean());

        let body = contracts[1].request.body.as_ref().unwrap();
        assert_eq!(body["name"].as_str().unwrap().len(), 4);
        assert_eq!(body["kind"], json!("cat"));
        assert!(body["tags"][0].is_string());
        assert!(body["vaccinated"].is_boolean());
    }

    #[test]
    fn test_huge_min_length_is_capped() {
        let schema = json!({"type": "string", "minLength": 1_000_000_000_000u64});
        let value = scalar_example("string", &schema, ExampleMode::Generated).unwrap();
        assert_eq!(value.as_str().unwrap().len(), MAX_STRING_LENGTH);

        let bounded = json!({"type": "string", "minLength": 3, "maxLength": 3});
        let value = scalar_example("string", &bounded, ExampleMode::Generated).unwrap();
        assert_eq!(value.as_str().unwrap().len(), 3);
    }

    #[test]
    fn test_response_side_uses_wildcards() {
        let contracts = contracts_from_openapi(&petstore()).unwrap();

        let expected = &contracts[0].response;
        assert_eq!(expected.status_code, 200);
        let body = expected.body.as_ref().unwrap();
        assert_eq!(body["name"], json!("<anyString>"));
        assert_eq!(body["kind"], json!("<anyString>"));
        assert_eq!(body["id"], json!("<anyNumber>"));
        assert_eq!(body["vaccinated"], json!("<anyBool>"));
        assert_eq!(body["owner"]["id"], json!("<anyString>"));
        // Pet -> Owner -> Pet stops at the cycle
        assert_eq!(body["owner"]["pets"], json!([]));

        assert_eq!(contracts[1].response.status_code, 201);
    }

    #[test]
    fn test_swagger2_body_parameter_and_response_schema() {
        let doc = json!({
            "swagger": "2.0",
            "paths": {"/orders": {"post": {
                "parameters": [{"name": "order", "in": "body", "schema": {
                    "type": "object",
                    "properties": {"qty": {"type": "integer", "minimum": 2, "maximum": 2}}
                }}],
                "responses": {"default": {"schema": {
                    "type": "object",
                    "properties": {"ok": {"type": "boolean"}}
                }}}
            }}}
        });

        let contracts = contracts_from_openapi(&doc).unwrap();
        assert_eq!(contracts[0].request.body, Some(json!({"qty": 2})));
        assert_eq!(contracts[0].response.status_code, 200);
        assert_eq!(contracts[0].response.body, Some(json!({"ok": "<anyBool>"})));
    }

    #[test]
    fn test_missing_paths_is_an_error() {
        assert!(matches!(
            contracts_from_openapi(&json!({"openapi": "3.0.0"})),
            Err(ContractError::MissingField { .. })
        ));
    }

    #[test]
    fn test_external_refs_are_rejected() {
        let doc = json!({"paths": {"/a": {"get": {
            "responses": {"200": {"$ref": "other.yaml#/x"}}
        }}}});
        assert!(contracts_from_openapi(&doc).is_err());
    }

    #[test]
    fn test_operation_names_are_unique() {
        let mut names = HashSet::new();
        assert_eq!(unique_name(&mut names, "get_a".into()), "get_a");
        assert_eq!(unique_name(&mut names, "get_a".into()), "get_a_2");
        assert_eq!(operation_name(&json!({}), "get", "/"), "get_root");
        assert_eq!(operation_name(&json!({}), "delete", "/users/{id}"), "delete_users__id");
    }
}
