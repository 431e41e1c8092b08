//! Contract supplier
//!
//! Discovers contract files under a directory, parses each YAML document
//! into a [`Contract`] and normalizes header/param declarations. A malformed
//! file fails on its own; the remaining files still load.
//!
//! Contract file layout:
//!
//! ```yaml
//! contract:
//!   request:
//!     path: /users/1
//!     method: get            # optional, case-insensitive, defaults to GET
//!     headers:               # mapping or list of single-key mappings
//!       Accept: application/json
//!     params:
//!       - verbose: true
//!     body: { name: "<generate[string(length=8)]>" }
//!   response:
//!     statusCode: 200
//!     headers:
//!       - Content-Type: application/json
//!     body: { id: "<anyNumber>" }
//! ```

use serde_json::Value;
use serde_yaml::Value as YamlValue;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{ContractError, Result};
use crate::model::{Contract, ContractRequest, ContractResponse, Method, NamedValue};
use crate::placeholder::{materialize, BodyRole};

/// File extensions recognized as contracts
pub const CONTRACT_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Outcome of loading one contract file
#[derive(Debug)]
pub struct LoadedContract {
    /// Contract name derived from the file path
    pub name: String,
    /// File the contract was read from
    pub source: PathBuf,
    /// The parsed contract or the reason it could not be built
    pub contract: Result<Contract>,
}

/// An entry found while walking the contracts tree
#[derive(Debug)]
enum Found {
    File(PathBuf),
    Unreadable(PathBuf, ContractError),
}

impl Found {
    fn path(&self) -> &Path {
        match self {
            Found::File(path) | Found::Unreadable(path, _) => path,
        }
    }
}

/// Walk `root`, keeping going past entries that cannot be read
///
/// Only an unreadable root is an error.
fn walk(root: &Path) -> Result<Vec<Found>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && is_contract_file(entry.path()) {
                    found.push(Found::File(entry.into_path()));
                }
            }
            Err(err) if err.depth() == 0 => return Err(err.into()),
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                tracing::warn!(path = %path.display(), error = %err, "skipping unreadable entry");
                found.push(Found::Unreadable(path, err.into()));
            }
        }
    }
    found.sort_by(|a, b| a.path().cmp(b.path()));
    Ok(found)
}

/// Recursively list contract files under `root`, sorted by path
///
/// A `root` that is itself a contract file yields just that file. Entries
/// that cannot be read are skipped.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>> {
    Ok(walk(root)?
        .into_iter()
        .filter_map(|found| match found {
            Found::File(path) => Some(path),
            Found::Unreadable(..) => None,
        })
        .collect())
}

fn is_contract_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| CONTRACT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Derive a contract name from its path relative to the contracts root
///
/// `root/users/get_user.yaml` becomes `users/get_user`.
pub fn contract_name(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let relative = if relative.as_os_str().is_empty() {
        Path::new(file.file_name().unwrap_or(file.as_os_str()))
    } else {
        relative
    };

    relative
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Discover and load every contract under `root`
///
/// Fails only when the root itself cannot be read. An entry that cannot be
/// walked is reported as a failed contract named after its path.
pub fn load_contracts(root: &Path) -> Result<Vec<LoadedContract>> {
    let found = walk(root)?;
    tracing::info!(root = %root.display(), entries = found.len(), "discovered contract files");

    let mut seen = HashSet::new();
    let loaded = found
        .into_iter()
        .map(|found| {
            let mut loaded = match found {
                Found::File(file) => load_file(root, &file),
                Found::Unreadable(path, err) => LoadedContract {
                    name: contract_name(root, &path),
                    source: path,
                    contract: Err(err),
                },
            };
            if loaded.contract.is_ok() && !seen.insert(loaded.name.clone()) {
                loaded.contract = Err(ContractError::invalid(
                    &loaded.name,
                    "name",
                    format!("duplicate contract name from '{}'", loaded.source.display()),
                ));
            }
            if let Err(err) = &loaded.contract {
                tracing::warn!(contract = %loaded.name, error = %err, "failed to load contract");
            }
            loaded
        })
        .collect();

    Ok(loaded)
}

/// Read and parse a single contract file
pub fn load_file(root: &Path, file: &Path) -> LoadedContract {
    let name = contract_name(root, file);
    let contract = std::fs::read_to_string(file)
        .map_err(ContractError::from)
        .and_then(|content| parse_contract(&name, &content));

    LoadedContract {
        name,
        source: file.to_path_buf(),
        contract,
    }
}

/// Parse a contract document
///
/// Generator tokens in request and response trees are resolved here, once.
pub fn parse_contract(name: &str, content: &str) -> Result<Contract> {
    let doc: YamlValue =
        serde_yaml::from_str(content).map_err(|e| ContractError::parse(name, e))?;

    let contract = required(name, &doc, "contract", "contract")?;
    let request = required(name, contract, "request", "contract.request")?;
    let response = required(name, contract, "response", "contract.response")?;

    Ok(Contract::new(
        name,
        parse_request(name, request)?,
        parse_response(name, response)?,
    ))
}

fn parse_request(name: &str, request: &YamlValue) -> Result<ContractRequest> {
    let path = required(name, request, "path", "contract.request.path")?
        .as_str()
        .ok_or_else(|| ContractError::invalid(name, "contract.request.path", "must be a string"))?
        .to_string();

    let method = match optional(request, "method") {
        None => Method::default(),
        Some(value) => value
            .as_str()
            .ok_or_else(|| {
                ContractError::invalid(name, "contract.request.method", "must be a string")
            })?
            .parse::<Method>()
            .map_err(|e| ContractError::invalid(name, "contract.request.method", e))?,
    };

    let role = BodyRole::Request;
    let headers = optional(request, "headers");
    let params = optional(request, "params");
    Ok(ContractRequest {
        path,
        method,
        headers: named_values(name, "contract.request.headers", headers, role)?,
        params: named_values(name, "contract.request.params", params, role)?,
        body: body(name, "contract.request.body", optional(request, "body"), role)?,
    })
}

fn parse_response(name: &str, response: &YamlValue) -> Result<ContractResponse> {
    let status = required(name, response, "statusCode", "contract.response.statusCode")?;
    let status_code = status_code(status).ok_or_else(|| {
        ContractError::invalid(
            name,
            "contract.response.statusCode",
            "must be an integer between 100 and 599",
        )
    })?;

    let role = BodyRole::Response;
    let headers = optional(response, "headers");
    Ok(ContractResponse {
        status_code,
        headers: named_values(name, "contract.response.headers", headers, role)?,
        body: body(name, "contract.response.body", optional(response, "body"), role)?,
    })
}

fn status_code(value: &YamlValue) -> Option<u16> {
    let code = match value {
        YamlValue::Number(n) => n.as_u64()?,
        YamlValue::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (100..=599).contains(&code).then_some(code as u16)
}

/// A present, non-null field
fn optional<'a>(parent: &'a YamlValue, key: &str) -> Option<&'a YamlValue> {
    parent.get(key).filter(|v| !v.is_null())
}

fn required<'a>(name: &str, parent: &'a YamlValue, key: &str, path: &str) -> Result<&'a YamlValue> {
    optional(parent, key).ok_or_else(|| ContractError::missing(name, path))
}

fn body(
    name: &str,
    path: &str,
    value: Option<&YamlValue>,
    role: BodyRole,
) -> Result<Option<Value>> {
    value
        .map(|v| to_json(name, path, v).map(|json| materialize(json, role)))
        .transpose()
}

/// Normalize a mapping or a list of single-key mappings into ordered entries
fn named_values(
    name: &str,
    path: &str,
    value: Option<&YamlValue>,
    role: BodyRole,
) -> Result<Option<Vec<NamedValue>>> {
    let Some(value) = value else {
        return Ok(None);
    };

    let mut entries = Vec::new();
    match value {
        YamlValue::Mapping(map) => {
            for (key, item) in map {
                entries.push(named_value(name, path, key, item, role)?);
            }
        }
        YamlValue::Sequence(items) => {
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{}[{}]", path, i);
                match item {
                    YamlValue::Mapping(map) if map.len() == 1 => {
                        for (key, item) in map {
                            entries.push(named_value(name, &item_path, key, item, role)?);
                        }
                    }
                    other => {
                        return Err(ContractError::invalid(
                            name,
                            item_path,
                            format!(
                                "list entries must be single-key mappings, found {}",
                                yaml_kind(other)
                            ),
                        ))
                    }
                }
            }
        }
        other => {
            return Err(ContractError::UnsupportedDeclaration {
                contract: name.to_string(),
                path: path.to_string(),
                found: yaml_kind(other).to_string(),
            })
        }
    }
    Ok(Some(entries))
}

fn named_value(
    name: &str,
    path: &str,
    key: &YamlValue,
    value: &YamlValue,
    role: BodyRole,
) -> Result<NamedValue> {
    let key = match key {
        YamlValue::String(s) => s.clone(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Bool(b) => b.to_string(),
        other => {
            return Err(ContractError::invalid(
                name,
                path,
                format!("names must be scalars, found {}", yaml_kind(other)),
            ))
        }
    };
    let value = materialize(to_json(name, path, value)?, role);
    Ok(NamedValue { name: key, value })
}

fn to_json(name: &str, path: &str, value: &YamlValue) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| ContractError::invalid(name, path, e.to_string()))
}

fn yaml_kind(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "boolean",
        YamlValue::Number(_) => "number",
        YamlValue::String(_) => "string",
        YamlValue::Sequence(_) => "list",
        YamlValue::Mapping(_) => "mapping",
        YamlValue::Tagged(_) => "tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FULL: &str = r#"
contract:
  request:
    path: /users
    method: post
    headers:
      X-Trace: "<generate[uuid]>"
      Accept: application/json
    params:
      - page: 2
      - sort: name
    body:
      name: "<generate[string(length=12)]>"
      tags: ["<generate[string(length=2)]>"]
  response:
    statusCode: 201
    headers:
      - Content-Type: application/json
    body:
      id: "<anyNumber>"
      name: "<anyString>"
"#;

    #[test]
    fn test_parse_full_contract() {
        let contract = parse_contract("users/create", FULL).unwrap();
        assert_eq!(contract.name, "users/create");
        assert_eq!(contract.request.path, "/users");
        assert_eq!(contract.request.method, Method::Post);

        let headers = contract.request.headers.as_ref().unwrap();
        assert_eq!(headers[0].name, "X-Trace");
        assert_eq!(headers[0].value.as_str().unwrap().len(), 36);
        assert_eq!(headers[1], NamedValue::new("Accept", "application/json"));

        let params = contract.request.params.as_ref().unwrap();
        assert_eq!(params, &vec![NamedValue::new("page", 2), NamedValue::new("sort", "name")]);

        let body = contract.request.body.as_ref().unwrap();
        assert_eq!(body["name"].as_str().unwrap().len(), 12);
        assert_eq!(body["tags"][0].as_str().unwrap().len(), 2);

        assert_eq!(contract.response.status_code, 201);
        assert_eq!(
            contract.response.body,
            Some(json!({"id": "<anyNumber>", "name": "<anyString>"}))
        );
    }

    #[test]
    fn test_mapping_headers_keep_declaration_order() {
        let yaml = r#"
contract:
  request: { path: / }
  response:
    statusCode: 200
    headers:
      Zeta: "1"
      Alpha: "2"
      Mid: "3"
"#;
        let contract = parse_contract("order", yaml).unwrap();
        let names: Vec<_> = contract
            .response
            .headers
            .unwrap()
            .into_iter()
            .map(|h| h.name)
            .collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_method_defaults_to_get() {
        let yaml = "contract:\n  request:\n    path: /health\n  response:\n    statusCode: 200\n";
        let contract = parse_contract("health", yaml).unwrap();
        assert_eq!(contract.request.method, Method::Get);
        assert!(contract.request.headers.is_none());
        assert!(contract.response.body.is_none());
    }

    #[test]
    fn test_missing_required_fields() {
        let cases = [
            ("other: 1", "contract"),
            ("contract:\n  response:\n    statusCode: 200", "contract.request"),
            (
                "contract:\n  request:\n    method: get\n  response:\n    statusCode: 200",
                "contract.request.path",
            ),
            ("contract:\n  request:\n    path: /", "contract.response"),
            (
                "contract:\n  request:\n    path: /\n  response:\n    body: {}",
                "contract.response.statusCode",
            ),
        ];

        for (yaml, expected_path) in cases {
            match parse_contract("broken", yaml) {
                Err(ContractError::MissingField { contract, path }) => {
                    assert_eq!(contract, "broken");
                    assert_eq!(path, expected_path);
                }
                other => panic!("expected missing {}, got {:?}", expected_path, other),
            }
        }
    }

    #[test]
    fn test_unsupported_header_declaration() {
        let yaml = "contract:\n  request:\n    path: /\n    headers: just-a-string\n  \
                    response:\n    statusCode: 200\n";
        let err = parse_contract("bad", yaml).unwrap_err();
        assert!(matches!(
            err,
            ContractError::UnsupportedDeclaration { ref path, ref found, .. }
                if path == "contract.request.headers" && found == "string"
        ));
    }

    #[test]
    fn test_list_entries_must_be_single_key() {
        let yaml = "contract:\n  request:\n    path: /\n    params:\n      - a: 1\n        b: 2\n  \
                    response:\n    statusCode: 200\n";
        let err = parse_contract("bad", yaml).unwrap_err();
        assert!(matches!(
            err,
            ContractError::InvalidField { ref path, .. } if path == "contract.request.params[0]"
        ));
    }

    #[test]
    fn test_invalid_status_and_method() {
        let yaml = "contract:\n  request:\n    path: /\n  response:\n    statusCode: 42\n";
        assert!(matches!(
            parse_contract("bad", yaml),
            Err(ContractError::InvalidField { .. })
        ));

        let yaml = "contract:\n  request:\n    path: /\n    method: fetch\n  \
                    response:\n    statusCode: 200\n";
        assert!(matches!(
            parse_contract("bad", yaml),
            Err(ContractError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            parse_contract("bad", "contract: [unclosed"),
            Err(ContractError::Parse { .. })
        ));
    }

    #[test]
    fn test_contract_name_derivation() {
        let root = Path::new("/contracts");
        assert_eq!(
            contract_name(root, Path::new("/contracts/users/get_user.yaml")),
            "users/get_user"
        );
        assert_eq!(contract_name(root, Path::new("/contracts/ping.yml")), "ping");
        let file = Path::new("/contracts/single.yaml");
        assert_eq!(contract_name(file, file), "single");
    }

    #[test]
    fn test_discover_and_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("users")).unwrap();
        std::fs::write(
            root.join("users/get.yaml"),
            "contract:\n  request:\n    path: /users/1\n  response:\n    statusCode: 200\n",
        )
        .unwrap();
        std::fs::write(root.join("broken.YML"), "contract:\n  request:\n    path: /\n").unwrap();
        std::fs::write(root.join("notes.txt"), "not a contract").unwrap();

        let files = discover(root).unwrap();
        assert_eq!(files.len(), 2);

        let loaded = load_contracts(root).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].name, "broken");
        assert!(loaded[0].contract.is_err());
        assert_eq!(loaded[1].name, "users/get");
        assert!(loaded[1].contract.is_ok());
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let doc = "contract:\n  request:\n    path: /\n  response:\n    statusCode: 200\n";
        std::fs::write(dir.path().join("ping.yaml"), doc).unwrap();
        std::fs::write(dir.path().join("ping.yml"), doc).unwrap();

        let loaded = load_contracts(dir.path()).unwrap();
        assert!(loaded[0].contract.is_ok());
        assert!(loaded[1].contract.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_entry_fails_alone() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(
            root.join("ok.yaml"),
            "contract:\n  request:\n    path: /ok\n  response:\n    statusCode: 200\n",
        )
        .unwrap();
        std::fs::create_dir(root.join("sub")).unwrap();
        std::os::unix::fs::symlink(root, root.join("sub/loop")).unwrap();

        assert_eq!(discover(root).unwrap(), vec![root.join("ok.yaml")]);

        let loaded = load_contracts(root).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].name, "ok");
        assert!(loaded[0].contract.is_ok());
        assert_eq!(loaded[1].name, "sub/loop");
        assert!(matches!(loaded[1].contract, Err(ContractError::Discovery(_))));
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_contracts(&dir.path().join("absent")),
            Err(ContractError::Discovery(_))
        ));
    }
}
