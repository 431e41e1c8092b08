//! Error types for the contract verification engine
//!
//! Contract errors are raised while loading a single contract and abort only
//! that contract. Rule errors never leave the validation pipeline; they are
//! folded into a synthetic violation.

use thiserror::Error;

/// Errors raised while discovering, parsing or generating contracts
#[derive(Error, Debug)]
pub enum ContractError {
    /// A required field is absent from the contract document
    #[error("Contract '{contract}' is missing required field '{path}'")]
    MissingField { contract: String, path: String },

    /// Headers or params declared with a type other than mapping or list
    #[error(
        "Contract '{contract}': '{path}' must be a mapping or a list of single-key mappings, \
         found {found}"
    )]
    UnsupportedDeclaration {
        contract: String,
        path: String,
        found: String,
    },

    /// A field is present but holds an unusable value
    #[error("Contract '{contract}': invalid value at '{path}': {reason}")]
    InvalidField {
        contract: String,
        path: String,
        reason: String,
    },

    /// The document could not be deserialized
    #[error("Parse error in '{contract}': {message}")]
    Parse { contract: String, message: String },

    /// File access error
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory traversal error
    #[error("Discovery error: {0}")]
    Discovery(String),
}

impl ContractError {
    /// Create a missing field error
    pub fn missing(contract: impl Into<String>, path: impl Into<String>) -> Self {
        ContractError::MissingField {
            contract: contract.into(),
            path: path.into(),
        }
    }

    /// Create an invalid field error
    pub fn invalid(
        contract: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ContractError::InvalidField {
            contract: contract.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a parse error
    pub fn parse(contract: impl Into<String>, message: impl ToString) -> Self {
        ContractError::Parse {
            contract: contract.into(),
            message: message.to_string(),
        }
    }
}

impl From<walkdir::Error> for ContractError {
    fn from(err: walkdir::Error) -> Self {
        ContractError::Discovery(err.to_string())
    }
}

/// Errors raised by a single validation rule
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    /// The value tree nests deeper than the comparator allows
    #[error("value tree exceeds maximum depth of {max} at '{path}'")]
    DepthExceeded { path: String, max: usize },

    /// Any other failure inside a rule
    #[error("{0}")]
    Internal(String),
}

/// Result type alias for contract loading operations
pub type Result<T> = std::result::Result<T, ContractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_names_contract_and_path() {
        let err = ContractError::missing("users/get", "contract.response.statusCode");
        assert_eq!(
            err.to_string(),
            "Contract 'users/get' is missing required field 'contract.response.statusCode'"
        );
    }

    #[test]
    fn test_rule_error_display() {
        let err = RuleError::DepthExceeded {
            path: "a.b".to_string(),
            max: 4,
        };
        assert_eq!(err.to_string(), "value tree exceeds maximum depth of 4 at 'a.b'");
    }
}
