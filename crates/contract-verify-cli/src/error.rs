//! Error types for the contract-verify CLI
//!
//! Distinguishes problems the user can fix (bad arguments, unreadable files,
//! malformed documents) from internal failures; the distinction drives the
//! process exit code.

use contract_verify_core::ContractError;
use thiserror::Error;

/// Main error type for CLI operations
#[derive(Error, Debug)]
pub enum VerifyError {
    /// Invalid arguments or configuration
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File access or I/O error
    #[error("File error: {0}")]
    FileError(String),

    /// Document parsing error
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Report serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl VerifyError {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        VerifyError::InvalidInput(msg.into())
    }

    /// Create a file error
    pub fn file_error(msg: impl Into<String>) -> Self {
        VerifyError::FileError(msg.into())
    }

    /// Create a parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        VerifyError::ParseError(msg.into())
    }

    /// Check if this is a user-facing error (vs internal)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            VerifyError::InvalidInput(_) | VerifyError::FileError(_) | VerifyError::ParseError(_)
        )
    }

    /// Check if this error concerns a file that could not be read or written
    pub fn is_file_error(&self) -> bool {
        matches!(self, VerifyError::FileError(_))
    }
}

impl From<std::io::Error> for VerifyError {
    fn from(err: std::io::Error) -> Self {
        VerifyError::FileError(err.to_string())
    }
}

impl From<ContractError> for VerifyError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::Io(e) => VerifyError::FileError(e.to_string()),
            ContractError::Discovery(msg) => VerifyError::FileError(msg),
            other => VerifyError::ParseError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors() {
        assert!(VerifyError::invalid_input("x").is_user_error());
        assert!(VerifyError::file_error("x").is_user_error());
        assert!(VerifyError::parse_error("x").is_user_error());
        assert!(!VerifyError::InternalError("x".into()).is_user_error());
        assert!(!VerifyError::SerializationError("x".into()).is_user_error());
    }

    #[test]
    fn test_contract_error_conversion() {
        let err: VerifyError = ContractError::Discovery("no such dir".into()).into();
        assert!(err.is_file_error());

        let err: VerifyError = ContractError::missing("users/get", "contract.response").into();
        assert!(matches!(err, VerifyError::ParseError(_)));
    }
}
