//! Contract Verify Core
//!
//! Consumer-driven HTTP contract verification: decide whether a live response
//! satisfies a declarative contract.
//!
//! ## Features
//!
//! - **Contracts**: YAML documents declaring a request and its expected response
//! - **Placeholders**: `<generate[...]>` tokens for request values, `<anyString>`,
//!   `<anyNumber>` and `<anyBool>` wildcards for expected values
//! - **Structural Comparison**: Open-world diff of JSON bodies with full key paths
//! - **Rule Pipeline**: Status code, body type, body structure and header rules
//!   merged into one violation report
//! - **OpenAPI Import**: Contract generation from OpenAPI 3 and Swagger 2 documents
//!
//! ## Architecture
//!
//! 1. **Model** (`model`): Contract, request, expected and actual response types.
//!
//! 2. **Placeholder** (`placeholder`): Generator and wildcard token handling.
//!
//! 3. **Comparator** (`comparator`): Recursive expected/actual value diff.
//!
//! 4. **Engine** (`engine`): Ordered rules producing a [`ViolationReport`].
//!
//! 5. **Loader** (`loader`): Contract discovery and parsing.
//!
//! 6. **OpenAPI** (`openapi`): Contract generation from API descriptions.
//!
//! ## Example
//!
//! ```rust
//! use contract_verify_core::{validate, ActualResponse, ContractResponse};
//! use serde_json::json;
//!
//! let expected = ContractResponse::new(200).with_body(json!({"id": "<anyNumber>"}));
//! let actual = ActualResponse::new(200).with_body(json!({"id": 7, "extra": true}));
//!
//! assert!(!validate(&expected, &actual).has_violations());
//! ```

pub mod comparator;
pub mod engine;
pub mod error;
pub mod loader;
pub mod model;
pub mod openapi;
pub mod placeholder;
pub mod violation;

pub use comparator::{compare, Comparator, MAX_DEPTH};
pub use engine::{
    validate, ResponseRule, RuleContext, ValidationContext, ValidationEngine, ValidationOptions,
};
pub use error::{ContractError, Result, RuleError};
pub use loader::{load_contracts, parse_contract, LoadedContract};
pub use model::{ActualResponse, Contract, ContractRequest, ContractResponse, Method, NamedValue};
pub use openapi::contracts_from_openapi;
pub use placeholder::{BodyRole, GeneratorToken, Wildcard, WildcardKind};
pub use violation::{Observed, Violation, ViolationReport};
